//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{NewAccount, ProfileUpdate, check_role_company};

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
///
/// 8 to 128 characters with at least one uppercase letter, one lowercase
/// letter and one digit.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    let length = password.chars().count();
    if length < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if length > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }

    Ok(())
}

/// Validate a display name
pub fn validate_name(name: &str) -> Result<(), String> {
    let length = name.trim().chars().count();
    if length < 2 {
        return Err("Name must be at least 2 characters long".to_string());
    }
    if length > 100 {
        return Err("Name must be at most 100 characters long".to_string());
    }
    Ok(())
}

/// Validate a company name
pub fn validate_company(company: &str) -> Result<(), String> {
    let company = company.trim();
    if company.is_empty() {
        return Err("Company cannot be empty".to_string());
    }
    if company.chars().count() > 200 {
        return Err("Company must be at most 200 characters long".to_string());
    }
    Ok(())
}

/// Normalise an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate a signup request, role/company pairing included
pub fn validate_new_account(account: &NewAccount) -> Result<(), String> {
    validate_email(&normalize_email(&account.email))?;
    validate_password(&account.password)?;
    validate_name(&account.name)?;
    if let Some(company) = &account.company {
        validate_company(company)?;
    }
    check_role_company(account.role, account.company.as_deref())
}

/// Validate a self-service profile update
pub fn validate_profile_update(update: &ProfileUpdate) -> Result<(), String> {
    if let Some(name) = &update.name {
        validate_name(name)?;
    }
    if let Some(Some(url)) = &update.resume_url {
        if url.len() > 2048 {
            return Err("Resume reference must be at most 2048 characters long".to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn account(role: Role, company: Option<&str>) -> NewAccount {
        NewAccount {
            email: "John.Doe@Email.com".to_string(),
            password: "Password1".to_string(),
            name: "John Doe".to_string(),
            role,
            company: company.map(str::to_string),
        }
    }

    #[test]
    fn email_format() {
        assert!(validate_email("john.doe@email.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("john.doe").is_err());
        assert!(validate_email("john@email").is_err());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("Password1").is_ok());
        assert!(validate_password("Pass1").is_err());
        assert!(validate_password("password1").is_err());
        assert!(validate_password("PASSWORD1").is_err());
        assert!(validate_password("Password").is_err());
        assert!(validate_password(&format!("Aa1{}", "x".repeat(126))).is_err());
    }

    #[test]
    fn name_and_company() {
        assert!(validate_name("Jo").is_ok());
        assert!(validate_name(" J ").is_err());
        assert!(validate_company("META").is_ok());
        assert!(validate_company("   ").is_err());
    }

    #[test]
    fn new_account_checks_role_company_pairing() {
        assert!(validate_new_account(&account(Role::Applicant, None)).is_ok());
        assert!(validate_new_account(&account(Role::Recruiter, Some("META"))).is_ok());
        assert!(validate_new_account(&account(Role::Recruiter, None)).is_err());
        assert!(validate_new_account(&account(Role::Applicant, Some("META"))).is_err());
    }

    #[test]
    fn emails_are_normalised() {
        assert_eq!(normalize_email("  John.Doe@Email.COM "), "john.doe@email.com");
    }
}
