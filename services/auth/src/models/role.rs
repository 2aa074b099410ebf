//! Role model and related functionality

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role
///
/// The role decides the ownership scope of a caller: applicants own their
/// applications, recruiters act on behalf of their company. Administrative
/// privilege is carried separately by `User::is_admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    Applicant,
    Recruiter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Applicant => "applicant",
            Role::Recruiter => "recruiter",
        }
    }

    /// Whether an account with this role must carry a company.
    pub fn requires_company(&self) -> bool {
        matches!(self, Role::Recruiter)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applicant" => Ok(Role::Applicant),
            "recruiter" => Ok(Role::Recruiter),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Check the role/company pairing every account must satisfy.
///
/// Recruiters need a company; applicants must not have one.
pub fn check_role_company(role: Role, company: Option<&str>) -> Result<(), String> {
    match (role.requires_company(), company) {
        (true, None) => Err("Company is required for recruiters".to_string()),
        (false, Some(_)) => Err("Applicants cannot have a company".to_string()),
        _ => Ok(()),
    }
}
