//! Field checks shared by request bodies

pub(crate) fn non_blank(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }
    Ok(())
}

pub(crate) fn check_len(field: &str, value: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("{} must be at most {} characters long", field, max));
    }
    Ok(())
}

pub(crate) fn check_optional_len(field: &str, value: Option<&str>, max: usize) -> Result<(), String> {
    value.map_or(Ok(()), |value| check_len(field, value, max))
}

pub(crate) fn check_salary(salary: Option<i32>) -> Result<(), String> {
    match salary {
        Some(target) if target <= 0 => Err("salaryTarget must be positive".to_string()),
        _ => Ok(()),
    }
}

/// Accept absolute http(s) URLs only
pub(crate) fn check_link(value: &str) -> Result<(), String> {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .ok_or_else(|| "link must be an http(s) URL".to_string())?;
    if rest.is_empty() || rest.chars().any(char::is_whitespace) {
        return Err("link must be an http(s) URL".to_string());
    }
    check_len("link", value, 2048)
}
