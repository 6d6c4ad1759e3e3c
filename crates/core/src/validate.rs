//! Domain input validation shared by the server and provisioning paths.

use regex::Regex;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidateError {
    #[error("invalid slug: {0}")]
    InvalidSlug(String),
    #[error("title must be 1-200 characters")]
    InvalidTitle,
    #[error("name must be 1-100 characters")]
    InvalidName,
}

/// Tenant, org, and space slugs: lowercase, digits, hyphens, 1-63 chars,
/// must start with an alphanumeric.
pub fn validate_slug(value: &str) -> Result<String, ValidateError> {
    static SLUG_RE: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
        Regex::new(r"^[a-z0-9][a-z0-9-]{0,62}$").expect("slug regex should compile")
    });
    let trimmed = value.trim();
    if SLUG_RE.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(ValidateError::InvalidSlug(value.to_string()))
    }
}

/// Document titles: trimmed, 1-200 characters.
pub fn validate_title(value: &str) -> Result<String, ValidateError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 200 {
        return Err(ValidateError::InvalidTitle);
    }
    Ok(trimmed.to_string())
}

/// Display names (tenants, orgs, sites): trimmed, 1-100 characters.
pub fn validate_name(value: &str) -> Result<String, ValidateError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 100 {
        return Err(ValidateError::InvalidName);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs() {
        assert_eq!(validate_slug("acme-docs").unwrap(), "acme-docs");
        assert_eq!(validate_slug("  acme  ").unwrap(), "acme");
        assert!(validate_slug("-acme").is_err());
        assert!(validate_slug("Acme").is_err());
        assert!(validate_slug("").is_err());
        assert!(validate_slug(&"a".repeat(64)).is_err());
    }

    #[test]
    fn titles() {
        assert_eq!(validate_title(" Install guide ").unwrap(), "Install guide");
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(201)).is_err());
    }
}
