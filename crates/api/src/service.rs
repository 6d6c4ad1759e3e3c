//! Shared business logic — framework-agnostic pure functions.
//!
//! Route handlers stay thin adapters: validation, normalization, and token
//! bundle preparation all live here.

use crate::{AuthTokenResponse, ServiceError};

// ─── Validation ─────────────────────────────────────────────────────────────

/// Validate and normalize an email address. Returns the lowercased, trimmed email.
pub fn validate_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') || email.len() > 254 {
        return Err(ServiceError::BadRequest("invalid email address".into()));
    }
    Ok(email)
}

/// Validate a password (8-128 characters).
pub fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.len() < 8 {
        return Err(ServiceError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }
    if password.len() > 128 {
        return Err(ServiceError::BadRequest(
            "password must be at most 128 characters".into(),
        ));
    }
    Ok(())
}

/// Validate and normalize a display name. Returns the trimmed name.
pub fn validate_display_name(name: &str) -> Result<String, ServiceError> {
    let trimmed = name.trim().to_string();
    if trimmed.is_empty() || trimmed.len() > 64 {
        return Err(ServiceError::BadRequest(
            "display name must be 1-64 characters".into(),
        ));
    }
    Ok(trimmed)
}

/// Validate a GitHub `owner/repo` full name.
pub fn validate_repo_full_name(value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    let valid = matches!(trimmed.split('/').collect::<Vec<_>>().as_slice(), [owner, repo]
        if !owner.is_empty()
            && !repo.is_empty()
            && trimmed.len() <= 140
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/')));
    if !valid {
        return Err(ServiceError::BadRequest(
            "repository must be in owner/repo form".into(),
        ));
    }
    Ok(trimmed.to_string())
}

// ─── Invitations ────────────────────────────────────────────────────────────

/// Invitation lifetime in days.
pub const INVITATION_EXPIRY_DAYS: i64 = 7;

/// Verification token lifetime in days.
pub const VERIFICATION_EXPIRY_DAYS: i64 = 3;

/// Compute an expiry timestamp in SQLite datetime format.
pub fn expiry_sqlite(now_unix: u64, days: i64) -> Result<String, ServiceError> {
    let base = chrono::DateTime::from_timestamp(now_unix as i64, 0)
        .ok_or_else(|| ServiceError::Internal("invalid timestamp".into()))?;
    Ok((base + chrono::Duration::days(days))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string())
}

/// Current time in SQLite datetime format.
pub fn now_sqlite(now_unix: u64) -> Result<String, ServiceError> {
    let base = chrono::DateTime::from_timestamp(now_unix as i64, 0)
        .ok_or_else(|| ServiceError::Internal("invalid timestamp".into()))?;
    Ok(base.format("%Y-%m-%d %H:%M:%S").to_string())
}

// ─── Token Bundle ───────────────────────────────────────────────────────────

/// Pre-computed token bundle returned by [`prepare_token_bundle`].
///
/// Contains everything needed to insert a refresh token row and return the
/// auth response. The caller only performs the DB INSERT.
pub struct TokenBundle {
    /// JWT access token.
    pub access_token: String,
    /// Raw refresh token (sent to the client).
    pub refresh_token: String,
    /// SHA-256 hash of the refresh token (stored in DB).
    pub token_hash: String,
    /// UUID primary key for the refresh_tokens row.
    pub token_id: String,
    /// `datetime` string for the refresh token expiry (DB column value).
    pub expires_at: String,
    /// Ready-to-return API response.
    pub response: AuthTokenResponse,
}

/// Build a [`TokenBundle`] containing a JWT, refresh token, and the auth
/// response for a user in a tenant.
pub fn prepare_token_bundle(
    jwt_secret: &str,
    tenant_id: &str,
    user_id: &str,
    display_name: &str,
    now_unix: u64,
) -> Result<TokenBundle, ServiceError> {
    use crate::crypto;

    let access_token = crypto::sign_jwt(user_id, tenant_id, jwt_secret, now_unix);
    let refresh_token = crypto::generate_token()?;
    let token_hash = crypto::hash_token(&refresh_token);
    let token_id = uuid::Uuid::new_v4().to_string();

    let base = chrono::DateTime::from_timestamp(now_unix as i64, 0)
        .ok_or_else(|| ServiceError::Internal("invalid timestamp".into()))?;
    let expires_at = base
        .checked_add_signed(chrono::Duration::seconds(crypto::REFRESH_EXPIRY_SECS as i64))
        .ok_or_else(|| ServiceError::Internal("timestamp overflow".into()))?
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    let response = AuthTokenResponse {
        access_token: access_token.clone(),
        refresh_token: refresh_token.clone(),
        expires_in: crypto::JWT_EXPIRY_SECS,
        user_id: user_id.to_string(),
        display_name: display_name.to_string(),
    };

    Ok(TokenBundle {
        access_token,
        refresh_token,
        token_hash,
        token_id,
        expires_at,
        response,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email(" Al@Example.COM ").unwrap(), "al@example.com");
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_display_name() {
        assert_eq!(validate_display_name("  Ada  ").unwrap(), "Ada");
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_repo_full_name() {
        assert_eq!(
            validate_repo_full_name("acme/docs-site").unwrap(),
            "acme/docs-site"
        );
        assert!(validate_repo_full_name("acme").is_err());
        assert!(validate_repo_full_name("a/b/c").is_err());
        assert!(validate_repo_full_name("bad name/repo").is_err());
    }

    #[test]
    fn token_bundle_hashes_refresh_token() {
        let bundle = prepare_token_bundle("secret", "t-1", "u-1", "Ada", 1_700_000_000).unwrap();
        assert_eq!(
            bundle.token_hash,
            crate::crypto::hash_token(&bundle.refresh_token)
        );
        assert_eq!(bundle.response.user_id, "u-1");
        assert!(!bundle.access_token.is_empty());
    }
}
