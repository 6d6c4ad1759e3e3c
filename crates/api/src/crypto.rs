//! Cryptographic helpers for authentication and request signing.
//!
//! - PBKDF2-SHA256 password hashing (600k iterations)
//! - HMAC-SHA256 JWT signing/verification
//! - HMAC-SHA256 request signatures (manager bootstrap, GitHub webhooks)
//!
//! Pure Rust crates throughout; no openssl linkage.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use crate::ServiceError;

const PBKDF2_ITERATIONS: u32 = 600_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

// ── Password hashing ────────────────────────────────────────────────────────

/// Hash a password with PBKDF2-SHA256. Returns `(hash_hex, salt_hex)`.
pub fn hash_password(password: &str) -> Result<(String, String), ServiceError> {
    let mut salt = [0u8; SALT_LEN];
    getrandom::getrandom(&mut salt)
        .map_err(|e| ServiceError::Internal(format!("RNG failure: {e}")))?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut hash);

    Ok((hex::encode(hash), hex::encode(salt)))
}

/// Verify a password against a stored hash and salt (both hex-encoded).
pub fn verify_password(password: &str, hash_hex: &str, salt_hex: &str) -> bool {
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(hash_hex) else {
        return false;
    };

    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut hash);

    constant_time_eq(&hash, &expected)
}

// ── JWT (HMAC-SHA256) ───────────────────────────────────────────────────────

/// JWT header (always HS256).
const JWT_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// JWT expiry: 1 hour in seconds.
pub const JWT_EXPIRY_SECS: u64 = 3600;

/// Refresh token expiry: 30 days in seconds (remember-me window).
pub const REFRESH_EXPIRY_SECS: u64 = 30 * 24 * 3600;

/// Sign a JWT carrying the user id and tenant id. Returns the encoded token.
pub fn sign_jwt(user_id: &str, tenant_id: &str, secret: &str, now_unix: u64) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(JWT_HEADER.as_bytes());

    let payload = format!(
        r#"{{"sub":"{}","tid":"{}","iat":{},"exp":{}}}"#,
        user_id,
        tenant_id,
        now_unix,
        now_unix + JWT_EXPIRY_SECS,
    );
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let signing_input = format!("{header_b64}.{payload_b64}");
    let signature = hmac_sha256(secret.as_bytes(), signing_input.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(signature);

    format!("{signing_input}.{sig_b64}")
}

/// Verified JWT claims.
pub struct JwtClaims {
    pub user_id: String,
    pub tenant_id: String,
}

/// Verify a JWT and return its claims if valid and unexpired.
pub fn verify_jwt(token: &str, secret: &str, now_unix: u64) -> Result<JwtClaims, ServiceError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ServiceError::Unauthorized("invalid JWT format".into()));
    }

    let signing_input = format!("{}.{}", parts[0], parts[1]);
    let expected_sig = hmac_sha256(secret.as_bytes(), signing_input.as_bytes());
    let actual_sig = URL_SAFE_NO_PAD
        .decode(parts[2])
        .map_err(|_| ServiceError::Unauthorized("invalid JWT signature encoding".into()))?;

    if !constant_time_eq(&expected_sig, &actual_sig) {
        return Err(ServiceError::Unauthorized("invalid JWT signature".into()));
    }

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|_| ServiceError::Unauthorized("invalid JWT payload encoding".into()))?;
    let payload: serde_json::Value = serde_json::from_slice(&payload_bytes)
        .map_err(|_| ServiceError::Unauthorized("invalid JWT payload".into()))?;

    let exp = payload["exp"]
        .as_u64()
        .ok_or_else(|| ServiceError::Unauthorized("missing exp claim".into()))?;
    if now_unix > exp {
        return Err(ServiceError::Unauthorized("JWT expired".into()));
    }

    let user_id = payload["sub"]
        .as_str()
        .ok_or_else(|| ServiceError::Unauthorized("missing sub claim".into()))?
        .to_string();
    let tenant_id = payload["tid"]
        .as_str()
        .ok_or_else(|| ServiceError::Unauthorized("missing tid claim".into()))?
        .to_string();

    Ok(JwtClaims { user_id, tenant_id })
}

// ── Opaque tokens ───────────────────────────────────────────────────────────

/// Generate a secure random token (refresh, invitation, verification,
/// webhook secrets). Returns hex-encoded 32 bytes.
pub fn generate_token() -> Result<String, ServiceError> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| ServiceError::Internal(format!("RNG failure: {e}")))?;
    Ok(hex::encode(bytes))
}

/// Hash a token with SHA-256 for storage. Returns hex-encoded.
pub fn hash_token(token: &str) -> String {
    use sha2::Digest;
    let hash = sha2::Sha256::digest(token.as_bytes());
    hex::encode(hash)
}

// ── Signed requests ─────────────────────────────────────────────────────────

/// Compute the hex signature for a timestamped request body:
/// `HMAC-SHA256(secret, "{timestamp}.{body}")`.
pub fn sign_request(secret: &str, timestamp: u64, body: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a timestamped request signature.
///
/// Rejects timestamps outside `tolerance_secs` of `now_unix` in either
/// direction (stale replays and future-dated requests alike), then compares
/// the signature in constant time.
pub fn verify_signed_request(
    secret: &str,
    timestamp: u64,
    body: &[u8],
    signature_hex: &str,
    now_unix: u64,
    tolerance_secs: u64,
) -> Result<(), ServiceError> {
    let skew = now_unix.abs_diff(timestamp);
    if skew > tolerance_secs {
        return Err(ServiceError::Unauthorized(
            "request timestamp outside tolerance window".into(),
        ));
    }

    let expected = sign_request(secret, timestamp, body);
    let Ok(expected_raw) = hex::decode(&expected) else {
        return Err(ServiceError::Internal("signature encoding failure".into()));
    };
    let Ok(actual_raw) = hex::decode(signature_hex) else {
        return Err(ServiceError::Unauthorized("malformed signature".into()));
    };

    if !constant_time_eq(&expected_raw, &actual_raw) {
        return Err(ServiceError::Unauthorized("invalid signature".into()));
    }
    Ok(())
}

/// Verify a GitHub-style `X-Hub-Signature-256` header (`sha256=<hex>`)
/// against the raw request body.
pub fn verify_webhook_signature(
    secret: &str,
    body: &[u8],
    header_value: &str,
) -> Result<(), ServiceError> {
    let hex_sig = header_value
        .strip_prefix("sha256=")
        .ok_or_else(|| ServiceError::Unauthorized("malformed webhook signature".into()))?;

    let expected = hmac_sha256(secret.as_bytes(), body);
    let actual = hex::decode(hex_sig)
        .map_err(|_| ServiceError::Unauthorized("malformed webhook signature".into()))?;

    if !constant_time_eq(&expected, &actual) {
        return Err(ServiceError::Unauthorized("invalid webhook signature".into()));
    }
    Ok(())
}

// ── Internal ────────────────────────────────────────────────────────────────

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_roundtrip() {
        let (hash, salt) = hash_password("hunter22").expect("hash");
        assert!(verify_password("hunter22", &hash, &salt));
        assert!(!verify_password("hunter23", &hash, &salt));
    }

    #[test]
    fn jwt_roundtrip_carries_tenant() {
        let token = sign_jwt("u-1", "t-acme", "secret", 1_700_000_000);
        let claims = verify_jwt(&token, "secret", 1_700_000_100).expect("verify");
        assert_eq!(claims.user_id, "u-1");
        assert_eq!(claims.tenant_id, "t-acme");
    }

    #[test]
    fn jwt_rejects_wrong_secret_and_expiry() {
        let token = sign_jwt("u-1", "t-acme", "secret", 1_700_000_000);
        assert!(verify_jwt(&token, "other", 1_700_000_100).is_err());
        assert!(verify_jwt(&token, "secret", 1_700_000_000 + JWT_EXPIRY_SECS + 1).is_err());
    }

    #[test]
    fn signed_request_roundtrip() {
        let sig = sign_request("mgr-secret", 1_700_000_000, b"{\"slug\":\"acme\"}");
        verify_signed_request(
            "mgr-secret",
            1_700_000_000,
            b"{\"slug\":\"acme\"}",
            &sig,
            1_700_000_060,
            300,
        )
        .expect("inside window");
    }

    #[test]
    fn signed_request_rejects_outside_window() {
        let body = b"{}";
        let sig = sign_request("s", 1_700_000_000, body);
        // Stale beyond tolerance.
        let err = verify_signed_request("s", 1_700_000_000, body, &sig, 1_700_000_301, 300)
            .expect_err("stale");
        assert_eq!(err.status_code(), 401);
        // Future-dated beyond tolerance.
        let sig = sign_request("s", 1_700_000_700, body);
        assert!(verify_signed_request("s", 1_700_000_700, body, &sig, 1_700_000_000, 300).is_err());
    }

    #[test]
    fn signed_request_rejects_tampered_body() {
        let sig = sign_request("s", 1_700_000_000, b"a");
        assert!(verify_signed_request("s", 1_700_000_000, b"b", &sig, 1_700_000_000, 300).is_err());
    }

    #[test]
    fn webhook_signature_roundtrip() {
        let body = br#"{"repository":{"full_name":"acme/docs"}}"#;
        let expected = {
            let mut mac = Hmac::<Sha256>::new_from_slice(b"wh-secret").unwrap();
            mac.update(body);
            hex::encode(mac.finalize().into_bytes())
        };
        verify_webhook_signature("wh-secret", body, &format!("sha256={expected}"))
            .expect("valid signature");
        assert!(verify_webhook_signature("wh-secret", body, "sha256=deadbeef").is_err());
        assert!(verify_webhook_signature("wh-secret", body, &expected).is_err());
    }
}
