//! Refresh-token + verification-token query builders.

use sea_query::{Expr, Query, SqliteQueryBuilder};

use super::tables::{RefreshTokens, VerificationTokens};
use super::Built;

// ── Refresh tokens ────────────────────────────────────────────────────────

/// INSERT a refresh token (stores hash only).
pub fn refresh_insert(id: &str, user_id: &str, token_hash: &str, expires_at: &str) -> Built {
    Query::insert()
        .into_table(RefreshTokens::Table)
        .columns([
            RefreshTokens::Id,
            RefreshTokens::UserId,
            RefreshTokens::TokenHash,
            RefreshTokens::ExpiresAt,
        ])
        .values_panic([
            id.into(),
            user_id.into(),
            token_hash.into(),
            expires_at.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Look up an unexpired refresh token by hash.
pub fn refresh_lookup(token_hash: &str) -> Built {
    Query::select()
        .columns([
            RefreshTokens::Id,
            RefreshTokens::UserId,
            RefreshTokens::ExpiresAt,
        ])
        .from(RefreshTokens::Table)
        .and_where(Expr::col(RefreshTokens::TokenHash).eq(token_hash))
        .and_where(Expr::col(RefreshTokens::ExpiresAt).gt(Expr::cust("datetime('now')")))
        .build(SqliteQueryBuilder)
}

/// DELETE a refresh token by hash (logout, rotation).
pub fn refresh_delete_by_hash(token_hash: &str) -> Built {
    Query::delete()
        .from_table(RefreshTokens::Table)
        .and_where(Expr::col(RefreshTokens::TokenHash).eq(token_hash))
        .build(SqliteQueryBuilder)
}

/// DELETE all refresh tokens for a user (password change, archive).
pub fn refresh_delete_for_user(user_id: &str) -> Built {
    Query::delete()
        .from_table(RefreshTokens::Table)
        .and_where(Expr::col(RefreshTokens::UserId).eq(user_id))
        .build(SqliteQueryBuilder)
}

// ── Verification tokens ───────────────────────────────────────────────────

/// INSERT a verification token for a purpose (`email_verify`, `password_reset`).
pub fn verification_insert(
    id: &str,
    user_id: &str,
    token_hash: &str,
    purpose: &str,
    expires_at: &str,
) -> Built {
    Query::insert()
        .into_table(VerificationTokens::Table)
        .columns([
            VerificationTokens::Id,
            VerificationTokens::UserId,
            VerificationTokens::TokenHash,
            VerificationTokens::Purpose,
            VerificationTokens::ExpiresAt,
        ])
        .values_panic([
            id.into(),
            user_id.into(),
            token_hash.into(),
            purpose.into(),
            expires_at.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Look up an unused, unexpired verification token by hash + purpose.
pub fn verification_lookup(token_hash: &str, purpose: &str) -> Built {
    Query::select()
        .columns([VerificationTokens::Id, VerificationTokens::UserId])
        .from(VerificationTokens::Table)
        .and_where(Expr::col(VerificationTokens::TokenHash).eq(token_hash))
        .and_where(Expr::col(VerificationTokens::Purpose).eq(purpose))
        .and_where(Expr::col(VerificationTokens::UsedAt).is_null())
        .and_where(Expr::col(VerificationTokens::ExpiresAt).gt(Expr::cust("datetime('now')")))
        .build(SqliteQueryBuilder)
}

/// Mark a verification token as used.
pub fn verification_mark_used(id: &str) -> Built {
    Query::update()
        .table(VerificationTokens::Table)
        .value(VerificationTokens::UsedAt, Expr::cust("datetime('now')"))
        .and_where(Expr::col(VerificationTokens::Id).eq(id))
        .and_where(Expr::col(VerificationTokens::UsedAt).is_null())
        .build(SqliteQueryBuilder)
}
