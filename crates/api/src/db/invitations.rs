//! Invitation query builders.

use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};

use super::tables::Invitations;
use super::Built;

fn invitation_columns(q: &mut sea_query::SelectStatement) -> &mut sea_query::SelectStatement {
    q.columns([
        Invitations::Id,
        Invitations::OrgId,
        Invitations::Email,
        Invitations::RoleId,
        Invitations::Status,
        Invitations::InvitedBy,
        Invitations::CreatedAt,
        Invitations::ExpiresAt,
    ])
}

/// INSERT an invitation (stores the token hash only).
pub fn insert(
    id: &str,
    org_id: &str,
    email: &str,
    role_id: &str,
    token_hash: &str,
    invited_by: Option<&str>,
    expires_at: &str,
) -> Built {
    Query::insert()
        .into_table(Invitations::Table)
        .columns([
            Invitations::Id,
            Invitations::OrgId,
            Invitations::Email,
            Invitations::RoleId,
            Invitations::TokenHash,
            Invitations::InvitedBy,
            Invitations::ExpiresAt,
        ])
        .values_panic([
            id.into(),
            org_id.into(),
            email.into(),
            role_id.into(),
            token_hash.into(),
            invited_by.map(|s| s.to_string()).into(),
            expires_at.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Look up a pending, unexpired invitation by token hash.
pub fn lookup_by_token_hash(token_hash: &str) -> Built {
    let mut q = Query::select().to_owned();
    invitation_columns(&mut q);
    q.from(Invitations::Table)
        .and_where(Expr::col(Invitations::TokenHash).eq(token_hash))
        .and_where(Expr::col(Invitations::Status).eq("pending"))
        .and_where(Expr::col(Invitations::ExpiresAt).gt(Expr::cust("datetime('now')")))
        .build(SqliteQueryBuilder)
}

/// List invitations for an org, newest first.
pub fn list(org_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    invitation_columns(&mut q);
    q.from(Invitations::Table)
        .and_where(Expr::col(Invitations::OrgId).eq(org_id))
        .order_by(Invitations::CreatedAt, Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Count pending invitations for an email within an org.
pub fn pending_for_email(org_id: &str, email: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(Invitations::Table)
        .and_where(Expr::col(Invitations::OrgId).eq(org_id))
        .and_where(Expr::col(Invitations::Email).eq(email))
        .and_where(Expr::col(Invitations::Status).eq("pending"))
        .and_where(Expr::col(Invitations::ExpiresAt).gt(Expr::cust("datetime('now')")))
        .build(SqliteQueryBuilder)
}

/// Mark an invitation accepted.
pub fn mark_accepted(id: &str) -> Built {
    Query::update()
        .table(Invitations::Table)
        .value(Invitations::Status, "accepted")
        .and_where(Expr::col(Invitations::Id).eq(id))
        .and_where(Expr::col(Invitations::Status).eq("pending"))
        .build(SqliteQueryBuilder)
}

/// Revoke a pending invitation.
pub fn revoke(id: &str) -> Built {
    Query::update()
        .table(Invitations::Table)
        .value(Invitations::Status, "revoked")
        .and_where(Expr::col(Invitations::Id).eq(id))
        .and_where(Expr::col(Invitations::Status).eq("pending"))
        .build(SqliteQueryBuilder)
}
