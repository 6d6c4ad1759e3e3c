//! User + org-membership query builders (tenant database).

use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};

use super::tables::{Roles, UserOrgs, Users};
use super::Built;

// ── User columns helper ───────────────────────────────────────────────────

fn user_columns(q: &mut sea_query::SelectStatement) -> &mut sea_query::SelectStatement {
    q.column((Users::Table, Users::Id))
        .column((Users::Table, Users::Email))
        .column((Users::Table, Users::DisplayName))
        .column((Users::Table, Users::EmailVerified))
        .column((Users::Table, Users::CreatedAt))
        .column((Users::Table, Users::ArchivedAt))
}

// ── User queries ──────────────────────────────────────────────────────────

/// INSERT a new user.
pub fn insert(
    id: &str,
    email: &str,
    display_name: &str,
    password_hash: &str,
    password_salt: &str,
) -> Built {
    Query::insert()
        .into_table(Users::Table)
        .columns([
            Users::Id,
            Users::Email,
            Users::DisplayName,
            Users::PasswordHash,
            Users::PasswordSalt,
        ])
        .values_panic([
            id.into(),
            email.into(),
            display_name.into(),
            password_hash.into(),
            password_salt.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// SELECT a user's credential columns by email (login path).
pub fn credentials_by_email(email: &str) -> Built {
    Query::select()
        .columns([
            Users::Id,
            Users::PasswordHash,
            Users::PasswordSalt,
            Users::ArchivedAt,
        ])
        .from(Users::Table)
        .and_where(Expr::col(Users::Email).eq(email))
        .build(SqliteQueryBuilder)
}

/// SELECT a user by email.
pub fn get_by_email(email: &str) -> Built {
    let mut q = Query::select().to_owned();
    user_columns(&mut q);
    q.from(Users::Table)
        .and_where(Expr::col((Users::Table, Users::Email)).eq(email))
        .build(SqliteQueryBuilder)
}

/// SELECT a user by id.
pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    user_columns(&mut q);
    q.from(Users::Table)
        .and_where(Expr::col((Users::Table, Users::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

/// Check whether an email is already registered.
pub fn email_exists(email: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(Users::Table)
        .and_where(Expr::col(Users::Email).eq(email))
        .build(SqliteQueryBuilder)
}

/// Replace a user's password hash + salt.
pub fn set_password(id: &str, password_hash: &str, password_salt: &str) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::PasswordHash, password_hash)
        .value(Users::PasswordSalt, password_salt)
        .and_where(Expr::col(Users::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Mark a user's email as verified.
pub fn set_email_verified(id: &str) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::EmailVerified, true)
        .and_where(Expr::col(Users::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Archive a user (sets archived_at, login is refused).
pub fn archive(id: &str) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::ArchivedAt, Expr::cust("datetime('now')"))
        .and_where(Expr::col(Users::Id).eq(id))
        .and_where(Expr::col(Users::ArchivedAt).is_null())
        .build(SqliteQueryBuilder)
}

/// Restore an archived user.
pub fn restore(id: &str) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::ArchivedAt, Option::<String>::None)
        .and_where(Expr::col(Users::Id).eq(id))
        .build(SqliteQueryBuilder)
}

// ── Membership queries ────────────────────────────────────────────────────

/// INSERT an org membership.
pub fn membership_insert(org_id: &str, user_id: &str, role_id: &str) -> Built {
    Query::insert()
        .into_table(UserOrgs::Table)
        .columns([UserOrgs::OrgId, UserOrgs::UserId, UserOrgs::RoleId])
        .values_panic([org_id.into(), user_id.into(), role_id.into()])
        .build(SqliteQueryBuilder)
}

/// Check whether a user belongs to an org.
pub fn membership_exists(org_id: &str, user_id: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(UserOrgs::Table)
        .and_where(Expr::col(UserOrgs::OrgId).eq(org_id))
        .and_where(Expr::col(UserOrgs::UserId).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Get a member's role name within an org.
pub fn membership_role(org_id: &str, user_id: &str) -> Built {
    Query::select()
        .column((Roles::Table, Roles::Id))
        .column((Roles::Table, Roles::Name))
        .from(UserOrgs::Table)
        .inner_join(
            Roles::Table,
            Expr::col((Roles::Table, Roles::Id)).equals((UserOrgs::Table, UserOrgs::RoleId)),
        )
        .and_where(Expr::col((UserOrgs::Table, UserOrgs::OrgId)).eq(org_id))
        .and_where(Expr::col((UserOrgs::Table, UserOrgs::UserId)).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// List all org memberships for a user.
pub fn memberships_for_user(user_id: &str) -> Built {
    Query::select()
        .column((UserOrgs::Table, UserOrgs::OrgId))
        .column((Roles::Table, Roles::Name))
        .column((UserOrgs::Table, UserOrgs::JoinedAt))
        .from(UserOrgs::Table)
        .inner_join(
            Roles::Table,
            Expr::col((Roles::Table, Roles::Id)).equals((UserOrgs::Table, UserOrgs::RoleId)),
        )
        .and_where(Expr::col((UserOrgs::Table, UserOrgs::UserId)).eq(user_id))
        .order_by((UserOrgs::Table, UserOrgs::JoinedAt), Order::Asc)
        .build(SqliteQueryBuilder)
}

/// List members of an org (joins users and roles), optionally with archived.
pub fn members_of_org(org_id: &str, include_archived: bool) -> Built {
    let mut q = Query::select().to_owned();
    user_columns(&mut q);
    q.column((Roles::Table, Roles::Name))
        .column((UserOrgs::Table, UserOrgs::JoinedAt))
        .from(UserOrgs::Table)
        .inner_join(
            Users::Table,
            Expr::col((Users::Table, Users::Id)).equals((UserOrgs::Table, UserOrgs::UserId)),
        )
        .inner_join(
            Roles::Table,
            Expr::col((Roles::Table, Roles::Id)).equals((UserOrgs::Table, UserOrgs::RoleId)),
        )
        .and_where(Expr::col((UserOrgs::Table, UserOrgs::OrgId)).eq(org_id));
    if !include_archived {
        q.and_where(Expr::col((Users::Table, Users::ArchivedAt)).is_null());
    }
    q.order_by((UserOrgs::Table, UserOrgs::JoinedAt), Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Change a member's role within an org.
pub fn set_member_role(org_id: &str, user_id: &str, role_id: &str) -> Built {
    Query::update()
        .table(UserOrgs::Table)
        .value(UserOrgs::RoleId, role_id)
        .and_where(Expr::col(UserOrgs::OrgId).eq(org_id))
        .and_where(Expr::col(UserOrgs::UserId).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Remove a member from an org.
pub fn membership_delete(org_id: &str, user_id: &str) -> Built {
    Query::delete()
        .from_table(UserOrgs::Table)
        .and_where(Expr::col(UserOrgs::OrgId).eq(org_id))
        .and_where(Expr::col(UserOrgs::UserId).eq(user_id))
        .build(SqliteQueryBuilder)
}
