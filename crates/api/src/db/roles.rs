//! Role + permission query builders.

use sea_query::{Alias, Asterisk, Expr, Func, OnConflict, Order, Query, SqliteQueryBuilder};

use super::tables::{Permissions, RolePermissions, Roles};
use super::Built;

// ── Roles ─────────────────────────────────────────────────────────────────

/// INSERT a role.
pub fn insert(id: &str, name: &str, builtin: bool) -> Built {
    Query::insert()
        .into_table(Roles::Table)
        .columns([Roles::Id, Roles::Name, Roles::Builtin])
        .values_panic([id.into(), name.into(), builtin.into()])
        .build(SqliteQueryBuilder)
}

/// SELECT a role by id.
pub fn get_by_id(id: &str) -> Built {
    Query::select()
        .columns([Roles::Id, Roles::Name, Roles::Builtin, Roles::CreatedAt])
        .from(Roles::Table)
        .and_where(Expr::col(Roles::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// SELECT a role by name.
pub fn get_by_name(name: &str) -> Built {
    Query::select()
        .columns([Roles::Id, Roles::Name, Roles::Builtin, Roles::CreatedAt])
        .from(Roles::Table)
        .and_where(Expr::col(Roles::Name).eq(name))
        .build(SqliteQueryBuilder)
}

/// List all roles, builtins first then by name.
pub fn list() -> Built {
    Query::select()
        .columns([Roles::Id, Roles::Name, Roles::Builtin, Roles::CreatedAt])
        .from(Roles::Table)
        .order_by(Roles::Builtin, Order::Desc)
        .order_by(Roles::Name, Order::Asc)
        .build(SqliteQueryBuilder)
}

/// DELETE a custom role. Builtins are guarded in the handler.
pub fn delete(id: &str) -> Built {
    Query::delete()
        .from_table(Roles::Table)
        .and_where(Expr::col(Roles::Id).eq(id))
        .and_where(Expr::col(Roles::Builtin).eq(false))
        .build(SqliteQueryBuilder)
}

/// Count memberships still pointing at a role.
pub fn membership_count(role_id: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(super::tables::UserOrgs::Table)
        .and_where(Expr::col(super::tables::UserOrgs::RoleId).eq(role_id))
        .build(SqliteQueryBuilder)
}

// ── Permissions ───────────────────────────────────────────────────────────

/// Upsert a permission key (seed path, idempotent).
pub fn permission_upsert(key: &str, description: &str) -> Built {
    Query::insert()
        .into_table(Permissions::Table)
        .columns([Permissions::Key, Permissions::Description])
        .values_panic([key.into(), description.into()])
        .on_conflict(
            OnConflict::column(Permissions::Key)
                .do_nothing()
                .to_owned(),
        )
        .build(SqliteQueryBuilder)
}

/// List the permission catalogue.
pub fn permission_list() -> Built {
    Query::select()
        .columns([Permissions::Key, Permissions::Description])
        .from(Permissions::Table)
        .order_by(Permissions::Key, Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Grant a permission to a role (idempotent).
pub fn grant(role_id: &str, permission_key: &str) -> Built {
    Query::insert()
        .into_table(RolePermissions::Table)
        .columns([RolePermissions::RoleId, RolePermissions::PermissionKey])
        .values_panic([role_id.into(), permission_key.into()])
        .on_conflict(
            OnConflict::columns([RolePermissions::RoleId, RolePermissions::PermissionKey])
                .do_nothing()
                .to_owned(),
        )
        .build(SqliteQueryBuilder)
}

/// Revoke a permission from a role.
pub fn revoke(role_id: &str, permission_key: &str) -> Built {
    Query::delete()
        .from_table(RolePermissions::Table)
        .and_where(Expr::col(RolePermissions::RoleId).eq(role_id))
        .and_where(Expr::col(RolePermissions::PermissionKey).eq(permission_key))
        .build(SqliteQueryBuilder)
}

/// List permission keys granted to a role.
pub fn grants_for_role(role_id: &str) -> Built {
    Query::select()
        .column(RolePermissions::PermissionKey)
        .from(RolePermissions::Table)
        .and_where(Expr::col(RolePermissions::RoleId).eq(role_id))
        .order_by(RolePermissions::PermissionKey, Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Check a single role/permission grant.
pub fn role_has_permission(role_id: &str, permission_key: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(RolePermissions::Table)
        .and_where(Expr::col(RolePermissions::RoleId).eq(role_id))
        .and_where(Expr::col(RolePermissions::PermissionKey).eq(permission_key))
        .build(SqliteQueryBuilder)
}
