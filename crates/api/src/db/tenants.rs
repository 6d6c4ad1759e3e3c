//! Tenant + org query builders (registry database).

use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};

use super::tables::{Orgs, Tenants};
use super::Built;

// ── Tenant queries ────────────────────────────────────────────────────────

/// INSERT a new tenant.
pub fn insert(id: &str, slug: &str, name: &str, status: &str) -> Built {
    Query::insert()
        .into_table(Tenants::Table)
        .columns([Tenants::Id, Tenants::Slug, Tenants::Name, Tenants::Status])
        .values_panic([id.into(), slug.into(), name.into(), status.into()])
        .build(SqliteQueryBuilder)
}

/// SELECT a tenant by slug.
pub fn get_by_slug(slug: &str) -> Built {
    Query::select()
        .columns([
            Tenants::Id,
            Tenants::Slug,
            Tenants::Name,
            Tenants::Status,
            Tenants::CreatedAt,
        ])
        .from(Tenants::Table)
        .and_where(Expr::col(Tenants::Slug).eq(slug))
        .build(SqliteQueryBuilder)
}

/// SELECT a tenant by id.
pub fn get_by_id(id: &str) -> Built {
    Query::select()
        .columns([
            Tenants::Id,
            Tenants::Slug,
            Tenants::Name,
            Tenants::Status,
            Tenants::CreatedAt,
        ])
        .from(Tenants::Table)
        .and_where(Expr::col(Tenants::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Check whether a tenant slug is already taken.
pub fn slug_exists(slug: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(Tenants::Table)
        .and_where(Expr::col(Tenants::Slug).eq(slug))
        .build(SqliteQueryBuilder)
}

/// List all tenants, newest first.
pub fn list() -> Built {
    Query::select()
        .columns([
            Tenants::Id,
            Tenants::Slug,
            Tenants::Name,
            Tenants::Status,
            Tenants::CreatedAt,
        ])
        .from(Tenants::Table)
        .order_by(Tenants::CreatedAt, Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Update a tenant's status.
pub fn set_status(id: &str, status: &str) -> Built {
    Query::update()
        .table(Tenants::Table)
        .value(Tenants::Status, status)
        .and_where(Expr::col(Tenants::Id).eq(id))
        .build(SqliteQueryBuilder)
}

// ── Org queries ───────────────────────────────────────────────────────────

/// INSERT an org under a tenant.
pub fn org_insert(id: &str, tenant_id: &str, slug: &str, name: &str, is_default: bool) -> Built {
    Query::insert()
        .into_table(Orgs::Table)
        .columns([
            Orgs::Id,
            Orgs::TenantId,
            Orgs::Slug,
            Orgs::Name,
            Orgs::IsDefault,
        ])
        .values_panic([
            id.into(),
            tenant_id.into(),
            slug.into(),
            name.into(),
            is_default.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// SELECT an org by id.
pub fn org_get(id: &str) -> Built {
    Query::select()
        .columns([
            Orgs::Id,
            Orgs::TenantId,
            Orgs::Slug,
            Orgs::Name,
            Orgs::IsDefault,
            Orgs::CreatedAt,
        ])
        .from(Orgs::Table)
        .and_where(Expr::col(Orgs::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// SELECT an org by tenant + slug.
pub fn org_by_slug(tenant_id: &str, slug: &str) -> Built {
    Query::select()
        .columns([
            Orgs::Id,
            Orgs::TenantId,
            Orgs::Slug,
            Orgs::Name,
            Orgs::IsDefault,
            Orgs::CreatedAt,
        ])
        .from(Orgs::Table)
        .and_where(Expr::col(Orgs::TenantId).eq(tenant_id))
        .and_where(Expr::col(Orgs::Slug).eq(slug))
        .build(SqliteQueryBuilder)
}

/// SELECT the default org for a tenant.
pub fn org_default(tenant_id: &str) -> Built {
    Query::select()
        .columns([
            Orgs::Id,
            Orgs::TenantId,
            Orgs::Slug,
            Orgs::Name,
            Orgs::IsDefault,
            Orgs::CreatedAt,
        ])
        .from(Orgs::Table)
        .and_where(Expr::col(Orgs::TenantId).eq(tenant_id))
        .and_where(Expr::col(Orgs::IsDefault).eq(true))
        .build(SqliteQueryBuilder)
}

/// List orgs for a tenant, oldest first.
pub fn org_list(tenant_id: &str) -> Built {
    Query::select()
        .columns([
            Orgs::Id,
            Orgs::TenantId,
            Orgs::Slug,
            Orgs::Name,
            Orgs::IsDefault,
            Orgs::CreatedAt,
        ])
        .from(Orgs::Table)
        .and_where(Expr::col(Orgs::TenantId).eq(tenant_id))
        .order_by(Orgs::CreatedAt, Order::Asc)
        .build(SqliteQueryBuilder)
}
