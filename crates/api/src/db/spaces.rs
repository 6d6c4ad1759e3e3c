//! Space query builders.

use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};

use super::tables::Spaces;
use super::Built;

/// INSERT a new space.
pub fn insert(id: &str, org_id: &str, slug: &str, name: &str) -> Built {
    Query::insert()
        .into_table(Spaces::Table)
        .columns([Spaces::Id, Spaces::OrgId, Spaces::Slug, Spaces::Name])
        .values_panic([id.into(), org_id.into(), slug.into(), name.into()])
        .build(SqliteQueryBuilder)
}

/// SELECT a space by id.
pub fn get_by_id(id: &str) -> Built {
    Query::select()
        .columns([
            Spaces::Id,
            Spaces::OrgId,
            Spaces::Slug,
            Spaces::Name,
            Spaces::CreatedAt,
        ])
        .from(Spaces::Table)
        .and_where(Expr::col(Spaces::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// SELECT a space by org + slug.
pub fn get_by_slug(org_id: &str, slug: &str) -> Built {
    Query::select()
        .columns([
            Spaces::Id,
            Spaces::OrgId,
            Spaces::Slug,
            Spaces::Name,
            Spaces::CreatedAt,
        ])
        .from(Spaces::Table)
        .and_where(Expr::col(Spaces::OrgId).eq(org_id))
        .and_where(Expr::col(Spaces::Slug).eq(slug))
        .build(SqliteQueryBuilder)
}

/// Check whether a slug is taken within an org.
pub fn slug_exists(org_id: &str, slug: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(Spaces::Table)
        .and_where(Expr::col(Spaces::OrgId).eq(org_id))
        .and_where(Expr::col(Spaces::Slug).eq(slug))
        .build(SqliteQueryBuilder)
}

/// List spaces for an org, oldest first.
pub fn list(org_id: &str) -> Built {
    Query::select()
        .columns([
            Spaces::Id,
            Spaces::OrgId,
            Spaces::Slug,
            Spaces::Name,
            Spaces::CreatedAt,
        ])
        .from(Spaces::Table)
        .and_where(Expr::col(Spaces::OrgId).eq(org_id))
        .order_by(Spaces::CreatedAt, Order::Asc)
        .build(SqliteQueryBuilder)
}

/// List just the space ids belonging to an org (asset scoping check).
pub fn ids_for_org(org_id: &str) -> Built {
    Query::select()
        .column(Spaces::Id)
        .from(Spaces::Table)
        .and_where(Expr::col(Spaces::OrgId).eq(org_id))
        .build(SqliteQueryBuilder)
}
