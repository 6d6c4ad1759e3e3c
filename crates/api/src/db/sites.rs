//! Docsite query builders.

use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use super::tables::Docsites;
use super::Built;

fn site_columns(q: &mut sea_query::SelectStatement) -> &mut sea_query::SelectStatement {
    q.columns([
        Docsites::Id,
        Docsites::SpaceId,
        Docsites::Name,
        Docsites::Status,
        Docsites::DeploymentUrl,
        Docsites::LastBuildId,
        Docsites::LastBuiltAt,
        Docsites::CreatedAt,
        Docsites::UpdatedAt,
    ])
}

/// INSERT a docsite.
pub fn insert(id: &str, space_id: &str, name: &str, status: &str) -> Built {
    Query::insert()
        .into_table(Docsites::Table)
        .columns([
            Docsites::Id,
            Docsites::SpaceId,
            Docsites::Name,
            Docsites::Status,
        ])
        .values_panic([id.into(), space_id.into(), name.into(), status.into()])
        .build(SqliteQueryBuilder)
}

/// SELECT a docsite by id.
pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    site_columns(&mut q);
    q.from(Docsites::Table)
        .and_where(Expr::col(Docsites::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// List docsites for a space.
pub fn list(space_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    site_columns(&mut q);
    q.from(Docsites::Table)
        .and_where(Expr::col(Docsites::SpaceId).eq(space_id))
        .order_by(Docsites::CreatedAt, Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Claim a site for a new build. Conditional on the current status being one
/// that allows a build; zero rows changed means a build is already running.
pub fn start_build(id: &str, build_id: &str, startable: &[&str]) -> Built {
    Query::update()
        .table(Docsites::Table)
        .value(Docsites::Status, "building")
        .value(Docsites::LastBuildId, build_id)
        .value(Docsites::UpdatedAt, Expr::cust("datetime('now')"))
        .and_where(Expr::col(Docsites::Id).eq(id))
        .and_where(Expr::col(Docsites::Status).is_in(startable.iter().copied()))
        .build(SqliteQueryBuilder)
}

/// Record the outcome of a build.
pub fn finish_build(id: &str, status: &str, deployment_url: Option<&str>) -> Built {
    Query::update()
        .table(Docsites::Table)
        .value(Docsites::Status, status)
        .value(Docsites::DeploymentUrl, deployment_url.map(|s| s.to_string()))
        .value(Docsites::LastBuiltAt, Expr::cust("datetime('now')"))
        .value(Docsites::UpdatedAt, Expr::cust("datetime('now')"))
        .and_where(Expr::col(Docsites::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Update status only (intermediate pipeline transitions).
pub fn set_status(id: &str, status: &str) -> Built {
    Query::update()
        .table(Docsites::Table)
        .value(Docsites::Status, status)
        .value(Docsites::UpdatedAt, Expr::cust("datetime('now')"))
        .and_where(Expr::col(Docsites::Id).eq(id))
        .build(SqliteQueryBuilder)
}
