//! Repository-integration query builders.

use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use super::tables::Integrations;
use super::Built;

fn integration_columns(q: &mut sea_query::SelectStatement) -> &mut sea_query::SelectStatement {
    q.columns([
        Integrations::Id,
        Integrations::OrgId,
        Integrations::Provider,
        Integrations::RepoFullName,
        Integrations::DefaultBranch,
        Integrations::Status,
        Integrations::CreatedAt,
        Integrations::LastEventAt,
    ])
}

/// INSERT an integration. The webhook secret is stored for signature checks
/// and never returned after creation.
pub fn insert(
    id: &str,
    org_id: &str,
    provider: &str,
    repo_full_name: &str,
    default_branch: &str,
    webhook_secret: &str,
) -> Built {
    Query::insert()
        .into_table(Integrations::Table)
        .columns([
            Integrations::Id,
            Integrations::OrgId,
            Integrations::Provider,
            Integrations::RepoFullName,
            Integrations::DefaultBranch,
            Integrations::WebhookSecret,
        ])
        .values_panic([
            id.into(),
            org_id.into(),
            provider.into(),
            repo_full_name.into(),
            default_branch.into(),
            webhook_secret.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// SELECT an integration by id (without the secret).
pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    integration_columns(&mut q);
    q.from(Integrations::Table)
        .and_where(Expr::col(Integrations::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// SELECT an integration by repository name, including the webhook secret.
/// Webhook delivery is the only caller.
pub fn get_by_repo_with_secret(repo_full_name: &str) -> Built {
    Query::select()
        .columns([
            Integrations::Id,
            Integrations::OrgId,
            Integrations::DefaultBranch,
            Integrations::WebhookSecret,
            Integrations::Status,
        ])
        .from(Integrations::Table)
        .and_where(Expr::col(Integrations::RepoFullName).eq(repo_full_name))
        .build(SqliteQueryBuilder)
}

/// List integrations for an org.
pub fn list(org_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    integration_columns(&mut q);
    q.from(Integrations::Table)
        .and_where(Expr::col(Integrations::OrgId).eq(org_id))
        .order_by(Integrations::CreatedAt, Order::Asc)
        .build(SqliteQueryBuilder)
}

/// DELETE an integration.
pub fn delete(id: &str) -> Built {
    Query::delete()
        .from_table(Integrations::Table)
        .and_where(Expr::col(Integrations::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Stamp last_event_at after an accepted webhook delivery.
pub fn touch_event(id: &str) -> Built {
    Query::update()
        .table(Integrations::Table)
        .value(Integrations::LastEventAt, Expr::cust("datetime('now')"))
        .and_where(Expr::col(Integrations::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Update an integration's status (`linked`, `paused`).
pub fn set_status(id: &str, status: &str) -> Built {
    Query::update()
        .table(Integrations::Table)
        .value(Integrations::Status, status)
        .and_where(Expr::col(Integrations::Id).eq(id))
        .build(SqliteQueryBuilder)
}
