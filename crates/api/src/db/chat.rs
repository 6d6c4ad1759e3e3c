//! Chat-message query builders.

use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use super::tables::{ChatMessages, Users};
use super::Built;

/// INSERT a chat message.
pub fn insert(id: &str, org_id: &str, user_id: &str, body: &str) -> Built {
    Query::insert()
        .into_table(ChatMessages::Table)
        .columns([
            ChatMessages::Id,
            ChatMessages::OrgId,
            ChatMessages::UserId,
            ChatMessages::Body,
        ])
        .values_panic([id.into(), org_id.into(), user_id.into(), body.into()])
        .build(SqliteQueryBuilder)
}

/// The most recent messages for an org, oldest of the window first.
pub fn recent(org_id: &str, limit: u64) -> Built {
    Query::select()
        .column((ChatMessages::Table, ChatMessages::Id))
        .column((ChatMessages::Table, ChatMessages::OrgId))
        .column((ChatMessages::Table, ChatMessages::UserId))
        .column((Users::Table, Users::DisplayName))
        .column((ChatMessages::Table, ChatMessages::Body))
        .column((ChatMessages::Table, ChatMessages::CreatedAt))
        .from(ChatMessages::Table)
        .inner_join(
            Users::Table,
            Expr::col((Users::Table, Users::Id))
                .equals((ChatMessages::Table, ChatMessages::UserId)),
        )
        .and_where(Expr::col((ChatMessages::Table, ChatMessages::OrgId)).eq(org_id))
        .order_by((ChatMessages::Table, ChatMessages::CreatedAt), Order::Desc)
        .limit(limit)
        .build(SqliteQueryBuilder)
}
