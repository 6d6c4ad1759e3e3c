//! Asset metadata query builders. Blob bytes live on disk; rows here carry
//! the storage key and bookkeeping.

use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use super::tables::Assets;
use super::Built;

fn asset_columns(q: &mut sea_query::SelectStatement) -> &mut sea_query::SelectStatement {
    q.columns([
        Assets::Id,
        Assets::SpaceId,
        Assets::Filename,
        Assets::ContentType,
        Assets::SizeBytes,
        Assets::StorageKey,
        Assets::Status,
        Assets::UploadedBy,
        Assets::CreatedAt,
        Assets::UpdatedAt,
    ])
}

/// INSERT an asset row.
pub fn insert(
    id: &str,
    space_id: &str,
    filename: &str,
    content_type: &str,
    size_bytes: i64,
    storage_key: &str,
    status: &str,
    uploaded_by: Option<&str>,
) -> Built {
    Query::insert()
        .into_table(Assets::Table)
        .columns([
            Assets::Id,
            Assets::SpaceId,
            Assets::Filename,
            Assets::ContentType,
            Assets::SizeBytes,
            Assets::StorageKey,
            Assets::Status,
            Assets::UploadedBy,
        ])
        .values_panic([
            id.into(),
            space_id.into(),
            filename.into(),
            content_type.into(),
            size_bytes.into(),
            storage_key.into(),
            status.into(),
            uploaded_by.map(|s| s.to_string()).into(),
        ])
        .build(SqliteQueryBuilder)
}

/// SELECT an asset by id.
pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    asset_columns(&mut q);
    q.from(Assets::Table)
        .and_where(Expr::col(Assets::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// SELECT an asset by id, restricted to the given spaces. Serving an asset
/// always goes through this so one org cannot read another's uploads.
pub fn get_scoped(id: &str, space_ids: &[String]) -> Built {
    let mut q = Query::select().to_owned();
    asset_columns(&mut q);
    q.from(Assets::Table)
        .and_where(Expr::col(Assets::Id).eq(id))
        .and_where(Expr::col(Assets::SpaceId).is_in(space_ids.iter().map(String::as_str)))
        .build(SqliteQueryBuilder)
}

/// List assets in a space, newest first, optionally filtered by status.
pub fn list(space_id: &str, status: Option<&str>) -> Built {
    let mut q = Query::select().to_owned();
    asset_columns(&mut q);
    q.from(Assets::Table)
        .and_where(Expr::col(Assets::SpaceId).eq(space_id));
    if let Some(status) = status {
        q.and_where(Expr::col(Assets::Status).eq(status));
    }
    q.order_by(Assets::CreatedAt, Order::Desc)
        .build(SqliteQueryBuilder)
}

/// List assets in a given status across all spaces (blob sweep).
pub fn by_status(status: &str) -> Built {
    let mut q = Query::select().to_owned();
    asset_columns(&mut q);
    q.from(Assets::Table)
        .and_where(Expr::col(Assets::Status).eq(status))
        .build(SqliteQueryBuilder)
}

/// Update an asset's status.
pub fn set_status(id: &str, status: &str) -> Built {
    Query::update()
        .table(Assets::Table)
        .value(Assets::Status, status)
        .value(Assets::UpdatedAt, Expr::cust("datetime('now')"))
        .and_where(Expr::col(Assets::Id).eq(id))
        .build(SqliteQueryBuilder)
}
