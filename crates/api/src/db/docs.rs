//! Document-tree query builders.
//!
//! Documents form a materialized-path tree per space. Soft delete stamps
//! `deleted_at` on the target and its live descendants; the target also gets
//! `explicitly_deleted = 1` so restoring an ancestor does not resurrect
//! subtrees the user deleted on their own.

use jolli_core::tree::{descendant_like_pattern, LIKE_ESCAPE};
use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use super::tables::Docs;
use super::Built;

// ── Column helper ─────────────────────────────────────────────────────────

fn doc_columns(q: &mut sea_query::SelectStatement) -> &mut sea_query::SelectStatement {
    q.columns([
        Docs::Id,
        Docs::SpaceId,
        Docs::ParentId,
        Docs::Title,
        Docs::Slug,
        Docs::Path,
        Docs::Content,
        Docs::SortOrder,
        Docs::Version,
        Docs::CreatedBy,
        Docs::CreatedAt,
        Docs::UpdatedAt,
        Docs::DeletedAt,
        Docs::ExplicitlyDeleted,
    ])
}

fn subtree_where(q: &mut sea_query::SelectStatement, space_id: &str, path: &str) {
    q.and_where(Expr::col(Docs::SpaceId).eq(space_id))
        .and_where(
            Expr::col(Docs::Path)
                .eq(path)
                .or(Expr::cust_with_values(
                    format!("path LIKE ? ESCAPE '{LIKE_ESCAPE}'"),
                    [descendant_like_pattern(path)],
                )),
        );
}

// ── Creation + lookup ─────────────────────────────────────────────────────

/// INSERT a new document.
#[allow(clippy::too_many_arguments)]
pub fn insert(
    id: &str,
    space_id: &str,
    parent_id: Option<&str>,
    title: &str,
    slug: &str,
    path: &str,
    content: &str,
    sort_order: i64,
    created_by: Option<&str>,
) -> Built {
    Query::insert()
        .into_table(Docs::Table)
        .columns([
            Docs::Id,
            Docs::SpaceId,
            Docs::ParentId,
            Docs::Title,
            Docs::Slug,
            Docs::Path,
            Docs::Content,
            Docs::SortOrder,
            Docs::CreatedBy,
        ])
        .values_panic([
            id.into(),
            space_id.into(),
            parent_id.map(|s| s.to_string()).into(),
            title.into(),
            slug.into(),
            path.into(),
            content.into(),
            sort_order.into(),
            created_by.map(|s| s.to_string()).into(),
        ])
        .build(SqliteQueryBuilder)
}

/// SELECT a document by id, live or deleted.
pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    doc_columns(&mut q);
    q.from(Docs::Table)
        .and_where(Expr::col(Docs::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// SELECT a live document by space + path.
pub fn get_by_path(space_id: &str, path: &str) -> Built {
    let mut q = Query::select().to_owned();
    doc_columns(&mut q);
    q.from(Docs::Table)
        .and_where(Expr::col(Docs::SpaceId).eq(space_id))
        .and_where(Expr::col(Docs::Path).eq(path))
        .and_where(Expr::col(Docs::DeletedAt).is_null())
        .build(SqliteQueryBuilder)
}

/// Check whether a live document occupies a path.
pub fn path_taken(space_id: &str, path: &str) -> Built {
    Query::select()
        .column(Docs::Id)
        .from(Docs::Table)
        .and_where(Expr::col(Docs::SpaceId).eq(space_id))
        .and_where(Expr::col(Docs::Path).eq(path))
        .and_where(Expr::col(Docs::DeletedAt).is_null())
        .build(SqliteQueryBuilder)
}

// ── Listing ───────────────────────────────────────────────────────────────

/// List all live documents in a space, ordered for tree rendering.
pub fn list_space(space_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    doc_columns(&mut q);
    q.from(Docs::Table)
        .and_where(Expr::col(Docs::SpaceId).eq(space_id))
        .and_where(Expr::col(Docs::DeletedAt).is_null())
        .order_by(Docs::Path, Order::Asc)
        .order_by(Docs::SortOrder, Order::Asc)
        .build(SqliteQueryBuilder)
}

/// List live documents under a path prefix (the root itself included).
pub fn list_subtree(space_id: &str, path: &str) -> Built {
    let mut q = Query::select().to_owned();
    doc_columns(&mut q);
    q.from(Docs::Table);
    subtree_where(&mut q, space_id, path);
    q.and_where(Expr::col(Docs::DeletedAt).is_null())
        .order_by(Docs::Path, Order::Asc)
        .order_by(Docs::SortOrder, Order::Asc)
        .build(SqliteQueryBuilder)
}

/// List explicitly-deleted documents in a space (the trash view).
pub fn list_trash(space_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    doc_columns(&mut q);
    q.from(Docs::Table)
        .and_where(Expr::col(Docs::SpaceId).eq(space_id))
        .and_where(Expr::col(Docs::ExplicitlyDeleted).eq(true))
        .order_by(Docs::DeletedAt, Order::Desc)
        .build(SqliteQueryBuilder)
}

/// List live direct children of a document.
pub fn children(parent_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    doc_columns(&mut q);
    q.from(Docs::Table)
        .and_where(Expr::col(Docs::ParentId).eq(parent_id))
        .and_where(Expr::col(Docs::DeletedAt).is_null())
        .order_by(Docs::SortOrder, Order::Asc)
        .order_by(Docs::Path, Order::Asc)
        .build(SqliteQueryBuilder)
}

// ── Editing ───────────────────────────────────────────────────────────────

/// Conditional UPDATE for optimistic concurrency. The WHERE clause pins the
/// expected version; zero rows changed means a conflict.
pub fn update_if_version(
    id: &str,
    expected_version: i64,
    title: Option<&str>,
    content: Option<&str>,
) -> Built {
    let mut q = Query::update().to_owned();
    q.table(Docs::Table);
    if let Some(title) = title {
        q.value(Docs::Title, title);
    }
    if let Some(content) = content {
        q.value(Docs::Content, content);
    }
    q.value(Docs::Version, Expr::col(Docs::Version).add(1))
        .value(Docs::UpdatedAt, Expr::cust("datetime('now')"))
        .and_where(Expr::col(Docs::Id).eq(id))
        .and_where(Expr::col(Docs::Version).eq(expected_version))
        .and_where(Expr::col(Docs::DeletedAt).is_null())
        .build(SqliteQueryBuilder)
}

/// Current version of a document (conflict responses).
pub fn version_of(id: &str) -> Built {
    Query::select()
        .column(Docs::Version)
        .from(Docs::Table)
        .and_where(Expr::col(Docs::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Re-parent a document and set its new path.
pub fn set_parent_and_path(id: &str, new_parent_id: Option<&str>, new_path: &str) -> Built {
    Query::update()
        .table(Docs::Table)
        .value(Docs::ParentId, new_parent_id.map(|s| s.to_string()))
        .value(Docs::Path, new_path)
        .value(Docs::UpdatedAt, Expr::cust("datetime('now')"))
        .and_where(Expr::col(Docs::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Rewrite a single descendant's path after a move.
pub fn update_path(id: &str, new_path: &str) -> Built {
    Query::update()
        .table(Docs::Table)
        .value(Docs::Path, new_path)
        .and_where(Expr::col(Docs::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Set a document's position among its siblings.
pub fn set_sort_order(id: &str, sort_order: i64) -> Built {
    Query::update()
        .table(Docs::Table)
        .value(Docs::SortOrder, sort_order)
        .value(Docs::UpdatedAt, Expr::cust("datetime('now')"))
        .and_where(Expr::col(Docs::Id).eq(id))
        .build(SqliteQueryBuilder)
}

// ── Soft delete + restore ─────────────────────────────────────────────────

/// Soft-delete the named document and flag it as explicitly deleted.
pub fn soft_delete_target(id: &str) -> Built {
    Query::update()
        .table(Docs::Table)
        .value(Docs::DeletedAt, Expr::cust("datetime('now')"))
        .value(Docs::ExplicitlyDeleted, true)
        .and_where(Expr::col(Docs::Id).eq(id))
        .and_where(Expr::col(Docs::DeletedAt).is_null())
        .build(SqliteQueryBuilder)
}

/// Soft-delete live descendants of a path (cascade, not explicit).
pub fn soft_delete_descendants(space_id: &str, path: &str) -> Built {
    Query::update()
        .table(Docs::Table)
        .value(Docs::DeletedAt, Expr::cust("datetime('now')"))
        .and_where(Expr::col(Docs::SpaceId).eq(space_id))
        .and_where(Expr::cust_with_values(
            format!("path LIKE ? ESCAPE '{LIKE_ESCAPE}'"),
            [descendant_like_pattern(path)],
        ))
        .and_where(Expr::col(Docs::DeletedAt).is_null())
        .build(SqliteQueryBuilder)
}

/// Restore the named document.
pub fn restore_target(id: &str) -> Built {
    Query::update()
        .table(Docs::Table)
        .value(Docs::DeletedAt, Option::<String>::None)
        .value(Docs::ExplicitlyDeleted, false)
        .and_where(Expr::col(Docs::Id).eq(id))
        .and_where(Expr::col(Docs::DeletedAt).is_not_null())
        .build(SqliteQueryBuilder)
}

/// List every deleted row under a path, for pruning explicit subtrees from a
/// restore cascade.
pub fn deleted_subtree(space_id: &str, path: &str) -> Built {
    let mut q = Query::select().to_owned();
    doc_columns(&mut q);
    q.from(Docs::Table);
    subtree_where(&mut q, space_id, path);
    q.and_where(Expr::col(Docs::DeletedAt).is_not_null())
        .order_by(Docs::Path, Order::Asc)
        .build(SqliteQueryBuilder)
}
