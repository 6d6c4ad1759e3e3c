//! Document endpoints: tree CRUD, moves, soft delete, restore, and the
//! optimistic-concurrency update.

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rusqlite::Connection;
use uuid::Uuid;

use jolli_api::db;
use jolli_api::{
    CreateDocRequest, DocResponse, DocSummary, ListDocsQuery, ListDocsResponse, MoveDocRequest,
    OkResponse, UpdateDocRequest, VersionConflictResponse,
};
use jolli_core::tree::{child_path, rebase_path, slugify};
use jolli_core::{validate, Jrn};

use crate::error::ApiErr;
use crate::routes::auth::{require_permission, AuthUser};
use crate::storage::{sq_execute, sq_query_map, sq_query_row};
use crate::tenancy::TenantCtx;

// ── Row mapping ───────────────────────────────────────────────────────────

/// One `docs` row, as selected by the shared column list.
#[derive(Debug, Clone)]
pub(crate) struct DocRecord {
    pub id: String,
    pub space_id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub slug: String,
    pub path: String,
    pub content: String,
    pub sort_order: i64,
    pub version: i64,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
    pub explicitly_deleted: bool,
}

pub(crate) fn doc_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocRecord> {
    Ok(DocRecord {
        id: row.get(0)?,
        space_id: row.get(1)?,
        parent_id: row.get(2)?,
        title: row.get(3)?,
        slug: row.get(4)?,
        path: row.get(5)?,
        content: row.get(6)?,
        sort_order: row.get(7)?,
        version: row.get(8)?,
        created_by: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        deleted_at: row.get(12)?,
        explicitly_deleted: row.get(13)?,
    })
}

impl DocRecord {
    fn into_response(self, tenant_slug: &str, space_slug: &str) -> DocResponse {
        let jrn = Jrn::doc(tenant_slug, space_slug, &self.path).to_string();
        DocResponse {
            id: self.id,
            jrn,
            space_id: self.space_id,
            parent_id: self.parent_id,
            title: self.title,
            slug: self.slug,
            path: self.path,
            content: self.content,
            sort_order: self.sort_order,
            version: self.version,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
            explicitly_deleted: self.explicitly_deleted,
        }
    }

    fn into_summary(self, tenant_slug: &str, space_slug: &str) -> DocSummary {
        let jrn = Jrn::doc(tenant_slug, space_slug, &self.path).to_string();
        DocSummary {
            id: self.id,
            jrn,
            space_id: self.space_id,
            parent_id: self.parent_id,
            title: self.title,
            slug: self.slug,
            path: self.path,
            sort_order: self.sort_order,
            version: self.version,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }
}

// ── Shared lookups ────────────────────────────────────────────────────────

/// A space by id, scoped to the context org. Foreign spaces read as 404.
pub(crate) fn space_in_org(
    conn: &Connection,
    org_id: &str,
    space_id: &str,
) -> Result<(String, String), ApiErr> {
    let space = sq_query_row(conn, db::spaces::get_by_id(space_id), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
    })
    .map_err(ApiErr::from_db("space lookup"))?;
    match space {
        Some((id, owner, slug)) if owner == org_id => Ok((id, slug)),
        _ => Err(ApiErr::not_found("space not found")),
    }
}

fn fetch_doc(conn: &Connection, id: &str) -> Result<Option<DocRecord>, ApiErr> {
    sq_query_row(conn, db::docs::get_by_id(id), doc_from_row).map_err(ApiErr::from_db("doc lookup"))
}

fn fetch_live_doc(conn: &Connection, id: &str) -> Result<DocRecord, ApiErr> {
    fetch_doc(conn, id)?
        .filter(|doc| doc.deleted_at.is_none())
        .ok_or_else(|| ApiErr::not_found("document not found"))
}

/// Pick a slug that yields a free path under `parent_path`, appending a
/// numeric suffix when the natural slug is taken.
fn resolve_unique_path(
    conn: &Connection,
    space_id: &str,
    parent_path: Option<&str>,
    base_slug: &str,
) -> Result<(String, String), ApiErr> {
    for attempt in 0..100 {
        let slug = if attempt == 0 {
            base_slug.to_string()
        } else {
            format!("{base_slug}-{}", attempt + 1)
        };
        let path = child_path(parent_path, &slug);
        let taken = sq_query_row(conn, db::docs::path_taken(space_id, &path), |row| {
            row.get::<_, String>(0)
        })
        .map_err(ApiErr::from_db("path check"))?
        .is_some();
        if !taken {
            return Ok((slug, path));
        }
    }
    Err(ApiErr::conflict("could not find a free path"))
}

// ── Tree operations (also exercised directly by tests) ────────────────────

pub(crate) enum UpdateOutcome {
    Applied,
    Conflict { current_version: i64 },
}

/// Conditional update: applies only when the stored version matches.
pub(crate) fn apply_versioned_update(
    conn: &Connection,
    id: &str,
    expected_version: i64,
    title: Option<&str>,
    content: Option<&str>,
) -> rusqlite::Result<UpdateOutcome> {
    let changed = sq_execute(
        conn,
        db::docs::update_if_version(id, expected_version, title, content),
    )?;
    if changed > 0 {
        return Ok(UpdateOutcome::Applied);
    }
    let current_version = sq_query_row(conn, db::docs::version_of(id), |row| row.get(0))?
        .unwrap_or(expected_version);
    Ok(UpdateOutcome::Conflict { current_version })
}

/// Soft-delete a document and cascade to its live descendants.
pub(crate) fn soft_delete_tree(conn: &Connection, doc: &DocRecord) -> rusqlite::Result<()> {
    sq_execute(conn, db::docs::soft_delete_descendants(&doc.space_id, &doc.path))?;
    sq_execute(conn, db::docs::soft_delete_target(&doc.id))?;
    Ok(())
}

/// Restore a deleted document together with its cascade-deleted descendants.
///
/// The target's path is recomputed from its parent's current location; a
/// missing or still-deleted parent relocates the subtree to the space root.
/// Explicitly-deleted descendants stay in the trash.
pub(crate) fn restore_tree(conn: &Connection, doc: &DocRecord) -> Result<DocRecord, ApiErr> {
    if doc.deleted_at.is_none() {
        return Err(ApiErr::bad_request("document is not deleted"));
    }

    let live_parent = match doc.parent_id.as_deref() {
        Some(parent_id) => fetch_doc(conn, parent_id)?.filter(|p| p.deleted_at.is_none()),
        None => None,
    };
    let new_parent_id = live_parent.as_ref().map(|p| p.id.clone());
    let new_path = child_path(live_parent.as_ref().map(|p| p.path.as_str()), &doc.slug);

    if new_path != doc.path {
        let taken = sq_query_row(conn, db::docs::path_taken(&doc.space_id, &new_path), |row| {
            row.get::<_, String>(0)
        })
        .map_err(ApiErr::from_db("path check"))?
        .is_some();
        if taken {
            return Err(ApiErr::conflict("a live document already occupies that path"));
        }
    }

    // Descendants first: the cascade filter needs the pre-restore paths.
    let descendants = sq_query_map(
        conn,
        db::docs::deleted_subtree(&doc.space_id, &doc.path),
        doc_from_row,
    )
    .map_err(ApiErr::from_db("subtree listing"))?;

    // Subtrees that were deleted on their own stay in the trash whole:
    // their cascade-deleted children belong to that deletion, not this one.
    let explicit_roots: Vec<&str> = descendants
        .iter()
        .filter(|d| d.id != doc.id && d.explicitly_deleted)
        .map(|d| d.path.as_str())
        .collect();
    let in_explicit_subtree = |path: &str| {
        explicit_roots
            .iter()
            .any(|root| rebase_path(path, root, "").is_some())
    };

    for descendant in &descendants {
        if descendant.id == doc.id
            || descendant.explicitly_deleted
            || in_explicit_subtree(&descendant.path)
        {
            continue;
        }
        sq_execute(conn, db::docs::restore_target(&descendant.id))
            .map_err(ApiErr::from_db("restore descendant"))?;
    }
    sq_execute(conn, db::docs::restore_target(&doc.id))
        .map_err(ApiErr::from_db("restore document"))?;

    if new_path != doc.path {
        sq_execute(
            conn,
            db::docs::set_parent_and_path(&doc.id, new_parent_id.as_deref(), &new_path),
        )
        .map_err(ApiErr::from_db("relocate document"))?;
        for descendant in &descendants {
            if descendant.id == doc.id
                || descendant.explicitly_deleted
                || in_explicit_subtree(&descendant.path)
            {
                continue;
            }
            if let Some(rebased) = rebase_path(&descendant.path, &doc.path, &new_path) {
                sq_execute(conn, db::docs::update_path(&descendant.id, &rebased))
                    .map_err(ApiErr::from_db("rebase descendant"))?;
            }
        }
    }

    fetch_doc(conn, &doc.id)?.ok_or_else(|| ApiErr::internal("document vanished during restore"))
}

/// Move a document (and its subtree) under a new parent, or to the root.
pub(crate) fn move_tree(
    conn: &Connection,
    doc: &DocRecord,
    new_parent: Option<&DocRecord>,
) -> Result<DocRecord, ApiErr> {
    if let Some(parent) = new_parent {
        if parent.id == doc.id {
            return Err(ApiErr::bad_request("cannot move a document under itself"));
        }
        if parent.space_id != doc.space_id {
            return Err(ApiErr::bad_request("cannot move across spaces"));
        }
        if rebase_path(&parent.path, &doc.path, "").is_some() {
            return Err(ApiErr::bad_request(
                "cannot move a document under its own descendant",
            ));
        }
    }

    let new_path = child_path(new_parent.map(|p| p.path.as_str()), &doc.slug);
    if new_path == doc.path {
        return fetch_doc(conn, &doc.id)?
            .ok_or_else(|| ApiErr::internal("document vanished during move"));
    }

    let taken = sq_query_row(conn, db::docs::path_taken(&doc.space_id, &new_path), |row| {
        row.get::<_, String>(0)
    })
    .map_err(ApiErr::from_db("path check"))?
    .is_some();
    if taken {
        return Err(ApiErr::conflict("a document already occupies that path"));
    }

    let descendants = sq_query_map(
        conn,
        db::docs::list_subtree(&doc.space_id, &doc.path),
        doc_from_row,
    )
    .map_err(ApiErr::from_db("subtree listing"))?;

    sq_execute(
        conn,
        db::docs::set_parent_and_path(&doc.id, new_parent.map(|p| p.id.as_str()), &new_path),
    )
    .map_err(ApiErr::from_db("move document"))?;

    for descendant in &descendants {
        if descendant.id == doc.id {
            continue;
        }
        if let Some(rebased) = rebase_path(&descendant.path, &doc.path, &new_path) {
            sq_execute(conn, db::docs::update_path(&descendant.id, &rebased))
                .map_err(ApiErr::from_db("rebase descendant"))?;
        }
    }

    fetch_doc(conn, &doc.id)?.ok_or_else(|| ApiErr::internal("document vanished during move"))
}

// ── Handlers ──────────────────────────────────────────────────────────────

/// POST /api/docs
pub async fn create_doc(
    ctx: TenantCtx,
    user: AuthUser,
    Json(req): Json<CreateDocRequest>,
) -> Result<(StatusCode, Json<DocResponse>), ApiErr> {
    require_permission(&ctx, &user.user_id, "docs.write")?;
    let title = validate::validate_title(&req.title)?;

    let conn = ctx.db.conn();
    let (space_id, space_slug) = space_in_org(&conn, &ctx.org.id, &req.space_id)?;

    let parent = match req.parent_id.as_deref() {
        Some(parent_id) => {
            let parent = fetch_live_doc(&conn, parent_id)?;
            if parent.space_id != space_id {
                return Err(ApiErr::bad_request("parent is in another space"));
            }
            Some(parent)
        }
        None => None,
    };

    let base_slug = slugify(&title);
    let (slug, path) = resolve_unique_path(
        &conn,
        &space_id,
        parent.as_ref().map(|p| p.path.as_str()),
        &base_slug,
    )?;

    let id = Uuid::new_v4().to_string();
    sq_execute(
        &conn,
        db::docs::insert(
            &id,
            &space_id,
            parent.as_ref().map(|p| p.id.as_str()),
            &title,
            &slug,
            &path,
            &req.content,
            0,
            Some(&user.user_id),
        ),
    )
    .map_err(ApiErr::from_db("create document"))?;

    let doc = fetch_doc(&conn, &id)?
        .ok_or_else(|| ApiErr::internal("document vanished after insert"))?;
    Ok((
        StatusCode::CREATED,
        Json(doc.into_response(&ctx.tenant.slug, &space_slug)),
    ))
}

/// GET /api/docs/{id} — `id` is a document id or a JRN.
pub async fn get_doc(
    ctx: TenantCtx,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DocResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "docs.read")?;

    let conn = ctx.db.conn();
    let (doc, space_slug) = if id.starts_with("jrn:") {
        let jrn = Jrn::parse(&id)?;
        if jrn.tenant() != ctx.tenant.slug {
            return Err(ApiErr::not_found("document not found"));
        }
        // JRN doc paths drop the leading slash; the docs table keeps it.
        let doc_path = jrn
            .as_doc_path()
            .map(|p| format!("/{p}"))
            .ok_or_else(|| ApiErr::bad_request("not a document JRN"))?;
        let space = sq_query_row(
            &conn,
            db::spaces::get_by_slug(&ctx.org.id, jrn.space()),
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(2)?)),
        )
        .map_err(ApiErr::from_db("space lookup"))?
        .ok_or_else(|| ApiErr::not_found("document not found"))?;
        let doc = sq_query_row(&conn, db::docs::get_by_path(&space.0, &doc_path), doc_from_row)
            .map_err(ApiErr::from_db("doc lookup"))?
            .ok_or_else(|| ApiErr::not_found("document not found"))?;
        (doc, space.1)
    } else {
        let doc = fetch_live_doc(&conn, &id)?;
        let (_, space_slug) = space_in_org(&conn, &ctx.org.id, &doc.space_id)?;
        (doc, space_slug)
    };

    Ok(Json(doc.into_response(&ctx.tenant.slug, &space_slug)))
}

/// GET /api/docs — live documents of a space, optionally one subtree.
pub async fn list_docs(
    ctx: TenantCtx,
    user: AuthUser,
    Query(query): Query<ListDocsQuery>,
) -> Result<Json<ListDocsResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "docs.read")?;

    let conn = ctx.db.conn();
    let (space_id, space_slug) = space_in_org(&conn, &ctx.org.id, &query.space_id)?;

    let built = match query.under.as_deref() {
        Some(under) => db::docs::list_subtree(&space_id, under),
        None => db::docs::list_space(&space_id),
    };
    let docs = sq_query_map(&conn, built, doc_from_row)
        .map_err(ApiErr::from_db("list documents"))?
        .into_iter()
        .map(|doc| doc.into_summary(&ctx.tenant.slug, &space_slug))
        .collect();
    Ok(Json(ListDocsResponse { docs }))
}

/// GET /api/docs/trash — explicitly-deleted documents of a space.
pub async fn list_trash(
    ctx: TenantCtx,
    user: AuthUser,
    Query(query): Query<ListDocsQuery>,
) -> Result<Json<ListDocsResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "docs.delete")?;

    let conn = ctx.db.conn();
    let (space_id, space_slug) = space_in_org(&conn, &ctx.org.id, &query.space_id)?;
    let docs = sq_query_map(&conn, db::docs::list_trash(&space_id), doc_from_row)
        .map_err(ApiErr::from_db("list trash"))?
        .into_iter()
        .map(|doc| doc.into_summary(&ctx.tenant.slug, &space_slug))
        .collect();
    Ok(Json(ListDocsResponse { docs }))
}

/// PUT /api/docs/{id} — optimistic-concurrency update. A stale
/// `expected_version` yields 409 with the current version, without writing.
pub async fn update_doc(
    ctx: TenantCtx,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateDocRequest>,
) -> Result<Response, ApiErr> {
    require_permission(&ctx, &user.user_id, "docs.write")?;
    let title = match req.title.as_deref() {
        Some(title) => Some(validate::validate_title(title)?),
        None => None,
    };

    let conn = ctx.db.conn();
    let doc = fetch_live_doc(&conn, &id)?;
    let (_, space_slug) = space_in_org(&conn, &ctx.org.id, &doc.space_id)?;

    let outcome = apply_versioned_update(
        &conn,
        &id,
        req.expected_version,
        title.as_deref(),
        req.content.as_deref(),
    )
    .map_err(ApiErr::from_db("update document"))?;

    match outcome {
        UpdateOutcome::Conflict { current_version } => Ok((
            StatusCode::CONFLICT,
            Json(VersionConflictResponse {
                error: "version conflict".to_string(),
                current_version,
            }),
        )
            .into_response()),
        UpdateOutcome::Applied => {
            let doc = fetch_doc(&conn, &doc.id)?
                .ok_or_else(|| ApiErr::internal("document vanished during update"))?;
            Ok(Json(doc.into_response(&ctx.tenant.slug, &space_slug)).into_response())
        }
    }
}

/// POST /api/docs/{id}/move
pub async fn move_doc(
    ctx: TenantCtx,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<MoveDocRequest>,
) -> Result<Json<DocResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "docs.write")?;

    let conn = ctx.db.conn();
    let doc = fetch_live_doc(&conn, &id)?;
    let (_, space_slug) = space_in_org(&conn, &ctx.org.id, &doc.space_id)?;

    let new_parent = match req.new_parent_id.as_deref() {
        Some(parent_id) => Some(fetch_live_doc(&conn, parent_id)?),
        None => None,
    };
    let moved = move_tree(&conn, &doc, new_parent.as_ref())?;

    if let Some(sort_order) = req.sort_order {
        sq_execute(&conn, db::docs::set_sort_order(&doc.id, sort_order))
            .map_err(ApiErr::from_db("reorder document"))?;
    }
    let doc = fetch_doc(&conn, &moved.id)?
        .ok_or_else(|| ApiErr::internal("document vanished during move"))?;
    Ok(Json(doc.into_response(&ctx.tenant.slug, &space_slug)))
}

/// DELETE /api/docs/{id} — soft delete with cascade.
pub async fn delete_doc(
    ctx: TenantCtx,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "docs.delete")?;

    let conn = ctx.db.conn();
    let doc = fetch_live_doc(&conn, &id)?;
    space_in_org(&conn, &ctx.org.id, &doc.space_id)?;

    soft_delete_tree(&conn, &doc).map_err(ApiErr::from_db("delete document"))?;
    Ok(Json(OkResponse { ok: true }))
}

/// POST /api/docs/{id}/restore
pub async fn restore_doc(
    ctx: TenantCtx,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DocResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "docs.delete")?;

    let conn = ctx.db.conn();
    let doc = fetch_doc(&conn, &id)?.ok_or_else(|| ApiErr::not_found("document not found"))?;
    let (_, space_slug) = space_in_org(&conn, &ctx.org.id, &doc.space_id)?;

    let restored = restore_tree(&conn, &doc)?;
    Ok(Json(restored.into_response(&ctx.tenant.slug, &space_slug)))
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenancy::TenantRegistry;

    struct Fixture {
        _dir: tempfile::TempDir,
        db: crate::storage::TenantDb,
        space_id: String,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let registry = TenantRegistry::open(dir.path()).unwrap();
        let out = registry.provision("acme", "Acme", "admin@acme.io").unwrap();
        let db = registry.tenant_db(&out.tenant_id, false).unwrap();
        {
            let conn = db.conn();
            sq_execute(&conn, db::spaces::insert("sp1", &out.org_id, "docs", "Docs")).unwrap();
        }
        Fixture {
            _dir: dir,
            db,
            space_id: "sp1".to_string(),
        }
    }

    fn mkdoc(
        fx: &Fixture,
        id: &str,
        parent: Option<&DocRecord>,
        title: &str,
    ) -> DocRecord {
        let conn = fx.db.conn();
        let slug = slugify(title);
        let path = child_path(parent.map(|p| p.path.as_str()), &slug);
        sq_execute(
            &conn,
            db::docs::insert(
                id,
                &fx.space_id,
                parent.map(|p| p.id.as_str()),
                title,
                &slug,
                &path,
                "",
                0,
                None,
            ),
        )
        .unwrap();
        fetch_doc(&conn, id).unwrap().unwrap()
    }

    #[test]
    fn versioned_update_applies_and_bumps() {
        let fx = fixture();
        let doc = mkdoc(&fx, "d1", None, "Intro");
        let conn = fx.db.conn();

        let outcome =
            apply_versioned_update(&conn, &doc.id, 1, None, Some("new body")).unwrap();
        assert!(matches!(outcome, UpdateOutcome::Applied));

        let updated = fetch_doc(&conn, &doc.id).unwrap().unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.content, "new body");
    }

    #[test]
    fn versioned_update_conflict_leaves_row_untouched() {
        let fx = fixture();
        let doc = mkdoc(&fx, "d1", None, "Intro");
        let conn = fx.db.conn();

        let outcome =
            apply_versioned_update(&conn, &doc.id, 7, None, Some("stale write")).unwrap();
        match outcome {
            UpdateOutcome::Conflict { current_version } => assert_eq!(current_version, 1),
            UpdateOutcome::Applied => panic!("stale update must not apply"),
        }
        let unchanged = fetch_doc(&conn, &doc.id).unwrap().unwrap();
        assert_eq!(unchanged.version, 1);
        assert_eq!(unchanged.content, "");
    }

    #[test]
    fn soft_delete_cascades_but_marks_only_target_explicit() {
        let fx = fixture();
        let folder = mkdoc(&fx, "folder", None, "Guides");
        let child = mkdoc(&fx, "child", Some(&folder), "Install");
        let grandchild = mkdoc(&fx, "grand", Some(&child), "Linux");

        let conn = fx.db.conn();
        soft_delete_tree(&conn, &folder).unwrap();

        let folder = fetch_doc(&conn, &folder.id).unwrap().unwrap();
        let child = fetch_doc(&conn, &child.id).unwrap().unwrap();
        let grandchild = fetch_doc(&conn, &grandchild.id).unwrap().unwrap();
        assert!(folder.deleted_at.is_some() && folder.explicitly_deleted);
        assert!(child.deleted_at.is_some() && !child.explicitly_deleted);
        assert!(grandchild.deleted_at.is_some() && !grandchild.explicitly_deleted);
    }

    #[test]
    fn restore_revives_cascade_deleted_descendants_only() {
        let fx = fixture();
        let folder = mkdoc(&fx, "folder", None, "Guides");
        let kept = mkdoc(&fx, "kept", Some(&folder), "Install");
        let trashed = mkdoc(&fx, "trashed", Some(&folder), "Old Draft");

        let conn = fx.db.conn();
        // The draft was deleted on its own before the folder went away.
        let trashed = fetch_doc(&conn, &trashed.id).unwrap().unwrap();
        soft_delete_tree(&conn, &trashed).unwrap();
        let folder = fetch_doc(&conn, &folder.id).unwrap().unwrap();
        soft_delete_tree(&conn, &folder).unwrap();

        let folder = fetch_doc(&conn, &folder.id).unwrap().unwrap();
        restore_tree(&conn, &folder).unwrap();

        let kept = fetch_doc(&conn, &kept.id).unwrap().unwrap();
        let trashed = fetch_doc(&conn, &trashed.id).unwrap().unwrap();
        assert!(kept.deleted_at.is_none());
        assert!(trashed.deleted_at.is_some() && trashed.explicitly_deleted);
    }

    #[test]
    fn restore_keeps_children_of_explicitly_deleted_subtrees_trashed() {
        let fx = fixture();
        let guides = mkdoc(&fx, "guides", None, "Guides");
        let draft = mkdoc(&fx, "draft", Some(&guides), "Draft");
        let notes = mkdoc(&fx, "notes", Some(&draft), "Notes");
        let kept = mkdoc(&fx, "kept", Some(&guides), "Install");

        let conn = fx.db.conn();
        // The draft subtree goes first, on its own; then the whole folder.
        let draft_rec = fetch_doc(&conn, &draft.id).unwrap().unwrap();
        soft_delete_tree(&conn, &draft_rec).unwrap();
        let guides_rec = fetch_doc(&conn, &guides.id).unwrap().unwrap();
        soft_delete_tree(&conn, &guides_rec).unwrap();

        let guides_rec = fetch_doc(&conn, &guides.id).unwrap().unwrap();
        restore_tree(&conn, &guides_rec).unwrap();

        // The folder and its cascade-deleted child come back.
        let guides = fetch_doc(&conn, &guides.id).unwrap().unwrap();
        let kept = fetch_doc(&conn, &kept.id).unwrap().unwrap();
        assert!(guides.deleted_at.is_none());
        assert!(kept.deleted_at.is_none());

        // The draft stays trashed together with its own cascade.
        let draft = fetch_doc(&conn, &draft.id).unwrap().unwrap();
        let notes = fetch_doc(&conn, &notes.id).unwrap().unwrap();
        assert!(draft.deleted_at.is_some() && draft.explicitly_deleted);
        assert!(notes.deleted_at.is_some() && !notes.explicitly_deleted);
    }

    #[test]
    fn restore_under_deleted_parent_relocates_to_root() {
        let fx = fixture();
        let folder = mkdoc(&fx, "folder", None, "Guides");
        let child = mkdoc(&fx, "child", Some(&folder), "Install");
        let grandchild = mkdoc(&fx, "grand", Some(&child), "Linux");

        let conn = fx.db.conn();
        let child_rec = fetch_doc(&conn, &child.id).unwrap().unwrap();
        soft_delete_tree(&conn, &child_rec).unwrap();
        let folder_rec = fetch_doc(&conn, &folder.id).unwrap().unwrap();
        soft_delete_tree(&conn, &folder_rec).unwrap();

        // Folder stays deleted; the child comes back at the root.
        let child_rec = fetch_doc(&conn, &child.id).unwrap().unwrap();
        let restored = restore_tree(&conn, &child_rec).unwrap();
        assert_eq!(restored.path, "/install");
        assert_eq!(restored.parent_id, None);
        assert!(restored.deleted_at.is_none());

        let grandchild = fetch_doc(&conn, &grandchild.id).unwrap().unwrap();
        assert!(grandchild.deleted_at.is_none());
        assert_eq!(grandchild.path, "/install/linux");

        let folder = fetch_doc(&conn, &folder.id).unwrap().unwrap();
        assert!(folder.deleted_at.is_some());
    }

    #[test]
    fn move_rebases_descendant_paths() {
        let fx = fixture();
        let guides = mkdoc(&fx, "guides", None, "Guides");
        let manual = mkdoc(&fx, "manual", None, "Manual");
        let install = mkdoc(&fx, "install", Some(&guides), "Install");
        let linux = mkdoc(&fx, "linux", Some(&install), "Linux");

        let conn = fx.db.conn();
        let install_rec = fetch_doc(&conn, &install.id).unwrap().unwrap();
        let moved = move_tree(&conn, &install_rec, Some(&manual)).unwrap();
        assert_eq!(moved.path, "/manual/install");
        assert_eq!(moved.parent_id.as_deref(), Some("manual"));

        let linux = fetch_doc(&conn, &linux.id).unwrap().unwrap();
        assert_eq!(linux.path, "/manual/install/linux");
    }

    #[test]
    fn move_under_own_descendant_is_rejected() {
        let fx = fixture();
        let folder = mkdoc(&fx, "folder", None, "Guides");
        let child = mkdoc(&fx, "child", Some(&folder), "Install");

        let conn = fx.db.conn();
        let folder_rec = fetch_doc(&conn, &folder.id).unwrap().unwrap();
        assert!(move_tree(&conn, &folder_rec, Some(&child)).is_err());
    }

    #[test]
    fn sibling_prefix_is_not_a_descendant() {
        let fx = fixture();
        let guides = mkdoc(&fx, "guides", None, "Guides");
        let guidestar = mkdoc(&fx, "guidestar", None, "Guidestar");

        let conn = fx.db.conn();
        let guides_rec = fetch_doc(&conn, &guides.id).unwrap().unwrap();
        soft_delete_tree(&conn, &guides_rec).unwrap();

        let guidestar = fetch_doc(&conn, &guidestar.id).unwrap().unwrap();
        assert!(guidestar.deleted_at.is_none());
    }
}
