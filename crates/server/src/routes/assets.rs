//! Asset upload, download, and lifecycle. Bytes live on the tenant's disk;
//! the database row carries metadata and the storage key.

use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rusqlite::Connection;
use uuid::Uuid;

use jolli_api::db;
use jolli_api::{
    AssetResponse, AssetStatus, ListAssetsQuery, ListAssetsResponse, OkResponse,
    SweepAssetsResponse, UploadAssetQuery,
};
use jolli_core::Jrn;

use crate::error::ApiErr;
use crate::routes::auth::{require_permission, AuthUser};
use crate::routes::docs::space_in_org;
use crate::storage::{sq_execute, sq_query_map, sq_query_row};
use crate::tenancy::TenantCtx;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const MAX_ASSET_BYTES: usize = 32 * 1024 * 1024;

struct AssetRecord {
    id: String,
    space_id: String,
    filename: String,
    content_type: String,
    size_bytes: i64,
    storage_key: String,
    status: String,
    uploaded_by: Option<String>,
    created_at: String,
    updated_at: String,
}

fn asset_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssetRecord> {
    Ok(AssetRecord {
        id: row.get(0)?,
        space_id: row.get(1)?,
        filename: row.get(2)?,
        content_type: row.get(3)?,
        size_bytes: row.get(4)?,
        storage_key: row.get(5)?,
        status: row.get(6)?,
        uploaded_by: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

impl AssetRecord {
    fn into_response(self, tenant_slug: &str, space_slug: &str) -> AssetResponse {
        let jrn = Jrn::asset(tenant_slug, space_slug, &self.id).to_string();
        AssetResponse {
            id: self.id,
            jrn,
            space_id: self.space_id,
            filename: self.filename,
            content_type: self.content_type,
            size_bytes: self.size_bytes,
            status: AssetStatus::from_str(&self.status).unwrap_or(AssetStatus::Orphaned),
            uploaded_by: self.uploaded_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn validate_filename(value: &str) -> Result<String, ApiErr> {
    let trimmed = value.trim();
    if trimmed.is_empty()
        || trimmed.len() > 255
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed == "."
        || trimmed == ".."
    {
        return Err(ApiErr::bad_request("invalid filename"));
    }
    Ok(trimmed.to_string())
}

/// Fetch an asset visible to the context org, or 404.
fn fetch_scoped(conn: &Connection, org_id: &str, id: &str) -> Result<AssetRecord, ApiErr> {
    let space_ids = sq_query_map(conn, db::spaces::ids_for_org(org_id), |row| {
        row.get::<_, String>(0)
    })
    .map_err(ApiErr::from_db("space listing"))?;
    sq_query_row(conn, db::assets::get_scoped(id, &space_ids), asset_from_row)
        .map_err(ApiErr::from_db("asset lookup"))?
        .ok_or_else(|| ApiErr::not_found("asset not found"))
}

/// POST /api/assets — raw body upload, metadata in the query string.
pub async fn upload_asset(
    ctx: TenantCtx,
    user: AuthUser,
    Query(query): Query<UploadAssetQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<AssetResponse>), ApiErr> {
    require_permission(&ctx, &user.user_id, "assets.write")?;
    let filename = validate_filename(&query.filename)?;
    if body.is_empty() {
        return Err(ApiErr::bad_request("empty upload"));
    }
    if body.len() > MAX_ASSET_BYTES {
        return Err(ApiErr::bad_request("asset exceeds the upload limit"));
    }

    let conn = ctx.db.conn();
    let (space_id, space_slug) = space_in_org(&conn, &ctx.org.id, &query.space_id)?;

    let id = Uuid::new_v4().to_string();
    let storage_key = ctx
        .db
        .write_blob(&id, &body)
        .map_err(ApiErr::from_db("write asset blob"))?;
    let content_type = query.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);
    sq_execute(
        &conn,
        db::assets::insert(
            &id,
            &space_id,
            &filename,
            content_type,
            body.len() as i64,
            &storage_key,
            AssetStatus::Active.as_str(),
            Some(&user.user_id),
        ),
    )
    .map_err(ApiErr::from_db("create asset"))?;

    let asset = sq_query_row(&conn, db::assets::get_by_id(&id), asset_from_row)
        .map_err(ApiErr::from_db("read asset"))?
        .ok_or_else(|| ApiErr::internal("asset vanished after insert"))?;
    Ok((
        StatusCode::CREATED,
        Json(asset.into_response(&ctx.tenant.slug, &space_slug)),
    ))
}

/// GET /api/assets/{id}/download — the blob itself.
pub async fn download_asset(
    ctx: TenantCtx,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiErr> {
    require_permission(&ctx, &user.user_id, "assets.read")?;

    let asset = {
        let conn = ctx.db.conn();
        fetch_scoped(&conn, &ctx.org.id, &id)?
    };
    if asset.status == AssetStatus::Deleted.as_str() {
        return Err(ApiErr::not_found("asset not found"));
    }

    let bytes = ctx
        .db
        .read_blob(&asset.storage_key)
        .map_err(ApiErr::from_db("read asset blob"))?;
    Ok((
        [
            (header::CONTENT_TYPE, asset.content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", asset.filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// GET /api/assets/{id} — metadata only.
pub async fn get_asset(
    ctx: TenantCtx,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<AssetResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "assets.read")?;

    let conn = ctx.db.conn();
    let asset = fetch_scoped(&conn, &ctx.org.id, &id)?;
    let (_, space_slug) = space_in_org(&conn, &ctx.org.id, &asset.space_id)?;
    Ok(Json(asset.into_response(&ctx.tenant.slug, &space_slug)))
}

/// GET /api/assets — assets of one space, active by default.
pub async fn list_assets(
    ctx: TenantCtx,
    user: AuthUser,
    Query(query): Query<ListAssetsQuery>,
) -> Result<Json<ListAssetsResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "assets.read")?;

    let conn = ctx.db.conn();
    let (space_id, space_slug) = space_in_org(&conn, &ctx.org.id, &query.space_id)?;
    let status = query.status.unwrap_or(AssetStatus::Active);
    let assets = sq_query_map(
        &conn,
        db::assets::list(&space_id, Some(status.as_str())),
        asset_from_row,
    )
    .map_err(ApiErr::from_db("list assets"))?
    .into_iter()
    .map(|asset| asset.into_response(&ctx.tenant.slug, &space_slug))
    .collect();
    Ok(Json(ListAssetsResponse { assets }))
}

/// DELETE /api/assets/{id} — tombstone the row; the sweep reclaims the blob.
pub async fn delete_asset(
    ctx: TenantCtx,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "assets.write")?;

    let conn = ctx.db.conn();
    let asset = fetch_scoped(&conn, &ctx.org.id, &id)?;
    sq_execute(
        &conn,
        db::assets::set_status(&asset.id, AssetStatus::Deleted.as_str()),
    )
    .map_err(ApiErr::from_db("delete asset"))?;
    Ok(Json(OkResponse { ok: true }))
}

/// POST /api/assets/sweep — remove blobs for tombstoned assets.
pub async fn sweep_assets(
    ctx: TenantCtx,
    user: AuthUser,
) -> Result<Json<SweepAssetsResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "org.admin")?;

    let tombstoned = {
        let conn = ctx.db.conn();
        sq_query_map(
            &conn,
            db::assets::by_status(AssetStatus::Deleted.as_str()),
            asset_from_row,
        )
        .map_err(ApiErr::from_db("list tombstoned assets"))?
    };

    let mut swept = 0;
    for asset in &tombstoned {
        match ctx.db.remove_blob(&asset.storage_key) {
            Ok(()) => swept += 1,
            Err(e) => tracing::warn!("sweep of {} failed: {e}", asset.id),
        }
    }
    Ok(Json(SweepAssetsResponse { swept }))
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenancy::TenantRegistry;

    struct Fixture {
        _dir: tempfile::TempDir,
        db: crate::storage::TenantDb,
        org_id: String,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let registry = TenantRegistry::open(dir.path()).unwrap();
        let out = registry.provision("acme", "Acme", "admin@acme.io").unwrap();
        let db = registry.tenant_db(&out.tenant_id, false).unwrap();
        {
            let conn = db.conn();
            sq_execute(&conn, db::spaces::insert("sp1", &out.org_id, "docs", "Docs")).unwrap();
            sq_execute(&conn, db::spaces::insert("sp2", "other-org", "docs", "Docs")).unwrap();
        }
        Fixture {
            _dir: dir,
            db,
            org_id: out.org_id,
        }
    }

    fn mkasset(fx: &Fixture, id: &str, space_id: &str) {
        let conn = fx.db.conn();
        sq_execute(
            &conn,
            db::assets::insert(
                id,
                space_id,
                "logo.png",
                "image/png",
                4,
                "blobs/logo",
                AssetStatus::Active.as_str(),
                None,
            ),
        )
        .unwrap();
    }

    #[test]
    fn scoped_fetch_finds_own_space_asset() {
        let fx = fixture();
        mkasset(&fx, "a1", "sp1");

        let conn = fx.db.conn();
        let asset = fetch_scoped(&conn, &fx.org_id, "a1").unwrap();
        assert_eq!(asset.id, "a1");
        assert_eq!(asset.space_id, "sp1");
    }

    #[test]
    fn scoped_fetch_hides_foreign_space_asset() {
        let fx = fixture();
        mkasset(&fx, "a2", "sp2");

        let conn = fx.db.conn();
        // The row exists, but sp2 belongs to another org.
        assert!(fetch_scoped(&conn, &fx.org_id, "a2").is_err());
    }
}
