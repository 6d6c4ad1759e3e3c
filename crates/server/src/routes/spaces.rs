//! Space management.

use axum::{http::StatusCode, Json};
use uuid::Uuid;

use jolli_api::db;
use jolli_api::{CreateSpaceRequest, ListSpacesResponse, SpaceResponse};
use jolli_core::validate;

use crate::error::ApiErr;
use crate::routes::auth::{require_permission, AuthUser};
use crate::storage::{sq_execute, sq_query_map, sq_query_row};
use crate::tenancy::TenantCtx;

pub(crate) fn space_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SpaceResponse> {
    Ok(SpaceResponse {
        id: row.get(0)?,
        org_id: row.get(1)?,
        slug: row.get(2)?,
        name: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// POST /api/spaces
pub async fn create_space(
    ctx: TenantCtx,
    user: AuthUser,
    Json(req): Json<CreateSpaceRequest>,
) -> Result<(StatusCode, Json<SpaceResponse>), ApiErr> {
    require_permission(&ctx, &user.user_id, "docs.write")?;
    let slug = validate::validate_slug(&req.slug)?;
    let name = validate::validate_name(&req.name)?;

    let conn = ctx.db.conn();
    let taken = sq_query_row(&conn, db::spaces::slug_exists(&ctx.org.id, &slug), |row| {
        row.get::<_, i64>(0)
    })
    .map_err(ApiErr::from_db("space slug check"))?
    .unwrap_or(0)
        > 0;
    if taken {
        return Err(ApiErr::conflict("space slug already exists"));
    }

    let id = Uuid::new_v4().to_string();
    sq_execute(&conn, db::spaces::insert(&id, &ctx.org.id, &slug, &name))
        .map_err(ApiErr::from_db("create space"))?;

    let space = sq_query_row(&conn, db::spaces::get_by_id(&id), space_from_row)
        .map_err(ApiErr::from_db("read space"))?
        .ok_or_else(|| ApiErr::internal("space vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(space)))
}

/// GET /api/spaces
pub async fn list_spaces(ctx: TenantCtx, user: AuthUser) -> Result<Json<ListSpacesResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "docs.read")?;

    let conn = ctx.db.conn();
    let spaces = sq_query_map(&conn, db::spaces::list(&ctx.org.id), space_from_row)
        .map_err(ApiErr::from_db("list spaces"))?;
    Ok(Json(ListSpacesResponse { spaces }))
}
