//! GitHub repository integrations.

use axum::{extract::Path, http::StatusCode, Json};
use uuid::Uuid;

use jolli_api::db;
use jolli_api::{
    crypto, service, CreateIntegrationRequest, CreateIntegrationResponse, IntegrationResponse,
    ListIntegrationsResponse, OkResponse,
};

use crate::error::ApiErr;
use crate::routes::auth::{require_permission, AuthUser};
use crate::storage::{sq_execute, sq_query_map, sq_query_row};
use crate::tenancy::TenantCtx;

const PROVIDER_GITHUB: &str = "github";
const DEFAULT_BRANCH: &str = "main";

pub(crate) fn integration_from_row(
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<IntegrationResponse> {
    Ok(IntegrationResponse {
        id: row.get(0)?,
        org_id: row.get(1)?,
        provider: row.get(2)?,
        repo_full_name: row.get(3)?,
        default_branch: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        last_event_at: row.get(7)?,
    })
}

/// POST /api/integrations — link a repository. The webhook secret is
/// returned exactly once.
pub async fn create_integration(
    ctx: TenantCtx,
    user: AuthUser,
    Json(req): Json<CreateIntegrationRequest>,
) -> Result<(StatusCode, Json<CreateIntegrationResponse>), ApiErr> {
    require_permission(&ctx, &user.user_id, "integrations.manage")?;
    let repo_full_name = service::validate_repo_full_name(&req.repo_full_name)?;
    let default_branch = req
        .default_branch
        .as_deref()
        .unwrap_or(DEFAULT_BRANCH)
        .to_string();

    let conn = ctx.db.conn();
    let taken = sq_query_row(
        &conn,
        db::integrations::get_by_repo_with_secret(&repo_full_name),
        |row| row.get::<_, String>(0),
    )
    .map_err(ApiErr::from_db("integration lookup"))?
    .is_some();
    if taken {
        return Err(ApiErr::conflict("repository is already linked"));
    }

    let webhook_secret = crypto::generate_token()?;
    let id = Uuid::new_v4().to_string();
    sq_execute(
        &conn,
        db::integrations::insert(
            &id,
            &ctx.org.id,
            PROVIDER_GITHUB,
            &repo_full_name,
            &default_branch,
            &webhook_secret,
        ),
    )
    .map_err(ApiErr::from_db("create integration"))?;

    let integration = sq_query_row(&conn, db::integrations::get_by_id(&id), integration_from_row)
        .map_err(ApiErr::from_db("read integration"))?
        .ok_or_else(|| ApiErr::internal("integration vanished after insert"))?;
    Ok((
        StatusCode::CREATED,
        Json(CreateIntegrationResponse {
            integration,
            webhook_secret,
        }),
    ))
}

/// GET /api/integrations
pub async fn list_integrations(
    ctx: TenantCtx,
    user: AuthUser,
) -> Result<Json<ListIntegrationsResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "integrations.manage")?;

    let conn = ctx.db.conn();
    let integrations = sq_query_map(&conn, db::integrations::list(&ctx.org.id), integration_from_row)
        .map_err(ApiErr::from_db("list integrations"))?;
    Ok(Json(ListIntegrationsResponse { integrations }))
}

/// DELETE /api/integrations/{id}
pub async fn delete_integration(
    ctx: TenantCtx,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "integrations.manage")?;

    let conn = ctx.db.conn();
    let owned = sq_query_row(&conn, db::integrations::get_by_id(&id), integration_from_row)
        .map_err(ApiErr::from_db("integration lookup"))?
        .map(|i| i.org_id == ctx.org.id)
        .unwrap_or(false);
    if !owned {
        return Err(ApiErr::not_found("integration not found"));
    }

    sq_execute(&conn, db::integrations::delete(&id))
        .map_err(ApiErr::from_db("delete integration"))?;
    Ok(Json(OkResponse { ok: true }))
}
