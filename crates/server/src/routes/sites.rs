//! Docsite management, builds, and the build-progress SSE stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use jolli_api::db;
use jolli_api::{
    CreateSiteRequest, ListSitesQuery, ListSitesResponse, SiteResponse, SiteStatus,
    StartBuildResponse,
};
use jolli_core::validate;

use crate::error::ApiErr;
use crate::events::EventHub;
use crate::routes::auth::{require_permission, AuthUser};
use crate::routes::docs::space_in_org;
use crate::sitegen::{self, BuildJob};
use crate::storage::{sq_execute, sq_query_map, sq_query_row};
use crate::tenancy::TenantCtx;
use crate::AppConfig;

pub(crate) fn site_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SiteResponse> {
    let status: String = row.get(3)?;
    Ok(SiteResponse {
        id: row.get(0)?,
        space_id: row.get(1)?,
        name: row.get(2)?,
        status: SiteStatus::from_str(&status).unwrap_or(SiteStatus::Failed),
        deployment_url: row.get(4)?,
        last_build_id: row.get(5)?,
        last_built_at: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn site_in_org(ctx: &TenantCtx, id: &str) -> Result<SiteResponse, ApiErr> {
    let conn = ctx.db.conn();
    let site = sq_query_row(&conn, db::sites::get_by_id(id), site_from_row)
        .map_err(ApiErr::from_db("site lookup"))?
        .ok_or_else(|| ApiErr::not_found("site not found"))?;
    space_in_org(&conn, &ctx.org.id, &site.space_id)?;
    Ok(site)
}

/// POST /api/sites
pub async fn create_site(
    ctx: TenantCtx,
    user: AuthUser,
    Json(req): Json<CreateSiteRequest>,
) -> Result<(StatusCode, Json<SiteResponse>), ApiErr> {
    require_permission(&ctx, &user.user_id, "sites.manage")?;
    let name = validate::validate_name(&req.name)?;

    let conn = ctx.db.conn();
    let (space_id, _) = space_in_org(&conn, &ctx.org.id, &req.space_id)?;

    let id = Uuid::new_v4().to_string();
    sq_execute(
        &conn,
        db::sites::insert(&id, &space_id, &name, SiteStatus::Idle.as_str()),
    )
    .map_err(ApiErr::from_db("create site"))?;

    let site = sq_query_row(&conn, db::sites::get_by_id(&id), site_from_row)
        .map_err(ApiErr::from_db("read site"))?
        .ok_or_else(|| ApiErr::internal("site vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(site)))
}

/// GET /api/sites
pub async fn list_sites(
    ctx: TenantCtx,
    user: AuthUser,
    Query(query): Query<ListSitesQuery>,
) -> Result<Json<ListSitesResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "docs.read")?;

    let conn = ctx.db.conn();
    let (space_id, _) = space_in_org(&conn, &ctx.org.id, &query.space_id)?;
    let sites = sq_query_map(&conn, db::sites::list(&space_id), site_from_row)
        .map_err(ApiErr::from_db("list sites"))?;
    Ok(Json(ListSitesResponse { sites }))
}

/// GET /api/sites/{id}
pub async fn get_site(
    ctx: TenantCtx,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SiteResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "docs.read")?;
    Ok(Json(site_in_org(&ctx, &id)?))
}

/// POST /api/sites/{id}/builds — claim the site and spawn the pipeline.
pub async fn start_build(
    ctx: TenantCtx,
    user: AuthUser,
    State(hub): State<Arc<EventHub>>,
    State(http): State<reqwest::Client>,
    State(config): State<AppConfig>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<StartBuildResponse>), ApiErr> {
    require_permission(&ctx, &user.user_id, "sites.manage")?;
    let site = site_in_org(&ctx, &id)?;

    let build_id = Uuid::new_v4().to_string();
    let settled = [SiteStatus::Idle, SiteStatus::Ready, SiteStatus::Failed];
    let startable: Vec<&str> = settled.iter().map(|s| s.as_str()).collect();
    let claimed = {
        let conn = ctx.db.conn();
        sq_execute(&conn, db::sites::start_build(&id, &build_id, &startable))
            .map_err(ApiErr::from_db("claim site"))?
    };
    if claimed == 0 {
        return Err(ApiErr::conflict("a build is already in progress"));
    }

    let job = BuildJob {
        tenant_slug: ctx.tenant.slug.clone(),
        site_id: site.id,
        build_id: build_id.clone(),
        space_id: site.space_id,
        deploy_hook_url: config.deploy_hook_url.clone(),
    };
    tokio::spawn(sitegen::run_build(ctx.db.clone(), hub, http, job));

    Ok((
        StatusCode::ACCEPTED,
        Json(StartBuildResponse {
            build_id,
            status: SiteStatus::Building,
        }),
    ))
}

/// GET /api/sites/{id}/events — build-progress SSE stream with replay.
pub async fn build_events(
    ctx: TenantCtx,
    user: AuthUser,
    State(hub): State<Arc<EventHub>>,
    Path(id): Path<String>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, ApiErr> {
    require_permission(&ctx, &user.user_id, "docs.read")?;
    site_in_org(&ctx, &id)?;

    let (replay, rx) = hub.subscribe(&EventHub::site_key(&id));
    let stream = tokio_stream::iter(replay)
        // A lagging subscriber gets its stream ended, not an error event.
        .chain(BroadcastStream::new(rx).map_while(|item| item.ok()))
        .map(|data| Ok(Event::default().data(data)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
