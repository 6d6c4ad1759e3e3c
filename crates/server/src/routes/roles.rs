//! Role and permission management.

use axum::{extract::Path, http::StatusCode, Json};
use uuid::Uuid;

use jolli_api::db;
use jolli_api::{
    CreateRoleRequest, GrantPermissionRequest, ListPermissionsResponse, ListRolesResponse,
    OkResponse, PermissionResponse, RoleResponse,
};
use jolli_core::{rbac, validate};

use crate::error::ApiErr;
use crate::routes::auth::{require_permission, AuthUser};
use crate::storage::{sq_execute, sq_query_map, sq_query_row};
use crate::tenancy::TenantCtx;

fn role_with_grants(
    conn: &rusqlite::Connection,
    id: String,
    name: String,
    builtin: bool,
) -> Result<RoleResponse, ApiErr> {
    let permissions = sq_query_map(conn, db::roles::grants_for_role(&id), |row| {
        row.get::<_, String>(0)
    })
    .map_err(ApiErr::from_db("list grants"))?;
    Ok(RoleResponse {
        id,
        name,
        builtin,
        permissions,
    })
}

/// GET /api/roles
pub async fn list_roles(ctx: TenantCtx, user: AuthUser) -> Result<Json<ListRolesResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "org.admin")?;

    let conn = ctx.db.conn();
    let rows = sq_query_map(&conn, db::roles::list(), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, bool>(2)?,
        ))
    })
    .map_err(ApiErr::from_db("list roles"))?;

    let mut roles = Vec::with_capacity(rows.len());
    for (id, name, builtin) in rows {
        roles.push(role_with_grants(&conn, id, name, builtin)?);
    }
    Ok(Json(ListRolesResponse { roles }))
}

/// POST /api/roles — create a custom role.
pub async fn create_role(
    ctx: TenantCtx,
    user: AuthUser,
    Json(req): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<RoleResponse>), ApiErr> {
    require_permission(&ctx, &user.user_id, "org.admin")?;
    let name = validate::validate_name(&req.name)?;
    if rbac::is_builtin_role(&name) {
        return Err(ApiErr::conflict("role name is reserved"));
    }

    let conn = ctx.db.conn();
    let taken = sq_query_row(&conn, db::roles::get_by_name(&name), |row| {
        row.get::<_, String>(0)
    })
    .map_err(ApiErr::from_db("role lookup"))?
    .is_some();
    if taken {
        return Err(ApiErr::conflict("role already exists"));
    }

    let id = Uuid::new_v4().to_string();
    sq_execute(&conn, db::roles::insert(&id, &name, false))
        .map_err(ApiErr::from_db("create role"))?;

    Ok((
        StatusCode::CREATED,
        Json(RoleResponse {
            id,
            name,
            builtin: false,
            permissions: Vec::new(),
        }),
    ))
}

/// DELETE /api/roles/{id} — custom roles only, and only when unused.
pub async fn delete_role(
    ctx: TenantCtx,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "org.admin")?;

    let conn = ctx.db.conn();
    let role = sq_query_row(&conn, db::roles::get_by_id(&id), |row| {
        Ok((row.get::<_, String>(1)?, row.get::<_, bool>(2)?))
    })
    .map_err(ApiErr::from_db("role lookup"))?
    .ok_or_else(|| ApiErr::not_found("role not found"))?;
    if role.1 {
        return Err(ApiErr::forbidden("builtin roles cannot be deleted"));
    }

    let in_use = sq_query_row(&conn, db::roles::membership_count(&id), |row| {
        row.get::<_, i64>(0)
    })
    .map_err(ApiErr::from_db("role usage"))?
    .unwrap_or(0)
        > 0;
    if in_use {
        return Err(ApiErr::conflict("role is still assigned to members"));
    }

    sq_execute(&conn, db::roles::delete(&id)).map_err(ApiErr::from_db("delete role"))?;
    Ok(Json(OkResponse { ok: true }))
}

/// GET /api/permissions — the seeded catalogue.
pub async fn list_permissions(
    ctx: TenantCtx,
    user: AuthUser,
) -> Result<Json<ListPermissionsResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "org.admin")?;

    let conn = ctx.db.conn();
    let permissions = sq_query_map(&conn, db::roles::permission_list(), |row| {
        Ok(PermissionResponse {
            key: row.get(0)?,
            description: row.get(1)?,
        })
    })
    .map_err(ApiErr::from_db("list permissions"))?;
    Ok(Json(ListPermissionsResponse { permissions }))
}

/// POST /api/roles/{id}/permissions — grant.
pub async fn grant_permission(
    ctx: TenantCtx,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<GrantPermissionRequest>,
) -> Result<Json<OkResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "org.admin")?;
    if !rbac::is_known_permission(&req.permission_key) {
        return Err(ApiErr::bad_request("unknown permission key"));
    }

    let conn = ctx.db.conn();
    let exists = sq_query_row(&conn, db::roles::get_by_id(&id), |row| {
        row.get::<_, String>(0)
    })
    .map_err(ApiErr::from_db("role lookup"))?
    .is_some();
    if !exists {
        return Err(ApiErr::not_found("role not found"));
    }

    sq_execute(&conn, db::roles::grant(&id, &req.permission_key))
        .map_err(ApiErr::from_db("grant permission"))?;
    Ok(Json(OkResponse { ok: true }))
}

/// DELETE /api/roles/{id}/permissions/{key} — revoke.
pub async fn revoke_permission(
    ctx: TenantCtx,
    user: AuthUser,
    Path((id, key)): Path<(String, String)>,
) -> Result<Json<OkResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "org.admin")?;

    let conn = ctx.db.conn();
    let changed = sq_execute(&conn, db::roles::revoke(&id, &key))
        .map_err(ApiErr::from_db("revoke permission"))?;
    if changed == 0 {
        return Err(ApiErr::not_found("grant not found"));
    }
    Ok(Json(OkResponse { ok: true }))
}
