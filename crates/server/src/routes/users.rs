//! Org member management and invitations.

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use jolli_api::db;
use jolli_api::{
    crypto, service, CreateInvitationRequest, CreateInvitationResponse, InvitationResponse,
    InvitationStatus, ListInvitationsResponse, ListUsersQuery, ListUsersResponse, OkResponse,
    UpdateMemberRoleRequest, UserResponse,
};

use crate::error::ApiErr;
use crate::routes::auth::{require_permission, AuthUser};
use crate::storage::{sq_execute, sq_query_map, sq_query_row};
use crate::tenancy::TenantCtx;

fn member_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserResponse> {
    // user_columns + role name + joined_at
    Ok(UserResponse {
        id: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        email_verified: row.get(3)?,
        created_at: row.get(4)?,
        archived_at: row.get(5)?,
        role: row.get(6)?,
    })
}

// ── Members ───────────────────────────────────────────────────────────────

/// GET /api/users — members of the context org.
pub async fn list_members(
    ctx: TenantCtx,
    user: AuthUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ListUsersResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "org.admin")?;

    let conn = ctx.db.conn();
    let users = sq_query_map(
        &conn,
        db::users::members_of_org(&ctx.org.id, query.include_archived),
        member_from_row,
    )
    .map_err(ApiErr::from_db("list members"))?;
    Ok(Json(ListUsersResponse { users }))
}

/// GET /api/users/{id}
pub async fn get_member(
    ctx: TenantCtx,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "org.admin")?;

    let conn = ctx.db.conn();
    let profile = sq_query_row(&conn, db::users::get_by_id(&id), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, bool>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })
    .map_err(ApiErr::from_db("get user"))?
    .ok_or_else(|| ApiErr::not_found("user not found"))?;

    let role = sq_query_row(&conn, db::users::membership_role(&ctx.org.id, &id), |row| {
        row.get::<_, String>(1)
    })
    .map_err(ApiErr::from_db("get role"))?
    .ok_or_else(|| ApiErr::not_found("user is not a member of this org"))?;

    Ok(Json(UserResponse {
        id: profile.0,
        email: profile.1,
        display_name: profile.2,
        email_verified: profile.3,
        created_at: profile.4,
        archived_at: profile.5,
        role,
    }))
}

/// POST /api/users/{id}/archive — soft-remove a user.
pub async fn archive_member(
    ctx: TenantCtx,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "org.admin")?;
    if id == user.user_id {
        return Err(ApiErr::bad_request("cannot archive yourself"));
    }

    let conn = ctx.db.conn();
    let changed =
        sq_execute(&conn, db::users::archive(&id)).map_err(ApiErr::from_db("archive user"))?;
    if changed == 0 {
        return Err(ApiErr::not_found("user not found or already archived"));
    }
    // Kill any live sessions
    sq_execute(&conn, db::tokens::refresh_delete_for_user(&id))
        .map_err(ApiErr::from_db("revoke refresh tokens"))?;
    Ok(Json(OkResponse { ok: true }))
}

/// POST /api/users/{id}/restore
pub async fn restore_member(
    ctx: TenantCtx,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "org.admin")?;

    let conn = ctx.db.conn();
    let changed =
        sq_execute(&conn, db::users::restore(&id)).map_err(ApiErr::from_db("restore user"))?;
    if changed == 0 {
        return Err(ApiErr::not_found("user not found"));
    }
    Ok(Json(OkResponse { ok: true }))
}

/// PUT /api/users/{id}/role — change a member's role within the org.
pub async fn update_member_role(
    ctx: TenantCtx,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateMemberRoleRequest>,
) -> Result<Json<OkResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "org.admin")?;

    let conn = ctx.db.conn();
    let role_exists = sq_query_row(&conn, db::roles::get_by_id(&req.role_id), |row| {
        row.get::<_, String>(0)
    })
    .map_err(ApiErr::from_db("role lookup"))?
    .is_some();
    if !role_exists {
        return Err(ApiErr::bad_request("unknown role"));
    }

    let changed = sq_execute(
        &conn,
        db::users::set_member_role(&ctx.org.id, &id, &req.role_id),
    )
    .map_err(ApiErr::from_db("update role"))?;
    if changed == 0 {
        return Err(ApiErr::not_found("user is not a member of this org"));
    }
    Ok(Json(OkResponse { ok: true }))
}

// ── Invitations ───────────────────────────────────────────────────────────

fn invitation_from_row(row: &rusqlite::Row<'_>, role: String) -> rusqlite::Result<InvitationResponse> {
    let status: String = row.get(4)?;
    Ok(InvitationResponse {
        id: row.get(0)?,
        org_id: row.get(1)?,
        email: row.get(2)?,
        role,
        status: InvitationStatus::from_str(&status).unwrap_or(InvitationStatus::Revoked),
        invited_by: row.get(5)?,
        created_at: row.get(6)?,
        expires_at: row.get(7)?,
    })
}

/// POST /api/invitations — invite someone into the org.
pub async fn create_invitation(
    ctx: TenantCtx,
    user: AuthUser,
    Json(req): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<CreateInvitationResponse>), ApiErr> {
    require_permission(&ctx, &user.user_id, "org.admin")?;
    let email = service::validate_email(&req.email)?;

    let conn = ctx.db.conn();
    let role_name = sq_query_row(&conn, db::roles::get_by_id(&req.role_id), |row| {
        row.get::<_, String>(1)
    })
    .map_err(ApiErr::from_db("role lookup"))?
    .ok_or_else(|| ApiErr::bad_request("unknown role"))?;

    let pending = sq_query_row(
        &conn,
        db::invitations::pending_for_email(&ctx.org.id, &email),
        |row| row.get::<_, i64>(0),
    )
    .map_err(ApiErr::from_db("invitation check"))?
    .unwrap_or(0)
        > 0;
    if pending {
        return Err(ApiErr::conflict("a pending invitation already exists"));
    }

    let token = crypto::generate_token()?;
    let token_hash = crypto::hash_token(&token);
    let id = Uuid::new_v4().to_string();
    let expires_at = service::expiry_sqlite(crate::now_unix(), service::INVITATION_EXPIRY_DAYS)?;
    sq_execute(
        &conn,
        db::invitations::insert(
            &id,
            &ctx.org.id,
            &email,
            &req.role_id,
            &token_hash,
            Some(&user.user_id),
            &expires_at,
        ),
    )
    .map_err(ApiErr::from_db("create invitation"))?;

    let created_at = service::now_sqlite(crate::now_unix())?;
    Ok((
        StatusCode::CREATED,
        Json(CreateInvitationResponse {
            invitation: InvitationResponse {
                id,
                org_id: ctx.org.id.clone(),
                email,
                role: role_name,
                status: InvitationStatus::Pending,
                invited_by: Some(user.user_id),
                created_at,
                expires_at,
            },
            token,
        }),
    ))
}

/// GET /api/invitations — invitations for the context org.
pub async fn list_invitations(
    ctx: TenantCtx,
    user: AuthUser,
) -> Result<Json<ListInvitationsResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "org.admin")?;

    let conn = ctx.db.conn();
    // Rows carry the role id; resolve it to the role name afterwards.
    let mut invitations = sq_query_map(&conn, db::invitations::list(&ctx.org.id), |row| {
        let role_id: String = row.get(3)?;
        invitation_from_row(row, role_id)
    })
    .map_err(ApiErr::from_db("list invitations"))?;

    for invitation in &mut invitations {
        if let Some(name) = sq_query_row(&conn, db::roles::get_by_id(&invitation.role), |row| {
            row.get::<_, String>(1)
        })
        .map_err(ApiErr::from_db("role lookup"))?
        {
            invitation.role = name;
        }
    }

    Ok(Json(ListInvitationsResponse { invitations }))
}

/// POST /api/invitations/{id}/revoke
pub async fn revoke_invitation(
    ctx: TenantCtx,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "org.admin")?;

    let conn = ctx.db.conn();
    let changed = sq_execute(&conn, db::invitations::revoke(&id))
        .map_err(ApiErr::from_db("revoke invitation"))?;
    if changed == 0 {
        return Err(ApiErr::not_found("invitation not found or not pending"));
    }
    Ok(Json(OkResponse { ok: true }))
}
