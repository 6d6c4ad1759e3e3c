//! Auth flows and the `AuthUser` extractor.

use axum::{
    extract::{FromRef, FromRequestParts, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use jolli_api::db;
use jolli_api::{
    crypto, service, AuthTokenResponse, ChangePasswordRequest, LoginRequest, LogoutRequest,
    MeResponse, MembershipResponse, OkResponse, RefreshRequest, RegisterRequest,
    VerifyEmailRequest,
};
use jolli_core::rbac;

use crate::error::ApiErr;
use crate::storage::{sq_execute, sq_query_map, sq_query_row};
use crate::tenancy::{TenantCtx, TenantRegistry};
use crate::AppConfig;

const VERIFY_PURPOSE: &str = "email_verify";

// ── Auth extractor ────────────────────────────────────────────────────────

/// Authenticated user, resolved from `Authorization: Bearer <jwt>` within
/// the request's tenant context.
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TenantRegistry: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = TenantCtx::from_request_parts(parts, state).await?;
        let config = AppConfig::from_ref(state);

        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| {
                ApiErr::unauthorized("missing or invalid Authorization header").into_response()
            })?;

        let claims = crypto::verify_jwt(token, &config.jwt_secret, crate::now_unix())
            .map_err(|e| ApiErr::from(e).into_response())?;
        if claims.tenant_id != ctx.tenant.id {
            return Err(ApiErr::unauthorized("token issued for another tenant").into_response());
        }

        let conn = ctx.db.conn();
        let row = sq_query_row(&conn, db::users::get_by_id(&claims.user_id), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })
        .map_err(|e| ApiErr::from_db("auth lookup")(e).into_response())?
        .ok_or_else(|| ApiErr::unauthorized("unknown user").into_response())?;

        let (user_id, email, display_name, archived_at) = row;
        if archived_at.is_some() {
            return Err(ApiErr::unauthorized("account is archived").into_response());
        }

        Ok(AuthUser {
            user_id,
            email,
            display_name,
        })
    }
}

/// Check that `user_id` holds `permission` within the context org.
///
/// The builtin admin role short-circuits; everything else goes through the
/// role's granted permission keys.
pub fn require_permission(ctx: &TenantCtx, user_id: &str, permission: &str) -> Result<(), ApiErr> {
    let conn = ctx.db.conn();
    let (role_id, role_name) = sq_query_row(
        &conn,
        db::users::membership_role(&ctx.org.id, user_id),
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
    )
    .map_err(ApiErr::from_db("membership lookup"))?
    .ok_or_else(|| ApiErr::forbidden("not a member of this org"))?;

    if role_name == rbac::ROLE_ADMIN {
        return Ok(());
    }

    let granted = sq_query_row(
        &conn,
        db::roles::role_has_permission(&role_id, permission),
        |row| row.get::<_, i64>(0),
    )
    .map_err(ApiErr::from_db("permission lookup"))?
    .unwrap_or(0)
        > 0;

    if granted {
        Ok(())
    } else {
        Err(ApiErr::forbidden(format!("requires {permission}")))
    }
}

fn issue_tokens(
    ctx: &TenantCtx,
    config: &AppConfig,
    user_id: &str,
    display_name: &str,
) -> Result<AuthTokenResponse, ApiErr> {
    let bundle = service::prepare_token_bundle(
        &config.jwt_secret,
        &ctx.tenant.id,
        user_id,
        display_name,
        crate::now_unix(),
    )?;
    let conn = ctx.db.conn();
    sq_execute(
        &conn,
        db::tokens::refresh_insert(
            &bundle.token_id,
            user_id,
            &bundle.token_hash,
            &bundle.expires_at,
        ),
    )
    .map_err(ApiErr::from_db("store refresh token"))?;
    Ok(bundle.response)
}

// ── Register (invitation redemption) ──────────────────────────────────────

/// POST /api/auth/register — redeem an org invitation and create the account.
pub async fn register(
    ctx: TenantCtx,
    State(config): State<AppConfig>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthTokenResponse>), ApiErr> {
    let display_name = service::validate_display_name(&req.display_name)?;
    service::validate_password(&req.password)?;

    let token_hash = crypto::hash_token(&req.invitation_token);
    let user_id = Uuid::new_v4().to_string();
    let verification_token = crypto::generate_token()?;
    {
        let conn = ctx.db.conn();
        let invitation = sq_query_row(
            &conn,
            db::invitations::lookup_by_token_hash(&token_hash),
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .map_err(ApiErr::from_db("invitation lookup"))?
        .ok_or_else(|| ApiErr::bad_request("invalid or expired invitation"))?;
        let (invitation_id, org_id, email, role_id) = invitation;

        let exists = sq_query_row(&conn, db::users::email_exists(&email), |row| {
            row.get::<_, i64>(0)
        })
        .map_err(ApiErr::from_db("email check"))?
        .unwrap_or(0)
            > 0;
        if exists {
            return Err(ApiErr::conflict("email already registered"));
        }

        let (hash, salt) = crypto::hash_password(&req.password)?;
        sq_execute(
            &conn,
            db::users::insert(&user_id, &email, &display_name, &hash, &salt),
        )
        .map_err(ApiErr::from_db("create user"))?;
        sq_execute(&conn, db::users::membership_insert(&org_id, &user_id, &role_id))
            .map_err(ApiErr::from_db("create membership"))?;
        sq_execute(&conn, db::invitations::mark_accepted(&invitation_id))
            .map_err(ApiErr::from_db("consume invitation"))?;

        // Email dispatch is out of scope; the token is surfaced in the log.
        let verification_hash = crypto::hash_token(&verification_token);
        let expires_at =
            service::expiry_sqlite(crate::now_unix(), service::VERIFICATION_EXPIRY_DAYS)?;
        sq_execute(
            &conn,
            db::tokens::verification_insert(
                &Uuid::new_v4().to_string(),
                &user_id,
                &verification_hash,
                VERIFY_PURPOSE,
                &expires_at,
            ),
        )
        .map_err(ApiErr::from_db("create verification token"))?;
        tracing::info!("verification token for {email}: {verification_token}");
    }

    let response = issue_tokens(&ctx, &config, &user_id, &display_name)?;
    Ok((StatusCode::CREATED, Json(response)))
}

// ── Login / refresh / logout ──────────────────────────────────────────────

/// POST /api/auth/login
pub async fn login(
    ctx: TenantCtx,
    State(config): State<AppConfig>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthTokenResponse>, ApiErr> {
    let email = service::validate_email(&req.email)?;

    let (user_id, display_name) = {
        let conn = ctx.db.conn();
        let creds = sq_query_row(&conn, db::users::credentials_by_email(&email), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })
        .map_err(ApiErr::from_db("login lookup"))?;

        let Some((user_id, hash, salt, archived_at)) = creds else {
            return Err(ApiErr::unauthorized("invalid credentials"));
        };
        if archived_at.is_some() {
            return Err(ApiErr::forbidden("account is archived"));
        }
        if !crypto::verify_password(&req.password, &hash, &salt) {
            return Err(ApiErr::unauthorized("invalid credentials"));
        }

        let display_name = sq_query_row(&conn, db::users::get_by_id(&user_id), |row| {
            row.get::<_, String>(2)
        })
        .map_err(ApiErr::from_db("login profile"))?
        .unwrap_or_default();
        (user_id, display_name)
    };

    let response = issue_tokens(&ctx, &config, &user_id, &display_name)?;
    Ok(Json(response))
}

/// POST /api/auth/refresh — rotate a refresh token.
pub async fn refresh(
    ctx: TenantCtx,
    State(config): State<AppConfig>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<AuthTokenResponse>, ApiErr> {
    let token_hash = crypto::hash_token(&req.refresh_token);

    let (user_id, display_name) = {
        let conn = ctx.db.conn();
        let row = sq_query_row(&conn, db::tokens::refresh_lookup(&token_hash), |row| {
            row.get::<_, String>(1)
        })
        .map_err(ApiErr::from_db("refresh lookup"))?;
        let Some(user_id) = row else {
            return Err(ApiErr::unauthorized("invalid or expired refresh token"));
        };

        sq_execute(&conn, db::tokens::refresh_delete_by_hash(&token_hash))
            .map_err(ApiErr::from_db("rotate refresh token"))?;

        let profile = sq_query_row(&conn, db::users::get_by_id(&user_id), |row| {
            Ok((row.get::<_, String>(2)?, row.get::<_, Option<String>>(5)?))
        })
        .map_err(ApiErr::from_db("refresh profile"))?
        .ok_or_else(|| ApiErr::unauthorized("unknown user"))?;
        if profile.1.is_some() {
            return Err(ApiErr::forbidden("account is archived"));
        }
        (user_id, profile.0)
    };

    let response = issue_tokens(&ctx, &config, &user_id, &display_name)?;
    Ok(Json(response))
}

/// POST /api/auth/logout — invalidate one refresh token.
pub async fn logout(
    ctx: TenantCtx,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<OkResponse>, ApiErr> {
    let token_hash = crypto::hash_token(&req.refresh_token);
    let conn = ctx.db.conn();
    sq_execute(&conn, db::tokens::refresh_delete_by_hash(&token_hash))
        .map_err(ApiErr::from_db("logout"))?;
    Ok(Json(OkResponse { ok: true }))
}

// ── Account management ────────────────────────────────────────────────────

/// PUT /api/auth/password — requires the current password.
pub async fn change_password(
    ctx: TenantCtx,
    user: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<OkResponse>, ApiErr> {
    service::validate_password(&req.new_password)?;

    let conn = ctx.db.conn();
    let creds = sq_query_row(&conn, db::users::credentials_by_email(&user.email), |row| {
        Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?))
    })
    .map_err(ApiErr::from_db("password lookup"))?
    .ok_or_else(|| ApiErr::unauthorized("unknown user"))?;

    if !crypto::verify_password(&req.current_password, &creds.0, &creds.1) {
        return Err(ApiErr::unauthorized("current password is incorrect"));
    }

    let (hash, salt) = crypto::hash_password(&req.new_password)?;
    sq_execute(&conn, db::users::set_password(&user.user_id, &hash, &salt))
        .map_err(ApiErr::from_db("update password"))?;
    // Invalidate all sessions
    sq_execute(&conn, db::tokens::refresh_delete_for_user(&user.user_id))
        .map_err(ApiErr::from_db("revoke refresh tokens"))?;

    Ok(Json(OkResponse { ok: true }))
}

/// GET /api/auth/me
pub async fn me(
    ctx: TenantCtx,
    State(registry): State<TenantRegistry>,
    user: AuthUser,
) -> Result<Json<MeResponse>, ApiErr> {
    let (email_verified, created_at, memberships) = {
        let conn = ctx.db.conn();
        let profile = sq_query_row(&conn, db::users::get_by_id(&user.user_id), |row| {
            Ok((row.get::<_, bool>(3)?, row.get::<_, String>(4)?))
        })
        .map_err(ApiErr::from_db("profile lookup"))?
        .ok_or_else(|| ApiErr::not_found("user not found"))?;

        let memberships = sq_query_map(
            &conn,
            db::users::memberships_for_user(&user.user_id),
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .map_err(ApiErr::from_db("membership listing"))?;
        (profile.0, profile.1, memberships)
    };

    let memberships = memberships
        .into_iter()
        .map(|(org_id, role, joined_at)| {
            let org_slug = registry
                .org_get(&org_id)
                .map(|o| o.slug)
                .unwrap_or_default();
            MembershipResponse {
                org_id,
                org_slug,
                role,
                joined_at,
            }
        })
        .collect();

    Ok(Json(MeResponse {
        user_id: user.user_id,
        email: user.email,
        display_name: user.display_name,
        email_verified,
        created_at,
        memberships,
    }))
}

/// POST /api/auth/verify-email — consume a verification token.
pub async fn verify_email(
    ctx: TenantCtx,
    Json(req): Json<VerifyEmailRequest>,
) -> Result<Json<OkResponse>, ApiErr> {
    let token_hash = crypto::hash_token(&req.token);
    let conn = ctx.db.conn();
    let row = sq_query_row(
        &conn,
        db::tokens::verification_lookup(&token_hash, VERIFY_PURPOSE),
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
    )
    .map_err(ApiErr::from_db("verification lookup"))?
    .ok_or_else(|| ApiErr::bad_request("invalid or expired verification token"))?;

    let (token_id, user_id) = row;
    sq_execute(&conn, db::tokens::verification_mark_used(&token_id))
        .map_err(ApiErr::from_db("consume verification token"))?;
    sq_execute(&conn, db::users::set_email_verified(&user_id))
        .map_err(ApiErr::from_db("mark email verified"))?;

    Ok(Json(OkResponse { ok: true }))
}
