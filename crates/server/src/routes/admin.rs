//! HMAC-verified control-plane endpoints, called by the manager service.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use jolli_api::{crypto, BootstrapRequest, BootstrapResponse};

use crate::error::ApiErr;
use crate::tenancy::TenantRegistry;
use crate::AppConfig;

fn signed_headers(headers: &HeaderMap) -> Result<(u64, &str), ApiErr> {
    let timestamp = headers
        .get("x-jolli-timestamp")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| ApiErr::unauthorized("missing or malformed timestamp header"))?;
    let signature = headers
        .get("x-jolli-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiErr::unauthorized("missing signature header"))?;
    Ok((timestamp, signature))
}

/// POST /admin/bootstrap — provision a tenant.
///
/// Takes the raw body so the signature covers the exact bytes on the wire.
pub async fn bootstrap(
    State(registry): State<TenantRegistry>,
    State(config): State<AppConfig>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<BootstrapResponse>), ApiErr> {
    if config.manager_secret.is_empty() {
        return Err(ApiErr::forbidden("bootstrap is disabled"));
    }

    let (timestamp, signature) = signed_headers(&headers)?;
    crypto::verify_signed_request(
        &config.manager_secret,
        timestamp,
        &body,
        signature,
        crate::now_unix(),
        config.bootstrap_tolerance_secs,
    )?;

    let req: BootstrapRequest =
        serde_json::from_slice(&body).map_err(|_| ApiErr::bad_request("malformed JSON body"))?;

    let out = registry.provision(&req.slug, &req.name, &req.admin_email)?;
    Ok((
        StatusCode::CREATED,
        Json(BootstrapResponse {
            tenant_id: out.tenant_id,
            org_id: out.org_id,
            invitation_token: out.invitation_token,
        }),
    ))
}
