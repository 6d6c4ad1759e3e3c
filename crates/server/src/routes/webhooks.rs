//! Inbound GitHub webhook deliveries.
//!
//! GitHub cannot set custom tenant headers, so deliveries resolve the tenant
//! from the host (or the single-tenant default) and look the integration up
//! by repository name. The raw body is needed for the HMAC check, so the
//! payload is deserialized manually after verification.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::Deserialize;
use std::sync::Arc;

use jolli_api::db;
use jolli_api::{crypto, OkResponse};

use crate::error::ApiErr;
use crate::events::EventHub;
use crate::storage::{sq_execute, sq_query_row};
use crate::tenancy::TenantCtx;

const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const EVENT_HEADER: &str = "x-github-event";

#[derive(Deserialize)]
struct PushPayload {
    repository: PayloadRepo,
    #[serde(rename = "ref", default)]
    git_ref: Option<String>,
}

#[derive(Deserialize)]
struct PayloadRepo {
    full_name: String,
}

struct IntegrationSecret {
    id: String,
    org_id: String,
    default_branch: String,
    webhook_secret: String,
    status: String,
}

/// POST /api/webhooks/github
pub async fn github(
    ctx: TenantCtx,
    State(hub): State<Arc<EventHub>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<OkResponse>, ApiErr> {
    let payload: PushPayload = serde_json::from_slice(&body)
        .map_err(|_| ApiErr::bad_request("unrecognized webhook payload"))?;
    let event = headers
        .get(EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("push")
        .to_string();
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiErr::unauthorized("missing webhook signature"))?
        .to_string();

    let integration = {
        let conn = ctx.db.conn();
        sq_query_row(
            &conn,
            db::integrations::get_by_repo_with_secret(&payload.repository.full_name),
            |row| {
                Ok(IntegrationSecret {
                    id: row.get(0)?,
                    org_id: row.get(1)?,
                    default_branch: row.get(2)?,
                    webhook_secret: row.get(3)?,
                    status: row.get(4)?,
                })
            },
        )
        .map_err(ApiErr::from_db("integration lookup"))?
        .ok_or_else(|| ApiErr::not_found("no integration for this repository"))?
    };

    // Signature first: a paused integration still authenticates its sender.
    crypto::verify_webhook_signature(&integration.webhook_secret, &body, &signature)?;

    if integration.status != "linked" {
        tracing::info!(
            "ignoring {event} for paused integration {}",
            payload.repository.full_name
        );
        return Ok(Json(OkResponse { ok: true }));
    }

    {
        let conn = ctx.db.conn();
        sq_execute(&conn, db::integrations::touch_event(&integration.id))
            .map_err(ApiErr::from_db("stamp integration"))?;
    }

    let announcement = serde_json::json!({
        "type": "webhook",
        "provider": "github",
        "event": event,
        "repo": payload.repository.full_name,
        "ref": payload.git_ref,
        "default_branch": integration.default_branch,
        "at": chrono::Utc::now().to_rfc3339(),
    });
    hub.publish(&EventHub::org_key(&integration.org_id), announcement.to_string());

    Ok(Json(OkResponse { ok: true }))
}
