//! Org chat: persisted messages fanned out over the org SSE stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use jolli_api::db;
use jolli_api::{
    ChatMessageResponse, ListChatMessagesResponse, ListChatQuery, PostChatMessageRequest,
};

use crate::error::ApiErr;
use crate::events::EventHub;
use crate::routes::auth::{require_permission, AuthUser};
use crate::storage::{sq_execute, sq_query_map};
use crate::tenancy::TenantCtx;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;
const MAX_BODY_CHARS: usize = 4000;

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessageResponse> {
    Ok(ChatMessageResponse {
        id: row.get(0)?,
        org_id: row.get(1)?,
        user_id: row.get(2)?,
        display_name: row.get(3)?,
        body: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// POST /api/chat/messages
pub async fn post_message(
    ctx: TenantCtx,
    user: AuthUser,
    State(hub): State<Arc<EventHub>>,
    Json(req): Json<PostChatMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessageResponse>), ApiErr> {
    require_permission(&ctx, &user.user_id, "docs.read")?;
    let body = req.body.trim().to_string();
    if body.is_empty() || body.chars().count() > MAX_BODY_CHARS {
        return Err(ApiErr::bad_request("message must be 1-4000 characters"));
    }

    let id = Uuid::new_v4().to_string();
    let message = {
        let conn = ctx.db.conn();
        sq_execute(&conn, db::chat::insert(&id, &ctx.org.id, &user.user_id, &body))
            .map_err(ApiErr::from_db("store message"))?;
        // Read back through the join so display_name matches what recent() serves.
        sq_query_map(&conn, db::chat::recent(&ctx.org.id, 1), message_from_row)
            .map_err(ApiErr::from_db("read message"))?
            .into_iter()
            .find(|m| m.id == id)
            .ok_or_else(|| ApiErr::internal("message vanished after insert"))?
    };

    let announcement = serde_json::json!({ "type": "chat", "message": message });
    hub.publish(&EventHub::org_key(&ctx.org.id), announcement.to_string());

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/chat/messages — most recent messages, newest first.
pub async fn list_messages(
    ctx: TenantCtx,
    user: AuthUser,
    Query(query): Query<ListChatQuery>,
) -> Result<Json<ListChatMessagesResponse>, ApiErr> {
    require_permission(&ctx, &user.user_id, "docs.read")?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as u64;

    let conn = ctx.db.conn();
    let messages = sq_query_map(&conn, db::chat::recent(&ctx.org.id, limit), message_from_row)
        .map_err(ApiErr::from_db("list messages"))?;
    Ok(Json(ListChatMessagesResponse { messages }))
}

/// GET /api/chat/events — the org activity SSE stream (chat plus webhooks).
pub async fn org_events(
    ctx: TenantCtx,
    user: AuthUser,
    State(hub): State<Arc<EventHub>>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, ApiErr> {
    require_permission(&ctx, &user.user_id, "docs.read")?;

    let (replay, rx) = hub.subscribe(&EventHub::org_key(&ctx.org.id));
    let stream = tokio_stream::iter(replay)
        .chain(BroadcastStream::new(rx).map_while(|item| item.ok()))
        .map(|data| Ok(Event::default().data(data)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
