//! REST endpoints for direct messages. The send path delegates to the same
//! service the realtime handler uses, so both entry points share one set of
//! validation and fan-out rules.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::middleware::Claims;
use crate::db;
use crate::error::ApiError;
use crate::realtime::fanout;
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendDmRequest {
    pub to_user_id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub gif_url: Option<String>,
}

/// POST /api/dm/send
pub async fn send(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<SendDmRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let message = crate::dm::service::send_message(
        &state,
        &claims.sub,
        &body.to_user_id,
        body.text,
        body.gif_url,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": message })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// The other side of the conversation.
    pub with: String,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

/// GET /api/dm/history?with=<userId>&limit=&cursor=
pub async fn history(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

    let db_pool = state.db.clone();
    let user_id = claims.sub.clone();
    let other_id = query.with.clone();
    let cursor = query.cursor.clone();
    let (messages, other_user) = tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        let other_user = db::users::find_by_id(&conn, &other_id)?
            .map(|u| u.summary())
            .ok_or(ApiError::NotFound("user"))?;
        let messages = db::dm::history(&conn, &user_id, &other_id, limit, cursor.as_deref())?;
        Ok::<_, ApiError>((messages, other_user))
    })
    .await??;

    let next_cursor = if messages.len() as u32 == limit {
        messages.first().map(|m| m.created_at.clone())
    } else {
        None
    };

    Ok(Json(json!({
        "success": true,
        "messages": messages,
        "nextCursor": next_cursor,
        "otherUser": other_user,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub from_user_id: String,
}

/// POST /api/dm/mark-read
/// Marks every unread message from the given user as read and emits a read
/// receipt to the original sender's channel.
pub async fn mark_read(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<MarkReadRequest>,
) -> Result<Json<Value>, ApiError> {
    let db_pool = state.db.clone();
    let user_id = claims.sub.clone();
    let from_user_id = body.from_user_id.clone();
    tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        db::dm::mark_read(&conn, &user_id, &from_user_id)
    })
    .await??;

    fanout::dm_read(&state.dispatcher, &body.from_user_id, &claims.sub);

    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/dm/{message_id}
pub async fn delete(
    State(state): State<AppState>,
    claims: Claims,
    Path(message_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let db_pool = state.db.clone();
    let user_id = claims.sub.clone();
    let id = message_id.clone();
    let deleted = tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        db::dm::soft_delete(&conn, &id, &user_id)
    })
    .await??;

    fanout::dm_deleted(
        &state.dispatcher,
        &deleted.message_id,
        &deleted.sender_id,
        &deleted.receiver_id,
        &deleted.deleted_at,
    );

    Ok(Json(json!({
        "success": true,
        "message": "Message deleted successfully"
    })))
}

/// GET /api/dm/unread
pub async fn unread(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Value>, ApiError> {
    let db_pool = state.db.clone();
    let user_id = claims.sub.clone();
    let count = tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        db::dm::unread_count(&conn, &user_id)
    })
    .await??;

    Ok(Json(json!({ "success": true, "unreadCount": count })))
}
