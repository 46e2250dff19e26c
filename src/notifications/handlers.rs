//! Notification endpoints. Marking read echoes a `notification_read` event
//! to the acting user's own channel so other open tabs stay in sync.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::middleware::Claims;
use crate::db;
use crate::error::ApiError;
use crate::realtime::events::ReadScope;
use crate::realtime::fanout;
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

/// GET /api/notifications
pub async fn list(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

    let db_pool = state.db.clone();
    let user_id = claims.sub.clone();
    let (notifications, unread) = tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        let list = db::notifications::list_for_user(&conn, &user_id, limit)?;
        let unread = db::notifications::unread_count(&conn, &user_id)?;
        Ok::<_, ApiError>((list, unread))
    })
    .await??;

    Ok(Json(json!({
        "success": true,
        "notifications": notifications,
        "unreadCount": unread,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    /// When omitted, every notification is marked read.
    #[serde(default)]
    pub notification_ids: Option<Vec<String>>,
}

/// POST /api/notifications/read
pub async fn mark_read(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<MarkReadRequest>,
) -> Result<Json<Value>, ApiError> {
    let db_pool = state.db.clone();
    let user_id = claims.sub.clone();
    let ids = body.notification_ids.clone();
    tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        match &ids {
            Some(ids) => db::notifications::mark_read(&conn, &user_id, ids),
            None => db::notifications::mark_all_read(&conn, &user_id),
        }
    })
    .await??;

    let (scope, ids) = match body.notification_ids {
        Some(ids) => (ReadScope::Specific, ids),
        None => (ReadScope::All, Vec::new()),
    };
    fanout::notifications_read(&state.dispatcher, &claims.sub, scope, ids);

    Ok(Json(json!({
        "success": true,
        "message": "Notifications marked as read"
    })))
}
