//! Direct-message send path shared by the HTTP endpoint and the realtime
//! action handler: validate, persist, then fan out to both personal
//! channels. A failure anywhere aborts before any event is emitted.

use crate::db::{self, models::DmRecord};
use crate::error::ApiError;
use crate::realtime::fanout;
use crate::state::AppState;

pub async fn send_message(
    state: &AppState,
    sender_id: &str,
    to_user_id: &str,
    text: Option<String>,
    gif_url: Option<String>,
) -> Result<DmRecord, ApiError> {
    if to_user_id.is_empty() {
        return Err(ApiError::Validation("recipient is required".to_string()));
    }
    if to_user_id == sender_id {
        return Err(ApiError::Validation(
            "cannot send message to yourself".to_string(),
        ));
    }

    let text = text.unwrap_or_default().trim().to_string();
    let gif_url = gif_url.filter(|u| !u.trim().is_empty());
    if text.is_empty() && gif_url.is_none() {
        return Err(ApiError::Validation(
            "message must contain text or a gif".to_string(),
        ));
    }
    if text.chars().count() > 280 {
        return Err(ApiError::Validation(
            "message must be at most 280 characters".to_string(),
        ));
    }

    let db_pool = state.db.clone();
    let sender = sender_id.to_string();
    let recipient = to_user_id.to_string();
    let record = tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        if db::users::find_by_id(&conn, &recipient)?.is_none() {
            return Err(ApiError::NotFound("recipient"));
        }
        db::dm::create(&conn, &sender, &recipient, &text, gif_url.as_deref())
    })
    .await??;

    fanout::dm_message(&state.dispatcher, &record);

    tracing::debug!(
        message_id = %record.id,
        sender_id = %record.sender_id,
        receiver_id = %record.receiver_id,
        "direct message sent"
    );

    Ok(record)
}
