//! Inbound frame dispatch: the actions a client may originate over its own
//! connection. Validation failures and data-layer errors surface as an
//! `action_error` event to the originating connection only — other clients
//! observe nothing for a failed action.

use axum::extract::ws::Message;

use crate::realtime::events::{ClientEvent, ServerEvent};
use crate::realtime::fanout;
use crate::realtime::registry::ConnectionSender;
use crate::state::AppState;
use crate::ws::handler::VerifiedUser;

/// Encode and push one event to a single connection.
pub fn send_event(tx: &ConnectionSender, event: &ServerEvent) {
    match serde_json::to_string(event) {
        Ok(text) => {
            let _ = tx.send(Message::Text(text.into()));
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to encode server event");
        }
    }
}

fn send_action_error(tx: &ConnectionSender, message: String) {
    send_event(tx, &ServerEvent::ActionError { message });
}

/// Handle one inbound JSON text frame.
pub async fn handle_text_frame(
    text: &str,
    tx: &ConnectionSender,
    state: &AppState,
    user: &VerifiedUser,
) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(
                user_id = %user.id,
                error = %e,
                "Undecodable client frame"
            );
            send_action_error(tx, "invalid message".to_string());
            return;
        }
    };

    match event {
        ClientEvent::SendDm {
            to_user_id,
            text,
            gif_url,
        } => {
            if let Err(e) =
                crate::dm::service::send_message(state, &user.id, &to_user_id, text, gif_url).await
            {
                send_action_error(tx, e.client_message());
            }
        }
        ClientEvent::TypingStart { to_user_id } => {
            if to_user_id.is_empty() {
                send_action_error(tx, "recipient is required".to_string());
            } else {
                fanout::typing(&state.dispatcher, &to_user_id, &user.id, &user.username, true);
            }
        }
        ClientEvent::TypingStop { to_user_id } => {
            if to_user_id.is_empty() {
                send_action_error(tx, "recipient is required".to_string());
            } else {
                fanout::typing(&state.dispatcher, &to_user_id, &user.id, &user.username, false);
            }
        }
        ClientEvent::PollVote { poll_id, option_id } => {
            if let Err(e) =
                crate::tweets::polls::cast_vote(state, &user.id, &poll_id, &option_id).await
            {
                send_action_error(tx, e.client_message());
            }
        }
        ClientEvent::RequestOnlineUsers {} => {
            send_event(
                tx,
                &ServerEvent::OnlineUsers {
                    user_ids: state.presence.list_online(),
                },
            );
        }
    }
}
