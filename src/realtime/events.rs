//! Wire protocol for the realtime channel: JSON text frames shaped
//! `{"event": <name>, "data": {...}}` in both directions.

use serde::{Deserialize, Serialize};

use crate::db::models::{DmRecord, NotificationRecord, PollRecord, TweetRecord};

/// Events pushed from the server to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    NewTweet(TweetRecord),
    Notification(NotificationRecord),
    Dm(DmRecord),
    #[serde(rename_all = "camelCase")]
    MessagesRead {
        read_by: String,
        conversation_with: String,
    },
    #[serde(rename_all = "camelCase")]
    MessageDeleted {
        message_id: String,
        sender_id: String,
        receiver_id: String,
        deleted_at: String,
    },
    #[serde(rename_all = "camelCase")]
    NotificationRead {
        scope: ReadScope,
        notification_ids: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    TypingStart { user_id: String, username: String },
    #[serde(rename_all = "camelCase")]
    TypingStop { user_id: String, username: String },
    #[serde(rename_all = "camelCase")]
    OnlineUsers { user_ids: Vec<String> },
    #[serde(rename_all = "camelCase")]
    UserOnline { user_id: String, username: String },
    #[serde(rename_all = "camelCase")]
    UserOffline { user_id: String, username: String },
    #[serde(rename_all = "camelCase")]
    PollUpdate { tweet_id: String, poll: PollRecord },
    /// Scoped error for a failed realtime action; only ever delivered to the
    /// connection that originated the action.
    ActionError { message: String },
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadScope {
    All,
    Specific,
}

/// Actions a connected client may originate over the socket itself.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    SendDm {
        to_user_id: String,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        gif_url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TypingStart { to_user_id: String },
    #[serde(rename_all = "camelCase")]
    TypingStop { to_user_id: String },
    #[serde(rename_all = "camelCase")]
    PollVote { poll_id: String, option_id: String },
    RequestOnlineUsers {},
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_event_wire_shape() {
        let event = ServerEvent::TypingStart {
            user_id: "u1".into(),
            username: "alice".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "typing_start");
        assert_eq!(value["data"]["userId"], "u1");
        assert_eq!(value["data"]["username"], "alice");
    }

    #[test]
    fn client_event_parses_camel_case_payload() {
        let frame = r#"{"event":"send_dm","data":{"toUserId":"u2","text":"hi"}}"#;
        match serde_json::from_str::<ClientEvent>(frame).unwrap() {
            ClientEvent::SendDm {
                to_user_id,
                text,
                gif_url,
            } => {
                assert_eq!(to_user_id, "u2");
                assert_eq!(text.as_deref(), Some("hi"));
                assert!(gif_url.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn request_online_users_parses_with_empty_data() {
        let frame = r#"{"event":"request_online_users","data":{}}"#;
        assert!(matches!(
            serde_json::from_str::<ClientEvent>(frame).unwrap(),
            ClientEvent::RequestOnlineUsers {}
        ));
    }

    #[test]
    fn unknown_event_is_an_error() {
        let frame = r#"{"event":"shutdown","data":{}}"#;
        assert!(serde_json::from_str::<ClientEvent>(frame).is_err());
    }
}
