use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Full user row. Never serialized to clients — see UserSummary.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: String,
}

impl User {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get("id")?,
            username: row.get("username")?,
            email: row.get("email")?,
            password_hash: row.get("password_hash")?,
            display_name: row.get("display_name")?,
            avatar_url: row.get("avatar_url")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// The user shape embedded in tweets, notifications, and messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Like,
    Retweet,
    Reply,
    Mention,
    Follow,
    PollVote,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "LIKE",
            NotificationKind::Retweet => "RETWEET",
            NotificationKind::Reply => "REPLY",
            NotificationKind::Mention => "MENTION",
            NotificationKind::Follow => "FOLLOW",
            NotificationKind::PollVote => "POLL_VOTE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "LIKE" => Some(NotificationKind::Like),
            "RETWEET" => Some(NotificationKind::Retweet),
            "REPLY" => Some(NotificationKind::Reply),
            "MENTION" => Some(NotificationKind::Mention),
            "FOLLOW" => Some(NotificationKind::Follow),
            "POLL_VOTE" => Some(NotificationKind::PollVote),
            _ => None,
        }
    }
}

/// Persisted notification as delivered over the wire and the HTTP API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: String,
    /// Recipient of the notification.
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub source_user: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_tweet_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

/// Tweet as delivered to clients: author joined, engagement counts, and the
/// poll when one is attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetRecord {
    pub id: String,
    pub text: String,
    pub author: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub like_count: i64,
    pub retweet_count: i64,
    pub reply_count: i64,
    pub hashtags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<PollRecord>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollRecord {
    pub id: String,
    pub tweet_id: String,
    pub expires_at: String,
    pub options: Vec<PollOptionRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOptionRecord {
    pub id: String,
    pub text: String,
    pub vote_count: i64,
    pub position: i64,
}

/// Direct message as echoed to both conversation parties.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DmRecord {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub sender: UserSummary,
    pub receiver: UserSummary,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gif_url: Option<String>,
    pub status: String,
    pub created_at: String,
}
