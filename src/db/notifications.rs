//! Notification persistence.

use rusqlite::{params, Connection};

use super::models::{NotificationKind, NotificationRecord, UserSummary};
use crate::error::ApiError;

pub fn create(
    conn: &Connection,
    recipient_id: &str,
    kind: NotificationKind,
    source_user_id: &str,
    source_tweet_id: Option<&str>,
) -> Result<NotificationRecord, ApiError> {
    let id = super::new_id();
    let now = super::now();
    conn.execute(
        "INSERT INTO notifications (id, user_id, kind, source_user_id, source_tweet_id, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
        params![id, recipient_id, kind.as_str(), source_user_id, source_tweet_id, now],
    )?;

    let source_user = super::users::summary_of(conn, source_user_id)?;
    Ok(NotificationRecord {
        id,
        user_id: recipient_id.to_string(),
        kind,
        source_user,
        source_tweet_id: source_tweet_id.map(str::to_string),
        is_read: false,
        created_at: now,
    })
}

/// Notifications for a user, newest first.
pub fn list_for_user(
    conn: &Connection,
    user_id: &str,
    limit: u32,
) -> Result<Vec<NotificationRecord>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT n.id, n.kind, n.source_tweet_id, n.is_read, n.created_at,
                u.id, u.username, u.display_name, u.avatar_url
         FROM notifications n JOIN users u ON u.id = n.source_user_id
         WHERE n.user_id = ?1
         ORDER BY n.created_at DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![user_id, limit], |row| {
        let kind_raw: String = row.get(1)?;
        Ok((
            row.get::<_, String>(0)?,
            kind_raw,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, bool>(3)?,
            row.get::<_, String>(4)?,
            UserSummary {
                id: row.get(5)?,
                username: row.get(6)?,
                display_name: row.get(7)?,
                avatar_url: row.get(8)?,
            },
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (id, kind_raw, source_tweet_id, is_read, created_at, source_user) = row?;
        let kind = NotificationKind::from_str(&kind_raw)
            .ok_or_else(|| ApiError::Internal(format!("unknown notification kind {kind_raw}")))?;
        records.push(NotificationRecord {
            id,
            user_id: user_id.to_string(),
            kind,
            source_user,
            source_tweet_id,
            is_read,
            created_at,
        });
    }
    Ok(records)
}

pub fn unread_count(conn: &Connection, user_id: &str) -> Result<i64, ApiError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
        [user_id],
        |r| r.get(0),
    )?;
    Ok(count)
}

/// Mark all of a user's notifications read.
pub fn mark_all_read(conn: &Connection, user_id: &str) -> Result<(), ApiError> {
    conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
        [user_id],
    )?;
    Ok(())
}

/// Mark specific notifications read. Ids not owned by the user are ignored.
pub fn mark_read(conn: &Connection, user_id: &str, ids: &[String]) -> Result<(), ApiError> {
    for id in ids {
        conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
    }
    Ok(())
}
