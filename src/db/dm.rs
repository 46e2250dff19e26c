//! Direct message persistence.

use rusqlite::{params, Connection, OptionalExtension};

use super::models::{DmRecord, UserSummary};
use crate::error::ApiError;

fn user_columns(prefix: &str) -> String {
    format!(
        "{p}.id, {p}.username, {p}.display_name, {p}.avatar_url",
        p = prefix
    )
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DmRecord> {
    Ok(DmRecord {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        text: row.get(3)?,
        gif_url: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        sender: UserSummary {
            id: row.get(7)?,
            username: row.get(8)?,
            display_name: row.get(9)?,
            avatar_url: row.get(10)?,
        },
        receiver: UserSummary {
            id: row.get(11)?,
            username: row.get(12)?,
            display_name: row.get(13)?,
            avatar_url: row.get(14)?,
        },
    })
}

fn select_record(where_clause: &str) -> String {
    format!(
        "SELECT m.id, m.sender_id, m.receiver_id, m.text, m.gif_url, m.status, m.created_at,
                {s}, {r}
         FROM direct_messages m
         JOIN users s ON s.id = m.sender_id
         JOIN users r ON r.id = m.receiver_id
         {w}",
        s = user_columns("s"),
        r = user_columns("r"),
        w = where_clause
    )
}

pub fn create(
    conn: &Connection,
    sender_id: &str,
    receiver_id: &str,
    text: &str,
    gif_url: Option<&str>,
) -> Result<DmRecord, ApiError> {
    let id = super::new_id();
    conn.execute(
        "INSERT INTO direct_messages (id, sender_id, receiver_id, text, gif_url, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'DELIVERED', ?6)",
        params![id, sender_id, receiver_id, text, gif_url, super::now()],
    )?;
    find(conn, &id)?.ok_or_else(|| ApiError::Internal("message vanished after insert".into()))
}

pub fn find(conn: &Connection, message_id: &str) -> Result<Option<DmRecord>, ApiError> {
    let record = conn
        .query_row(
            &select_record("WHERE m.id = ?1"),
            [message_id],
            record_from_row,
        )
        .optional()?;
    Ok(record)
}

/// Conversation history between two users, oldest first within the page.
pub fn history(
    conn: &Connection,
    user_id: &str,
    other_user_id: &str,
    limit: u32,
    cursor: Option<&str>,
) -> Result<Vec<DmRecord>, ApiError> {
    let base = "WHERE ((m.sender_id = ?1 AND m.receiver_id = ?2)
                   OR (m.sender_id = ?2 AND m.receiver_id = ?1))
                  AND m.is_deleted = 0";
    let mut records: Vec<DmRecord> = match cursor {
        Some(before) => {
            let clause =
                format!("{base} AND m.created_at < ?3 ORDER BY m.created_at DESC LIMIT ?4");
            let mut stmt = conn.prepare(&select_record(&clause))?;
            let rows = stmt
                .query_map(
                    params![user_id, other_user_id, before, limit],
                    record_from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let clause = format!("{base} ORDER BY m.created_at DESC LIMIT ?3");
            let mut stmt = conn.prepare(&select_record(&clause))?;
            let rows = stmt
                .query_map(params![user_id, other_user_id, limit], record_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };
    records.reverse();
    Ok(records)
}

/// Mark every unread message from `from_user_id` to `user_id` as read.
pub fn mark_read(conn: &Connection, user_id: &str, from_user_id: &str) -> Result<(), ApiError> {
    conn.execute(
        "UPDATE direct_messages
         SET status = 'READ', read_at = ?1
         WHERE sender_id = ?2 AND receiver_id = ?3 AND status != 'READ' AND is_deleted = 0",
        params![super::now(), from_user_id, user_id],
    )?;
    Ok(())
}

pub struct DeletedMessage {
    pub message_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub deleted_at: String,
}

/// Soft-delete a message. Only the sender may delete; deleting twice is a
/// conflict.
pub fn soft_delete(
    conn: &Connection,
    message_id: &str,
    user_id: &str,
) -> Result<DeletedMessage, ApiError> {
    let row: Option<(String, String, bool)> = conn
        .query_row(
            "SELECT sender_id, receiver_id, is_deleted FROM direct_messages WHERE id = ?1",
            [message_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    let (sender_id, receiver_id, is_deleted) = row.ok_or(ApiError::NotFound("message"))?;

    if sender_id != user_id {
        return Err(ApiError::Validation(
            "you can only delete your own messages".to_string(),
        ));
    }
    if is_deleted {
        return Err(ApiError::Conflict("message is already deleted".to_string()));
    }

    let deleted_at = super::now();
    conn.execute(
        "UPDATE direct_messages SET is_deleted = 1, deleted_at = ?1 WHERE id = ?2",
        params![deleted_at, message_id],
    )?;

    Ok(DeletedMessage {
        message_id: message_id.to_string(),
        sender_id,
        receiver_id,
        deleted_at,
    })
}

/// Unread received messages for a user.
pub fn unread_count(conn: &Connection, user_id: &str) -> Result<i64, ApiError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM direct_messages
         WHERE receiver_id = ?1 AND read_at IS NULL AND is_deleted = 0",
        [user_id],
        |r| r.get(0),
    )?;
    Ok(count)
}
