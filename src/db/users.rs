//! User and follow-graph queries.

use rusqlite::{params, Connection, OptionalExtension};

use super::models::{User, UserSummary};
use crate::error::ApiError;

pub fn create(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, ApiError> {
    let id = super::new_id();
    let now = super::now();

    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM users WHERE username = ?1 COLLATE NOCASE OR email = ?2 COLLATE NOCASE",
            params![username, email],
            |row| row.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Err(ApiError::Conflict(
            "username or email already exists".to_string(),
        ));
    }

    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, username, email, password_hash, now],
    )?;

    find_by_id(conn, &id)?.ok_or_else(|| ApiError::Internal("user vanished after insert".into()))
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<User>, ApiError> {
    let user = conn
        .query_row("SELECT * FROM users WHERE id = ?1", [id], User::from_row)
        .optional()?;
    Ok(user)
}

pub fn find_by_username(conn: &Connection, username: &str) -> Result<Option<User>, ApiError> {
    let user = conn
        .query_row(
            "SELECT * FROM users WHERE username = ?1 COLLATE NOCASE",
            [username],
            User::from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn find_by_username_or_email(
    conn: &Connection,
    username_or_email: &str,
) -> Result<Option<User>, ApiError> {
    let user = conn
        .query_row(
            "SELECT * FROM users
             WHERE username = ?1 COLLATE NOCASE OR email = ?1 COLLATE NOCASE",
            [username_or_email],
            User::from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn summary_of(conn: &Connection, id: &str) -> Result<UserSummary, ApiError> {
    find_by_id(conn, id)?
        .map(|u| u.summary())
        .ok_or(ApiError::NotFound("user"))
}

/// Resolve a list of (lowercased) usernames to user summaries. Names that do
/// not correspond to an account are dropped, not errors.
pub fn resolve_usernames(
    conn: &Connection,
    usernames: &[String],
) -> Result<Vec<UserSummary>, ApiError> {
    let mut found = Vec::new();
    for name in usernames {
        if let Some(user) = find_by_username(conn, name)? {
            found.push(user.summary());
        }
    }
    Ok(found)
}

/// Ids of every user following `user_id`.
pub fn find_followers_of(conn: &Connection, user_id: &str) -> Result<Vec<String>, ApiError> {
    let mut stmt =
        conn.prepare("SELECT follower_id FROM follows WHERE followee_id = ?1")?;
    let ids = stmt
        .query_map([user_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

pub fn is_following(
    conn: &Connection,
    follower_id: &str,
    followee_id: &str,
) -> Result<bool, ApiError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
            params![follower_id, followee_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn follow(conn: &Connection, follower_id: &str, followee_id: &str) -> Result<(), ApiError> {
    conn.execute(
        "INSERT OR IGNORE INTO follows (follower_id, followee_id, created_at) VALUES (?1, ?2, ?3)",
        params![follower_id, followee_id, super::now()],
    )?;
    Ok(())
}

pub fn unfollow(conn: &Connection, follower_id: &str, followee_id: &str) -> Result<(), ApiError> {
    conn.execute(
        "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
        params![follower_id, followee_id],
    )?;
    Ok(())
}

pub fn follower_count(conn: &Connection, user_id: &str) -> Result<i64, ApiError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM follows WHERE followee_id = ?1",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn following_count(conn: &Connection, user_id: &str) -> Result<i64, ApiError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM follows WHERE follower_id = ?1",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn tweet_count(conn: &Connection, user_id: &str) -> Result<i64, ApiError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM tweets WHERE author_id = ?1",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}
