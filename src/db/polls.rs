//! Poll storage. The one-vote-per-user-per-poll guarantee lives in the
//! poll_votes primary key; `record_vote` surfaces it as a Conflict.

use rusqlite::{params, Connection, OptionalExtension};

use super::models::{PollOptionRecord, PollRecord};
use crate::error::ApiError;

pub fn create(
    conn: &Connection,
    tweet_id: &str,
    options: &[String],
    duration_days: i64,
) -> Result<PollRecord, ApiError> {
    let id = super::new_id();
    let expires_at = (chrono::Utc::now() + chrono::Duration::days(duration_days)).to_rfc3339();
    conn.execute(
        "INSERT INTO polls (id, tweet_id, expires_at) VALUES (?1, ?2, ?3)",
        params![id, tweet_id, expires_at],
    )?;
    for (position, text) in options.iter().enumerate() {
        conn.execute(
            "INSERT INTO poll_options (id, poll_id, text, vote_count, position)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![super::new_id(), id, text, position as i64],
        )?;
    }
    load(conn, &id)
}

pub fn load(conn: &Connection, poll_id: &str) -> Result<PollRecord, ApiError> {
    let (tweet_id, expires_at) = conn
        .query_row(
            "SELECT tweet_id, expires_at FROM polls WHERE id = ?1",
            [poll_id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?
        .ok_or(ApiError::NotFound("poll"))?;

    let mut stmt = conn.prepare(
        "SELECT id, text, vote_count, position FROM poll_options
         WHERE poll_id = ?1 ORDER BY position",
    )?;
    let options = stmt
        .query_map([poll_id], |row| {
            Ok(PollOptionRecord {
                id: row.get(0)?,
                text: row.get(1)?,
                vote_count: row.get(2)?,
                position: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PollRecord {
        id: poll_id.to_string(),
        tweet_id,
        expires_at,
        options,
    })
}

pub fn find_by_tweet(conn: &Connection, tweet_id: &str) -> Result<Option<PollRecord>, ApiError> {
    let poll_id: Option<String> = conn
        .query_row("SELECT id FROM polls WHERE tweet_id = ?1", [tweet_id], |r| {
            r.get(0)
        })
        .optional()?;
    match poll_id {
        Some(id) => Ok(Some(load(conn, &id)?)),
        None => Ok(None),
    }
}

/// Validate and record a vote, incrementing the option tally in the same
/// transaction. State machine per (poll, user): NotVoted -> Voted, terminal.
pub fn record_vote(
    conn: &mut Connection,
    poll_id: &str,
    option_id: &str,
    user_id: &str,
) -> Result<PollRecord, ApiError> {
    let expires_at: String = conn
        .query_row("SELECT expires_at FROM polls WHERE id = ?1", [poll_id], |r| {
            r.get(0)
        })
        .optional()?
        .ok_or(ApiError::NotFound("poll"))?;

    if expires_at <= super::now() {
        return Err(ApiError::NotFound("poll"));
    }

    let option_belongs: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM poll_options WHERE id = ?1 AND poll_id = ?2",
            params![option_id, poll_id],
            |r| r.get(0),
        )
        .optional()?;
    if option_belongs.is_none() {
        return Err(ApiError::NotFound("poll option"));
    }

    let already_voted: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM poll_votes WHERE user_id = ?1 AND poll_id = ?2",
            params![user_id, poll_id],
            |r| r.get(0),
        )
        .optional()?;
    if already_voted.is_some() {
        return Err(ApiError::Conflict(
            "you have already voted in this poll".to_string(),
        ));
    }

    let tx = conn.transaction()?;
    let inserted = tx.execute(
        "INSERT OR IGNORE INTO poll_votes (user_id, poll_id, option_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![user_id, poll_id, option_id, super::now()],
    )?;
    if inserted == 0 {
        // Lost a race with a concurrent vote by the same user.
        return Err(ApiError::Conflict(
            "you have already voted in this poll".to_string(),
        ));
    }
    tx.execute(
        "UPDATE poll_options SET vote_count = vote_count + 1 WHERE id = ?1",
        [option_id],
    )?;
    tx.commit()?;

    load(conn, poll_id)
}
