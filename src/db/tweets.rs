//! Tweet persistence: creation, engagement toggles, timeline reads.

use rusqlite::{params, Connection, OptionalExtension};

use super::models::{TweetRecord, UserSummary};
use crate::error::ApiError;

pub struct TweetRow {
    pub id: String,
    pub author_id: String,
    pub text: String,
    pub parent_id: Option<String>,
    pub created_at: String,
}

pub fn create(
    conn: &Connection,
    author_id: &str,
    text: &str,
    parent_id: Option<&str>,
) -> Result<TweetRow, ApiError> {
    let id = super::new_id();
    let now = super::now();
    conn.execute(
        "INSERT INTO tweets (id, author_id, text, parent_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, author_id, text, parent_id, now],
    )?;
    Ok(TweetRow {
        id,
        author_id: author_id.to_string(),
        text: text.to_string(),
        parent_id: parent_id.map(str::to_string),
        created_at: now,
    })
}

pub fn find_row(conn: &Connection, tweet_id: &str) -> Result<Option<TweetRow>, ApiError> {
    let row = conn
        .query_row(
            "SELECT id, author_id, text, parent_id, created_at FROM tweets WHERE id = ?1",
            [tweet_id],
            |row| {
                Ok(TweetRow {
                    id: row.get(0)?,
                    author_id: row.get(1)?,
                    text: row.get(2)?,
                    parent_id: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Load the client-facing record: author summary, counts, hashtags, poll.
pub fn load_record(conn: &Connection, tweet_id: &str) -> Result<TweetRecord, ApiError> {
    let (row, author) = conn
        .query_row(
            "SELECT t.id, t.text, t.parent_id, t.created_at,
                    u.id, u.username, u.display_name, u.avatar_url
             FROM tweets t JOIN users u ON u.id = t.author_id
             WHERE t.id = ?1",
            [tweet_id],
            |row| {
                Ok((
                    (
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                    ),
                    UserSummary {
                        id: row.get(4)?,
                        username: row.get(5)?,
                        display_name: row.get(6)?,
                        avatar_url: row.get(7)?,
                    },
                ))
            },
        )
        .optional()?
        .ok_or(ApiError::NotFound("tweet"))?;

    let (id, text, parent_id, created_at) = row;

    let like_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE tweet_id = ?1",
        [&id],
        |r| r.get(0),
    )?;
    let retweet_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM retweets WHERE tweet_id = ?1",
        [&id],
        |r| r.get(0),
    )?;
    let reply_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tweets WHERE parent_id = ?1",
        [&id],
        |r| r.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT h.tag FROM hashtags h
         JOIN tweet_tags tt ON tt.hashtag_id = h.id
         WHERE tt.tweet_id = ?1 ORDER BY h.tag",
    )?;
    let hashtags = stmt
        .query_map([&id], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let poll = super::polls::find_by_tweet(conn, &id)?;

    Ok(TweetRecord {
        id,
        text,
        author,
        parent_id,
        like_count,
        retweet_count,
        reply_count,
        hashtags,
        poll,
        created_at,
    })
}

/// Global timeline, newest first. `cursor` is the created_at of the last
/// tweet of the previous page.
pub fn timeline(
    conn: &Connection,
    limit: u32,
    cursor: Option<&str>,
) -> Result<Vec<TweetRecord>, ApiError> {
    let mut ids: Vec<String> = Vec::new();
    match cursor {
        Some(before) => {
            let mut stmt = conn.prepare(
                "SELECT id FROM tweets WHERE created_at < ?1
                 ORDER BY created_at DESC LIMIT ?2",
            )?;
            for id in stmt.query_map(params![before, limit], |r| r.get::<_, String>(0))? {
                ids.push(id?);
            }
        }
        None => {
            let mut stmt =
                conn.prepare("SELECT id FROM tweets ORDER BY created_at DESC LIMIT ?1")?;
            for id in stmt.query_map([limit], |r| r.get::<_, String>(0))? {
                ids.push(id?);
            }
        }
    }

    ids.iter().map(|id| load_record(conn, id)).collect()
}

/// Toggle a like. Returns (is_liked, like_count) after the toggle.
pub fn toggle_like(
    conn: &Connection,
    user_id: &str,
    tweet_id: &str,
) -> Result<(bool, i64), ApiError> {
    let removed = conn.execute(
        "DELETE FROM likes WHERE user_id = ?1 AND tweet_id = ?2",
        params![user_id, tweet_id],
    )?;
    let is_liked = if removed == 0 {
        conn.execute(
            "INSERT INTO likes (user_id, tweet_id, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, tweet_id, super::now()],
        )?;
        true
    } else {
        false
    };
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE tweet_id = ?1",
        [tweet_id],
        |r| r.get(0),
    )?;
    Ok((is_liked, count))
}

/// Toggle a retweet. Returns (is_retweeted, retweet_count) after the toggle.
pub fn toggle_retweet(
    conn: &Connection,
    user_id: &str,
    tweet_id: &str,
) -> Result<(bool, i64), ApiError> {
    let removed = conn.execute(
        "DELETE FROM retweets WHERE user_id = ?1 AND tweet_id = ?2",
        params![user_id, tweet_id],
    )?;
    let is_retweeted = if removed == 0 {
        conn.execute(
            "INSERT INTO retweets (user_id, tweet_id, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, tweet_id, super::now()],
        )?;
        true
    } else {
        false
    };
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM retweets WHERE tweet_id = ?1",
        [tweet_id],
        |r| r.get(0),
    )?;
    Ok((is_retweeted, count))
}

/// Upsert hashtags (case-insensitive) and attach them to a tweet.
pub fn attach_hashtags(
    conn: &Connection,
    tweet_id: &str,
    tags: &[String],
) -> Result<(), ApiError> {
    for tag in tags {
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM hashtags WHERE tag = ?1 COLLATE NOCASE",
                [tag],
                |r| r.get(0),
            )
            .optional()?;
        let hashtag_id = match existing {
            Some(id) => id,
            None => {
                let id = super::new_id();
                conn.execute(
                    "INSERT INTO hashtags (id, tag) VALUES (?1, ?2)",
                    params![id, tag],
                )?;
                id
            }
        };
        conn.execute(
            "INSERT OR IGNORE INTO tweet_tags (tweet_id, hashtag_id) VALUES (?1, ?2)",
            params![tweet_id, hashtag_id],
        )?;
    }
    Ok(())
}
