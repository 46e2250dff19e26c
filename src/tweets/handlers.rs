//! Tweet endpoints. Each mutating handler persists through the data layer,
//! then hands the result to the fan-out rules.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::middleware::Claims;
use crate::db::{self, models::NotificationKind, models::NotificationRecord, models::TweetRecord};
use crate::error::ApiError;
use crate::realtime::fanout;
use crate::state::AppState;
use crate::tweets::text::{extract_hashtags, extract_mentions};

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTweetRequest {
    pub text: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub poll_options: Option<Vec<String>>,
    /// Poll duration in days, 1-7.
    #[serde(default)]
    pub poll_duration: Option<i64>,
}

struct CreatedTweet {
    record: TweetRecord,
    follower_ids: Vec<String>,
    /// (actor_id is the author for all of these)
    notifications: Vec<NotificationRecord>,
}

/// POST /api/tweets
pub async fn create(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<CreateTweetRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let text = body.text.trim().to_string();
    if text.is_empty() || text.chars().count() > 280 {
        return Err(ApiError::Validation(
            "tweet text must be 1-280 characters".to_string(),
        ));
    }
    if let Some(options) = &body.poll_options {
        if !(2..=4).contains(&options.len()) {
            return Err(ApiError::Validation(
                "a poll needs 2-4 options".to_string(),
            ));
        }
        if options.iter().any(|o| o.trim().is_empty()) {
            return Err(ApiError::Validation(
                "poll options must not be empty".to_string(),
            ));
        }
    }
    let poll_duration = body.poll_duration.unwrap_or(1);
    if !(1..=7).contains(&poll_duration) {
        return Err(ApiError::Validation(
            "poll duration must be 1-7 days".to_string(),
        ));
    }

    let db_pool = state.db.clone();
    let author_id = claims.sub.clone();
    let parent_id = body.parent_id.clone();
    let poll_options = body.poll_options.clone();
    let created = tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;

        let parent = match parent_id.as_deref() {
            Some(pid) => Some(db::tweets::find_row(&conn, pid)?.ok_or(ApiError::NotFound("tweet"))?),
            None => None,
        };

        let row = db::tweets::create(&conn, &author_id, &text, parent_id.as_deref())?;

        let mut notifications = Vec::new();

        // Reply notification for the parent author, unless replying to self.
        if let Some(parent) = &parent {
            if parent.author_id != author_id {
                notifications.push(db::notifications::create(
                    &conn,
                    &parent.author_id,
                    NotificationKind::Reply,
                    &author_id,
                    Some(&row.id),
                )?);
            }
        }

        // Mention notifications for every mentioned name that resolves to an
        // account. Unresolvable mentions are dropped silently.
        let mentioned = db::users::resolve_usernames(&conn, &extract_mentions(&text))?;
        for user in mentioned {
            if user.id == author_id {
                continue;
            }
            notifications.push(db::notifications::create(
                &conn,
                &user.id,
                NotificationKind::Mention,
                &author_id,
                Some(&row.id),
            )?);
        }

        db::tweets::attach_hashtags(&conn, &row.id, &extract_hashtags(&text))?;

        if let Some(options) = &poll_options {
            db::polls::create(&conn, &row.id, options, poll_duration)?;
        }

        let record = db::tweets::load_record(&conn, &row.id)?;
        let follower_ids = db::users::find_followers_of(&conn, &author_id)?;

        Ok::<_, ApiError>(CreatedTweet {
            record,
            follower_ids,
            notifications,
        })
    })
    .await??;

    for record in &created.notifications {
        fanout::notification(&state.dispatcher, &claims.sub, record);
    }
    fanout::tweet_created(&state.dispatcher, &created.follower_ids, &created.record);

    tracing::info!(
        tweet_id = %created.record.id,
        author_id = %claims.sub,
        followers = created.follower_ids.len(),
        "tweet created"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "tweet": created.record })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

/// GET /api/tweets — global timeline, newest first.
pub async fn timeline(
    State(state): State<AppState>,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let cursor = query.cursor.clone();

    let db_pool = state.db.clone();
    let tweets = tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        db::tweets::timeline(&conn, limit, cursor.as_deref())
    })
    .await??;

    let next_cursor = if tweets.len() as u32 == limit {
        tweets.last().map(|t| t.created_at.clone())
    } else {
        None
    };

    Ok(Json(json!({
        "success": true,
        "tweets": tweets,
        "nextCursor": next_cursor,
    })))
}

/// GET /api/tweets/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(tweet_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let db_pool = state.db.clone();
    let tweet = tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        db::tweets::load_record(&conn, &tweet_id)
    })
    .await??;

    Ok(Json(json!({ "success": true, "tweet": tweet })))
}

/// POST /api/tweets/{id}/like — toggle.
pub async fn like(
    State(state): State<AppState>,
    claims: Claims,
    Path(tweet_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let db_pool = state.db.clone();
    let user_id = claims.sub.clone();
    let tid = tweet_id.clone();
    let (is_liked, like_count, notification) = tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        let tweet = db::tweets::find_row(&conn, &tid)?.ok_or(ApiError::NotFound("tweet"))?;
        let (is_liked, like_count) = db::tweets::toggle_like(&conn, &user_id, &tid)?;
        // Notify the author on like only, never on unlike or self-like.
        let notification = if is_liked && tweet.author_id != user_id {
            Some(db::notifications::create(
                &conn,
                &tweet.author_id,
                NotificationKind::Like,
                &user_id,
                Some(&tid),
            )?)
        } else {
            None
        };
        Ok::<_, ApiError>((is_liked, like_count, notification))
    })
    .await??;

    if let Some(record) = &notification {
        fanout::notification(&state.dispatcher, &claims.sub, record);
    }

    Ok(Json(json!({
        "success": true,
        "isLiked": is_liked,
        "likeCount": like_count,
    })))
}

/// POST /api/tweets/{id}/retweet — toggle.
pub async fn retweet(
    State(state): State<AppState>,
    claims: Claims,
    Path(tweet_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let db_pool = state.db.clone();
    let user_id = claims.sub.clone();
    let tid = tweet_id.clone();
    let (is_retweeted, retweet_count, notification) = tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        let tweet = db::tweets::find_row(&conn, &tid)?.ok_or(ApiError::NotFound("tweet"))?;
        let (is_retweeted, retweet_count) = db::tweets::toggle_retweet(&conn, &user_id, &tid)?;
        let notification = if is_retweeted && tweet.author_id != user_id {
            Some(db::notifications::create(
                &conn,
                &tweet.author_id,
                NotificationKind::Retweet,
                &user_id,
                Some(&tid),
            )?)
        } else {
            None
        };
        Ok::<_, ApiError>((is_retweeted, retweet_count, notification))
    })
    .await??;

    if let Some(record) = &notification {
        fanout::notification(&state.dispatcher, &claims.sub, record);
    }

    Ok(Json(json!({
        "success": true,
        "isRetweeted": is_retweeted,
        "retweetCount": retweet_count,
    })))
}
