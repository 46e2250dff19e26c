//! Poll voting, shared by the REST route and the realtime action handler.
//! Persists the vote and tally atomically, notifies the poll author (unless
//! voting on their own poll), and broadcasts the updated tally to everyone.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::auth::middleware::Claims;
use crate::db::{self, models::NotificationKind, models::PollRecord};
use crate::error::ApiError;
use crate::realtime::fanout;
use crate::state::AppState;

pub struct VoteOutcome {
    pub tweet_id: String,
    pub poll: PollRecord,
}

/// Cast a vote in a poll. Validation failures and the duplicate-vote
/// conflict abort before any event is emitted; on success the tally
/// broadcast always goes out, the author notification only when the voter
/// is somebody else.
pub async fn cast_vote(
    state: &AppState,
    voter_id: &str,
    poll_id: &str,
    option_id: &str,
) -> Result<VoteOutcome, ApiError> {
    let db_pool = state.db.clone();
    let voter = voter_id.to_string();
    let poll_id_owned = poll_id.to_string();
    let option_id_owned = option_id.to_string();

    let (poll, tweet_id, notification) = tokio::task::spawn_blocking(move || {
        let mut conn = db::lock(&db_pool)?;
        let poll = db::polls::record_vote(&mut conn, &poll_id_owned, &option_id_owned, &voter)?;
        let tweet = db::tweets::find_row(&conn, &poll.tweet_id)?
            .ok_or(ApiError::NotFound("tweet"))?;
        let notification = if tweet.author_id != voter {
            Some(db::notifications::create(
                &conn,
                &tweet.author_id,
                NotificationKind::PollVote,
                &voter,
                Some(&tweet.id),
            )?)
        } else {
            None
        };
        Ok::<_, ApiError>((poll, tweet.id, notification))
    })
    .await??;

    if let Some(record) = &notification {
        fanout::notification(&state.dispatcher, voter_id, record);
    }
    fanout::poll_tally(&state.dispatcher, &tweet_id, &poll);

    Ok(VoteOutcome { tweet_id, poll })
}

/// POST /api/tweets/{tweet_id}/poll/{option_id}/vote
pub async fn vote(
    State(state): State<AppState>,
    claims: Claims,
    Path((tweet_id, option_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let db_pool = state.db.clone();
    let tid = tweet_id.clone();
    let poll = tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        db::polls::find_by_tweet(&conn, &tid)?.ok_or(ApiError::NotFound("poll"))
    })
    .await??;

    let outcome = cast_vote(&state, &claims.sub, &poll.id, &option_id).await?;

    Ok(Json(json!({ "success": true, "poll": outcome.poll })))
}
