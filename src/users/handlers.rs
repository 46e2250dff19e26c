//! User profile and follow endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::auth::middleware::Claims;
use crate::db::{self, models::NotificationKind};
use crate::error::ApiError;
use crate::realtime::fanout;
use crate::state::AppState;

/// GET /api/users/{username}
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let db_pool = state.db.clone();
    let (user, followers, following, tweets) = tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        let user = db::users::find_by_username(&conn, &username)?.ok_or(ApiError::NotFound("user"))?;
        let followers = db::users::follower_count(&conn, &user.id)?;
        let following = db::users::following_count(&conn, &user.id)?;
        let tweets = db::users::tweet_count(&conn, &user.id)?;
        Ok::<_, ApiError>((user.summary(), followers, following, tweets))
    })
    .await??;

    Ok(Json(json!({
        "success": true,
        "user": user,
        "followerCount": followers,
        "followingCount": following,
        "tweetCount": tweets,
    })))
}

/// POST /api/users/{username}/follow — toggle.
/// A new follow persists the edge and notifies the followee; unfollow is
/// silent. Self-follow is rejected before anything is written.
pub async fn follow(
    State(state): State<AppState>,
    claims: Claims,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let db_pool = state.db.clone();
    let follower_id = claims.sub.clone();
    let (is_following, follower_count, notification) = tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        let followee =
            db::users::find_by_username(&conn, &username)?.ok_or(ApiError::NotFound("user"))?;
        if followee.id == follower_id {
            return Err(ApiError::Validation("cannot follow yourself".to_string()));
        }

        let (is_following, notification) =
            if db::users::is_following(&conn, &follower_id, &followee.id)? {
                db::users::unfollow(&conn, &follower_id, &followee.id)?;
                (false, None)
            } else {
                db::users::follow(&conn, &follower_id, &followee.id)?;
                let record = db::notifications::create(
                    &conn,
                    &followee.id,
                    NotificationKind::Follow,
                    &follower_id,
                    None,
                )?;
                (true, Some(record))
            };

        let follower_count = db::users::follower_count(&conn, &followee.id)?;
        Ok::<_, ApiError>((is_following, follower_count, notification))
    })
    .await??;

    if let Some(record) = &notification {
        fanout::notification(&state.dispatcher, &claims.sub, record);
    }

    Ok(Json(json!({
        "success": true,
        "isFollowing": is_following,
        "followerCount": follower_count,
    })))
}
