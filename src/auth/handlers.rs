//! Signup and login endpoints. Passwords are bcrypt-hashed; a successful
//! signup or login returns a short-lived access token for both the HTTP API
//! and the WebSocket handshake.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::middleware::Claims;
use crate::db;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    let ok_len = (3..=20).contains(&username.len());
    let ok_chars = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !ok_len || !ok_chars {
        return Err(ApiError::Validation(
            "username must be 3-20 characters of letters, digits, or underscore".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    validate_username(&body.username)?;
    if !body.email.contains('@') {
        return Err(ApiError::Validation("invalid email".to_string()));
    }
    if body.password.len() < 6 {
        return Err(ApiError::Validation(
            "password must be at least 6 characters".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&body.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(format!("bcrypt failure: {e}")))?;

    let db_pool = state.db.clone();
    let username = body.username.clone();
    let email = body.email.clone();
    let user = tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        db::users::create(&conn, &username, &email, &password_hash)
    })
    .await??;

    let access_token = crate::auth::jwt::issue_access_token(&state.jwt_secret, &user.id, &user.username)
        .map_err(|e| ApiError::Internal(format!("token issue failed: {e}")))?;

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "accessToken": access_token,
            "user": user.summary(),
        })),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let db_pool = state.db.clone();
    let lookup = body.username_or_email.clone();
    let user = tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        db::users::find_by_username_or_email(&conn, &lookup)
    })
    .await??
    .ok_or_else(|| ApiError::Unauthenticated("invalid credentials".to_string()))?;

    let valid = bcrypt::verify(&body.password, &user.password_hash)
        .map_err(|e| ApiError::Internal(format!("bcrypt failure: {e}")))?;
    if !valid {
        return Err(ApiError::Unauthenticated("invalid credentials".to_string()));
    }

    let access_token = crate::auth::jwt::issue_access_token(&state.jwt_secret, &user.id, &user.username)
        .map_err(|e| ApiError::Internal(format!("token issue failed: {e}")))?;

    Ok(Json(json!({
        "success": true,
        "accessToken": access_token,
        "user": user.summary(),
    })))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Value>, ApiError> {
    let db_pool = state.db.clone();
    let user_id = claims.sub.clone();
    let summary = tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        db::users::summary_of(&conn, &user_id)
    })
    .await??;

    Ok(Json(json!({ "success": true, "user": summary })))
}
