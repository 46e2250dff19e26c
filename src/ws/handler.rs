//! WebSocket upgrade endpoint and identity verification.
//!
//! The bearer credential arrives as a `?token=` query parameter because the
//! upgrade request cannot carry normal Authorization headers from browser
//! clients. No connection state is registered until verification succeeds.

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;

use crate::auth::jwt;
use crate::db;
use crate::state::AppState;
use crate::ws::actor;

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: String,
}

/// WebSocket close codes:
/// 4001 = token expired
/// 4002 = token invalid / unknown user
const CLOSE_TOKEN_EXPIRED: u16 = 4001;
const CLOSE_TOKEN_INVALID: u16 = 4002;

/// Identity established for one connection. Immutable for the connection's
/// lifetime.
#[derive(Debug, Clone)]
pub struct VerifiedUser {
    pub id: String,
    pub username: String,
}

enum AuthFailure {
    Expired,
    Invalid,
}

impl AuthFailure {
    fn close_frame(&self) -> CloseFrame {
        match self {
            AuthFailure::Expired => CloseFrame {
                code: CLOSE_TOKEN_EXPIRED,
                reason: "Token expired".into(),
            },
            AuthFailure::Invalid => CloseFrame {
                code: CLOSE_TOKEN_INVALID,
                reason: "Token invalid".into(),
            },
        }
    }
}

/// Validate the handshake credential and resolve it to an existing user.
/// Read-only; runs to completion before any registry is touched.
async fn verify_credential(state: &AppState, token: &str) -> Result<VerifiedUser, AuthFailure> {
    let claims = jwt::validate_access_token(&state.jwt_secret, token).map_err(|err| {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthFailure::Expired,
            _ => AuthFailure::Invalid,
        }
    })?;

    let db_pool = state.db.clone();
    let user_id = claims.sub.clone();
    let user = tokio::task::spawn_blocking(move || {
        let conn = db::lock(&db_pool)?;
        db::users::find_by_id(&conn, &user_id)
    })
    .await
    .map_err(|_| AuthFailure::Invalid)?
    .map_err(|_| AuthFailure::Invalid)?;

    match user {
        Some(user) => Ok(VerifiedUser {
            id: user.id,
            username: user.username,
        }),
        None => Err(AuthFailure::Invalid),
    }
}

/// GET /ws?token=JWT
/// On auth failure, upgrades then immediately closes with the appropriate
/// close code. On success, spawns the connection actor.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsAuthQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    match verify_credential(&state, &params.token).await {
        Ok(user) => {
            tracing::info!(
                user_id = %user.id,
                username = %user.username,
                "WebSocket connection authenticated"
            );
            ws.on_upgrade(move |socket| handle_authenticated(socket, state, user))
        }
        Err(failure) => {
            let frame = failure.close_frame();
            tracing::warn!(
                close_code = frame.code,
                reason = %frame.reason,
                "WebSocket auth failed"
            );
            ws.on_upgrade(move |mut socket| async move {
                let _ = socket.send(Message::Close(Some(frame))).await;
            })
        }
    }
}

async fn handle_authenticated(socket: WebSocket, state: AppState, user: VerifiedUser) {
    actor::run_connection(socket, state, user).await;
}
