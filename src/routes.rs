use axum::{middleware, Router};

use crate::auth::handlers as auth_handlers;
use crate::auth::middleware::JwtSecret;
use crate::dm::handlers as dm_handlers;
use crate::notifications::handlers as notification_handlers;
use crate::state::AppState;
use crate::tweets::{handlers as tweet_handlers, polls};
use crate::users::handlers as user_handlers;
use crate::ws::handler as ws_handler;

/// Inject the JWT secret into request extensions so the Claims extractor can find it.
async fn inject_jwt_secret(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut()
        .insert(JwtSecret(state.jwt_secret.clone()));
    next.run(req).await
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/api/auth/signup", axum::routing::post(auth_handlers::signup))
        .route("/api/auth/login", axum::routing::post(auth_handlers::login))
        .route("/api/auth/me", axum::routing::get(auth_handlers::me));

    let user_routes = Router::new()
        .route(
            "/api/users/{username}",
            axum::routing::get(user_handlers::get_profile),
        )
        .route(
            "/api/users/{username}/follow",
            axum::routing::post(user_handlers::follow),
        );

    let tweet_routes = Router::new()
        .route("/api/tweets", axum::routing::post(tweet_handlers::create))
        .route("/api/tweets", axum::routing::get(tweet_handlers::timeline))
        .route(
            "/api/tweets/{tweet_id}",
            axum::routing::get(tweet_handlers::get),
        )
        .route(
            "/api/tweets/{tweet_id}/like",
            axum::routing::post(tweet_handlers::like),
        )
        .route(
            "/api/tweets/{tweet_id}/retweet",
            axum::routing::post(tweet_handlers::retweet),
        )
        .route(
            "/api/tweets/{tweet_id}/poll/{option_id}/vote",
            axum::routing::post(polls::vote),
        );

    let dm_routes = Router::new()
        .route("/api/dm/send", axum::routing::post(dm_handlers::send))
        .route("/api/dm/history", axum::routing::get(dm_handlers::history))
        .route(
            "/api/dm/mark-read",
            axum::routing::post(dm_handlers::mark_read),
        )
        .route(
            "/api/dm/{message_id}",
            axum::routing::delete(dm_handlers::delete),
        )
        .route("/api/dm/unread", axum::routing::get(dm_handlers::unread));

    let notification_routes = Router::new()
        .route(
            "/api/notifications",
            axum::routing::get(notification_handlers::list),
        )
        .route(
            "/api/notifications/read",
            axum::routing::post(notification_handlers::mark_read),
        );

    // WebSocket endpoint (auth via query param, not JWT header)
    let ws_routes = Router::new().route("/ws", axum::routing::get(ws_handler::ws_upgrade));

    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(auth_routes)
        .merge(user_routes)
        .merge(tweet_routes)
        .merge(dm_routes)
        .merge(notification_routes)
        .merge(ws_routes)
        .merge(health)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_jwt_secret,
        ))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
