//! Shared harness for integration tests: spins up the server on a random
//! port with a temp data dir, registers users over HTTP, and speaks the JSON
//! event protocol over a tungstenite client.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub type WsWrite =
    futures_util::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
pub type WsRead = futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Start the server on a random port and return (base_url, addr).
pub async fn start_test_server() -> (String, SocketAddr) {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = flock_server::db::init_db(&data_dir).expect("Failed to init DB");
    let jwt_secret = flock_server::auth::jwt::load_or_generate_jwt_secret(&data_dir)
        .expect("Failed to generate JWT secret");

    let state = flock_server::state::AppState::new(db, jwt_secret);
    let app = flock_server::routes::build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
        let _keep = tmp_dir;
    });

    (format!("http://{}", addr), addr)
}

/// Register a user and return (access_token, user_id).
pub async fn signup_user(base_url: &str, username: &str) -> (String, String) {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/auth/signup", base_url))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "password123",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 201, "Signup failed for {}", username);
    let body: Value = resp.json().await.unwrap();
    let token = body["accessToken"].as_str().unwrap().to_string();
    let user_id = body["user"]["id"].as_str().unwrap().to_string();
    (token, user_id)
}

/// Connect to the WebSocket endpoint and wait for the initial online_users
/// snapshot, so registration is complete before the test proceeds.
/// Returns (write, read, snapshot_user_ids).
///
/// A fresh connection receives the snapshot twice: once addressed to it
/// directly and once via the broadcast of the updated snapshot to everyone.
/// Both are consumed here so tests start from a quiet stream.
pub async fn connect_ws(addr: &SocketAddr, token: &str) -> (WsWrite, WsRead, Vec<String>) {
    let ws_url = format!("ws://{}/ws?token={}", addr, token);
    let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
        .await
        .expect("Failed to connect to WebSocket");
    let (write, mut read) = ws_stream.split();

    let data = recv_event(&mut read, "online_users").await;
    let _broadcast_copy = recv_event(&mut read, "online_users").await;
    let user_ids = data["userIds"]
        .as_array()
        .expect("userIds array")
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();

    (write, read, user_ids)
}

/// Send one client event frame.
pub async fn send_event(write: &mut WsWrite, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    write
        .send(Message::Text(frame.into()))
        .await
        .expect("Failed to send frame");
}

/// Read frames until one with the given event name arrives; returns its
/// data payload. Panics after 2 seconds.
pub async fn recv_event(read: &mut WsRead, event: &str) -> Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let remaining = deadline
            .checked_duration_since(tokio::time::Instant::now())
            .unwrap_or_else(|| panic!("Timed out waiting for event {event}"));
        match tokio::time::timeout(remaining, read.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                let value: Value =
                    serde_json::from_str(text.as_str()).expect("valid JSON frame");
                if value["event"] == event {
                    return value["data"].clone();
                }
            }
            Ok(Some(Ok(_))) => continue,
            other => panic!("Stream ended while waiting for {event}: {other:?}"),
        }
    }
}

/// Assert that no frame with the given event name arrives within the window.
pub async fn assert_no_event(read: &mut WsRead, event: &str, window_ms: u64) {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(window_ms);
    loop {
        let Some(remaining) = deadline.checked_duration_since(tokio::time::Instant::now()) else {
            return;
        };
        match tokio::time::timeout(remaining, read.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                let value: Value =
                    serde_json::from_str(text.as_str()).expect("valid JSON frame");
                assert_ne!(
                    value["event"], event,
                    "Expected no {event} event, got: {value}"
                );
            }
            Ok(Some(Ok(_))) => continue,
            _ => return,
        }
    }
}

/// Authenticated POST helper; returns (status, body).
pub async fn post_json(
    base_url: &str,
    path: &str,
    token: &str,
    body: Value,
) -> (u16, Value) {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}{}", base_url, path))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    let body: Value = resp.json().await.unwrap_or(Value::Null);
    (status, body)
}

/// Authenticated GET helper; returns (status, body).
pub async fn get_json(base_url: &str, path: &str, token: &str) -> (u16, Value) {
    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}{}", base_url, path))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    let body: Value = resp.json().await.unwrap_or(Value::Null);
    (status, body)
}
