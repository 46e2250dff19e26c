//! Actor-per-connection: the only place connection state is created and
//! destroyed. The actor registers the connection, joins its personal
//! channel, announces presence, pumps inbound frames through the protocol
//! dispatcher, and tears everything down exactly once on the way out.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::realtime::events::ServerEvent;
use crate::realtime::fanout;
use crate::realtime::registry::next_connection_id;
use crate::state::AppState;
use crate::ws::handler::VerifiedUser;
use crate::ws::protocol;

/// Ping interval: server sends a WebSocket ping every 30 seconds so abrupt
/// disconnects cannot leak registry entries.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// If no pong arrives within 10 seconds after a ping, close.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run_connection(socket: WebSocket, state: AppState, user: VerifiedUser) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    let conn_id = next_connection_id();

    // Registration order: membership first so the snapshot broadcast below
    // reaches this connection too, then presence.
    state.channels.join(conn_id, tx.clone(), &user.id);
    let came_online = state.presence.mark_online(&user.id, conn_id);

    // Initial snapshot to the new connection, updated snapshot to everyone.
    let snapshot = state.presence.list_online();
    protocol::send_event(&tx, &ServerEvent::OnlineUsers {
        user_ids: snapshot.clone(),
    });
    fanout::online_snapshot(&state.dispatcher, snapshot);
    if came_online {
        fanout::user_online(&state.dispatcher, &user.id, &user.username);
    }

    tracing::info!(
        user_id = %user.id,
        username = %user.username,
        conn_id,
        "WebSocket actor started"
    );

    // Writer task: owns the sink, forwards frames from the mpsc channel.
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Ping task: periodic pings, close on missing pong.
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();
    let ping_tx = tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(PING_INTERVAL);
        // Skip the first immediate tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                // Writer task has died — connection is gone
                break;
            }

            match timeout(PONG_TIMEOUT, pong_rx.recv()).await {
                Ok(Some(())) => {}
                _ => {
                    tracing::warn!("Pong timeout, closing connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    // Reader loop: inbound frames for this connection are handled in order.
    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    protocol::handle_text_frame(text.as_str(), &tx, &state, &user).await;
                }
                Message::Binary(_) => {
                    tracing::debug!(
                        user_id = %user.id,
                        "Received binary frame (protocol is JSON text)"
                    );
                }
                Message::Pong(_) => {
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(
                        user_id = %user.id,
                        reason = ?frame,
                        "Client initiated close"
                    );
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(
                    user_id = %user.id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
            None => {
                tracing::info!(user_id = %user.id, "WebSocket stream ended");
                break;
            }
        }
    }

    writer_handle.abort();
    ping_handle.abort();

    // Teardown is idempotent: leave_all and mark_offline tolerate a
    // connection that is already gone.
    state.channels.leave_all(conn_id);
    let went_offline = state.presence.mark_offline(&user.id, conn_id);

    if went_offline {
        fanout::user_offline(&state.dispatcher, &user.id, &user.username);
        fanout::online_snapshot(&state.dispatcher, state.presence.list_online());
    }

    tracing::info!(
        user_id = %user.id,
        conn_id,
        "WebSocket actor stopped"
    );
}

/// Writer task: receives frames from the mpsc channel and forwards them to
/// the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed — connection is broken
            break;
        }
    }
}
