//! The broadcast primitive. Knows nothing about domain semantics: it takes
//! an event and a target and pushes a frame to every matching registered
//! connection.

use std::sync::Arc;

use axum::extract::ws::Message;

use super::events::ServerEvent;
use super::registry::ChannelMembership;

/// Fire-and-forget delivery over the channel membership tables. Cheap to
/// clone; handlers receive it injected through application state rather than
/// reaching for a global.
///
/// Delivery is best-effort: a connection registered at the moment of the
/// call gets exactly one delivery attempt, and a stale sender never prevents
/// delivery to the remaining targets. There is no retry, acknowledgment, or
/// backlog — a disconnected client reconciles through the HTTP API.
#[derive(Clone)]
pub struct EventDispatcher {
    channels: Arc<ChannelMembership>,
}

impl EventDispatcher {
    pub fn new(channels: Arc<ChannelMembership>) -> Self {
        Self { channels }
    }

    fn encode(event: &ServerEvent) -> Option<Message> {
        match serde_json::to_string(event) {
            Ok(text) => Some(Message::Text(text.into())),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode server event");
                None
            }
        }
    }

    /// Send an event to every connection in a user's personal channel.
    /// A user with zero open connections is a silent no-op.
    pub fn deliver_to_user(&self, user_id: &str, event: &ServerEvent) {
        let Some(msg) = Self::encode(event) else {
            return;
        };
        for sender in self.channels.members_of(user_id) {
            let _ = sender.send(msg.clone());
        }
    }

    /// Fan an event out to a set of users. No ordering guarantee between
    /// recipients.
    pub fn deliver_to_users<I, S>(&self, user_ids: I, event: &ServerEvent)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Some(msg) = Self::encode(event) else {
            return;
        };
        for user_id in user_ids {
            for sender in self.channels.members_of(user_id.as_ref()) {
                let _ = sender.send(msg.clone());
            }
        }
    }

    /// Deliver an event to every registered connection.
    pub fn broadcast_all(&self, event: &ServerEvent) {
        let Some(msg) = Self::encode(event) else {
            return;
        };
        for sender in self.channels.all_members() {
            let _ = sender.send(msg.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::registry::ConnectionSender;
    use tokio::sync::mpsc;

    fn channel() -> (ConnectionSender, mpsc::UnboundedReceiver<Message>) {
        mpsc::unbounded_channel()
    }

    fn typing_event() -> ServerEvent {
        ServerEvent::TypingStart {
            user_id: "u9".into(),
            username: "sender".into(),
        }
    }

    #[test]
    fn delivers_to_every_connection_of_the_target_user() {
        let channels = Arc::new(ChannelMembership::new());
        let dispatcher = EventDispatcher::new(channels.clone());

        let (tx_a, mut rx_a) = channel();
        let (tx_b, mut rx_b) = channel();
        let (tx_other, mut rx_other) = channel();
        channels.join(1, tx_a, "u1");
        channels.join(2, tx_b, "u1");
        channels.join(3, tx_other, "u2");

        dispatcher.deliver_to_user("u1", &typing_event());

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_other.try_recv().is_err());
    }

    #[test]
    fn offline_target_is_a_silent_noop() {
        let channels = Arc::new(ChannelMembership::new());
        let dispatcher = EventDispatcher::new(channels);
        // No panic, no error.
        dispatcher.deliver_to_user("nobody", &typing_event());
    }

    #[test]
    fn closed_receiver_does_not_block_other_deliveries() {
        let channels = Arc::new(ChannelMembership::new());
        let dispatcher = EventDispatcher::new(channels.clone());

        let (tx_dead, rx_dead) = channel();
        drop(rx_dead);
        let (tx_live, mut rx_live) = channel();
        channels.join(1, tx_dead, "u1");
        channels.join(2, tx_live, "u2");

        dispatcher.broadcast_all(&typing_event());

        assert!(rx_live.try_recv().is_ok());
    }

    #[test]
    fn broadcast_reaches_each_connection_once() {
        let channels = Arc::new(ChannelMembership::new());
        let dispatcher = EventDispatcher::new(channels.clone());

        let (tx, mut rx) = channel();
        channels.join(1, tx.clone(), "u1");
        channels.join(1, tx, "room:7");

        dispatcher.broadcast_all(&typing_event());

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
