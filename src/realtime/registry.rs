//! Shared connection bookkeeping: who is online, and which connections
//! belong to which delivery channel.
//!
//! Both registries are mutated only by the connection actors on connect and
//! disconnect; every mutation is a synchronous DashMap operation, so no task
//! can observe a half-updated state across an await point. The dispatcher
//! only reads.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Process-unique id for one live WebSocket connection.
pub type ConnectionId = u64;

/// Sender half of a connection's outbound channel. Cloning this is how any
/// part of the system pushes a frame to that client.
pub type ConnectionSender = tokio::sync::mpsc::UnboundedSender<axum::extract::ws::Message>;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_connection_id() -> ConnectionId {
    NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Online-presence tracking, set-valued per user: a user is online iff at
/// least one of their connections is registered. Closing one of several tabs
/// must not mark the user offline.
#[derive(Default)]
pub struct PresenceRegistry {
    online: DashMap<String, HashSet<ConnectionId>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a user. Returns true when this was the
    /// user's first open connection (offline -> online transition).
    pub fn mark_online(&self, user_id: &str, conn: ConnectionId) -> bool {
        let mut entry = self.online.entry(user_id.to_string()).or_default();
        let was_offline = entry.is_empty();
        entry.insert(conn);
        was_offline
    }

    /// Remove a connection for a user. Returns true when this was the user's
    /// last open connection (online -> offline transition). Safe to call for
    /// connections that were never registered.
    pub fn mark_offline(&self, user_id: &str, conn: ConnectionId) -> bool {
        let went_offline = match self.online.get_mut(user_id) {
            Some(mut entry) => {
                let removed = entry.remove(&conn);
                removed && entry.is_empty()
            }
            None => false,
        };
        if went_offline {
            self.online.remove(user_id);
        }
        went_offline
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.online
            .get(user_id)
            .map(|e| !e.is_empty())
            .unwrap_or(false)
    }

    pub fn list_online(&self) -> Vec<String> {
        self.online
            .iter()
            .filter(|e| !e.value().is_empty())
            .map(|e| e.key().clone())
            .collect()
    }
}

/// Channel membership: channel key -> member connections, and the reverse
/// index connection -> joined channel keys. Every authenticated connection
/// joins one personal channel keyed by its own user id; the model allows a
/// connection to belong to any number of channels.
#[derive(Default)]
pub struct ChannelMembership {
    members: DashMap<String, HashMap<ConnectionId, ConnectionSender>>,
    joined: DashMap<ConnectionId, HashSet<String>>,
}

impl ChannelMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, conn: ConnectionId, sender: ConnectionSender, channel_key: &str) {
        self.members
            .entry(channel_key.to_string())
            .or_default()
            .insert(conn, sender);
        self.joined
            .entry(conn)
            .or_default()
            .insert(channel_key.to_string());
    }

    pub fn leave(&self, conn: ConnectionId, channel_key: &str) {
        let drop_channel = match self.members.get_mut(channel_key) {
            Some(mut entry) => {
                entry.remove(&conn);
                entry.is_empty()
            }
            None => false,
        };
        if drop_channel {
            self.members.remove(channel_key);
        }
        if let Some(mut joined) = self.joined.get_mut(&conn) {
            joined.remove(channel_key);
        }
    }

    /// Remove a connection from every channel it joined. Idempotent.
    pub fn leave_all(&self, conn: ConnectionId) {
        let channels: Vec<String> = self
            .joined
            .remove(&conn)
            .map(|(_, keys)| keys.into_iter().collect())
            .unwrap_or_default();
        for key in channels {
            let drop_channel = match self.members.get_mut(&key) {
                Some(mut entry) => {
                    entry.remove(&conn);
                    entry.is_empty()
                }
                None => false,
            };
            if drop_channel {
                self.members.remove(&key);
            }
        }
    }

    /// Senders for every member of a channel. Empty when nobody is joined.
    pub fn members_of(&self, channel_key: &str) -> Vec<ConnectionSender> {
        self.members
            .get(channel_key)
            .map(|entry| entry.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Every registered connection, once each, regardless of how many
    /// channels it joined.
    pub fn all_members(&self) -> Vec<ConnectionSender> {
        let mut seen: HashMap<ConnectionId, ConnectionSender> = HashMap::new();
        for entry in self.members.iter() {
            for (conn, sender) in entry.value() {
                seen.entry(*conn).or_insert_with(|| sender.clone());
            }
        }
        seen.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn sender() -> ConnectionSender {
        let (tx, _rx) = mpsc::unbounded_channel();
        tx
    }

    #[test]
    fn online_iff_at_least_one_connection() {
        let presence = PresenceRegistry::new();
        let (a, b, c) = (1, 2, 3);

        assert!(!presence.is_online("u1"));

        assert!(presence.mark_online("u1", a));
        assert!(!presence.mark_online("u1", b));
        assert!(!presence.mark_online("u1", c));
        assert!(presence.is_online("u1"));

        assert!(!presence.mark_offline("u1", b));
        assert!(presence.is_online("u1"));
        assert!(!presence.mark_offline("u1", a));
        assert!(presence.is_online("u1"));
        assert!(presence.mark_offline("u1", c));
        assert!(!presence.is_online("u1"));
        assert!(presence.list_online().is_empty());
    }

    #[test]
    fn mark_offline_for_unknown_connection_is_a_noop() {
        let presence = PresenceRegistry::new();
        assert!(!presence.mark_offline("ghost", 99));
        assert!(!presence.is_online("ghost"));

        presence.mark_online("u1", 1);
        // Removing a connection id that was never registered must not
        // transition the user offline.
        assert!(!presence.mark_offline("u1", 42));
        assert!(presence.is_online("u1"));
    }

    #[test]
    fn membership_join_leave_round_trip() {
        let channels = ChannelMembership::new();
        channels.join(1, sender(), "u1");
        channels.join(2, sender(), "u1");
        channels.join(3, sender(), "u2");

        assert_eq!(channels.members_of("u1").len(), 2);
        assert_eq!(channels.members_of("u2").len(), 1);
        assert_eq!(channels.members_of("u3").len(), 0);

        channels.leave(1, "u1");
        assert_eq!(channels.members_of("u1").len(), 1);

        channels.leave_all(2);
        channels.leave_all(2); // double-close must be safe
        assert!(channels.members_of("u1").is_empty());
    }

    #[test]
    fn all_members_counts_each_connection_once() {
        let channels = ChannelMembership::new();
        channels.join(1, sender(), "u1");
        channels.join(1, sender(), "room:42");
        channels.join(2, sender(), "u2");

        assert_eq!(channels.all_members().len(), 2);
    }

    #[test]
    fn connection_ids_are_unique() {
        let a = next_connection_id();
        let b = next_connection_id();
        assert_ne!(a, b);
    }
}
