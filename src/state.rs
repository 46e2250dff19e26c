use std::sync::Arc;

use crate::db::DbPool;
use crate::realtime::{ChannelMembership, EventDispatcher, PresenceRegistry};

/// Shared application state passed to all handlers via axum State extractor.
///
/// The presence registry and channel membership are constructed once at
/// startup and owned here; connection actors are the only writers, the
/// dispatcher the only other reader.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// JWT signing secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    /// Online users and their open connections
    pub presence: Arc<PresenceRegistry>,
    /// Channel key -> member connections
    pub channels: Arc<ChannelMembership>,
    /// Broadcast primitive over `channels`
    pub dispatcher: EventDispatcher,
}

impl AppState {
    pub fn new(db: DbPool, jwt_secret: Vec<u8>) -> Self {
        let presence = Arc::new(PresenceRegistry::new());
        let channels = Arc::new(ChannelMembership::new());
        let dispatcher = EventDispatcher::new(channels.clone());
        Self {
            db,
            jwt_secret,
            presence,
            channels,
            dispatcher,
        }
    }
}
