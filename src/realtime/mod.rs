pub mod dispatcher;
pub mod events;
pub mod fanout;
pub mod registry;

pub use dispatcher::EventDispatcher;
pub use registry::{ChannelMembership, ConnectionId, ConnectionSender, PresenceRegistry};
