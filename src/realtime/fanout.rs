//! Targeting rules: which channels receive which event for each domain
//! action. Handlers persist through the data layer first and call in here
//! afterwards; nothing below touches storage.
//!
//! Notification-style rules suppress actor == target (you are never notified
//! of your own action). Broadcast-style rules (poll tally, presence
//! snapshot, new-tweet audience) are about the audience and are never
//! suppressed by actor identity.

use crate::db::models::{DmRecord, NotificationRecord, PollRecord, TweetRecord};

use super::dispatcher::EventDispatcher;
use super::events::{ReadScope, ServerEvent};

/// A freshly created tweet goes to every current follower of the author.
/// The author is not a follower of themselves, so they are never targeted.
pub fn tweet_created(dispatcher: &EventDispatcher, follower_ids: &[String], tweet: &TweetRecord) {
    dispatcher.deliver_to_users(follower_ids, &ServerEvent::NewTweet(tweet.clone()));
}

/// Deliver a persisted notification to its recipient's personal channel.
/// Self-notification is suppressed here as the single enforcement point,
/// even if a caller forgot to skip persisting one.
pub fn notification(dispatcher: &EventDispatcher, actor_id: &str, record: &NotificationRecord) {
    if record.user_id == actor_id {
        return;
    }
    dispatcher.deliver_to_user(&record.user_id, &ServerEvent::Notification(record.clone()));
}

/// Updated poll tally goes to everyone; voting is public state. The voter's
/// identity never suppresses the broadcast.
pub fn poll_tally(dispatcher: &EventDispatcher, tweet_id: &str, poll: &PollRecord) {
    dispatcher.broadcast_all(&ServerEvent::PollUpdate {
        tweet_id: tweet_id.to_string(),
        poll: poll.clone(),
    });
}

/// A direct message is echoed to both personal channels: the recipient gets
/// the message, the sender's other tabs stay consistent.
pub fn dm_message(dispatcher: &EventDispatcher, message: &DmRecord) {
    let event = ServerEvent::Dm(message.clone());
    dispatcher.deliver_to_user(&message.receiver_id, &event);
    dispatcher.deliver_to_user(&message.sender_id, &event);
}

/// Read receipts go to the original sender only.
pub fn dm_read(dispatcher: &EventDispatcher, original_sender_id: &str, read_by: &str) {
    dispatcher.deliver_to_user(
        original_sender_id,
        &ServerEvent::MessagesRead {
            read_by: read_by.to_string(),
            conversation_with: original_sender_id.to_string(),
        },
    );
}

/// Deletion tombstones go to both conversation parties.
pub fn dm_deleted(
    dispatcher: &EventDispatcher,
    message_id: &str,
    sender_id: &str,
    receiver_id: &str,
    deleted_at: &str,
) {
    let event = ServerEvent::MessageDeleted {
        message_id: message_id.to_string(),
        sender_id: sender_id.to_string(),
        receiver_id: receiver_id.to_string(),
        deleted_at: deleted_at.to_string(),
    };
    dispatcher.deliver_to_user(sender_id, &event);
    dispatcher.deliver_to_user(receiver_id, &event);
}

/// Read-state changes echo to the acting user's own channel so their other
/// tabs update.
pub fn notifications_read(
    dispatcher: &EventDispatcher,
    user_id: &str,
    scope: ReadScope,
    notification_ids: Vec<String>,
) {
    dispatcher.deliver_to_user(
        user_id,
        &ServerEvent::NotificationRead {
            scope,
            notification_ids,
        },
    );
}

/// Typing indicators go to the named recipient's channel only; the sender
/// never sees their own indicator echoed back.
pub fn typing(
    dispatcher: &EventDispatcher,
    recipient_id: &str,
    from_user_id: &str,
    from_username: &str,
    started: bool,
) {
    let event = if started {
        ServerEvent::TypingStart {
            user_id: from_user_id.to_string(),
            username: from_username.to_string(),
        }
    } else {
        ServerEvent::TypingStop {
            user_id: from_user_id.to_string(),
            username: from_username.to_string(),
        }
    };
    dispatcher.deliver_to_user(recipient_id, &event);
}

/// Presence snapshot to every connection.
pub fn online_snapshot(dispatcher: &EventDispatcher, user_ids: Vec<String>) {
    dispatcher.broadcast_all(&ServerEvent::OnlineUsers { user_ids });
}

pub fn user_online(dispatcher: &EventDispatcher, user_id: &str, username: &str) {
    dispatcher.broadcast_all(&ServerEvent::UserOnline {
        user_id: user_id.to_string(),
        username: username.to_string(),
    });
}

pub fn user_offline(dispatcher: &EventDispatcher, user_id: &str, username: &str) {
    dispatcher.broadcast_all(&ServerEvent::UserOffline {
        user_id: user_id.to_string(),
        username: username.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{NotificationKind, UserSummary};
    use crate::realtime::registry::ChannelMembership;
    use axum::extract::ws::Message;
    use std::sync::Arc;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn setup() -> (Arc<ChannelMembership>, EventDispatcher) {
        let channels = Arc::new(ChannelMembership::new());
        let dispatcher = EventDispatcher::new(channels.clone());
        (channels, dispatcher)
    }

    fn join(channels: &ChannelMembership, conn: u64, user: &str) -> UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        channels.join(conn, tx, user);
        rx
    }

    fn summary(id: &str) -> UserSummary {
        UserSummary {
            id: id.to_string(),
            username: format!("user_{id}"),
            display_name: None,
            avatar_url: None,
        }
    }

    fn notification_for(recipient: &str, actor: &str) -> NotificationRecord {
        NotificationRecord {
            id: "n1".into(),
            user_id: recipient.to_string(),
            kind: NotificationKind::Like,
            source_user: summary(actor),
            source_tweet_id: Some("t1".into()),
            is_read: false,
            created_at: "2026-01-01T00:00:00+00:00".into(),
        }
    }

    #[test]
    fn self_notification_is_suppressed() {
        let (channels, dispatcher) = setup();
        let mut rx = join(&channels, 1, "u1");

        notification(&dispatcher, "u1", &notification_for("u1", "u1"));
        assert!(rx.try_recv().is_err());

        notification(&dispatcher, "u2", &notification_for("u1", "u2"));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn typing_reaches_only_the_recipient() {
        let (channels, dispatcher) = setup();
        let mut sender_rx = join(&channels, 1, "sender");
        let mut recipient_rx = join(&channels, 2, "recipient");
        let mut bystander_rx = join(&channels, 3, "bystander");

        typing(&dispatcher, "recipient", "sender", "user_sender", true);

        assert!(recipient_rx.try_recv().is_ok());
        assert!(sender_rx.try_recv().is_err());
        assert!(bystander_rx.try_recv().is_err());
    }

    #[test]
    fn dm_echoes_to_both_parties_only() {
        let (channels, dispatcher) = setup();
        let mut a_rx = join(&channels, 1, "a");
        let mut b_rx = join(&channels, 2, "b");
        let mut c_rx = join(&channels, 3, "c");

        let message = DmRecord {
            id: "m1".into(),
            sender_id: "a".into(),
            receiver_id: "b".into(),
            sender: summary("a"),
            receiver: summary("b"),
            text: "hi".into(),
            gif_url: None,
            status: "DELIVERED".into(),
            created_at: "2026-01-01T00:00:00+00:00".into(),
        };
        dm_message(&dispatcher, &message);

        assert!(a_rx.try_recv().is_ok());
        assert!(a_rx.try_recv().is_err());
        assert!(b_rx.try_recv().is_ok());
        assert!(b_rx.try_recv().is_err());
        assert!(c_rx.try_recv().is_err());
    }

    #[test]
    fn tweet_goes_to_followers_not_author() {
        let (channels, dispatcher) = setup();
        let mut author_rx = join(&channels, 1, "author");
        let mut follower_rx = join(&channels, 2, "follower");

        let tweet = TweetRecord {
            id: "t1".into(),
            text: "hello".into(),
            author: summary("author"),
            parent_id: None,
            like_count: 0,
            retweet_count: 0,
            reply_count: 0,
            hashtags: vec![],
            poll: None,
            created_at: "2026-01-01T00:00:00+00:00".into(),
        };
        tweet_created(&dispatcher, &["follower".to_string()], &tweet);

        assert!(follower_rx.try_recv().is_ok());
        assert!(author_rx.try_recv().is_err());
    }
}
