//! Per-conversation fanout.
//!
//! One process-wide [`ChannelRegistry`] maps each conversation id to a
//! broadcast channel. Sessions join to obtain a receiver and leave on
//! disconnect; broadcasts reach every receiver alive at send time.

use crate::events::ServerEvent;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

/// Registry of live subscriptions, keyed by conversation id.
///
/// The map lock is a plain mutex and no method awaits while holding it, so
/// `leave` can run from `Drop` and joins never block behind a broadcast.
pub struct ChannelRegistry {
    capacity: usize,
    channels: Mutex<HashMap<i64, broadcast::Sender<ServerEvent>>>,
}

impl ChannelRegistry {
    /// Create a registry whose per-conversation channels buffer `capacity`
    /// events before slow subscribers start lagging.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to a conversation, creating its channel on first join.
    /// Joining is idempotent; each call hands back an independent receiver.
    pub fn join(&self, conversation_id: i64) -> broadcast::Receiver<ServerEvent> {
        let mut channels = self.channels.lock().expect("channel registry poisoned");
        channels
            .entry(conversation_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Drop a conversation's entry once no subscribers remain. Safe to call
    /// for conversations that were never joined; an empty entry and no entry
    /// are equivalent.
    pub fn leave(&self, conversation_id: i64) {
        let mut channels = self.channels.lock().expect("channel registry poisoned");
        if let Some(sender) = channels.get(&conversation_id) {
            if sender.receiver_count() == 0 {
                channels.remove(&conversation_id);
                debug!(conversation_id, "pruned empty conversation channel");
            }
        }
    }

    /// Deliver an event to every session currently subscribed to the
    /// conversation, best effort. Returns how many subscribers were reached;
    /// zero when nobody is listening.
    pub fn broadcast(&self, conversation_id: i64, event: ServerEvent) -> usize {
        let sender = {
            let channels = self.channels.lock().expect("channel registry poisoned");
            channels.get(&conversation_id).cloned()
        };

        match sender {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Number of sessions currently subscribed to a conversation.
    pub fn subscriber_count(&self, conversation_id: i64) -> usize {
        let channels = self.channels.lock().expect("channel registry poisoned");
        channels
            .get(&conversation_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> ServerEvent {
        ServerEvent::MessageRead {
            message_id: 1,
            read_by_id: 2,
            read_by_username: "bakary".to_string(),
            read_at: "2024-05-01T10:00:00+00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let registry = ChannelRegistry::new(8);

        let mut first = registry.join(5);
        let mut second = registry.join(5);
        assert_eq!(registry.subscriber_count(5), 2);

        let reached = registry.broadcast(5, sample_event());
        assert_eq!(reached, 2);

        assert_eq!(first.recv().await.unwrap(), sample_event());
        assert_eq!(second.recv().await.unwrap(), sample_event());
    }

    #[tokio::test]
    async fn conversations_are_isolated() {
        let registry = ChannelRegistry::new(8);

        let mut subscriber = registry.join(1);
        registry.join(2); // dropped immediately

        registry.broadcast(2, sample_event());
        assert!(subscriber.try_recv().is_err());
    }

    #[test]
    fn broadcast_without_subscribers_is_a_noop() {
        let registry = ChannelRegistry::new(8);
        assert_eq!(registry.broadcast(99, sample_event()), 0);

        // Also after the last receiver is gone.
        drop(registry.join(99));
        assert_eq!(registry.broadcast(99, sample_event()), 0);
    }

    #[test]
    fn leave_prunes_only_empty_entries() {
        let registry = ChannelRegistry::new(8);

        let receiver = registry.join(7);
        registry.leave(7);
        assert_eq!(registry.subscriber_count(7), 1);

        drop(receiver);
        registry.leave(7);
        assert_eq!(registry.subscriber_count(7), 0);
        assert!(registry.channels.lock().unwrap().get(&7).is_none());

        // Leaving a conversation that was never joined is fine.
        registry.leave(1234);
    }
}
