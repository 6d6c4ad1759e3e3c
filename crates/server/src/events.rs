//! In-process event fan-out for SSE endpoints.
//!
//! Each channel key (an org or a docsite) owns a tokio broadcast sender plus
//! a bounded replay buffer, so a subscriber that connects mid-build still
//! sees the progress so far. Lagging subscribers are dropped by the broadcast
//! channel, which ends their stream rather than crashing anything.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use tokio::sync::broadcast;

const REPLAY_CAPACITY: usize = 64;
const CHANNEL_CAPACITY: usize = 256;

struct Channel {
    tx: broadcast::Sender<String>,
    replay: VecDeque<String>,
}

impl Channel {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            replay: VecDeque::with_capacity(REPLAY_CAPACITY),
        }
    }
}

/// Map of channel key to broadcast sender + replay buffer.
#[derive(Default)]
pub struct EventHub {
    channels: Mutex<HashMap<String, Channel>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel key for a docsite's build-progress stream.
    pub fn site_key(site_id: &str) -> String {
        format!("site:{site_id}")
    }

    /// Channel key for an org's activity stream (chat, webhook events).
    pub fn org_key(org_id: &str) -> String {
        format!("org:{org_id}")
    }

    /// Publish a pre-serialized event to a channel.
    pub fn publish(&self, key: &str, event: String) {
        let mut channels = self.channels.lock().expect("event hub mutex poisoned");
        let channel = channels
            .entry(key.to_string())
            .or_insert_with(Channel::new);
        if channel.replay.len() == REPLAY_CAPACITY {
            channel.replay.pop_front();
        }
        channel.replay.push_back(event.clone());
        // No subscribers is fine.
        let _ = channel.tx.send(event);
    }

    /// Subscribe to a channel: the buffered replay plus a live receiver.
    pub fn subscribe(&self, key: &str) -> (Vec<String>, broadcast::Receiver<String>) {
        let mut channels = self.channels.lock().expect("event hub mutex poisoned");
        let channel = channels
            .entry(key.to_string())
            .or_insert_with(Channel::new);
        (channel.replay.iter().cloned().collect(), channel.tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_subscriber_sees_replay() {
        let hub = EventHub::new();
        hub.publish("site:s1", "one".into());
        hub.publish("site:s1", "two".into());

        let (replay, _rx) = hub.subscribe("site:s1");
        assert_eq!(replay, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn replay_is_bounded() {
        let hub = EventHub::new();
        for i in 0..200 {
            hub.publish("org:o1", format!("e{i}"));
        }
        let (replay, _rx) = hub.subscribe("org:o1");
        assert_eq!(replay.len(), REPLAY_CAPACITY);
        assert_eq!(replay.first().map(String::as_str), Some("e136"));
        assert_eq!(replay.last().map(String::as_str), Some("e199"));
    }

    #[tokio::test]
    async fn live_events_reach_subscribers() {
        let hub = EventHub::new();
        let (_replay, mut rx) = hub.subscribe("site:s1");
        hub.publish("site:s1", "hello".into());
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[test]
    fn channels_are_independent() {
        let hub = EventHub::new();
        hub.publish("org:a", "for-a".into());
        let (replay, _rx) = hub.subscribe("org:b");
        assert!(replay.is_empty());
    }
}
