use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::Change;

const CHANNEL_CAPACITY: usize = 64;

/// Broadcast hub for store change notifications, one channel per store key.
pub struct NotifyHub {
    channels: DashMap<String, broadcast::Sender<Change>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to changes of a store. Creates the channel if needed.
    pub fn subscribe(&self, store: &str) -> broadcast::Receiver<Change> {
        let sender = self
            .channels
            .entry(store.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, store: &str, change: &Change) {
        if let Some(sender) = self.channels.get(store) {
            let _ = sender.send(change.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(store: &str, revision: u64) -> Change {
        Change::Saved {
            store: store.into(),
            revision,
            events: 0,
        }
    }

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe("club");
        hub.send("club", &saved("club", 1));
        assert_eq!(rx.recv().await.unwrap(), saved("club", 1));
    }

    #[tokio::test]
    async fn stores_are_isolated() {
        let hub = NotifyHub::new();
        let mut a = hub.subscribe("a");
        let mut b = hub.subscribe("b");
        hub.send("b", &saved("b", 1));
        assert_eq!(b.recv().await.unwrap(), saved("b", 1));
        assert!(a.try_recv().is_err());
    }

    #[test]
    fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        hub.send("nobody", &saved("nobody", 1));
        assert!(hub.channels.is_empty());
    }
}
