// src/server/reload.rs

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// Buffered notifications per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 100;

/// One batch of changed build files, paths relative to the build root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadEvent {
    pub paths: Vec<String>,
}

/// Fan-out point between asset tasks and connected live-reload clients.
///
/// Cheap to clone; every clone feeds the same channel. Sending with no
/// subscriber is not an error: builds run whether or not a browser listens.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadEvent>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Tell every connected client that `paths` changed.
    pub fn notify(&self, paths: Vec<String>) {
        if paths.is_empty() {
            return;
        }
        let receivers = self.tx.send(ReloadEvent { paths }).unwrap_or(0);
        debug!(receivers, "reload notification sent");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_without_subscribers_is_fine() {
        let hub = ReloadHub::new();
        hub.notify(vec!["index.html".to_string()]);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_batches() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        hub.notify(vec!["css/main.css".to_string()]);
        hub.notify(Vec::new());
        hub.clone().notify(vec!["js/main.js".to_string()]);

        assert_eq!(rx.recv().await.unwrap().paths, vec!["css/main.css"]);
        assert_eq!(rx.recv().await.unwrap().paths, vec!["js/main.js"]);
    }
}
