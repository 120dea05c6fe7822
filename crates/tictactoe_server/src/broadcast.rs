//! Named-topic fan-out for human-readable status lines.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, instrument, trace};

/// Topic carrying chat lines.
pub const CHAT_TOPIC: &str = "chat";

/// Topic carrying game status lines.
pub const GAME_TOPIC: &str = "game";

/// In-process publish/subscribe keyed by topic name.
///
/// Topics are created on first use. Publishing to a topic nobody listens to
/// is a no-op.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<String>>>>,
    capacity: usize,
}

impl Broadcaster {
    /// Creates a broadcaster buffering `capacity` lines per topic.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<String>>> {
        self.topics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sends `text` to every current subscriber of `topic`.
    #[instrument(skip(self, text))]
    pub fn publish(&self, topic: &str, text: impl Into<String>) {
        let text = text.into();
        let sender = self.topics().get(topic).cloned();
        match sender.map(|s| s.send(text)) {
            Some(Ok(receivers)) => trace!(topic, receivers, "Published"),
            _ => trace!(topic, "Published with no subscribers"),
        }
    }

    /// Starts receiving lines published to `topic` from now on.
    #[instrument(skip(self))]
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<String> {
        let mut topics = self.topics();
        let sender = topics.entry(topic.to_string()).or_insert_with(|| {
            debug!(topic, "Creating topic");
            broadcast::channel(self.capacity).0
        });
        sender.subscribe()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
