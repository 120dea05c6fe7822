//! Outbound queues for open game connections.

use crate::router::Outbound;
use crate::session::ConnectionId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, error, instrument, warn};

/// Registry of per-connection send queues.
///
/// Delivery is fire-and-forget: a full or closed queue drops the message.
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    senders: Arc<Mutex<HashMap<ConnectionId, mpsc::Sender<String>>>>,
    capacity: usize,
}

impl ConnectionRegistry {
    /// Creates a registry whose queues hold `capacity` messages each.
    pub fn new(capacity: usize) -> Self {
        Self {
            senders: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    fn senders(&self) -> MutexGuard<'_, HashMap<ConnectionId, mpsc::Sender<String>>> {
        self.senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Opens a queue for a new connection.
    #[instrument(skip(self))]
    pub fn register(&self) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.capacity);
        self.senders().insert(id, tx);
        debug!(connection_id = %id, "Connection registered");
        (id, rx)
    }

    /// Closes a connection's queue.
    #[instrument(skip(self))]
    pub fn unregister(&self, id: &ConnectionId) {
        if self.senders().remove(id).is_some() {
            debug!(connection_id = %id, "Connection unregistered");
        }
    }

    /// Queues a raw text frame. Returns `false` if it was dropped.
    #[instrument(skip(self, id, text), fields(connection_id = %id, len = text.len()))]
    pub fn send_to(&self, id: &ConnectionId, text: String) -> bool {
        let Some(tx) = self.senders().get(id).cloned() else {
            debug!(connection_id = %id, "No queue for connection, dropping message");
            return false;
        };
        match tx.try_send(text) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                warn!(connection_id = %id, msg_len = msg.len(), "Send queue full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(connection_id = %id, "Send queue closed, dropping message");
                false
            }
        }
    }

    /// Encodes and queues each outbound message in order.
    #[instrument(skip(self, outbound), fields(count = outbound.len()))]
    pub fn deliver(&self, outbound: Vec<Outbound>) {
        for Outbound { recipient, message } in outbound {
            match message.encode() {
                Ok(text) => {
                    self.send_to(&recipient, text);
                }
                Err(e) => error!(connection_id = %recipient, error = %e, "Failed to encode message"),
            }
        }
    }

    /// Number of open connections.
    pub fn count(&self) -> usize {
        self.senders().len()
    }
}
