//! Bounded, time-ordered message history.
//!
//! A FIFO capped at a fixed capacity; appending past capacity evicts from
//! the front. Insertion order equals timestamp order because the append path
//! assigns timestamps from a single clock under the history guard.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use kakehashi_shared::time::Clock;

/// A chat message as stored in history. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub sender_id: Uuid,
    pub sender_name: String,
    pub text: String,
    pub timestamp: i64,
}

/// Bounded chronological buffer of broadcast messages.
pub struct ChatHistory {
    capacity: usize,
    clock: Arc<dyn Clock>,
    messages: Mutex<VecDeque<StoredMessage>>,
}

impl ChatHistory {
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            capacity,
            clock,
            messages: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a message, assigning the current timestamp and trimming to
    /// capacity. Returns the stored record for fan-out.
    pub async fn append(
        &self,
        sender_id: Uuid,
        sender_name: impl Into<String>,
        text: impl Into<String>,
    ) -> StoredMessage {
        let message = StoredMessage {
            sender_id,
            sender_name: sender_name.into(),
            text: text.into(),
            timestamp: self.clock.now_millis(),
        };

        let mut messages = self.messages.lock().await;
        messages.push_back(message.clone());
        while messages.len() > self.capacity {
            messages.pop_front();
        }

        message
    }

    /// All messages with `timestamp > since`, in chronological order.
    pub async fn since(&self, since: i64) -> Vec<StoredMessage> {
        let messages = self.messages.lock().await;
        messages
            .iter()
            .filter(|m| m.timestamp > since)
            .cloned()
            .collect()
    }

    /// Snapshot of the full history.
    pub async fn all(&self) -> Vec<StoredMessage> {
        let messages = self.messages.lock().await;
        messages.iter().cloned().collect()
    }

    /// Drop all stored messages.
    pub async fn clear(&self) {
        let mut messages = self.messages.lock().await;
        messages.clear();
    }
}
