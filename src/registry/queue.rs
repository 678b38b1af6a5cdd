//! Per-subscriber delivery queue
//!
//! An unbounded FIFO guarded by a short lock, paired with a semaphore whose
//! permit count equals the number of queued messages. `enqueue` never waits;
//! `dequeue` waits for a permit for at most the given timeout, so a consumer
//! wakes up periodically even when nothing is published.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::protocol::Message;

/// Unbounded FIFO with bounded-wait consumption
#[derive(Debug)]
pub struct SubscriberQueue {
    messages: Mutex<VecDeque<Message>>,
    available: Semaphore,
}

impl SubscriberQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            available: Semaphore::new(0),
        }
    }

    /// Append a message to the tail. Never blocks, never fails.
    pub fn enqueue(&self, msg: Message) {
        self.messages.lock().push_back(msg);
        self.available.add_permits(1);
    }

    /// Remove the head, waiting up to `timeout` for one to arrive
    ///
    /// Returns `None` on timeout without removing anything.
    pub async fn dequeue(&self, timeout: Duration) -> Option<Message> {
        let permit = tokio::time::timeout(timeout, self.available.acquire())
            .await
            .ok()?
            .ok()?;

        // One permit per queued message: holding it means the head is ours
        permit.forget();
        self.messages.lock().pop_front()
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SubscriberQueue {
    fn default() -> Self {
        Self::new()
    }
}
