//! Subscriber identity and delivery queue

use super::queue::SubscriberQueue;

/// A logged-in subscriber
///
/// Owned by its connection worker; rooms hold shared references and must
/// drop theirs before the worker finishes.
#[derive(Debug)]
pub struct Subscriber {
    id: u64,
    username: String,
    queue: SubscriberQueue,
}

impl Subscriber {
    /// Create a subscriber identified by its session id
    pub fn new(id: u64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            queue: SubscriberQueue::new(),
        }
    }

    /// Session id; unique per connection
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Username as given at login (not required to be unique)
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Pending deliveries
    pub fn queue(&self) -> &SubscriberQueue {
        &self.queue
    }
}
