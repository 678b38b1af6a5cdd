//! Chat room
//!
//! A room is a named set of subscribers. Membership changes and broadcast
//! enumeration take the same lock, so a broadcast always sees a consistent
//! member set. Broadcast only enqueues; it never waits on a subscriber's
//! connection.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::protocol::Message;

use super::subscriber::Subscriber;

/// A named broadcast group
#[derive(Debug)]
pub struct Room {
    name: String,
    /// Members keyed by session id
    members: Mutex<HashMap<u64, Arc<Subscriber>>>,
}

impl Room {
    /// Create an empty room
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Mutex::new(HashMap::new()),
        }
    }

    /// Room name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a subscriber. Returns `false` if it was already a member.
    pub async fn add_member(&self, subscriber: Arc<Subscriber>) -> bool {
        let mut members = self.members.lock().await;
        let id = subscriber.id();
        let added = members.insert(id, subscriber).is_none();

        tracing::debug!(
            room = %self.name,
            session_id = id,
            members = members.len(),
            "Member added"
        );

        added
    }

    /// Remove a subscriber. Returns `false` if it was not a member.
    pub async fn remove_member(&self, subscriber: &Subscriber) -> bool {
        let mut members = self.members.lock().await;
        let removed = members.remove(&subscriber.id()).is_some();

        if removed {
            tracing::debug!(
                room = %self.name,
                session_id = subscriber.id(),
                members = members.len(),
                "Member removed"
            );
        }

        removed
    }

    /// Number of members
    pub async fn member_count(&self) -> usize {
        self.members.lock().await.len()
    }

    /// Enqueue one delivery of `text` from `sender` on every member's queue
    ///
    /// Returns the number of members the delivery was queued for.
    pub async fn broadcast(&self, sender: &str, text: &str) -> usize {
        let delivery = Message::delivery(&self.name, sender, text);

        let members = self.members.lock().await;
        for member in members.values() {
            member.queue().enqueue(delivery.clone());
        }

        tracing::debug!(
            room = %self.name,
            sender = sender,
            recipients = members.len(),
            "Broadcast"
        );

        members.len()
    }
}
