//! Room registry
//!
//! Process-wide map from room name to room. `find_or_create` is the only
//! path that inserts, and it holds the map lock across lookup and insert,
//! so concurrent callers asking for the same name always get the same room.
//! Rooms are never removed.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::room::Room;

/// Central registry of all rooms
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Arc<Room>>>,
}

impl RoomRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the room with this name, creating it on first reference
    pub async fn find_or_create(&self, name: &str) -> Arc<Room> {
        let mut rooms = self.rooms.lock().await;

        if let Some(room) = rooms.get(name) {
            return Arc::clone(room);
        }

        let room = Arc::new(Room::new(name));
        rooms.insert(name.to_string(), Arc::clone(&room));

        tracing::info!(room = name, rooms = rooms.len(), "Room created");
        room
    }

    /// Look up a room without creating it
    pub async fn get(&self, name: &str) -> Option<Arc<Room>> {
        self.rooms.lock().await.get(name).cloned()
    }

    /// Number of rooms
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Names of all rooms, sorted
    pub async fn room_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rooms.lock().await.keys().cloned().collect();
        names.sort();
        names
    }
}
