//! Room registry for pub/sub routing
//!
//! Publishers broadcast into rooms; each subscriber owns a queue that its
//! connection worker drains.
//!
//! ```text
//!                       Arc<RoomRegistry>
//!                  ┌──────────────────────────┐
//!                  │ rooms: HashMap<String,   │
//!                  │   Arc<Room {             │
//!                  │     members: {id: Sub}   │
//!                  │   }>                     │
//!                  │ >                        │
//!                  └────────────┬─────────────┘
//!                               │
//!         ┌─────────────────────┼─────────────────────┐
//!         │                     │                     │
//!         ▼                     ▼                     ▼
//!    [Publisher]          [Subscriber]          [Subscriber]
//!    room.broadcast()     queue.dequeue()       queue.dequeue()
//!         │                     │                     │
//!         └──► queue.enqueue() ─┴──► conn.send() ──► TCP
//! ```
//!
//! Locks are scoped per registry, per room and per queue; none is held
//! across socket I/O.

pub mod queue;
pub mod room;
pub mod store;
pub mod subscriber;

pub use queue::SubscriberQueue;
pub use room::Room;
pub use store::RoomRegistry;
pub use subscriber::Subscriber;
