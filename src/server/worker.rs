//! Per-connection worker
//!
//! One worker task runs per accepted connection and drives the session
//! state machine to completion. Errors end only this worker; the accept loop
//! and other workers are unaffected.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;

use crate::error::Result;
use crate::protocol::constants::{replies, DELIMITER, MAX_LEN};
use crate::protocol::message::delivery_payload_len;
use crate::protocol::{Connection, Message, Tag};
use crate::registry::{Room, RoomRegistry, Subscriber};
use crate::session::{Role, SessionState};
use crate::stats::ServerMetrics;

/// Shared handles every worker receives from the server
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub registry: Arc<RoomRegistry>,
    pub metrics: Arc<ServerMetrics>,
    pub dequeue_timeout: Duration,
    /// Flips to `true` when the server shuts down
    pub shutdown: watch::Receiver<bool>,
}

/// Drives one connection from login to close
pub struct Worker<S> {
    conn: Connection<S>,
    state: SessionState,
    ctx: WorkerContext,
}

impl<S> Worker<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(session_id: u64, peer_addr: SocketAddr, stream: S, ctx: WorkerContext) -> Self {
        Self {
            conn: Connection::new(stream),
            state: SessionState::new(session_id, peer_addr),
            ctx,
        }
    }

    /// Run the session to completion, then release the stream
    pub async fn run(mut self) -> Result<()> {
        let result = self.run_session().await;

        self.state.close();
        self.conn.close().await;

        tracing::debug!(
            session_id = self.state.id,
            peer = %self.state.peer_addr,
            received = self.state.messages_received,
            sent = self.state.messages_sent,
            duration_ms = self.state.duration().as_millis() as u64,
            "Session closed"
        );

        result
    }

    async fn run_session(&mut self) -> Result<()> {
        let role = match self.await_login().await? {
            Some(role) => role,
            None => return Ok(()),
        };

        match role {
            Role::Publisher => self.publisher_loop().await,
            Role::Subscriber => {
                let subscriber = Arc::new(Subscriber::new(self.state.id, self.state.username()));
                match self.await_join(&subscriber).await? {
                    Some(room) => self.subscriber_loop(&room, &subscriber).await,
                    // Never added to a room; dropped here
                    None => Ok(()),
                }
            }
        }
    }

    /// First message must be `slogin` or `rlogin` with a username
    async fn await_login(&mut self) -> Result<Option<Role>> {
        let msg = match self.receive().await {
            Ok(msg) => msg,
            Err(e) => {
                self.reply_best_effort(Message::err(replies::INVALID_LOGIN))
                    .await;
                return Err(e);
            }
        };

        let role = match msg.tag {
            Tag::LoginPublish => Role::Publisher,
            Tag::LoginSubscribe => Role::Subscriber,
            other => {
                tracing::warn!(
                    session_id = self.state.id,
                    tag = %other,
                    "Expected login"
                );
                self.reply_best_effort(Message::err(replies::EXPECTED_LOGIN))
                    .await;
                return Ok(None);
            }
        };

        if let Some(reason) = name_error(
            &msg.payload,
            replies::MISSING_USERNAME,
            replies::INVALID_USERNAME,
        ) {
            self.reply_best_effort(Message::err(reason)).await;
            return Ok(None);
        }

        self.state.on_login(role, msg.payload);
        match role {
            Role::Publisher => self.ctx.metrics.publisher_login(),
            Role::Subscriber => self.ctx.metrics.subscriber_login(),
        }
        self.reply(Message::ok()).await?;

        tracing::info!(
            session_id = self.state.id,
            username = self.state.username(),
            role = %role,
            "Logged in"
        );

        Ok(Some(role))
    }

    /// Sender commands until `quit` or disconnect
    async fn publisher_loop(&mut self) -> Result<()> {
        let username = self.state.username().to_string();
        let mut current: Option<Arc<Room>> = None;

        loop {
            let msg = match self.receive().await {
                Ok(msg) => msg,
                Err(e) if e.is_disconnect() => {
                    tracing::debug!(session_id = self.state.id, "Publisher disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            tracing::debug!(
                session_id = self.state.id,
                tag = %msg.tag,
                "Publisher command"
            );

            match msg.tag {
                Tag::Join => {
                    if let Some(reason) =
                        name_error(&msg.payload, replies::MISSING_ROOM, replies::INVALID_ROOM)
                    {
                        self.reply(Message::err(reason)).await?;
                        continue;
                    }
                    let room = self.ctx.registry.find_or_create(&msg.payload).await;
                    self.state.on_join(room.name());
                    current = Some(room);
                    self.reply(Message::ok()).await?;
                }
                Tag::SendAll => {
                    let reply = match &current {
                        None => Message::err(replies::NOT_IN_ROOM),
                        Some(room)
                            if delivery_payload_len(room.name(), &username, &msg.payload)
                                > MAX_LEN =>
                        {
                            Message::err(replies::MESSAGE_TOO_LONG)
                        }
                        Some(room) => {
                            room.broadcast(&username, &msg.payload).await;
                            self.ctx.metrics.broadcast();
                            Message::ok()
                        }
                    };
                    self.reply(reply).await?;
                }
                Tag::Leave => {
                    current = None;
                    self.state.on_leave();
                    self.reply(Message::ok()).await?;
                }
                Tag::Quit => {
                    self.reply(Message::ok()).await?;
                    return Ok(());
                }
                Tag::LoginPublish | Tag::LoginSubscribe | Tag::Ok | Tag::Err | Tag::Delivery => {
                    self.reply(Message::err(replies::INVALID_COMMAND)).await?;
                }
            }
        }
    }

    /// Receiver's next message must be `join`; on success it becomes a member
    async fn await_join(&mut self, subscriber: &Arc<Subscriber>) -> Result<Option<Arc<Room>>> {
        let msg = match self.receive().await {
            Ok(msg) if msg.tag == Tag::Join => msg,
            Ok(msg) => {
                tracing::warn!(
                    session_id = self.state.id,
                    tag = %msg.tag,
                    "Expected join"
                );
                self.reply_best_effort(Message::err(replies::EXPECTED_JOIN))
                    .await;
                return Ok(None);
            }
            Err(e) => {
                self.reply_best_effort(Message::err(replies::EXPECTED_JOIN))
                    .await;
                return Err(e);
            }
        };

        if let Some(reason) =
            name_error(&msg.payload, replies::MISSING_ROOM, replies::INVALID_ROOM)
        {
            self.reply_best_effort(Message::err(reason)).await;
            return Ok(None);
        }

        let room = self.ctx.registry.find_or_create(&msg.payload).await;
        room.add_member(Arc::clone(subscriber)).await;
        self.state.on_join(room.name());

        if let Err(e) = self.reply(Message::ok()).await {
            room.remove_member(subscriber).await;
            return Err(e);
        }

        tracing::info!(
            session_id = self.state.id,
            username = subscriber.username(),
            room = room.name(),
            "Subscriber joined"
        );

        Ok(Some(room))
    }

    /// Forward queued deliveries until the connection fails or the server
    /// shuts down. Membership is always removed before returning.
    async fn subscriber_loop(&mut self, room: &Room, subscriber: &Subscriber) -> Result<()> {
        let timeout = self.ctx.dequeue_timeout;

        let result = loop {
            if *self.ctx.shutdown.borrow() {
                tracing::debug!(session_id = self.state.id, "Shutdown, leaving room");
                break Ok(());
            }

            let delivery = match subscriber.queue().dequeue(timeout).await {
                Some(delivery) => delivery,
                None => continue,
            };

            if let Err(e) = self.send(&delivery).await {
                tracing::debug!(
                    session_id = self.state.id,
                    error = %e,
                    "Subscriber disconnected"
                );
                break if e.is_disconnect() { Ok(()) } else { Err(e) };
            }
            self.ctx.metrics.delivery_sent();
        };

        room.remove_member(subscriber).await;
        result
    }

    async fn receive(&mut self) -> Result<Message> {
        let msg = self.conn.receive().await?;
        self.state.messages_received += 1;
        Ok(msg)
    }

    async fn send(&mut self, msg: &Message) -> Result<()> {
        self.conn.send(msg).await?;
        self.state.messages_sent += 1;
        Ok(())
    }

    async fn reply(&mut self, msg: Message) -> Result<()> {
        self.send(&msg).await
    }

    /// Reply on a connection that is about to close; failure is expected
    /// when the peer is already gone
    async fn reply_best_effort(&mut self, msg: Message) {
        if let Err(e) = self.reply(msg).await {
            tracing::trace!(session_id = self.state.id, error = %e, "Final reply not sent");
        }
    }
}

/// Reply text for a username or room name that cannot be carried in a
/// `room:sender:text` delivery
fn name_error(name: &str, missing: &'static str, invalid: &'static str) -> Option<&'static str> {
    if name.is_empty() {
        Some(missing)
    } else if name.contains(DELIMITER) {
        Some(invalid)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::task::JoinHandle;

    use super::*;

    struct Harness {
        registry: Arc<RoomRegistry>,
        metrics: Arc<ServerMetrics>,
        shutdown: watch::Sender<bool>,
        next_id: u64,
    }

    impl Harness {
        fn new() -> Self {
            let (shutdown, _) = watch::channel(false);
            Self {
                registry: Arc::new(RoomRegistry::new()),
                metrics: Arc::new(ServerMetrics::new()),
                shutdown,
                next_id: 1,
            }
        }

        fn connect(&mut self) -> (Connection<DuplexStream>, JoinHandle<Result<()>>) {
            let (client, worker) = self.connect_raw();
            (Connection::new(client), worker)
        }

        /// Spawn a worker and return the client end of its stream
        fn connect_raw(&mut self) -> (DuplexStream, JoinHandle<Result<()>>) {
            let (client, server) = duplex(4096);
            let ctx = WorkerContext {
                registry: Arc::clone(&self.registry),
                metrics: Arc::clone(&self.metrics),
                dequeue_timeout: Duration::from_millis(20),
                shutdown: self.shutdown.subscribe(),
            };
            let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 40000);
            let worker = Worker::new(self.next_id, addr, server, ctx);
            self.next_id += 1;

            (client, tokio::spawn(worker.run()))
        }
    }

    /// Everything the worker writes until it closes its end
    async fn read_to_close(raw: &mut DuplexStream) -> String {
        let mut out = Vec::new();
        raw.read_to_end(&mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    async fn request(conn: &mut Connection<DuplexStream>, tag: Tag, payload: &str) -> Message {
        conn.send(&Message::new(tag, payload)).await.unwrap();
        conn.receive().await.unwrap()
    }

    #[tokio::test]
    async fn test_first_message_must_be_login() {
        let mut h = Harness::new();
        let (mut conn, worker) = h.connect();

        let reply = request(&mut conn, Tag::SendAll, "hi").await;
        assert_eq!(reply, Message::err(replies::EXPECTED_LOGIN));

        // Connection closes
        assert!(conn.receive().await.is_err());
        assert!(worker.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_malformed_login_replies_err() {
        let mut h = Harness::new();
        let (mut raw, worker) = h.connect_raw();

        raw.write_all(b"hello world\n").await.unwrap();
        let mut conn = Connection::new(raw);
        assert_eq!(
            conn.receive().await.unwrap(),
            Message::err(replies::INVALID_LOGIN)
        );

        assert!(worker.await.unwrap().is_err());
        assert_eq!(h.metrics.snapshot().publisher_logins, 0);
    }

    #[tokio::test]
    async fn test_empty_username_rejected() {
        let mut h = Harness::new();
        let (mut conn, worker) = h.connect();

        let reply = request(&mut conn, Tag::LoginPublish, "").await;
        assert_eq!(reply, Message::err(replies::MISSING_USERNAME));

        assert!(conn.receive().await.is_err());
        worker.await.unwrap().unwrap();
        assert_eq!(h.metrics.snapshot().publisher_logins, 0);
    }

    #[tokio::test]
    async fn test_username_with_delimiter_rejected() {
        let mut h = Harness::new();
        let (mut conn, worker) = h.connect();

        let reply = request(&mut conn, Tag::LoginSubscribe, "a:b").await;
        assert_eq!(reply, Message::err(replies::INVALID_USERNAME));

        assert!(conn.receive().await.is_err());
        worker.await.unwrap().unwrap();
        assert_eq!(h.metrics.snapshot().subscriber_logins, 0);
    }

    #[tokio::test]
    async fn test_publisher_eof_closes_without_reply() {
        let mut h = Harness::new();
        let (mut raw, worker) = h.connect_raw();

        raw.write_all(b"slogin:alice\njoin:lobby\n").await.unwrap();
        raw.shutdown().await.unwrap();

        assert_eq!(read_to_close(&mut raw).await, "ok:\nok:\n");
        worker.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_publisher_malformed_line_closes_without_reply() {
        let mut h = Harness::new();
        let (mut raw, worker) = h.connect_raw();

        raw.write_all(b"slogin:alice\nhello world\n").await.unwrap();

        assert_eq!(read_to_close(&mut raw).await, "ok:\n");
        assert!(worker.await.unwrap().is_err());
        assert_eq!(h.registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_oversized_room_name_is_never_created() {
        let mut h = Harness::new();
        let (mut raw, worker) = h.connect_raw();

        let line = format!("slogin:alice\njoin:{}\n", "r".repeat(MAX_LEN + 5));
        raw.write_all(line.as_bytes()).await.unwrap();

        assert_eq!(read_to_close(&mut raw).await, "ok:\n");
        assert!(worker.await.unwrap().is_err());
        assert_eq!(h.registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_publisher_room_with_delimiter_rejected() {
        let mut h = Harness::new();
        let (mut conn, _worker) = h.connect();

        request(&mut conn, Tag::LoginPublish, "alice").await;
        assert_eq!(
            request(&mut conn, Tag::Join, "a:b").await,
            Message::err(replies::INVALID_ROOM)
        );
        assert_eq!(h.registry.room_count().await, 0);

        // Connection stays usable
        assert_eq!(request(&mut conn, Tag::Join, "lobby").await, Message::ok());
    }

    #[tokio::test]
    async fn test_publisher_commands() {
        let mut h = Harness::new();
        let (mut conn, worker) = h.connect();

        assert_eq!(request(&mut conn, Tag::LoginPublish, "alice").await, Message::ok());
        assert_eq!(
            request(&mut conn, Tag::SendAll, "early").await,
            Message::err(replies::NOT_IN_ROOM)
        );
        assert_eq!(
            request(&mut conn, Tag::Join, "").await,
            Message::err(replies::MISSING_ROOM)
        );
        assert_eq!(request(&mut conn, Tag::Join, "lobby").await, Message::ok());
        assert_eq!(request(&mut conn, Tag::SendAll, "hi").await, Message::ok());
        assert_eq!(
            request(&mut conn, Tag::Delivery, "x").await,
            Message::err(replies::INVALID_COMMAND)
        );
        assert_eq!(request(&mut conn, Tag::Leave, "").await, Message::ok());
        assert_eq!(
            request(&mut conn, Tag::SendAll, "late").await,
            Message::err(replies::NOT_IN_ROOM)
        );
        assert_eq!(request(&mut conn, Tag::Quit, "bye").await, Message::ok());

        worker.await.unwrap().unwrap();
        assert!(h.registry.get("lobby").await.is_some());

        let stats = h.metrics.snapshot();
        assert_eq!(stats.publisher_logins, 1);
        assert_eq!(stats.broadcasts, 1);
    }

    #[tokio::test]
    async fn test_sendall_too_long_for_delivery() {
        let mut h = Harness::new();
        let (mut conn, _worker) = h.connect();

        request(&mut conn, Tag::LoginPublish, "alice").await;
        request(&mut conn, Tag::Join, "lobby").await;

        let text = "x".repeat(MAX_LEN);
        assert_eq!(
            request(&mut conn, Tag::SendAll, &text).await,
            Message::err(replies::MESSAGE_TOO_LONG)
        );
        // Still usable afterwards
        assert_eq!(request(&mut conn, Tag::SendAll, "short").await, Message::ok());
    }

    #[tokio::test]
    async fn test_subscriber_must_join_next() {
        let mut h = Harness::new();
        let (mut conn, worker) = h.connect();

        assert_eq!(request(&mut conn, Tag::LoginSubscribe, "bob").await, Message::ok());
        assert_eq!(
            request(&mut conn, Tag::SendAll, "hi").await,
            Message::err(replies::EXPECTED_JOIN)
        );

        worker.await.unwrap().unwrap();
        assert_eq!(h.registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_subscriber_eof_before_join() {
        let mut h = Harness::new();
        let (mut raw, worker) = h.connect_raw();

        raw.write_all(b"rlogin:bob\n").await.unwrap();
        raw.shutdown().await.unwrap();

        assert_eq!(
            read_to_close(&mut raw).await,
            format!("ok:\nerr:{}\n", replies::EXPECTED_JOIN)
        );
        assert!(worker.await.unwrap().is_err());
        assert_eq!(h.registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_subscriber_empty_room_closes() {
        let mut h = Harness::new();
        let (mut conn, worker) = h.connect();

        assert_eq!(request(&mut conn, Tag::LoginSubscribe, "bob").await, Message::ok());
        assert_eq!(
            request(&mut conn, Tag::Join, "").await,
            Message::err(replies::MISSING_ROOM)
        );

        assert!(conn.receive().await.is_err());
        worker.await.unwrap().unwrap();
        assert_eq!(h.registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_subscriber_room_with_delimiter_closes() {
        let mut h = Harness::new();
        let (mut conn, worker) = h.connect();

        request(&mut conn, Tag::LoginSubscribe, "bob").await;
        assert_eq!(
            request(&mut conn, Tag::Join, "a:b").await,
            Message::err(replies::INVALID_ROOM)
        );

        assert!(conn.receive().await.is_err());
        worker.await.unwrap().unwrap();
        assert_eq!(h.registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_broadcast_and_leaves_on_disconnect() {
        let mut h = Harness::new();
        let (mut sub, sub_worker) = h.connect();

        request(&mut sub, Tag::LoginSubscribe, "bob").await;
        assert_eq!(request(&mut sub, Tag::Join, "lobby").await, Message::ok());

        let room = h.registry.get("lobby").await.unwrap();
        assert_eq!(room.member_count().await, 1);

        room.broadcast("alice", "hi").await;
        assert_eq!(
            sub.receive().await.unwrap(),
            Message::delivery("lobby", "alice", "hi")
        );

        // Drop the client; the next delivery fails and the worker cleans up
        drop(sub);
        room.broadcast("alice", "anyone?").await;
        sub_worker.await.unwrap().unwrap();

        assert_eq!(room.member_count().await, 0);
    }

    #[tokio::test]
    async fn test_subscriber_exits_on_shutdown() {
        let mut h = Harness::new();
        let (mut sub, worker) = h.connect();

        request(&mut sub, Tag::LoginSubscribe, "bob").await;
        request(&mut sub, Tag::Join, "lobby").await;

        h.shutdown.send_replace(true);
        worker.await.unwrap().unwrap();

        let room = h.registry.get("lobby").await.unwrap();
        assert_eq!(room.member_count().await, 0);
        assert!(sub.receive().await.is_err());
    }
}
