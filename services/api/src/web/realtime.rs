//! services/api/src/web/realtime.rs
//!
//! The live socket registry. Each connection owns a bounded outbound queue
//! drained by its writer task; a connection may join the room named after its
//! user id so that targeted events reach every tab that user has open.

use std::collections::HashSet;

use dashmap::DashMap;
use notice_board_core::broadcast::RealtimeEvent;
use notice_board_core::ports::RealtimeService;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub type ConnectionId = Uuid;

#[derive(Debug)]
pub struct SocketHub {
    /// Connection id → outbound queue.
    connections: DashMap<ConnectionId, mpsc::Sender<String>>,
    /// User id → connections that joined that user's room.
    rooms: DashMap<Uuid, HashSet<ConnectionId>>,
    /// Reverse index: connection id → the room it joined.
    memberships: DashMap<ConnectionId, Uuid>,
    buffer_size: usize,
    shutdown: CancellationToken,
}

impl SocketHub {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
            memberships: DashMap::new(),
            buffer_size: buffer_size.max(1),
            shutdown: CancellationToken::new(),
        }
    }

    /// Registers a connection and returns the receiving end of its queue.
    pub fn register(&self) -> (ConnectionId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let conn_id = Uuid::new_v4();
        self.connections.insert(conn_id, tx);
        info!(conn_id = %conn_id, total = self.connections.len(), "Socket connected");
        (conn_id, rx)
    }

    /// Puts the connection in `user_id`'s room, leaving any room it was in.
    pub fn join(&self, conn_id: ConnectionId, user_id: Uuid) {
        if !self.connections.contains_key(&conn_id) {
            return;
        }
        if let Some(previous) = self.memberships.insert(conn_id, user_id) {
            if previous == user_id {
                return;
            }
            self.leave_room(previous, conn_id);
        }
        self.rooms.entry(user_id).or_default().insert(conn_id);
        debug!(conn_id = %conn_id, user_id = %user_id, "Socket joined room");
    }

    /// Drops the connection and prunes it from its room.
    pub fn unregister(&self, conn_id: ConnectionId) {
        if self.connections.remove(&conn_id).is_none() {
            return;
        }
        if let Some((_, user_id)) = self.memberships.remove(&conn_id) {
            self.leave_room(user_id, conn_id);
        }
        info!(conn_id = %conn_id, total = self.connections.len(), "Socket disconnected");
    }

    /// Queues a raw frame for a single connection.
    pub fn send_to_connection(&self, conn_id: ConnectionId, payload: &str) {
        self.deliver([conn_id], payload);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn room_size(&self, user_id: Uuid) -> usize {
        self.rooms.get(&user_id).map(|r| r.len()).unwrap_or(0)
    }

    /// Cancelled once the server starts shutting down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn shutdown(&self) {
        info!(open = self.connections.len(), "Closing realtime connections");
        self.shutdown.cancel();
    }

    fn leave_room(&self, user_id: Uuid, conn_id: ConnectionId) {
        if let Some(mut room) = self.rooms.get_mut(&user_id) {
            room.remove(&conn_id);
            if room.is_empty() {
                drop(room);
                self.rooms.remove_if(&user_id, |_, r| r.is_empty());
            }
        }
    }

    /// Queues `payload` on every listed connection; full queues drop the
    /// message, closed ones are unregistered afterwards.
    fn deliver<I>(&self, targets: I, payload: &str)
    where
        I: IntoIterator<Item = ConnectionId>,
    {
        let mut dead = Vec::new();
        for conn_id in targets {
            let Some(sender) = self.connections.get(&conn_id) else {
                continue;
            };
            match sender.try_send(payload.to_owned()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(conn_id = %conn_id, "Socket send buffer full, dropping message");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => dead.push(conn_id),
            }
        }
        for conn_id in dead {
            self.unregister(conn_id);
        }
    }

    fn encode(event: &RealtimeEvent) -> Option<String> {
        serde_json::to_string(event)
            .map_err(|e| error!(event = event.name(), "Failed to serialize realtime event: {e}"))
            .ok()
    }
}

impl RealtimeService for SocketHub {
    fn broadcast(&self, event: &RealtimeEvent) {
        let Some(payload) = Self::encode(event) else {
            return;
        };
        let targets: Vec<ConnectionId> = self.connections.iter().map(|c| *c.key()).collect();
        debug!(event = event.name(), recipients = targets.len(), "Broadcasting");
        self.deliver(targets, &payload);
    }

    fn send_to_user(&self, user_id: Uuid, event: &RealtimeEvent) {
        let targets: Vec<ConnectionId> = match self.rooms.get(&user_id) {
            Some(room) => room.iter().copied().collect(),
            None => return,
        };
        let Some(payload) = Self::encode(event) else {
            return;
        };
        debug!(event = event.name(), user_id = %user_id, recipients = targets.len(), "Sending to room");
        self.deliver(targets, &payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deleted() -> RealtimeEvent {
        RealtimeEvent::CommentDeleted {
            comment_id: Uuid::nil(),
        }
    }

    #[test]
    fn broadcast_reaches_every_connection() {
        let hub = SocketHub::new(8);
        let (_a, mut rx_a) = hub.register();
        let (_b, mut rx_b) = hub.register();

        hub.broadcast(&RealtimeEvent::NoticeUpdate);

        assert_eq!(rx_a.try_recv().unwrap(), r#"{"event":"notice-update"}"#);
        assert_eq!(rx_b.try_recv().unwrap(), r#"{"event":"notice-update"}"#);
    }

    #[test]
    fn send_to_user_only_reaches_that_room() {
        let hub = SocketHub::new(8);
        let alice = Uuid::new_v4();
        let (conn_a, mut rx_a) = hub.register();
        let (conn_b, mut rx_b) = hub.register();
        let (_anon, mut rx_anon) = hub.register();
        hub.join(conn_a, alice);
        hub.join(conn_b, Uuid::new_v4());

        hub.send_to_user(alice, &deleted());

        let payload: serde_json::Value = serde_json::from_str(&rx_a.try_recv().unwrap()).unwrap();
        assert_eq!(payload["event"], "comment-deleted");
        assert!(payload["data"]["commentId"].is_string());
        assert!(rx_b.try_recv().is_err());
        assert!(rx_anon.try_recv().is_err());
    }

    #[test]
    fn rejoining_moves_the_connection_between_rooms() {
        let hub = SocketHub::new(8);
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());
        let (conn, _rx) = hub.register();

        hub.join(conn, first);
        hub.join(conn, second);

        assert_eq!(hub.room_size(first), 0);
        assert_eq!(hub.room_size(second), 1);
    }

    #[test]
    fn closed_connections_are_pruned_on_send() {
        let hub = SocketHub::new(8);
        let user = Uuid::new_v4();
        let (conn, rx) = hub.register();
        hub.join(conn, user);
        drop(rx);

        hub.send_to_user(user, &RealtimeEvent::NotificationUpdate);

        assert_eq!(hub.connection_count(), 0);
        assert_eq!(hub.room_size(user), 0);
    }

    #[test]
    fn full_queue_drops_message_but_keeps_connection() {
        let hub = SocketHub::new(1);
        let (_conn, mut rx) = hub.register();

        hub.broadcast(&RealtimeEvent::NoticeUpdate);
        hub.broadcast(&RealtimeEvent::NotificationUpdate);

        assert_eq!(hub.connection_count(), 1);
        assert_eq!(rx.try_recv().unwrap(), r#"{"event":"notice-update"}"#);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn shutdown_cancels_handed_out_tokens() {
        let hub = SocketHub::new(8);
        let token = hub.shutdown_token();
        hub.shutdown();
        assert!(token.is_cancelled());
    }
}
