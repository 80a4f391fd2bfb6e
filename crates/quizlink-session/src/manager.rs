//! The connection manager: live connections and room broadcast groups.
//!
//! # Concurrency note
//!
//! `ConnectionManager` is NOT thread-safe by itself; it uses plain
//! `HashMap`s. It is owned by the server's hub task, which processes one
//! command at a time, so no locking is needed here.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use quizlink_protocol::{ClientId, Codec, ProtocolError, RoomCode, ServerEvent};
use quizlink_transport::ConnectionId;

use crate::{ConnectionEntry, Membership, OutboundSender, SessionError};

/// Tracks every live connection and the room it is subscribed to.
///
/// ## Lifecycle
///
/// ```text
/// on_connect() ──→ on_join() ──→ on_join(other room) ──→ on_disconnect()
///      │               │                 │                      │
///      ▼               ▼                 ▼                      ▼
///  [no room]      [in room A]   [in room B, A reported]   [gone, B reported]
/// ```
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connections: HashMap<ConnectionId, ConnectionEntry>,

    /// Broadcast groups. Kept in sync with each entry's `membership`.
    /// `BTreeSet` gives a stable delivery order, which keeps logs and
    /// tests predictable.
    rooms: HashMap<RoomCode, BTreeSet<ConnectionId>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection that isn't in any room yet.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if the id is taken.
    pub fn on_connect(
        &mut self,
        conn_id: ConnectionId,
        sender: OutboundSender,
    ) -> Result<(), SessionError> {
        if self.connections.contains_key(&conn_id) {
            return Err(SessionError::AlreadyConnected(conn_id));
        }
        self.connections
            .insert(conn_id, ConnectionEntry::new(sender));
        tracing::debug!(%conn_id, "connection registered");
        Ok(())
    }

    /// Subscribes the connection to `room` as `client_id`.
    ///
    /// A connection is in at most one room. If it was subscribed elsewhere
    /// (or to the same room under another profile id), that membership is
    /// replaced and returned so the caller can release the old seat.
    ///
    /// # Errors
    /// Returns [`SessionError::UnknownConnection`] if the connection isn't
    /// registered.
    pub fn on_join(
        &mut self,
        conn_id: ConnectionId,
        room: RoomCode,
        client_id: ClientId,
    ) -> Result<Option<Membership>, SessionError> {
        let entry = self
            .connections
            .get_mut(&conn_id)
            .ok_or(SessionError::UnknownConnection(conn_id))?;

        let joined = Membership { room, client_id };
        if entry.membership.as_ref() == Some(&joined) {
            return Ok(None);
        }

        let previous = entry.membership.replace(joined.clone());
        if let Some(prev) = &previous {
            Self::unsubscribe(&mut self.rooms, &prev.room, conn_id);
        }
        self.rooms.entry(joined.room.clone()).or_default().insert(conn_id);

        tracing::debug!(
            %conn_id,
            room = %joined.room,
            player = %joined.client_id,
            "connection subscribed"
        );
        Ok(previous)
    }

    /// Unsubscribes the connection from its room without disconnecting it.
    pub fn leave(&mut self, conn_id: ConnectionId) -> Option<Membership> {
        let membership = self.connections.get_mut(&conn_id)?.membership.take()?;
        Self::unsubscribe(&mut self.rooms, &membership.room, conn_id);
        Some(membership)
    }

    /// Forgets the connection and returns the membership it held.
    pub fn on_disconnect(&mut self, conn_id: ConnectionId) -> Option<Membership> {
        let entry = self.connections.remove(&conn_id)?;
        let membership = entry.membership?;
        Self::unsubscribe(&mut self.rooms, &membership.room, conn_id);
        Some(membership)
    }

    /// Whether any live connection in `room` joined as `client_id`.
    ///
    /// A player who reconnects opens a new connection before the old one
    /// times out; the stale connection's disconnect must not free the seat.
    pub fn holds_client(&self, room: &RoomCode, client_id: &ClientId) -> bool {
        self.subscribers(room).any(|conn_id| {
            self.membership(conn_id)
                .is_some_and(|m| &m.client_id == client_id)
        })
    }

    /// Encodes `event` once and queues it for every connection subscribed
    /// to `room`, sender included. Returns how many connections it reached.
    ///
    /// A connection whose task has already exited is skipped; its
    /// disconnect cleans it up.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the event can't be encoded.
    pub fn fan_out<C: Codec>(
        &self,
        room: &RoomCode,
        event: &ServerEvent,
        codec: &C,
    ) -> Result<usize, ProtocolError> {
        let Some(members) = self.rooms.get(room) else {
            return Ok(0);
        };
        let frame: Arc<[u8]> = codec.encode(event)?.into();

        let mut delivered = 0;
        for conn_id in members {
            match self.connections.get(conn_id) {
                Some(entry) if entry.deliver(Arc::clone(&frame)) => {
                    delivered += 1;
                }
                _ => {
                    tracing::debug!(%conn_id, event = event.name(), "skipping closed connection");
                }
            }
        }
        tracing::debug!(room = %room, event = event.name(), delivered, "fan-out");
        Ok(delivered)
    }

    /// Queues `event` for one connection. Returns `false` if the
    /// connection is unknown or already closed.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the event can't be encoded.
    pub fn send_to<C: Codec>(
        &self,
        conn_id: ConnectionId,
        event: &ServerEvent,
        codec: &C,
    ) -> Result<bool, ProtocolError> {
        let Some(entry) = self.connections.get(&conn_id) else {
            return Ok(false);
        };
        let frame: Arc<[u8]> = codec.encode(event)?.into();
        Ok(entry.deliver(frame))
    }

    /// Connections subscribed to `room`, in id order.
    pub fn subscribers(
        &self,
        room: &RoomCode,
    ) -> impl Iterator<Item = ConnectionId> + '_ {
        self.rooms.get(room).into_iter().flatten().copied()
    }

    pub fn membership(&self, conn_id: ConnectionId) -> Option<&Membership> {
        self.connections.get(&conn_id)?.membership()
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn unsubscribe(
        rooms: &mut HashMap<RoomCode, BTreeSet<ConnectionId>>,
        room: &RoomCode,
        conn_id: ConnectionId,
    ) {
        if let Some(members) = rooms.get_mut(room) {
            members.remove(&conn_id);
            if members.is_empty() {
                rooms.remove(room);
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    type Outbox = mpsc::UnboundedReceiver<Arc<[u8]>>;

    fn cid(n: u64) -> ConnectionId {
        ConnectionId::new(n)
    }

    fn connect(mgr: &mut ConnectionManager, n: u64) -> Outbox {
        let (tx, rx) = mpsc::unbounded_channel();
        mgr.on_connect(cid(n), tx).expect("fresh id");
        rx
    }

    #[test]
    fn test_on_connect_duplicate_id_is_rejected() {
        let mut mgr = ConnectionManager::new();
        let _rx = connect(&mut mgr, 1);
        let (tx, _rx2) = mpsc::unbounded_channel();
        assert!(matches!(
            mgr.on_connect(cid(1), tx),
            Err(SessionError::AlreadyConnected(_))
        ));
    }

    #[test]
    fn test_on_join_unknown_connection_is_error() {
        let mut mgr = ConnectionManager::new();
        let result = mgr.on_join(cid(9), "A".into(), "h1".into());
        assert!(matches!(result, Err(SessionError::UnknownConnection(_))));
    }

    #[test]
    fn test_on_join_same_room_twice_reports_nothing() {
        let mut mgr = ConnectionManager::new();
        let _rx = connect(&mut mgr, 1);
        assert_eq!(mgr.on_join(cid(1), "A".into(), "h1".into()).unwrap(), None);
        assert_eq!(mgr.on_join(cid(1), "A".into(), "h1".into()).unwrap(), None);
        assert_eq!(mgr.subscribers(&"A".into()).count(), 1);
    }

    #[test]
    fn test_on_join_other_room_moves_subscription() {
        let mut mgr = ConnectionManager::new();
        let _rx = connect(&mut mgr, 1);
        mgr.on_join(cid(1), "A".into(), "h1".into()).unwrap();

        let previous = mgr.on_join(cid(1), "B".into(), "h1".into()).unwrap();

        assert_eq!(
            previous,
            Some(Membership { room: "A".into(), client_id: "h1".into() })
        );
        assert_eq!(mgr.subscribers(&"A".into()).count(), 0);
        assert_eq!(mgr.subscribers(&"B".into()).collect::<Vec<_>>(), vec![cid(1)]);
    }

    #[test]
    fn test_on_disconnect_returns_membership() {
        let mut mgr = ConnectionManager::new();
        let _rx = connect(&mut mgr, 1);
        mgr.on_join(cid(1), "A".into(), "h1".into()).unwrap();

        let membership = mgr.on_disconnect(cid(1)).expect("was in a room");
        assert_eq!(membership.room.as_str(), "A");
        assert!(mgr.is_empty());
        assert!(mgr.on_disconnect(cid(1)).is_none());
    }

    #[test]
    fn test_leave_keeps_connection() {
        let mut mgr = ConnectionManager::new();
        let _rx = connect(&mut mgr, 1);
        mgr.on_join(cid(1), "A".into(), "h1".into()).unwrap();

        assert!(mgr.leave(cid(1)).is_some());
        assert!(mgr.leave(cid(1)).is_none());
        assert_eq!(mgr.len(), 1);
        assert!(mgr.membership(cid(1)).is_none());
    }

    #[test]
    fn test_holds_client_sees_reconnected_player() {
        let mut mgr = ConnectionManager::new();
        let _old = connect(&mut mgr, 1);
        let _new = connect(&mut mgr, 2);
        mgr.on_join(cid(1), "A".into(), "h1".into()).unwrap();
        mgr.on_join(cid(2), "A".into(), "h1".into()).unwrap();

        mgr.on_disconnect(cid(1));

        assert!(mgr.holds_client(&"A".into(), &"h1".into()));
        assert!(!mgr.holds_client(&"A".into(), &"o1".into()));
        assert!(!mgr.holds_client(&"B".into(), &"h1".into()));
    }

    #[test]
    fn test_send_to_unknown_connection_is_false() {
        let mgr = ConnectionManager::new();
        let event = ServerEvent::Ack { request_id: "r1".into() };
        assert!(!mgr.send_to(cid(1), &event, &quizlink_protocol::JsonCodec).unwrap());
    }
}
