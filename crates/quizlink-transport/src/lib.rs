//! Transport abstraction layer for Quizlink.
//!
//! Provides the [`Transport`] and [`Connection`] traits so the relay server
//! never touches sockets directly. A connection is identified by an opaque
//! [`ConnectionId`] assigned here, at accept time; it has nothing to do with
//! the profile id a client picks for itself.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    WebSocketConnection, WebSocketTransport, WebSocketUpgrade,
};

use std::fmt;
use std::time::Duration;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// An accepted socket whose handshake has not run yet.
    type Pending: PendingConnection<
            Connection = Self::Connection,
            Error = Self::Error,
        >;
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming socket.
    ///
    /// This returns as soon as the socket is accepted. The protocol
    /// handshake is left to [`PendingConnection::upgrade`], so a peer
    /// that never completes it cannot hold up the accept loop.
    async fn accept(&mut self) -> Result<Self::Pending, Self::Error>;
}

/// A socket that still has to finish its protocol handshake.
pub trait PendingConnection: Send + 'static {
    /// The connection produced once the handshake succeeds.
    type Connection: Connection;
    /// The error type for the handshake.
    type Error: std::error::Error + Send + Sync;

    /// The identifier the finished connection will carry.
    fn id(&self) -> ConnectionId;

    /// Runs the handshake. Callers bound this with a timeout.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive frames.
///
/// `send` and `recv` may be driven concurrently from the same task (for
/// example from two arms of a `tokio::select!`); implementations must not
/// make one wait on the other.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Time since the peer last sent anything.
    ///
    /// Protocol-level keepalives (WebSocket ping and pong) count as
    /// traffic here even though `recv` never yields them.
    fn idle_for(&self) -> Duration;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_orders_by_allocation() {
        assert!(ConnectionId::new(1) < ConnectionId::new(2));
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "AB12CD");
        map.insert(ConnectionId::new(2), "ZZ99XX");
        assert_eq!(map[&ConnectionId::new(1)], "AB12CD");
    }
}
