//! Per-connection records kept by the connection manager.
//!
//! An entry tracks:
//! - WHERE frames for this connection go (its outbound channel)
//! - WHICH room it is subscribed to, if any
//! - WHO it joined as (the profile id from its last `join_room`)

use std::sync::Arc;

use quizlink_protocol::{ClientId, RoomCode};
use tokio::sync::mpsc;

/// Sending half of a connection's outbound queue.
///
/// Frames are `Arc<[u8]>` so one encoded broadcast is shared by every
/// recipient instead of being copied per connection. The queue is
/// unbounded: the hub must never block on a slow client.
pub type OutboundSender = mpsc::UnboundedSender<Arc<[u8]>>;

/// The room a connection is subscribed to and the profile id it joined as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub room: RoomCode,
    pub client_id: ClientId,
}

/// One live connection.
#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    pub(crate) sender: OutboundSender,
    pub(crate) membership: Option<Membership>,
}

impl ConnectionEntry {
    pub(crate) fn new(sender: OutboundSender) -> Self {
        Self {
            sender,
            membership: None,
        }
    }

    /// The room and profile this connection joined with, if it has joined.
    pub fn membership(&self) -> Option<&Membership> {
        self.membership.as_ref()
    }

    /// Queues a frame for delivery. Returns `false` if the connection's
    /// task has already gone away.
    pub fn deliver(&self, frame: Arc<[u8]>) -> bool {
        self.sender.send(frame).is_ok()
    }
}
