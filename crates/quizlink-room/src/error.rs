//! Error types for the room layer.

use quizlink_protocol::{GameMode, RoomCode};

/// Errors that can occur during room operations.
///
/// None of these are fatal: the hub logs them, and only reports them back
/// when the client asked for an acknowledgement.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room is registered under this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The operation only applies to another mode, e.g. boss damage sent
    /// to a `BATTLE` room.
    #[error("room {room} is a {mode} room")]
    ModeMismatch { room: RoomCode, mode: GameMode },

    /// The raid boss is already at zero hit points.
    #[error("boss in room {0} is already defeated")]
    BossDefeated(RoomCode),
}

impl RoomError {
    /// HTTP-style status used when reporting this error to a client.
    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::ModeMismatch { .. } | Self::BossDefeated(_) => 409,
        }
    }
}
