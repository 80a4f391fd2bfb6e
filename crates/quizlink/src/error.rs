//! Unified error type for the Quizlink server.

use quizlink_protocol::ProtocolError;
use quizlink_room::RoomError;
use quizlink_session::SessionError;
use quizlink_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum QuizlinkError {
    /// A transport-level error (bind, accept, handshake, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown or duplicate connection).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (not found, wrong mode, boss defeated).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The server configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The hub task is gone, so no further commands can be processed.
    #[error("hub stopped")]
    HubStopped,
}

impl QuizlinkError {
    /// HTTP-style status for an `error` reply to the client.
    pub fn code(&self) -> u16 {
        match self {
            Self::Protocol(e) => e.code(),
            Self::Room(e) => e.code(),
            Self::Session(_) => 400,
            Self::Transport(_) | Self::Config(_) | Self::HubStopped => 500,
        }
    }
}

/// A configuration value that couldn't be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable is set but doesn't parse.
    #[error("invalid {var}={value:?}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// A value parsed but is out of range.
    #[error("{var} must be {expected}")]
    OutOfRange {
        var: &'static str,
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use quizlink_protocol::RoomCode;
    use quizlink_transport::ConnectionId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::Handshake("missing upgrade header".into());
        let quizlink_err: QuizlinkError = err.into();
        assert!(matches!(quizlink_err, QuizlinkError::Transport(_)));
        assert!(quizlink_err.to_string().contains("missing upgrade header"));
        assert_eq!(quizlink_err.code(), 500);
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let quizlink_err: QuizlinkError = err.into();
        assert!(matches!(quizlink_err, QuizlinkError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::UnknownConnection(ConnectionId::new(3));
        let quizlink_err: QuizlinkError = err.into();
        assert!(matches!(quizlink_err, QuizlinkError::Session(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(RoomCode::from("AB12CD"));
        let quizlink_err: QuizlinkError = err.into();
        assert!(matches!(quizlink_err, QuizlinkError::Room(_)));
        assert_eq!(quizlink_err.to_string(), "room AB12CD not found");
    }

    #[test]
    fn test_config_error_names_variable() {
        let err = ConfigError::InvalidValue {
            var: "QUIZLINK_RAID_SEATS",
            value: "lots".into(),
            reason: "invalid digit found in string".into(),
        };
        let quizlink_err: QuizlinkError = err.into();
        assert!(quizlink_err.to_string().contains("QUIZLINK_RAID_SEATS=\"lots\""));
    }
}
