//! Error types for the session layer.

use quizlink_transport::ConnectionId;

/// Errors raised by the [`ConnectionManager`](crate::ConnectionManager).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No live connection is registered under this id. It either never
    /// connected or has already been cleaned up.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),

    /// A connection with this id is already registered.
    #[error("connection {0} is already registered")]
    AlreadyConnected(ConnectionId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_connection() {
        let err = SessionError::UnknownConnection(ConnectionId::new(7));
        assert_eq!(err.to_string(), "unknown connection conn-7");
    }
}
