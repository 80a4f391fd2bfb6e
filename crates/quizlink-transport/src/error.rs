use std::time::Duration;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Writing a frame to the peer failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading a frame from the peer failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listener or accepting a socket failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The peer sent something that is not a valid upgrade request.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The peer did not finish the handshake in time.
    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_timeout_display() {
        let err = TransportError::HandshakeTimeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "handshake timed out after 10s");
    }
}
