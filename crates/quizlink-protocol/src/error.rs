//! Error types for the protocol layer.
//!
//! Each crate in Quizlink defines its own error enum. A `ProtocolError`
//! always means "these bytes are not a valid event", never a room or
//! network problem.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning an event into bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed: malformed JSON, unknown event name,
    /// missing required fields, or wrong field types.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The frame decoded but breaks a protocol rule, e.g. an empty
    /// `roomId` or a profile without an id.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ProtocolError {
    /// HTTP-style status used when reporting this error to a client.
    pub fn code(&self) -> u16 {
        match self {
            Self::Encode(_) => 500,
            Self::Decode(_) | Self::InvalidMessage(_) => 400,
        }
    }
}
