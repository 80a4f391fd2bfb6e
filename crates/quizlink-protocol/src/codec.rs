//! Codec trait and implementations for serializing/deserializing events.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The rest of the server only sees the [`Codec`] trait, so the wire format
//! can change without touching the hub or the connection handler.
//!
//! Browser clients speak JSON, so [`JsonCodec`] is the only implementation.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{ClientFrame, ProtocolError};

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// - `Send + Sync` → one codec instance is shared by every connection task.
/// - `'static` → it owns everything it needs and lives as long as the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;

    /// Decodes and validates one client frame.
    ///
    /// On failure the error is paired with the frame's `requestId` when
    /// one could still be read, so the caller can address an error reply.
    fn decode_frame(
        &self,
        data: &[u8],
    ) -> Result<ClientFrame, (Option<String>, ProtocolError)> {
        match self.decode::<ClientFrame>(data) {
            Ok(frame) => match frame.event.validate() {
                Ok(()) => Ok(frame),
                Err(e) => Err((frame.request_id, e)),
            },
            Err(e) => {
                let request_id = self
                    .decode::<RequestIdOnly>(data)
                    .ok()
                    .and_then(|r| r.request_id);
                Err((request_id, e))
            }
        }
    }
}

/// Salvages the correlation id from a frame whose event didn't decode.
#[derive(Deserialize)]
struct RequestIdOnly {
    #[serde(default, rename = "requestId")]
    request_id: Option<String>,
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use quizlink_protocol::{ClientEvent, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let frame = codec
///     .decode_frame(br#"{"event":"ping","data":{"clientTime":5}}"#)
///     .unwrap();
/// assert_eq!(frame.event, ClientEvent::Ping { client_time: 5 });
/// assert!(frame.request_id.is_none());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
