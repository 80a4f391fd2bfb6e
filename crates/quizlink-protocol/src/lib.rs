//! Wire protocol for Quizlink.
//!
//! This crate defines the "language" that quiz clients and the relay speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`Profile`],
//!   [`RoomSnapshot`], ...): the events that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those events
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the room
//! coordinator. It knows nothing about connections or rooms; it only knows
//! how to serialize and deserialize events.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientFrame) → Hub → Room coordinator
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ClientEvent, ClientFrame, ClientId, GameMode, Profile, RoomCode,
    RoomPhase, RoomSnapshot, ServerEvent,
};
