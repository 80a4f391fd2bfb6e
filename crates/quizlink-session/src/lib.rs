//! Connection tracking for Quizlink.
//!
//! This crate knows which connections are live, which room each one is
//! subscribed to, and which profile id it joined as. It does not know
//! anything about seats or game rules; that is the room crate's job.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (beside)  ← decides WHAT to broadcast
//!     ↕
//! Session Layer (this crate)  ← decides WHO receives it
//!     ↕
//! Transport Layer (below)  ← provides ConnectionId
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::ConnectionManager;
pub use session::{ConnectionEntry, Membership, OutboundSender};
