//! Room registry and coordination for Quizlink.
//!
//! Rooms are plain data owned by a [`Coordinator`]; there is no per-room
//! task. The server drives the coordinator from a single task, so every
//! operation runs to completion before the next one starts.
//!
//! # Key types
//!
//! - [`Coordinator`]: join, start, score/damage/chat relays, leave
//! - [`RoomRegistry`]: room code → [`Room`] table with idle eviction
//! - [`Room`]: seats, mode, boss pool, lifecycle phase
//! - [`RoomConfig`]: seat counts, boss hit points, idle TTL

mod config;
mod coordinator;
mod error;
mod registry;
mod room;

pub use config::RoomConfig;
pub use coordinator::Coordinator;
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{JoinOutcome, Room};
