//! # Quizlink
//!
//! Real-time room relay for two-player quiz battles and cooperative raids.
//!
//! Clients connect over WebSocket, join a room by code, and exchange
//! scores, boss damage and chat. The server keeps only what it has to
//! (seats, mode, boss hit points) and relays everything else verbatim.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quizlink::prelude::*;
//!
//! # async fn start() -> Result<(), QuizlinkError> {
//! let config = ServerConfig::from_env()?;
//! let server = QuizlinkServer::builder().config(config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod hub;
mod server;

pub use config::ServerConfig;
pub use error::{ConfigError, QuizlinkError};
pub use server::{QuizlinkServer, QuizlinkServerBuilder};

/// Everything needed to embed a server or talk its protocol.
pub mod prelude {
    pub use crate::{
        ConfigError, QuizlinkError, QuizlinkServer, QuizlinkServerBuilder,
        ServerConfig,
    };
    pub use quizlink_protocol::{
        ClientEvent, ClientFrame, ClientId, Codec, GameMode, JsonCodec,
        Profile, ProtocolError, RoomCode, RoomPhase, RoomSnapshot,
        ServerEvent,
    };
    pub use quizlink_room::{RoomConfig, RoomError};
    pub use quizlink_session::SessionError;
    pub use quizlink_transport::TransportError;
}
