//! `QuizlinkServer` builder and accept loop.
//!
//! This is the entry point for running a Quizlink relay. It ties together
//! all the layers: transport → protocol → session → room.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use quizlink_protocol::JsonCodec;
use quizlink_room::{Coordinator, RoomConfig};
use quizlink_transport::{Transport, WebSocketTransport};

use crate::hub::{HubHandle, spawn_hub};
use crate::handler::{ConnectionLimits, handle_connection};
use crate::{QuizlinkError, ServerConfig};

/// Capacity of the hub's command queue.
const HUB_CHANNEL_SIZE: usize = 1024;

/// Builder for configuring and starting a Quizlink server.
///
/// # Example
///
/// ```rust,no_run
/// use quizlink::prelude::*;
///
/// # async fn start() -> Result<(), QuizlinkError> {
/// let server = QuizlinkServer::builder()
///     .bind("0.0.0.0:3001")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct QuizlinkServerBuilder {
    config: ServerConfig,
}

impl QuizlinkServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every setting at once, e.g. with
    /// [`ServerConfig::from_env`].
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Closes connections that send nothing for this long. Off unless
    /// set.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = Some(timeout);
        self
    }

    /// How long a new socket gets to complete the WebSocket upgrade.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// How often idle rooms are swept.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    pub fn room_config(mut self, room: RoomConfig) -> Self {
        self.config.room = room;
        self
    }

    /// Binds the listener and starts the hub.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<QuizlinkServer, QuizlinkError> {
        let ServerConfig {
            bind_addr,
            idle_timeout,
            handshake_timeout,
            sweep_interval,
            room,
        } = self.config;

        let transport = WebSocketTransport::bind(&bind_addr).await?;
        let codec = Arc::new(JsonCodec);
        let hub = spawn_hub(
            Coordinator::new(room),
            Arc::clone(&codec),
            sweep_interval,
            HUB_CHANNEL_SIZE,
        );

        Ok(QuizlinkServer {
            transport,
            hub,
            codec,
            limits: ConnectionLimits {
                handshake_timeout,
                idle_timeout,
            },
        })
    }
}

/// A bound Quizlink server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct QuizlinkServer {
    transport: WebSocketTransport,
    hub: HubHandle,
    codec: Arc<JsonCodec>,
    limits: ConnectionLimits,
}

impl QuizlinkServer {
    /// Creates a new builder.
    pub fn builder() -> QuizlinkServerBuilder {
        QuizlinkServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), QuizlinkError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// Connections already accepted keep running until they close on
    /// their own.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), QuizlinkError> {
        if let Ok(addr) = self.local_addr() {
            tracing::info!(%addr, "Quizlink server running");
        }
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        // The upgrade runs on the spawned task, never here.
                        let hub = self.hub.clone();
                        let codec = Arc::clone(&self.codec);
                        let limits = self.limits;
                        tokio::spawn(async move {
                            if let Err(e) =
                                handle_connection(pending, hub, codec, limits).await
                            {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                },
                () = &mut shutdown => {
                    tracing::info!("shutdown requested, no longer accepting");
                    break;
                }
            }
        }

        Ok(())
    }
}
