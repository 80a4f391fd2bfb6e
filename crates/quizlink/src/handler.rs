//! Per-connection handler: decode inbound frames, write outbound ones.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Finish the WebSocket upgrade within `handshake_timeout`
//!   2. Register with the hub, handing it the outbound queue
//!   3. Loop: forward decoded frames to the hub, write queued frames to
//!      the socket, and (if configured) close after `idle_timeout`
//!      without inbound traffic
//!   4. On exit (clean or not) the guard tells the hub we're gone

use std::sync::Arc;
use std::time::Duration;

use quizlink_protocol::Codec;
use quizlink_transport::{
    Connection, ConnectionId, PendingConnection, TransportError,
    WebSocketUpgrade,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::QuizlinkError;
use crate::hub::HubHandle;

/// Drop guard that reports the disconnect when the handler exits.
///
/// This ensures the seat is released even if the handler returns early
/// with an error or panics.
struct DisconnectGuard {
    conn_id: ConnectionId,
    hub: HubHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        self.hub.disconnect_now(self.conn_id);
    }
}

/// Per-connection timing, copied out of `ServerConfig`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConnectionLimits {
    pub handshake_timeout: Duration,
    pub idle_timeout: Option<Duration>,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    pending: WebSocketUpgrade,
    hub: HubHandle,
    codec: Arc<C>,
    limits: ConnectionLimits,
) -> Result<(), QuizlinkError> {
    let conn_id = pending.id();
    let conn = tokio::time::timeout(limits.handshake_timeout, pending.upgrade())
        .await
        .map_err(|_| TransportError::HandshakeTimeout(limits.handshake_timeout))??;
    tracing::info!(%conn_id, "client connected");

    let (sender, mut outbound) = mpsc::unbounded_channel();
    hub.connect(conn_id, sender).await?;
    let _guard = DisconnectGuard {
        conn_id,
        hub: hub.clone(),
    };

    // With no idle timeout the deadline arm is disabled and never polled.
    let idle_timeout = limits.idle_timeout;
    let idle = tokio::time::sleep(idle_timeout.unwrap_or(Duration::ZERO));
    tokio::pin!(idle);

    loop {
        tokio::select! {
            inbound = conn.recv() => {
                let data = match inbound {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                };

                match codec.decode_frame(&data) {
                    Ok(frame) => hub.frame(conn_id, frame).await?,
                    Err((request_id, error)) => {
                        tracing::debug!(%conn_id, error = %error, "undecodable frame");
                        hub.rejected(conn_id, request_id, error).await?;
                    }
                }
            }
            frame = outbound.recv() => {
                // `None` means the hub dropped our queue: it has stopped.
                let Some(frame) = frame else { break };
                if let Err(e) = conn.send(&frame).await {
                    tracing::debug!(%conn_id, error = %e, "send failed");
                    break;
                }
            }
            () = &mut idle, if idle_timeout.is_some() => {
                let timeout = idle_timeout.unwrap_or_default();
                let quiet = conn.idle_for();
                if quiet < timeout {
                    idle.as_mut().reset(Instant::now() + (timeout - quiet));
                } else {
                    tracing::info!(%conn_id, ?timeout, "connection idle, closing");
                    break;
                }
            }
        }
    }

    let _ = conn.close().await;
    // _guard drops here → hub releases the seat.
    Ok(())
}
