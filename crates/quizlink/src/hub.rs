//! The hub: one task that owns every room and every subscription.
//!
//! Connection tasks decode frames and forward them here through an mpsc
//! channel. The hub handles one command at a time, fan-out included, so
//! each event runs to completion before the next one is looked at. No
//! locks, just message passing.

use std::sync::Arc;
use std::time::Duration;

use quizlink_protocol::{
    ClientEvent, ClientFrame, Codec, ProtocolError, RoomCode, ServerEvent,
};
use quizlink_room::Coordinator;
use quizlink_session::{ConnectionManager, Membership, OutboundSender};
use quizlink_transport::ConnectionId;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::QuizlinkError;

/// Commands sent to the hub by connection tasks.
#[derive(Debug)]
pub(crate) enum HubCommand {
    /// A connection was accepted. `sender` feeds its outbound queue.
    Connect {
        conn_id: ConnectionId,
        sender: OutboundSender,
    },

    /// A decoded, validated client frame.
    Frame {
        conn_id: ConnectionId,
        frame: ClientFrame,
    },

    /// A frame that didn't decode. Only answered if it carried a
    /// `requestId`.
    Rejected {
        conn_id: ConnectionId,
        request_id: Option<String>,
        error: ProtocolError,
    },

    /// The connection is gone.
    Disconnect { conn_id: ConnectionId },
}

/// Cheap, cloneable handle for sending commands to the hub.
#[derive(Debug, Clone)]
pub(crate) struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub(crate) async fn connect(
        &self,
        conn_id: ConnectionId,
        sender: OutboundSender,
    ) -> Result<(), QuizlinkError> {
        self.send(HubCommand::Connect { conn_id, sender }).await
    }

    pub(crate) async fn frame(
        &self,
        conn_id: ConnectionId,
        frame: ClientFrame,
    ) -> Result<(), QuizlinkError> {
        self.send(HubCommand::Frame { conn_id, frame }).await
    }

    pub(crate) async fn rejected(
        &self,
        conn_id: ConnectionId,
        request_id: Option<String>,
        error: ProtocolError,
    ) -> Result<(), QuizlinkError> {
        self.send(HubCommand::Rejected {
            conn_id,
            request_id,
            error,
        })
        .await
    }

    /// Reports a disconnect without awaiting. Used from `Drop`, where the
    /// handler can't await.
    pub(crate) fn disconnect_now(&self, conn_id: ConnectionId) {
        match self.sender.try_send(HubCommand::Disconnect { conn_id }) {
            Ok(()) | Err(mpsc::error::TrySendError::Closed(_)) => {}
            Err(mpsc::error::TrySendError::Full(cmd)) => {
                // Queue is full: hand the command to a task that can wait.
                let sender = self.sender.clone();
                if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                    runtime.spawn(async move {
                        let _ = sender.send(cmd).await;
                    });
                }
            }
        }
    }

    async fn send(&self, cmd: HubCommand) -> Result<(), QuizlinkError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| QuizlinkError::HubStopped)
    }
}

/// The hub actor's state.
struct Hub<C: Codec> {
    coordinator: Coordinator,
    connections: ConnectionManager,
    codec: Arc<C>,
    receiver: mpsc::Receiver<HubCommand>,
    sweep_interval: Duration,
    /// Reference point for `pong.serverTime`.
    started: Instant,
}

impl<C: Codec> Hub<C> {
    /// Processes commands until every handle is dropped.
    async fn run(mut self) {
        tracing::info!(sweep_every = ?self.sweep_interval, "hub started");

        let mut sweep = tokio::time::interval_at(
            Instant::now() + self.sweep_interval,
            self.sweep_interval,
        );
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                _ = sweep.tick() => self.sweep(),
            }
        }

        tracing::info!("hub stopped");
    }

    fn handle(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Connect { conn_id, sender } => {
                if let Err(e) = self.connections.on_connect(conn_id, sender) {
                    tracing::warn!(%conn_id, error = %e, "connect rejected");
                }
            }
            HubCommand::Frame { conn_id, frame } => {
                let event_name = frame.event.name();
                let result = self.dispatch(conn_id, frame.event);
                self.reply(conn_id, event_name, frame.request_id, result);
            }
            HubCommand::Rejected {
                conn_id,
                request_id,
                error,
            } => {
                self.reply(conn_id, "unknown", request_id, Err(error.into()));
            }
            HubCommand::Disconnect { conn_id } => {
                if let Some(membership) = self.connections.on_disconnect(conn_id)
                {
                    self.release(membership);
                }
                tracing::info!(%conn_id, live = self.connections.len(), "connection closed");
            }
        }
    }

    /// Routes one client event to the coordinator and fans out the result.
    fn dispatch(
        &mut self,
        conn_id: ConnectionId,
        event: ClientEvent,
    ) -> Result<(), QuizlinkError> {
        match event {
            ClientEvent::JoinRoom {
                room_id,
                player,
                game_mode,
            } => {
                let previous = self.connections.on_join(
                    conn_id,
                    room_id.clone(),
                    player.id.clone(),
                )?;
                if let Some(previous) = previous {
                    self.release(previous);
                }
                let (outcome, events) =
                    self.coordinator.join(&room_id, player, game_mode);
                tracing::debug!(%conn_id, room = %room_id, ?outcome, "join handled");
                self.broadcast(&room_id, &events)?;
            }
            ClientEvent::StartGameRequest {
                room_id,
                game_config,
            } => {
                let events = self.coordinator.start_game(&room_id, game_config);
                self.broadcast(&room_id, &events)?;
            }
            ClientEvent::ScoreUpdate {
                room_id,
                player_id,
                score,
            } => {
                let events =
                    self.coordinator.relay_score(&room_id, player_id, score);
                self.broadcast(&room_id, &events)?;
            }
            ClientEvent::BossDamage {
                room_id,
                player_id,
                damage,
            } => {
                let events =
                    self.coordinator.relay_damage(&room_id, player_id, damage)?;
                self.broadcast(&room_id, &events)?;
            }
            ClientEvent::ChatMessage {
                room_id,
                player_id,
                message,
            } => {
                let events =
                    self.coordinator.relay_chat(&room_id, player_id, message);
                self.broadcast(&room_id, &events)?;
            }
            ClientEvent::LeaveRoom { room_id } => {
                let in_room = self
                    .connections
                    .membership(conn_id)
                    .is_some_and(|m| m.room == room_id);
                if in_room {
                    if let Some(membership) = self.connections.leave(conn_id) {
                        self.release(membership);
                    }
                }
            }
            ClientEvent::Ping { client_time } => {
                let server_time =
                    u64::try_from(self.started.elapsed().as_millis())
                        .unwrap_or(u64::MAX);
                let pong = ServerEvent::Pong {
                    client_time,
                    server_time,
                };
                self.connections.send_to(conn_id, &pong, &*self.codec)?;
            }
        }
        Ok(())
    }

    /// Answers the sender if it asked for an acknowledgement; otherwise a
    /// failure is only logged.
    fn reply(
        &self,
        conn_id: ConnectionId,
        event_name: &str,
        request_id: Option<String>,
        result: Result<(), QuizlinkError>,
    ) {
        let reply = match (request_id, result) {
            (None, Ok(())) => return,
            (None, Err(e)) => {
                tracing::debug!(%conn_id, event = event_name, error = %e, "frame dropped");
                return;
            }
            (Some(request_id), Ok(())) => ServerEvent::Ack { request_id },
            (Some(request_id), Err(e)) => {
                tracing::debug!(%conn_id, event = event_name, error = %e, "frame refused");
                ServerEvent::Error {
                    request_id: Some(request_id),
                    code: e.code(),
                    message: e.to_string(),
                }
            }
        };
        if let Err(e) = self.connections.send_to(conn_id, &reply, &*self.codec)
        {
            tracing::warn!(%conn_id, error = %e, "failed to encode reply");
        }
    }

    /// Frees the seat a departed connection held, unless the same player is
    /// still in the room through another connection.
    fn release(&mut self, membership: Membership) {
        let Membership { room, client_id } = membership;
        if self.connections.holds_client(&room, &client_id) {
            tracing::debug!(%room, player = %client_id, "seat kept by another connection");
            return;
        }
        let events = self.coordinator.leave(&room, &client_id);
        if let Err(e) = self.broadcast(&room, &events) {
            tracing::warn!(%room, error = %e, "failed to announce departure");
        }
    }

    fn broadcast(
        &self,
        room: &RoomCode,
        events: &[ServerEvent],
    ) -> Result<(), ProtocolError> {
        for event in events {
            self.connections.fan_out(room, event, &*self.codec)?;
        }
        Ok(())
    }

    /// Evicts idle rooms. A room with a live subscriber is never evicted,
    /// however quiet: its players are still waiting in it.
    fn sweep(&mut self) {
        let connections = &self.connections;
        let evicted = self
            .coordinator
            .evict_idle(|room| connections.subscribers(room).next().is_some());
        if !evicted.is_empty() {
            tracing::debug!(rooms = evicted.len(), "idle sweep finished");
        }
    }
}

/// Spawns the hub task and returns a handle to it.
///
/// `channel_size` bounds the command queue; when it fills up, connection
/// tasks wait before forwarding more frames.
pub(crate) fn spawn_hub<C: Codec>(
    coordinator: Coordinator,
    codec: Arc<C>,
    sweep_interval: Duration,
    channel_size: usize,
) -> HubHandle {
    let (sender, receiver) = mpsc::channel(channel_size);

    let hub = Hub {
        coordinator,
        connections: ConnectionManager::new(),
        codec,
        receiver,
        // A zero period would make the interval panic.
        sweep_interval: sweep_interval.max(Duration::from_millis(1)),
        started: Instant::now(),
    };
    tokio::spawn(hub.run());

    HubHandle { sender }
}
