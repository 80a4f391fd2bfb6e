//! The room coordinator: join, start, relays and leave.
//!
//! Every operation mutates the registry (if at all) and returns the events
//! that must be fanned out to the room it targeted, in order. Delivery is
//! the caller's job; the coordinator never sees a connection.

use quizlink_protocol::{
    ClientId, GameMode, Profile, RoomCode, ServerEvent,
};
use serde_json::{Number, Value};

use crate::{JoinOutcome, Room, RoomConfig, RoomError, RoomRegistry};

/// Drives the room protocol on top of a [`RoomRegistry`].
///
/// The coordinator is an authority-less relay: scores, damage amounts,
/// chat text and game configuration pass through unvalidated. Its only
/// rules are seating, the raid boss pool and the room phase.
#[derive(Debug, Default)]
pub struct Coordinator {
    registry: RoomRegistry,
}

impl Coordinator {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            registry: RoomRegistry::new(config),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn room(&self, code: &RoomCode) -> Option<&Room> {
        self.registry.get(code)
    }

    /// Handles a join. The mode only matters if this join creates the room.
    ///
    /// Always produces a `room_update` carrying the whole room, even when
    /// nothing changed, so a reconnecting host or a late observer gets the
    /// current state.
    pub fn join(
        &mut self,
        code: &RoomCode,
        profile: Profile,
        mode: Option<GameMode>,
    ) -> (JoinOutcome, Vec<ServerEvent>) {
        let player = profile.id.clone();
        let (room, created) =
            self.registry.get_or_create(code, profile.clone(), mode);
        let outcome = if created {
            JoinOutcome::Created
        } else {
            room.seat(profile)
        };
        room.touch();

        match outcome {
            JoinOutcome::Seated => {
                let seated = room.seats().last();
                tracing::info!(
                    room = %code,
                    %player,
                    name = seated.and_then(Profile::name).unwrap_or("-"),
                    bot = seated.is_some_and(Profile::is_bot),
                    seat = room.seats().len() - 1,
                    "player seated"
                );
            }
            JoinOutcome::Observer => tracing::debug!(
                room = %code,
                %player,
                "room full, joined as observer"
            ),
            JoinOutcome::Created | JoinOutcome::Reaffirmed => {}
        }

        (outcome, vec![ServerEvent::RoomUpdate(room.snapshot())])
    }

    /// Relays the start signal with the configuration untouched.
    ///
    /// No precondition: a room without an opponent can start, and a
    /// repeated start simply re-broadcasts.
    pub fn start_game(
        &mut self,
        code: &RoomCode,
        config: Value,
    ) -> Vec<ServerEvent> {
        if let Some(room) = self.registry.get_mut(code) {
            room.mark_started();
            room.touch();
        }
        tracing::info!(room = %code, "game started");
        vec![ServerEvent::GameStart { config }]
    }

    /// Relays a score. Nothing is stored or checked.
    pub fn relay_score(
        &mut self,
        code: &RoomCode,
        player_id: ClientId,
        score: Number,
    ) -> Vec<ServerEvent> {
        self.registry.touch(code);
        tracing::debug!(room = %code, player = %player_id, %score, "score relayed");
        vec![ServerEvent::ScoreUpdate { player_id, score }]
    }

    /// Applies raid damage and reports the new boss state.
    ///
    /// The hit that takes the boss from positive to zero also produces a
    /// `raid_victory`. Damage after that is refused, so a victory is
    /// announced exactly once per room.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`]: no such room
    /// - [`RoomError::ModeMismatch`]: the room is not a raid
    /// - [`RoomError::BossDefeated`]: the boss is already at zero
    pub fn relay_damage(
        &mut self,
        code: &RoomCode,
        player_id: ClientId,
        damage: i64,
    ) -> Result<Vec<ServerEvent>, RoomError> {
        let room = self
            .registry
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        if room.mode() != GameMode::Raid {
            return Err(RoomError::ModeMismatch {
                room: code.clone(),
                mode: room.mode(),
            });
        }
        if room.boss_hp() == 0 {
            return Err(RoomError::BossDefeated(code.clone()));
        }

        let boss_hp = room.apply_damage(damage);
        room.touch();
        tracing::debug!(room = %code, attacker = %player_id, damage, boss_hp, "boss hit");

        let mut events = vec![ServerEvent::BossUpdate {
            boss_hp,
            damage,
            attacker_id: player_id.clone(),
        }];
        if boss_hp == 0 {
            tracing::info!(room = %code, final_hit_by = %player_id, "raid boss defeated");
            events.push(ServerEvent::RaidVictory {
                final_hit_by: player_id,
            });
        }
        Ok(events)
    }

    /// Relays a chat line verbatim.
    pub fn relay_chat(
        &mut self,
        code: &RoomCode,
        player_id: ClientId,
        message: String,
    ) -> Vec<ServerEvent> {
        self.registry.touch(code);
        tracing::debug!(room = %code, player = %player_id, len = message.len(), "chat relayed");
        vec![ServerEvent::ChatMessage { player_id, message }]
    }

    /// Frees the seat held by `player_id`, if any.
    ///
    /// Produces `participant_left` followed by the updated `room_update`.
    /// Leaving without a seat (observers, unknown rooms) produces nothing.
    pub fn leave(
        &mut self,
        code: &RoomCode,
        player_id: &ClientId,
    ) -> Vec<ServerEvent> {
        let Some(room) = self.registry.get_mut(code) else {
            return Vec::new();
        };
        let Some(profile) = room.vacate(player_id) else {
            return Vec::new();
        };
        room.touch();
        tracing::info!(
            room = %code,
            player = %player_id,
            remaining = room.seats().len(),
            "player left seat"
        );

        vec![
            ServerEvent::ParticipantLeft {
                player_id: profile.id,
            },
            ServerEvent::RoomUpdate(room.snapshot()),
        ]
    }

    /// Drops rooms that have been idle past the configured TTL, sparing
    /// those `in_use` reports as still subscribed.
    pub fn evict_idle(
        &mut self,
        in_use: impl Fn(&RoomCode) -> bool,
    ) -> Vec<RoomCode> {
        self.registry.evict_idle(in_use)
    }
}
