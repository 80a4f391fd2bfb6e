//! The room record: seats, mode, boss pool and lifecycle phase.

use std::time::{Duration, Instant};

use quizlink_protocol::{
    ClientId, GameMode, Profile, RoomCode, RoomPhase, RoomSnapshot,
};

use crate::RoomConfig;

/// What a join did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The join created the room; the joiner is its host.
    Created,
    /// The joiner took a free seat.
    Seated,
    /// The joiner already holds a seat (typically a reconnect). No change.
    Reaffirmed,
    /// Every seat is taken. The joiner watches without a seat.
    Observer,
}

/// Authoritative state of one lobby or match.
///
/// Seats are an ordered list keyed by profile id: seat 0 is the host,
/// seat 1 the opponent, further seats are raid party members. A seated
/// profile is never displaced by another join.
#[derive(Debug, Clone)]
pub struct Room {
    code: RoomCode,
    mode: GameMode,
    capacity: usize,
    seats: Vec<Profile>,
    boss_hp: i64,
    boss_max_hp: i64,
    started: bool,
    last_activity: Instant,
}

impl Room {
    /// Creates a room with `host` in seat 0.
    pub fn new(
        code: RoomCode,
        host: Profile,
        mode: GameMode,
        config: &RoomConfig,
    ) -> Self {
        Self {
            code,
            mode,
            capacity: config.seats_for(mode),
            seats: vec![host],
            boss_hp: config.boss_max_hp,
            boss_max_hp: config.boss_max_hp,
            started: false,
            last_activity: Instant::now(),
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn boss_hp(&self) -> i64 {
        self.boss_hp
    }

    pub fn boss_max_hp(&self) -> i64 {
        self.boss_max_hp
    }

    /// Seat 0, if anyone is seated.
    pub fn host(&self) -> Option<&Profile> {
        self.seats.first()
    }

    /// Seat 1, if filled.
    pub fn opponent(&self) -> Option<&Profile> {
        self.seats.get(1)
    }

    /// All seated profiles in join order.
    pub fn seats(&self) -> &[Profile] {
        &self.seats
    }

    /// Index of the seat held by `id`.
    pub fn seat_of(&self, id: &ClientId) -> Option<usize> {
        self.seats.iter().position(|p| &p.id == id)
    }

    pub fn is_full(&self) -> bool {
        self.seats.len() >= self.capacity
    }

    /// Current lifecycle phase.
    ///
    /// Once started, a room stays `InProgress` even if players drop; before
    /// that the phase follows the seat count.
    pub fn phase(&self) -> RoomPhase {
        if self.started {
            RoomPhase::InProgress
        } else if self.seats.len() >= 2 {
            RoomPhase::Ready
        } else {
            RoomPhase::Forming
        }
    }

    /// Seats `profile` if it isn't seated yet and a seat is free.
    pub fn seat(&mut self, profile: Profile) -> JoinOutcome {
        if self.seat_of(&profile.id).is_some() {
            return JoinOutcome::Reaffirmed;
        }
        if self.is_full() {
            return JoinOutcome::Observer;
        }
        self.seats.push(profile);
        JoinOutcome::Seated
    }

    /// Frees the seat held by `id`. Later seats move up one place, so the
    /// opponent becomes host when the host leaves.
    pub fn vacate(&mut self, id: &ClientId) -> Option<Profile> {
        let index = self.seat_of(id)?;
        Some(self.seats.remove(index))
    }

    pub(crate) fn mark_started(&mut self) {
        self.started = true;
    }

    /// Subtracts `damage` from the boss pool, clamping at zero, and returns
    /// the new hit points. The amount is not validated.
    pub(crate) fn apply_damage(&mut self, damage: i64) -> i64 {
        self.boss_hp = self.boss_hp.saturating_sub(damage).max(0);
        self.boss_hp
    }

    /// Records activity so the idle sweep leaves the room alone.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Time since the last recorded activity.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// The full wire representation of this room.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            id: self.code.clone(),
            host: self.host().cloned(),
            opponent: self.opponent().cloned(),
            party: self.seats.clone(),
            game_mode: self.mode,
            phase: self.phase(),
            boss_hp: self.boss_hp,
            boss_max_hp: self.boss_max_hp,
        }
    }
}
