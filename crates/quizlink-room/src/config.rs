//! Room configuration.

use std::time::Duration;

use quizlink_protocol::GameMode;
use serde::{Deserialize, Serialize};

/// Settings shared by every room in a registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Seats in a `BATTLE` room: host and opponent.
    pub battle_seats: usize,

    /// Seats in a `RAID` room. The quiz client shows a party of up to four.
    pub raid_seats: usize,

    /// Boss hit points a new raid room starts with.
    pub boss_max_hp: i64,

    /// Rooms untouched for this long are dropped by the idle sweep.
    pub idle_ttl: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            battle_seats: 2,
            raid_seats: 4,
            boss_max_hp: 100,
            idle_ttl: Duration::from_secs(30 * 60),
        }
    }
}

impl RoomConfig {
    /// Number of seats a room of the given mode gets.
    ///
    /// Never less than one, so a room always has room for its host.
    pub fn seats_for(&self, mode: GameMode) -> usize {
        let seats = match mode {
            GameMode::Battle => self.battle_seats,
            GameMode::Raid => self.raid_seats,
        };
        seats.max(1)
    }
}
