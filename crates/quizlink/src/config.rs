//! Server configuration, from code or from the environment.

use std::str::FromStr;
use std::time::Duration;

use quizlink_room::RoomConfig;

use crate::ConfigError;

/// Everything needed to run a server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// A connection that sends nothing for this long is closed. Any
    /// inbound frame resets it, WebSocket pings included; outbound
    /// traffic does not. `None` (the default) keeps quiet connections
    /// open, so a host can wait in the lobby indefinitely.
    pub idle_timeout: Option<Duration>,

    /// How long an accepted socket gets to finish the WebSocket upgrade.
    pub handshake_timeout: Duration,

    /// How often the hub sweeps idle rooms.
    pub sweep_interval: Duration,

    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3001".to_string(),
            idle_timeout: None,
            handshake_timeout: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(60),
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads overrides from the process environment. Unset variables keep
    /// their defaults.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `QUIZLINK_BIND` | `bind_addr` |
    /// | `QUIZLINK_IDLE_TIMEOUT_SECS` | `idle_timeout` (`0` disables) |
    /// | `QUIZLINK_HANDSHAKE_TIMEOUT_SECS` | `handshake_timeout` |
    /// | `QUIZLINK_SWEEP_INTERVAL_SECS` | `sweep_interval` |
    /// | `QUIZLINK_ROOM_TTL_SECS` | `room.idle_ttl` |
    /// | `QUIZLINK_RAID_SEATS` | `room.raid_seats` |
    /// | `QUIZLINK_BOSS_MAX_HP` | `room.boss_max_hp` |
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a variable is set to something unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), but reads variables through
    /// `lookup` instead of the process environment.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("QUIZLINK_BIND") {
            config.bind_addr = addr;
        }
        if let Some(secs) = parse::<u64>(&lookup, "QUIZLINK_IDLE_TIMEOUT_SECS")? {
            config.idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(secs) = parse::<u64>(&lookup, "QUIZLINK_HANDSHAKE_TIMEOUT_SECS")? {
            if secs == 0 {
                return Err(ConfigError::OutOfRange {
                    var: "QUIZLINK_HANDSHAKE_TIMEOUT_SECS",
                    expected: "at least 1",
                });
            }
            config.handshake_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse::<u64>(&lookup, "QUIZLINK_SWEEP_INTERVAL_SECS")? {
            // tokio::time::interval panics on a zero period.
            if secs == 0 {
                return Err(ConfigError::OutOfRange {
                    var: "QUIZLINK_SWEEP_INTERVAL_SECS",
                    expected: "at least 1",
                });
            }
            config.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse::<u64>(&lookup, "QUIZLINK_ROOM_TTL_SECS")? {
            config.room.idle_ttl = Duration::from_secs(secs);
        }
        if let Some(seats) = parse::<usize>(&lookup, "QUIZLINK_RAID_SEATS")? {
            if seats == 0 {
                return Err(ConfigError::OutOfRange {
                    var: "QUIZLINK_RAID_SEATS",
                    expected: "at least 1",
                });
            }
            config.room.raid_seats = seats;
        }
        if let Some(hp) = parse::<i64>(&lookup, "QUIZLINK_BOSS_MAX_HP")? {
            if hp <= 0 {
                return Err(ConfigError::OutOfRange {
                    var: "QUIZLINK_BOSS_MAX_HP",
                    expected: "positive",
                });
            }
            config.room.boss_max_hp = hp;
        }

        Ok(config)
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            reason: e.to_string(),
            value,
        })
}
