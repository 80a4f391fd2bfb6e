//! Core protocol types for Quizlink's wire format.
//!
//! Every frame is one JSON object naming an event and carrying its data:
//!
//! ```text
//! { "event": "join_room", "data": { "roomId": "AB12CD", "player": {...} },
//!   "requestId": "optional-correlation-id" }
//! ```
//!
//! Event names are `snake_case`, data fields are `camelCase`, and mode and
//! phase values are `SCREAMING_SNAKE_CASE`, matching what the quiz client
//! already sends and expects.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The shareable code that names a room, e.g. `"AB12CD"`.
///
/// Chosen by the client that creates the room. The server never generates
/// or reformats codes; two codes are the same room only if they are
/// byte-identical.
///
/// `#[serde(transparent)]` keeps it a plain JSON string on the wire.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty code, which no room may use.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for RoomCode {
    fn from(code: &str) -> Self {
        Self(code.to_owned())
    }
}

impl From<String> for RoomCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The id a client minted for itself when it set up its profile.
///
/// Distinct from the transport's connection id: the same player keeps their
/// `ClientId` across reconnects, which is what lets a host rejoin their own
/// room without taking a second seat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty id.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Modes and phases
// ---------------------------------------------------------------------------

/// What kind of match a room runs. Fixed when the room is created.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    /// 1v1 scoring race. No shared boss.
    #[default]
    Battle,
    /// Everyone in the room chips away at one shared boss hit-point pool.
    Raid,
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Battle => f.write_str("BATTLE"),
            Self::Raid => f.write_str("RAID"),
        }
    }
}

/// Lifecycle phase of a room.
///
/// ```text
/// Forming ──(second seat filled)──→ Ready ──(start_game)──→ InProgress
///    ↑                                │
///    └──────(seat vacated)────────────┘
/// ```
///
/// There is no terminal phase: clients decide when a match is over and the
/// server is never told.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomPhase {
    /// Only the host is seated.
    Forming,
    /// At least two seats are filled; waiting for the host to start.
    Ready,
    /// A start event has been fanned out.
    InProgress,
}

impl fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forming => f.write_str("FORMING"),
            Self::Ready => f.write_str("READY"),
            Self::InProgress => f.write_str("IN_PROGRESS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A participant's self-declared identity for one room.
///
/// The server is a relay, not an authority: apart from `id`, a profile is an
/// opaque JSON object that is stored and rebroadcast exactly as received.
/// Fields the server doesn't know about survive untouched, and absent fields
/// are never filled in. The accessors below read the fields the quiz client
/// is known to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Client-chosen id; the only field the server interprets.
    pub id: ClientId,

    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Profile {
    /// Builds a profile with just an id and a display name.
    pub fn new(id: impl Into<ClientId>, name: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("name".into(), Value::String(name.to_owned()));
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Adds or replaces an arbitrary field.
    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_owned(), value);
        self
    }

    /// Display name, if the client sent one.
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    /// `true` for synthetic raid teammates a client asked to represent.
    pub fn is_bot(&self) -> bool {
        self.fields
            .get("isBot")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// RoomSnapshot
// ---------------------------------------------------------------------------

/// The full state of a room, as sent in every `room_update`.
///
/// `host` and `opponent` mirror the first two seats of `party` so that
/// two-player clients keep working unchanged; raid clients read `party`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    /// The room's code.
    pub id: RoomCode,
    /// Seat 0. `None` only after every seated participant has left.
    pub host: Option<Profile>,
    /// Seat 1, if filled.
    pub opponent: Option<Profile>,
    /// Every seat, in join order.
    pub party: Vec<Profile>,
    /// Battle or raid.
    pub game_mode: GameMode,
    /// Where the room is in its lifecycle.
    pub phase: RoomPhase,
    /// Remaining boss hit points (raid rooms).
    pub boss_hp: i64,
    /// Starting boss hit points (raid rooms).
    pub boss_max_hp: i64,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Events a client sends to the server.
///
/// `#[serde(tag = "event", content = "data")]` produces "adjacently tagged"
/// JSON: `{ "event": "score_update", "data": { "roomId": ..., ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Create or enter a room. `game_mode` only matters when this join
    /// creates the room.
    JoinRoom {
        room_id: RoomCode,
        player: Profile,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_mode: Option<GameMode>,
    },

    /// Start the match. `game_config` (topic, difficulty, ...) is relayed
    /// without inspection.
    StartGameRequest { room_id: RoomCode, game_config: Value },

    /// A player's new score. Kept as the exact JSON number sent.
    ScoreUpdate {
        room_id: RoomCode,
        player_id: ClientId,
        score: Number,
    },

    /// Damage dealt to the raid boss.
    BossDamage {
        room_id: RoomCode,
        player_id: ClientId,
        damage: i64,
    },

    /// A chat line. No length limit, no filtering.
    ChatMessage {
        room_id: RoomCode,
        player_id: ClientId,
        message: String,
    },

    /// Leave the room without closing the connection.
    LeaveRoom { room_id: RoomCode },

    /// Keep-alive. Answered with `pong` to the sender only.
    Ping {
        #[serde(default)]
        client_time: u64,
    },
}

impl ClientEvent {
    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join_room",
            Self::StartGameRequest { .. } => "start_game_request",
            Self::ScoreUpdate { .. } => "score_update",
            Self::BossDamage { .. } => "boss_damage",
            Self::ChatMessage { .. } => "chat_message",
            Self::LeaveRoom { .. } => "leave_room",
            Self::Ping { .. } => "ping",
        }
    }

    /// The room this event targets, if any.
    pub fn room_code(&self) -> Option<&RoomCode> {
        match self {
            Self::JoinRoom { room_id, .. }
            | Self::StartGameRequest { room_id, .. }
            | Self::ScoreUpdate { room_id, .. }
            | Self::BossDamage { room_id, .. }
            | Self::ChatMessage { room_id, .. }
            | Self::LeaveRoom { room_id } => Some(room_id),
            Self::Ping { .. } => None,
        }
    }

    /// Checks the rules serde can't express: room codes and profile ids
    /// must be non-empty.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.room_code().is_some_and(RoomCode::is_empty) {
            return Err(ProtocolError::InvalidMessage(format!(
                "{}: roomId must not be empty",
                self.name()
            )));
        }
        if let Self::JoinRoom { player, .. } = self {
            if player.id.is_empty() {
                return Err(ProtocolError::InvalidMessage(
                    "join_room: player.id must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

/// One decoded client frame: the event plus its optional correlation id.
///
/// When `request_id` is present the server replies to the sender with
/// `ack` or `error`; without it the frame is fire-and-forget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientFrame {
    #[serde(
        default,
        rename = "requestId",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_id: Option<String>,

    #[serde(flatten)]
    pub event: ClientEvent,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Events the server sends. Everything except `Pong`, `Ack` and `Error` is
/// fanned out to the whole room, sender included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// The full current room, after any join or leave.
    RoomUpdate(RoomSnapshot),

    /// Echo of the submitted game configuration.
    GameStart { config: Value },

    /// Relay of a player's score.
    ScoreUpdate { player_id: ClientId, score: Number },

    /// The boss took damage.
    BossUpdate {
        boss_hp: i64,
        damage: i64,
        attacker_id: ClientId,
    },

    /// The boss reached zero; names who landed the last hit.
    RaidVictory { final_hit_by: ClientId },

    /// Relay of a chat line.
    ChatMessage { player_id: ClientId, message: String },

    /// A seated participant left or dropped; their seat is free again.
    ParticipantLeft { player_id: ClientId },

    /// Reply to `ping`. `server_time` is milliseconds since server start.
    Pong { client_time: u64, server_time: u64 },

    /// The frame with this `requestId` was handled.
    Ack { request_id: String },

    /// The frame was rejected. `code` follows HTTP conventions (400 bad
    /// request, 404 no such room, 409 wrong room state).
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        code: u16,
        message: String,
    },
}

impl ServerEvent {
    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomUpdate(_) => "room_update",
            Self::GameStart { .. } => "game_start",
            Self::ScoreUpdate { .. } => "score_update",
            Self::BossUpdate { .. } => "boss_update",
            Self::RaidVictory { .. } => "raid_victory",
            Self::ChatMessage { .. } => "chat_message",
            Self::ParticipantLeft { .. } => "participant_left",
            Self::Pong { .. } => "pong",
            Self::Ack { .. } => "ack",
            Self::Error { .. } => "error",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The quiz client parses these shapes directly, so the tests pin the
    //! exact JSON produced by the serde attributes.

    use serde_json::json;

    use super::*;

    fn ada() -> Profile {
        Profile::new("h1", "Ada").with_field("avatar", json!("🦊"))
    }

    // =====================================================================
    // Identity types
    // =====================================================================

    #[test]
    fn test_room_code_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomCode::from("AB12CD")).unwrap();
        assert_eq!(json, "\"AB12CD\"");
    }

    #[test]
    fn test_room_code_is_case_sensitive() {
        assert_ne!(RoomCode::from("ab12cd"), RoomCode::from("AB12CD"));
    }

    #[test]
    fn test_client_id_display() {
        assert_eq!(ClientId::from("o1").to_string(), "o1");
    }

    #[test]
    fn test_game_mode_wire_names() {
        assert_eq!(serde_json::to_value(GameMode::Raid).unwrap(), "RAID");
        assert_eq!(
            serde_json::from_value::<GameMode>(json!("BATTLE")).unwrap(),
            GameMode::Battle
        );
        assert_eq!(GameMode::default(), GameMode::Battle);
    }

    #[test]
    fn test_room_phase_wire_names() {
        assert_eq!(
            serde_json::to_value(RoomPhase::InProgress).unwrap(),
            "IN_PROGRESS"
        );
        assert_eq!(RoomPhase::Forming.to_string(), "FORMING");
    }

    // =====================================================================
    // Profile
    // =====================================================================

    #[test]
    fn test_profile_preserves_unknown_fields() {
        let raw = json!({
            "id": "h1",
            "name": "Ada",
            "avatar": "img:castle-042",
            "isBot": false,
            "score": 0,
            "progress": 0,
            "title": "Quizmaster"
        });
        let profile: Profile = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(profile.id, ClientId::from("h1"));
        assert_eq!(profile.name(), Some("Ada"));
        assert!(!profile.is_bot());

        let back = serde_json::to_value(&profile).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_profile_does_not_fill_in_missing_fields() {
        let profile: Profile =
            serde_json::from_value(json!({ "id": "o1" })).unwrap();
        assert_eq!(profile.name(), None);
        assert!(!profile.is_bot());

        let back = serde_json::to_value(&profile).unwrap();
        assert_eq!(back, json!({ "id": "o1" }));
    }

    #[test]
    fn test_profile_without_id_is_rejected() {
        let result: Result<Profile, _> =
            serde_json::from_value(json!({ "name": "Nobody" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_profile_bot_flag() {
        let bot = Profile::new("bot-1", "Unit 7").with_field("isBot", json!(true));
        assert!(bot.is_bot());
    }

    // =====================================================================
    // RoomSnapshot
    // =====================================================================

    #[test]
    fn test_room_snapshot_json_format() {
        let snapshot = RoomSnapshot {
            id: RoomCode::from("AB12CD"),
            host: Some(ada()),
            opponent: None,
            party: vec![ada()],
            game_mode: GameMode::Raid,
            phase: RoomPhase::Forming,
            boss_hp: 100,
            boss_max_hp: 100,
        };
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["id"], "AB12CD");
        assert_eq!(json["host"]["name"], "Ada");
        assert!(json["opponent"].is_null());
        assert_eq!(json["party"].as_array().unwrap().len(), 1);
        assert_eq!(json["gameMode"], "RAID");
        assert_eq!(json["phase"], "FORMING");
        assert_eq!(json["bossHp"], 100);
        assert_eq!(json["bossMaxHp"], 100);
    }

    // =====================================================================
    // ClientEvent
    // =====================================================================

    #[test]
    fn test_join_room_decodes_with_and_without_mode() {
        let with_mode: ClientEvent = serde_json::from_value(json!({
            "event": "join_room",
            "data": { "roomId": "AB12CD", "player": { "id": "h1" }, "gameMode": "RAID" }
        }))
        .unwrap();
        assert!(matches!(
            with_mode,
            ClientEvent::JoinRoom { game_mode: Some(GameMode::Raid), .. }
        ));

        let without: ClientEvent = serde_json::from_value(json!({
            "event": "join_room",
            "data": { "roomId": "AB12CD", "player": { "id": "o1" } }
        }))
        .unwrap();
        assert!(matches!(
            without,
            ClientEvent::JoinRoom { game_mode: None, .. }
        ));
    }

    #[test]
    fn test_start_game_request_keeps_config_verbatim() {
        let config = json!({ "topic": "History", "difficulty": 3, "extra": [1, 2] });
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "start_game_request",
            "data": { "roomId": "AB12CD", "gameConfig": config.clone() }
        }))
        .unwrap();
        match event {
            ClientEvent::StartGameRequest { game_config, .. } => {
                assert_eq!(game_config, config);
            }
            other => panic!("expected StartGameRequest, got {other:?}"),
        }
    }

    #[test]
    fn test_score_update_keeps_fractional_score() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "score_update",
            "data": { "roomId": "AB12CD", "playerId": "h1", "score": 12.5 }
        }))
        .unwrap();
        match event {
            ClientEvent::ScoreUpdate { score, .. } => {
                assert_eq!(score.as_f64(), Some(12.5));
            }
            other => panic!("expected ScoreUpdate, got {other:?}"),
        }
    }

    #[test]
    fn test_boss_damage_requires_integer() {
        let result: Result<ClientEvent, _> = serde_json::from_value(json!({
            "event": "boss_damage",
            "data": { "roomId": "AB12CD", "playerId": "h1", "damage": "lots" }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let result: Result<ClientEvent, _> = serde_json::from_value(json!({
            "event": "fly_to_moon",
            "data": {}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_empty_profile_id() {
        let event = ClientEvent::JoinRoom {
            room_id: RoomCode::from("AB12CD"),
            player: Profile::new("", "Ghost"),
            game_mode: None,
        };
        assert!(matches!(
            event.validate(),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_ping_has_no_room() {
        let event = ClientEvent::Ping { client_time: 1 };
        assert!(event.room_code().is_none());
        assert!(event.validate().is_ok());
    }

    // =====================================================================
    // ClientFrame
    // =====================================================================

    #[test]
    fn test_client_frame_reads_request_id_next_to_event() {
        let frame: ClientFrame = serde_json::from_value(json!({
            "event": "leave_room",
            "data": { "roomId": "AB12CD" },
            "requestId": "r-42"
        }))
        .unwrap();
        assert_eq!(frame.request_id.as_deref(), Some("r-42"));
        assert_eq!(
            frame.event,
            ClientEvent::LeaveRoom { room_id: RoomCode::from("AB12CD") }
        );
    }

    #[test]
    fn test_client_frame_serializes_flat() {
        let frame = ClientFrame {
            request_id: Some("r-1".into()),
            event: ClientEvent::Ping { client_time: 9 },
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            json,
            json!({ "requestId": "r-1", "event": "ping", "data": { "clientTime": 9 } })
        );
    }

    // =====================================================================
    // ServerEvent
    // =====================================================================

    #[test]
    fn test_boss_update_json_format() {
        let event = ServerEvent::BossUpdate {
            boss_hp: 60,
            damage: 40,
            attacker_id: ClientId::from("o1"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            json!({
                "event": "boss_update",
                "data": { "bossHp": 60, "damage": 40, "attackerId": "o1" }
            })
        );
    }

    #[test]
    fn test_room_update_carries_snapshot_as_data() {
        let event = ServerEvent::RoomUpdate(RoomSnapshot {
            id: RoomCode::from("AB12CD"),
            host: Some(ada()),
            opponent: None,
            party: vec![ada()],
            game_mode: GameMode::Battle,
            phase: RoomPhase::Forming,
            boss_hp: 100,
            boss_max_hp: 100,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "room_update");
        assert_eq!(json["data"]["host"]["id"], "h1");
        assert_eq!(json["data"]["gameMode"], "BATTLE");
    }

    #[test]
    fn test_error_without_request_id_omits_field() {
        let event = ServerEvent::Error {
            request_id: None,
            code: 400,
            message: "bad frame".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json["data"].get("requestId").is_none());
        assert_eq!(json["data"]["code"], 400);
    }

    #[test]
    fn test_ack_json_format() {
        let event = ServerEvent::Ack { request_id: "r-9".into() };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "event": "ack", "data": { "requestId": "r-9" } })
        );
    }

    #[test]
    fn test_server_event_names_match_wire() {
        let event = ServerEvent::ParticipantLeft { player_id: ClientId::from("o1") };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
    }
}
