//! The room registry: the single table of live rooms.

use std::collections::HashMap;

use quizlink_protocol::{GameMode, Profile, RoomCode};

use crate::{Room, RoomConfig};

/// Maps room codes to rooms.
///
/// Owned by a [`Coordinator`](crate::Coordinator) rather than living in a
/// global, so several independent registries can coexist (one per test,
/// for instance). Not thread-safe by itself; the server keeps it inside a
/// single task.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, Room>,
    config: RoomConfig,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
        }
    }

    /// Returns the room for `code`, creating it with `creator` as host if
    /// it doesn't exist yet. An existing room is returned untouched: its
    /// seats and mode are not affected by `creator` or `mode`.
    ///
    /// The flag is `true` when this call created the room.
    pub fn get_or_create(
        &mut self,
        code: &RoomCode,
        creator: Profile,
        mode: Option<GameMode>,
    ) -> (&mut Room, bool) {
        let mut created = false;
        let room = self.rooms.entry(code.clone()).or_insert_with(|| {
            created = true;
            let mode = mode.unwrap_or_default();
            tracing::info!(room = %code, %mode, host = %creator.id, "room created");
            Room::new(code.clone(), creator, mode, &self.config)
        });
        (room, created)
    }

    pub fn get(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn get_mut(&mut self, code: &RoomCode) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    /// Marks the room as active, if it exists.
    pub fn touch(&mut self, code: &RoomCode) {
        if let Some(room) = self.rooms.get_mut(code) {
            room.touch();
        }
    }

    pub fn remove(&mut self, code: &RoomCode) -> Option<Room> {
        self.rooms.remove(code)
    }

    /// Drops every room idle for at least `idle_ttl` and returns their codes.
    ///
    /// Rooms for which `in_use` returns `true` are kept however long they
    /// have been quiet: someone is still subscribed and would otherwise
    /// stop receiving the room's events without being told.
    pub fn evict_idle(
        &mut self,
        in_use: impl Fn(&RoomCode) -> bool,
    ) -> Vec<RoomCode> {
        let ttl = self.config.idle_ttl;
        let stale: Vec<RoomCode> = self
            .rooms
            .iter()
            .filter(|(code, room)| room.idle_for() >= ttl && !in_use(code))
            .map(|(code, _)| code.clone())
            .collect();
        for code in &stale {
            self.remove(code);
            tracing::info!(room = %code, "idle room evicted");
        }
        stale
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn code(s: &str) -> RoomCode {
        RoomCode::from(s)
    }

    fn registry_with_ttl(secs: u64) -> RoomRegistry {
        RoomRegistry::new(RoomConfig {
            idle_ttl: Duration::from_secs(secs),
            ..RoomConfig::default()
        })
    }

    #[test]
    fn test_get_or_create_creates_with_defaults() {
        let mut registry = RoomRegistry::default();
        let (room, created) =
            registry.get_or_create(&code("AB12CD"), Profile::new("h1", "Ada"), None);
        assert!(created);
        assert_eq!(room.mode(), GameMode::Battle);
        assert_eq!(room.boss_hp(), 100);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_or_create_leaves_existing_room_untouched() {
        let mut registry = RoomRegistry::default();
        registry.get_or_create(
            &code("AB12CD"),
            Profile::new("h1", "Ada"),
            Some(GameMode::Raid),
        );

        let (room, created) = registry.get_or_create(
            &code("AB12CD"),
            Profile::new("o1", "Bo"),
            Some(GameMode::Battle),
        );
        assert!(!created);
        assert_eq!(room.mode(), GameMode::Raid);
        assert_eq!(room.seats().len(), 1);
        assert_eq!(room.host().map(|p| p.id.as_str()), Some("h1"));
    }

    #[test]
    fn test_get_missing_room_is_none() {
        let registry = RoomRegistry::default();
        assert!(registry.get(&code("NOPE")).is_none());
    }

    #[test]
    fn test_raid_room_uses_configured_boss_hp() {
        let mut registry = RoomRegistry::new(RoomConfig {
            boss_max_hp: 250,
            ..RoomConfig::default()
        });
        let (room, _) = registry.get_or_create(
            &code("R41D"),
            Profile::new("h1", "Ada"),
            Some(GameMode::Raid),
        );
        assert_eq!(room.boss_hp(), 250);
        assert_eq!(room.capacity(), 4);
    }

    #[test]
    fn test_evict_idle_with_zero_ttl_drops_everything() {
        let mut registry = registry_with_ttl(0);
        registry.get_or_create(&code("A"), Profile::new("h1", "Ada"), None);
        registry.get_or_create(&code("B"), Profile::new("h2", "Bo"), None);

        let mut evicted = registry.evict_idle(|_| false);
        evicted.sort();
        assert_eq!(evicted, vec![code("A"), code("B")]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_evict_idle_keeps_fresh_rooms() {
        let mut registry = registry_with_ttl(3600);
        registry.get_or_create(&code("A"), Profile::new("h1", "Ada"), None);

        assert!(registry.evict_idle(|_| false).is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_evict_idle_spares_rooms_in_use() {
        let mut registry = registry_with_ttl(0);
        registry.get_or_create(&code("A"), Profile::new("h1", "Ada"), None);
        registry.get_or_create(&code("B"), Profile::new("h2", "Bo"), None);

        let evicted = registry.evict_idle(|room| room == &code("A"));
        assert_eq!(evicted, vec![code("B")]);
        assert!(registry.get(&code("A")).is_some());

        // Once nobody watches it, the next sweep takes it.
        assert_eq!(registry.evict_idle(|_| false), vec![code("A")]);
    }

    #[test]
    fn test_remove() {
        let mut registry = RoomRegistry::default();
        registry.get_or_create(&code("A"), Profile::new("h1", "Ada"), None);
        assert!(registry.remove(&code("A")).is_some());
        assert!(registry.remove(&code("A")).is_none());
        assert!(registry.is_empty());
    }
}
