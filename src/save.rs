//! Save slots and world snapshots.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec2;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::map::Map;
use crate::math::Color;
use crate::weather::Weather;
use crate::world::{ObjectId, World};

pub const SAVE_SLOTS: usize = 10;
pub const SAVE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reasons the game cannot be saved right now. Zero means saving is allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaveBlockers(u32);

impl SaveBlockers {
    pub const IN_MENU: u32 = 1;
    pub const SEQUENCE: u32 = 1 << 1;
    pub const PLAYER_DEAD: u32 = 1 << 2;
    pub const IN_DIALOGUE: u32 = 1 << 3;
    pub const IN_CHALLENGE: u32 = 1 << 4;

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn set(&mut self, flag: u32) {
        self.0 |= flag;
    }

    pub fn clear(&mut self, flag: u32) {
        self.0 &= !flag;
    }

    pub fn toggle(&mut self, flag: u32, on: bool) {
        if on {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }

    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub fn is_clear(self) -> bool {
        self.0 == 0
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

/// Persistent state of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    pub name: String,
    pub class: String,
    pub position: Vec2,
    pub movement: Vec2,
    pub facing: Vec2,
    /// Class-owned blob from `serialize`.
    pub custom: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default)]
    pub radius: f32,
    #[serde(default)]
    pub attenuation: f32,
}

impl ObjectSnapshot {
    pub fn capture(world: &World, id: ObjectId) -> Option<Self> {
        let object = world.get(id)?;
        Some(Self {
            name: object.name.clone(),
            class: object.class.clone(),
            position: object.position,
            movement: object.movement,
            facing: object.facing,
            custom: world.serialize_object(id),
            color: object.color,
            radius: object.radius,
            attenuation: object.attenuation,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSnapshot {
    pub map_name: String,
    pub weather_data: Weather,
    pub objects: Vec<ObjectSnapshot>,
}

impl MapSnapshot {
    /// Captures every persistent object of the map.
    pub fn capture(map: &Map) -> Self {
        let objects = map
            .world
            .objects()
            .filter(|(_, object)| object.is_persistent)
            .filter_map(|(id, _)| ObjectSnapshot::capture(&map.world, id))
            .collect();
        Self {
            map_name: map.name.clone(),
            weather_data: map.weather.clone(),
            objects,
        }
    }
}

/// One save slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub version: String,
    pub save_name: String,
    pub current_map: String,
    pub maps: Vec<MapSnapshot>,
    /// Game mode blob.
    pub game_mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveFile {
    version: String,
    game_states: Vec<Option<GameState>>,
}

/// The slots file on disk.
#[derive(Debug, Clone)]
pub struct SaveStore {
    path: PathBuf,
    states: Vec<Option<GameState>>,
}

impl SaveStore {
    /// Reads the slots file; a missing or undecodable file starts over with
    /// empty slots.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let states = match fs::read(&path) {
            Ok(data) => match serde_json::from_slice::<SaveFile>(&data) {
                Ok(file) => file.game_states,
                Err(err) => {
                    warn!("save file {} is broken, ignoring it: {err}", path.display());
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        let mut store = Self { path, states };
        store.states.resize(SAVE_SLOTS, None);
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn slot(&self, slot: usize) -> Result<&GameState, EngineError> {
        self.states
            .get(slot)
            .ok_or(EngineError::BadSlot(slot))?
            .as_ref()
            .ok_or(EngineError::EmptySlot(slot))
    }

    /// Names of the occupied slots.
    pub fn list(&self) -> Vec<(usize, &str)> {
        self.states
            .iter()
            .enumerate()
            .filter_map(|(slot, state)| state.as_ref().map(|s| (slot, s.save_name.as_str())))
            .collect()
    }

    /// Stores `state` in `slot` and rewrites the slots file.
    pub fn write(&mut self, slot: usize, state: GameState) -> Result<(), EngineError> {
        if slot >= SAVE_SLOTS {
            return Err(EngineError::BadSlot(slot));
        }
        info!("saving '{}' to slot {slot}", state.save_name);
        self.states[slot] = Some(state);
        let file = SaveFile {
            version: SAVE_VERSION.to_string(),
            game_states: self.states.clone(),
        };
        fs::write(&self.path, serde_json::to_vec(&file)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(name: &str) -> GameState {
        GameState {
            version: SAVE_VERSION.to_string(),
            save_name: name.to_string(),
            current_map: "town".to_string(),
            maps: vec![MapSnapshot {
                map_name: "town".to_string(),
                weather_data: Weather::default(),
                objects: vec![ObjectSnapshot {
                    name: "player".into(),
                    class: "anim".into(),
                    position: Vec2::new(1.0, 2.0),
                    movement: Vec2::ZERO,
                    facing: Vec2::X,
                    custom: "{}".into(),
                    color: None,
                    radius: 0.0,
                    attenuation: 0.0,
                }],
            }],
            game_mode: String::new(),
        }
    }

    #[test]
    fn blockers_are_a_bitmask() {
        let mut blockers = SaveBlockers::default();
        assert!(blockers.is_clear());
        blockers.set(SaveBlockers::IN_DIALOGUE);
        blockers.toggle(SaveBlockers::SEQUENCE, true);
        assert_eq!(blockers.bits(), 10);
        blockers.clear(SaveBlockers::IN_DIALOGUE);
        assert!(blockers.contains(SaveBlockers::SEQUENCE));
        assert!(!blockers.contains(SaveBlockers::IN_DIALOGUE));
    }

    #[test]
    fn slots_persist_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gamesav.db");
        let mut store = SaveStore::open(&path);
        store.write(3, state("before boss")).unwrap();

        let reopened = SaveStore::open(&path);
        assert_eq!(reopened.slot(3).unwrap(), &state("before boss"));
        assert_eq!(reopened.list(), vec![(3, "before boss")]);
        assert!(matches!(reopened.slot(0), Err(EngineError::EmptySlot(0))));
        assert!(matches!(reopened.slot(10), Err(EngineError::BadSlot(10))));
    }

    #[test]
    fn broken_files_reinitialize_the_slots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gamesav.db");
        fs::write(&path, "not json").unwrap();
        let mut store = SaveStore::open(&path);
        assert!(store.list().is_empty());
        assert!(matches!(store.write(12, state("x")), Err(EngineError::BadSlot(12))));
        store.write(0, state("fresh")).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"gameStates\""));
        assert!(text.contains("\"saveName\":\"fresh\""));
    }
}
