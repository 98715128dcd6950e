use std::sync::Arc;

use glam::Vec2;

use crate::assets::AssetStore;
use crate::config::EngineConfig;
use crate::events::EventQueue;
use crate::input::InputState;
use crate::save::SaveBlockers;
use crate::world::ClassRegistry;

/// Services shared by every world and handed to object hooks.
#[derive(Debug)]
pub struct Env {
    pub input: Arc<InputState>,
    pub assets: AssetStore,
    pub classes: ClassRegistry,
    pub can_save: SaveBlockers,
    pub events: EventQueue,
    /// Fixed simulation step in seconds.
    pub frame_time: f32,
    pub time_scale: f32,
    pub running: bool,
    pub debug: bool,
    pub screen: Vec2,
    /// Simulated seconds since start-up.
    pub elapsed: f64,
    /// Name of the map the simulation is focused on.
    pub current_map: String,
}

impl Env {
    pub fn new(config: &EngineConfig, assets: AssetStore, input: Arc<InputState>) -> Self {
        Self {
            input,
            assets,
            classes: ClassRegistry::with_builtins(),
            can_save: SaveBlockers::default(),
            events: EventQueue::default(),
            frame_time: config.frame_time,
            time_scale: config.time_scale,
            running: true,
            debug: config.debug,
            screen: Vec2::new(config.screen_width as f32, config.screen_height as f32),
            elapsed: 0.0,
            current_map: String::new(),
        }
    }

    /// Step handed to object updates.
    pub fn scaled_dt(&self) -> f32 {
        self.frame_time * self.time_scale
    }
}

impl Default for Env {
    fn default() -> Self {
        let config = EngineConfig::default();
        let assets = AssetStore::new(config.asset_root.clone());
        Self::new(&config, assets, Arc::new(InputState::new()))
    }
}
