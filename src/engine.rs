//! Engine context: loaded maps, quests, notifications and saves.
//!
//! One [`Engine`] replaces the process-wide state a game loop needs. Maps are
//! kept in load order and addressed by name; the current map is the one that
//! is drawn and that receives camera events.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use glam::Vec2;
use log::{error, info, warn};

use crate::assets::AssetStore;
use crate::classes::Camera;
use crate::config::EngineConfig;
use crate::env::Env;
use crate::error::EngineError;
use crate::events::{Event, EventHandler, EventHandlers};
use crate::input::InputState;
use crate::map::Map;
use crate::math::Color;
use crate::notifications::{Notifications, DEFAULT_NOTIFICATION_DURATION};
use crate::profiler::ProfilerSet;
use crate::quest::{QuestHost, QuestId, QuestManager};
use crate::render::{Canvas, Frustum};
use crate::save::{GameState, MapSnapshot, SaveStore, SAVE_VERSION};
use crate::world::{DrawContext, ObjectId, ObjectMeta, World};

pub const MAIN_CAMERA: &str = "main_camera";
const PLAYER: &str = "player";

#[derive(Debug)]
pub struct Engine {
    pub config: EngineConfig,
    pub env: Env,
    maps: Vec<Map>,
    current: Option<usize>,
    pub quests: QuestManager,
    pub notifications: Notifications,
    pub profilers: ProfilerSet,
    pub saves: SaveStore,
    handlers: EventHandlers,
    /// Simulated seconds since the last profiler report.
    report_timer: f64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let assets = AssetStore::new(config.asset_root.clone());
        Self::with_assets(config, assets)
    }

    pub fn with_assets(config: EngineConfig, assets: AssetStore) -> Self {
        let env = Env::new(&config, assets, Arc::new(InputState::new()));
        Self {
            saves: SaveStore::open(config.save_path.clone()),
            quests: QuestManager::new(config.max_quests),
            notifications: Notifications::default(),
            profilers: ProfilerSet::default(),
            handlers: EventHandlers::default(),
            maps: Vec::new(),
            current: None,
            report_timer: 0.0,
            env,
            config,
        }
    }

    pub fn maps(&self) -> &[Map] {
        &self.maps
    }

    pub fn map(&self, name: &str) -> Option<&Map> {
        self.maps.iter().find(|m| m.name == name)
    }

    pub fn map_mut(&mut self, name: &str) -> Option<&mut Map> {
        self.maps.iter_mut().find(|m| m.name == name)
    }

    pub fn current_map(&self) -> Option<&Map> {
        self.current.map(|index| &self.maps[index])
    }

    pub fn current_map_mut(&mut self) -> Option<&mut Map> {
        self.current.map(|index| &mut self.maps[index])
    }

    /// Loads `name` unless it is already loaded. The first map loaded
    /// becomes the current one.
    pub fn load_map(&mut self, name: &str) -> Result<&mut Map> {
        let index = self.load_map_index(name)?;
        Ok(&mut self.maps[index])
    }

    fn load_map_index(&mut self, name: &str) -> Result<usize> {
        if let Some(index) = self.maps.iter().position(|m| m.name == name) {
            return Ok(index);
        }
        if self.current.is_none() {
            self.env.current_map = name.to_string();
        }
        let mut map = self
            .profilers
            .measure("map load", || Map::load(&mut self.env, name))
            .with_context(|| format!("map {name} could not be loaded"))?;
        resolve_local_player(&mut map.world);

        self.maps.push(map);
        let index = self.maps.len() - 1;
        if self.current.is_none() {
            self.current = Some(index);
        }
        Ok(index)
    }

    /// Makes an already loaded map the current one.
    pub fn switch_map(&mut self, name: &str) -> Result<(), EngineError> {
        let index = self
            .maps
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| EngineError::MapNotLoaded(name.to_string()))?;
        info!("switching to map '{name}'");
        self.current = Some(index);
        self.env.current_map = name.to_string();
        Ok(())
    }

    /// Drops every loaded map together with its world.
    pub fn flush_maps(&mut self) {
        self.maps.clear();
        self.current = None;
        self.env.current_map.clear();
    }

    /// Runs `InitObjects` on the current map, creating its camera first.
    pub fn init_map(&mut self) -> Result<(), EngineError> {
        if self.current.is_none() {
            return Err(EngineError::MapNotLoaded(self.env.current_map.clone()));
        }
        self.ensure_camera()?;
        if let Some(index) = self.current {
            self.maps[index].world.init_objects(&mut self.env);
        }
        Ok(())
    }

    /// Gives the current map an invisible, non-persistent camera following
    /// the local player when it has none.
    pub fn ensure_camera(&mut self) -> Result<Option<ObjectId>, EngineError> {
        let Some(index) = self.current else {
            return Ok(None);
        };
        let world = &mut self.maps[index].world;
        if let Some((id, _)) = world.find_object(MAIN_CAMERA) {
            world.main_camera = Some(id);
            return Ok(Some(id));
        }
        if world.main_camera.is_some() {
            return Ok(world.main_camera);
        }

        let player = world.local_player.and_then(|id| world.get(id));
        let follow = player.map_or(PLAYER.to_string(), |p| p.name.clone());
        let position = player.map_or(Vec2::ZERO, |p| p.position);
        let meta = ObjectMeta::new(MAIN_CAMERA, "cam")
            .at(position.x, position.y)
            .with_property("mode", "follow")
            .with_property("follow", &follow);
        let id = world.spawn(&mut self.env, meta)?;
        if let Some(camera) = id.and_then(|id| world.get_mut(id)) {
            camera.visible = false;
            camera.is_persistent = false;
        }
        Ok(id)
    }

    pub fn register_handler(&mut self, event: &str, handler: EventHandler) {
        self.handlers.register(event, handler);
    }

    fn player_position(&self) -> Option<Vec2> {
        let world = &self.current_map()?.world;
        world.local_player.and_then(|id| world.get(id)).map(|o| o.position)
    }

    /// Loads `quests/<name>.qst` and starts it.
    pub fn add_quest(&mut self, name: &str, details: &HashMap<String, f64>) -> Result<QuestId> {
        let player_position = self.player_position();
        let mut host = QuestHost {
            events: &mut self.env.events,
            frame_time: self.env.frame_time,
            time: self.env.elapsed,
            player_position,
        };
        self.quests.add_quest(&self.env.assets, name, details, &mut host)
    }

    /// Restarts event task `name` on quest `id` (or on every quest).
    pub fn call_quest_event(&mut self, id: Option<QuestId>, name: &str, args: &[f64]) {
        let player_position = self.player_position();
        let mut host = QuestHost {
            events: &mut self.env.events,
            frame_time: self.env.frame_time,
            time: self.env.elapsed,
            player_position,
        };
        self.quests.call_event(id, name, args, &mut host);
    }

    /// One simulation tick over every loaded map.
    ///
    /// A dependency cycle stops the engine: `running` is cleared and the
    /// error is returned.
    pub fn update_maps(&mut self) -> Result<(), EngineError> {
        let dt = self.env.scaled_dt();
        if let Some(index) = self.current {
            let weather = &mut self.maps[index].weather;
            self.profilers.measure("weather", || weather.update(dt));
        }

        let player_position = self.player_position();
        let mut host = QuestHost {
            events: &mut self.env.events,
            frame_time: self.env.frame_time,
            time: self.env.elapsed,
            player_position,
        };
        let quests = &mut self.quests;
        self.profilers.measure("quests", || quests.process(&mut host));

        let (maps, env) = (&mut self.maps, &mut self.env);
        let updated = self.profilers.measure("update", || {
            maps.iter_mut()
                .try_for_each(|map| map.world.update_objects(env))
        });
        if let Err(err) = updated {
            error!("simulation halted: {err}");
            self.env.running = false;
            return Err(err);
        }

        for event in self.env.events.take() {
            self.dispatch_event(&event);
        }

        self.notifications.update(self.env.frame_time);
        self.env.elapsed += f64::from(self.env.frame_time);

        if self.config.profile {
            self.report_timer += f64::from(self.env.frame_time);
            if self.report_timer >= 1.0 {
                self.report_timer = 0.0;
                for line in self.profilers.report() {
                    info!("{line}");
                }
            }
        }
        Ok(())
    }

    /// Runs the built-in natives for `event`, then the game's handlers.
    pub fn dispatch_event(&mut self, event: &Event) {
        let handled = match event.name.as_str() {
            "exitGame" => {
                info!("exit requested");
                self.env.running = false;
                true
            }
            "followPlayer" => {
                self.follow_player(event.number("Speed", 0).unwrap_or(0.0) as f32);
                true
            }
            "cameraInterpolate" => {
                let speed = event.number("Speed", 0).unwrap_or(0.0) as f32;
                let start = event.text("Start", 1).unwrap_or_default();
                let end = event.text("End", 2).unwrap_or_default();
                self.camera_interpolate(speed, &start, &end);
                true
            }
            "notify" => {
                let text = event.text("Text", 0).unwrap_or_default();
                let duration = event
                    .number("Duration", 1)
                    .map_or(DEFAULT_NOTIFICATION_DURATION, |d| d as f32);
                let color = event
                    .text("Color", 2)
                    .and_then(|hex| Color::from_hex(&hex))
                    .unwrap_or(Color::WHITE);
                self.notifications.push_with_duration(&text, duration, color);
                true
            }
            _ => false,
        };

        let dispatched = match self.current {
            Some(index) => {
                self.handlers
                    .dispatch(&mut self.maps[index].world, &mut self.env, event)
            }
            None => false,
        };
        if !handled && !dispatched {
            warn!("event '{}' has no handler", event.name);
        }
    }

    fn follow_player(&mut self, speed: f32) {
        let Some(world) = self.current_map_mut().map(|m| &mut m.world) else {
            return;
        };
        let Some(cam) = world.main_camera else {
            warn!("followPlayer: map has no main camera");
            return;
        };
        let player = world.local_player;
        let name = player
            .and_then(|id| world.get(id))
            .map_or(PLAYER.to_string(), |o| o.name.clone());
        if let Some(camera) = world.behavior_as_mut::<Camera>(cam) {
            camera.follow_object(player, &name, speed);
        }
    }

    fn camera_interpolate(&mut self, speed: f32, start: &str, end: &str) {
        let Some(world) = self.current_map_mut().map(|m| &mut m.world) else {
            return;
        };
        let Some(cam) = world.main_camera else {
            warn!("cameraInterpolate: map has no main camera");
            return;
        };
        let start = world.find_object(start).map(|(id, _)| id);
        let end = world.find_object(end).map(|(id, _)| id);
        if let Some(camera) = world.behavior_as_mut::<Camera>(cam) {
            camera.interpolate(start, end, speed);
        }
    }

    fn draw_context<'a>(&'a self, map: &'a Map) -> DrawContext<'a> {
        let mut ctx = DrawContext::new(&map.world, &self.env);
        ctx.tilesets = &map.tilemap.tilesets;
        ctx.tint = map.weather.sky_color();
        ctx
    }

    /// Draws the current map: tiles, objects sorted by Y, then overlay
    /// tiles. Returns how many tiles and objects were drawn.
    pub fn draw_map(&self, canvas: &mut dyn Canvas) -> usize {
        let Some(map) = self.current_map() else {
            return 0;
        };
        let world = &map.world;
        let view = world.main_camera.and_then(|id| {
            let camera = world.behavior_as::<Camera>(id)?;
            Some(camera.view(world.get(id)?, self.env.screen))
        });
        let frustum = match view {
            Some(view) if self.config.culling => {
                Frustum::new(view.target, view.zoom, self.env.screen)
            }
            _ => Frustum::unbounded(),
        };

        let mut ctx = self.draw_context(map);
        ctx.frustum = frustum;
        canvas.set_camera(view);
        let mut drawn = map.draw_tiles(canvas, &frustum, ctx.tint, false);
        drawn += world.draw_objects(&ctx, canvas);
        drawn += map.draw_tiles(canvas, &frustum, ctx.tint, true);
        canvas.set_camera(None);
        drawn
    }

    /// Screen-space pass: object UI, notifications and debug readouts.
    pub fn draw_map_ui(&self, canvas: &mut dyn Canvas) {
        if let Some(map) = self.current_map() {
            map.world.draw_object_ui(&self.draw_context(map), canvas);
            map.weather.draw(canvas, self.env.debug);
        }
        self.notifications.draw(canvas, self.env.screen.x);

        if self.env.debug && self.config.profile {
            for (row, profiler) in self.profilers.iter().enumerate() {
                canvas.draw_text(
                    profiler.display(),
                    Vec2::new(5.0, 45.0 + 10.0 * row as f32),
                    10.0,
                    Color::WHITE,
                );
            }
        }
    }

    /// Stores every loaded map's persistent objects in `slot`.
    pub fn save_game(
        &mut self,
        slot: usize,
        name: &str,
        game_mode: String,
    ) -> Result<(), EngineError> {
        if !self.env.can_save.is_clear() {
            let reason = self.env.can_save.bits();
            warn!("cannot save the game right now, reason: {reason:#x}");
            return Err(EngineError::SaveRefused(reason));
        }
        let current = self
            .current_map()
            .ok_or_else(|| EngineError::MapNotLoaded(self.env.current_map.clone()))?;
        let state = GameState {
            version: SAVE_VERSION.to_string(),
            save_name: name.to_string(),
            current_map: current.name.clone(),
            maps: self.maps.iter().map(MapSnapshot::capture).collect(),
            game_mode,
        };
        self.saves.write(slot, state)
    }

    /// Replaces every loaded map with the contents of `slot` and returns
    /// the game mode blob stored with it.
    pub fn load_game(&mut self, slot: usize) -> Result<String> {
        let state = self.saves.slot(slot)?.clone();
        info!("loading '{}' from slot {slot}", state.save_name);
        self.env.can_save.reset();
        self.quests.reset();
        self.flush_maps();
        self.load_map_index(&state.current_map)?;

        for snapshot in &state.maps {
            let index = self.load_map_index(&snapshot.map_name)?;
            let map = &mut self.maps[index];
            map.weather = snapshot.weather_data.clone();

            for entry in &snapshot.objects {
                let id = match map.world.find_object(&entry.name) {
                    Some((id, _)) => id,
                    None => {
                        let created =
                            map.world
                                .new_object_pro(&mut self.env, &entry.name, &entry.class);
                        match created {
                            Ok(Some(id)) => id,
                            Ok(None) => continue,
                            Err(err) => {
                                warn!("saved object '{}' could not be restored: {err}", entry.name);
                                continue;
                            }
                        }
                    }
                };
                if let Some(object) = map.world.get_mut(id) {
                    object.position = entry.position;
                    object.movement = entry.movement;
                    object.facing = entry.facing;
                    object.color = entry.color;
                    object.radius = entry.radius;
                    object.attenuation = entry.attenuation;
                }
                map.world.deserialize_object(id, &entry.custom);
            }
            resolve_local_player(&mut map.world);
        }

        self.ensure_camera()?;
        for map in &mut self.maps {
            map.world.init_objects(&mut self.env);
        }
        Ok(state.game_mode)
    }
}

/// Points the world's local player at the object named `player` unless the
/// game already picked one.
fn resolve_local_player(world: &mut World) {
    if world.local_player.is_none() {
        world.local_player = world.find_object(PLAYER).map(|(id, _)| id);
    }
}
