//! Fixed-timestep driver and the game-mode hook.

use anyhow::{Context, Result};
use log::info;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::render::Canvas;

/// Game-specific layer run after the world each tick.
pub trait GameMode {
    fn init(&mut self, _engine: &mut Engine) -> Result<()> {
        Ok(())
    }

    fn update(&mut self, _engine: &mut Engine) {}

    fn draw(&mut self, engine: &Engine, canvas: &mut dyn Canvas) {
        engine.draw_map(canvas);
    }

    fn draw_ui(&mut self, engine: &Engine, canvas: &mut dyn Canvas) {
        engine.draw_map_ui(canvas);
    }

    /// Blob stored next to the maps in a save slot.
    fn serialize(&self) -> String {
        String::new()
    }

    fn deserialize(&mut self, _data: &str) {}

    fn shutdown(&mut self, _engine: &mut Engine) {}
}

/// Draws the current map and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMode;

impl GameMode for DefaultMode {}

pub struct Runtime {
    pub engine: Engine,
    mode: Box<dyn GameMode>,
    accumulator: f64,
    ticks: u64,
}

impl Runtime {
    pub fn new(engine: Engine, mode: Box<dyn GameMode>) -> Self {
        Self {
            engine,
            mode,
            accumulator: 0.0,
            ticks: 0,
        }
    }

    /// Loads `map`, initializes its objects and then the game mode.
    pub fn start(&mut self, map: &str) -> Result<()> {
        self.engine.load_map(map)?;
        self.engine
            .init_map()
            .with_context(|| format!("map {map} could not be initialized"))?;
        self.mode.init(&mut self.engine)
    }

    pub fn is_running(&self) -> bool {
        self.engine.env.running
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick(&mut self) -> Result<(), EngineError> {
        self.engine.update_maps()?;
        self.mode.update(&mut self.engine);
        self.engine.env.input.advance_frame();
        self.ticks += 1;
        Ok(())
    }

    /// Adds `passed` seconds and runs every whole tick that fits. Returns
    /// the number of ticks run.
    pub fn advance(&mut self, passed: f64) -> Result<usize, EngineError> {
        let frame_time = f64::from(self.engine.env.frame_time);
        self.accumulator += passed;
        let mut ran = 0;
        while self.accumulator > frame_time && self.is_running() {
            self.tick()?;
            self.accumulator -= frame_time;
            ran += 1;
        }
        Ok(ran)
    }

    pub fn render(&mut self, canvas: &mut dyn Canvas) {
        self.mode.draw(&self.engine, canvas);
        self.mode.draw_ui(&self.engine, canvas);
    }

    /// One host frame: ticks for `passed` seconds, then renders if any tick
    /// ran.
    pub fn frame(&mut self, passed: f64, canvas: &mut dyn Canvas) -> Result<usize, EngineError> {
        let ran = self.advance(passed)?;
        if ran > 0 {
            self.render(canvas);
        }
        Ok(ran)
    }

    /// Runs up to `ticks` ticks without a clock, stopping early when the
    /// engine stops running.
    pub fn run_headless(&mut self, ticks: u64) -> Result<u64, EngineError> {
        let mut ran = 0;
        while ran < ticks && self.is_running() {
            self.tick()?;
            ran += 1;
        }
        Ok(ran)
    }

    pub fn save_game(&mut self, slot: usize, name: &str) -> Result<(), EngineError> {
        let blob = self.mode.serialize();
        self.engine.save_game(slot, name, blob)
    }

    pub fn load_game(&mut self, slot: usize) -> Result<()> {
        let blob = self.engine.load_game(slot)?;
        self.mode.deserialize(&blob);
        Ok(())
    }

    pub fn shutdown(&mut self) {
        info!("shutting down after {} ticks", self.ticks);
        self.mode.shutdown(&mut self.engine);
        self.engine.flush_maps();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetStore;
    use crate::config::EngineConfig;
    use crate::events::Event;
    use crate::render::RecordingCanvas;
    use std::cell::RefCell;
    use std::rc::Rc;

    const FIELD: &str = r#"<map width="2" height="2" tilewidth="16" tileheight="16">
 <objectgroup name="objects">
  <object id="1" name="player" type="target" x="8" y="8"/>
 </objectgroup>
</map>"#;

    #[derive(Debug, Default)]
    struct Counts {
        updates: u32,
        draws: u32,
        restored: String,
    }

    #[derive(Debug, Default)]
    struct Counting(Rc<RefCell<Counts>>);

    impl GameMode for Counting {
        fn update(&mut self, _engine: &mut Engine) {
            self.0.borrow_mut().updates += 1;
        }

        fn draw(&mut self, engine: &Engine, canvas: &mut dyn Canvas) {
            self.0.borrow_mut().draws += 1;
            engine.draw_map(canvas);
        }

        fn serialize(&self) -> String {
            format!("updates={}", self.0.borrow().updates)
        }

        fn deserialize(&mut self, data: &str) {
            self.0.borrow_mut().restored = data.to_string();
        }
    }

    fn runtime(dir: &tempfile::TempDir) -> (Runtime, Rc<RefCell<Counts>>) {
        let assets = AssetStore::new(dir.path());
        assets.insert_file("map/field/field.tmx", FIELD);
        let config = EngineConfig {
            save_path: dir.path().join("gamesav.db"),
            ..EngineConfig::default()
        };
        let counts = Rc::new(RefCell::new(Counts::default()));
        let mut runtime = Runtime::new(
            Engine::with_assets(config, assets),
            Box::new(Counting(Rc::clone(&counts))),
        );
        runtime.start("field").unwrap();
        (runtime, counts)
    }

    #[test]
    fn advance_runs_whole_ticks_and_keeps_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let (mut runtime, counts) = runtime(&dir);
        let mut canvas = RecordingCanvas::new();

        assert_eq!(runtime.frame(0.04, &mut canvas).unwrap(), 2);
        assert_eq!(runtime.ticks(), 2);
        assert!(runtime.accumulator > 0.0 && runtime.accumulator < 0.01);
        assert_eq!(runtime.frame(0.001, &mut canvas).unwrap(), 0);
        assert_eq!(runtime.frame(0.02, &mut canvas).unwrap(), 1);
        assert!((runtime.engine.env.elapsed - 3.0 / 60.0).abs() < 1e-6);
        assert_eq!(counts.borrow().updates, 3);
        assert_eq!(counts.borrow().draws, 2);
    }

    #[test]
    fn headless_runs_stop_on_exit() {
        let dir = tempfile::tempdir().unwrap();
        let (mut runtime, _) = runtime(&dir);
        assert_eq!(runtime.run_headless(5).unwrap(), 5);
        runtime.engine.env.events.push(Event::new("exitGame", vec![]));
        assert_eq!(runtime.run_headless(100).unwrap(), 1);
        assert!(!runtime.is_running());
        assert_eq!(runtime.advance(1.0).unwrap(), 0);
    }

    #[test]
    fn saves_carry_the_game_mode_blob() {
        let dir = tempfile::tempdir().unwrap();
        let (mut runtime, counts) = runtime(&dir);
        runtime.run_headless(3).unwrap();
        runtime.save_game(1, "three").unwrap();
        runtime.run_headless(2).unwrap();
        runtime.load_game(1).unwrap();
        assert_eq!(counts.borrow().restored, "updates=3");
        assert_eq!(runtime.engine.saves.list(), vec![(1, "three")]);
        assert!(runtime.engine.current_map().is_some());
        runtime.shutdown();
        assert!(runtime.engine.maps().is_empty());
    }
}
