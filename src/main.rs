use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use tileworld_runtime::{DefaultMode, Engine, EngineConfig, Runtime, World};

const USAGE: &str = "Usage: tileworld <asset-root> [--map NAME] [--ticks N] [--quest NAME] \
[--save SLOT] [--debug] [--profile] [--musicvol V] [--timescale S]";

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let config = options.config();
    let mut runtime = Runtime::new(Engine::new(config), Box::new(DefaultMode));
    runtime
        .start(&options.map)
        .with_context(|| format!("failed to start map {}", options.map))?;

    let map = runtime
        .engine
        .current_map()
        .ok_or_else(|| anyhow!("map {} is not loaded", options.map))?;
    println!(
        "Loaded map '{}' with {} objects ({} layers)",
        map.name,
        map.world.len(),
        map.tilemap.layers.len()
    );
    for (_, object) in map.world.objects() {
        println!(" - {} ({})", object.name, object.class);
    }

    for quest in &options.quests {
        let id = runtime
            .engine
            .add_quest(quest, &HashMap::new())
            .with_context(|| format!("failed to start quest {quest}"))?;
        println!("Started quest '{quest}' (#{id})");
    }

    let ran = runtime.run_headless(options.ticks)?;
    println!("Ran {ran} tick(s)");
    for quest in runtime.engine.quests.quests() {
        println!(" - quest '{}' is {:?}", quest.name, quest.state);
    }

    if let Some(slot) = options.save_slot {
        runtime
            .save_game(slot, "headless")
            .with_context(|| format!("failed to save into slot {slot}"))?;
        println!("Saved slot {slot}");
    }

    if let Some(map) = runtime.engine.current_map() {
        print_final_state(&map.world);
    }
    runtime.shutdown();
    Ok(())
}

fn print_final_state(world: &World) {
    println!("Final object states:");
    for (_, object) in world.objects() {
        println!(
            " - {} pos=({:.2}, {:.2}) facing=({:.2}, {:.2})",
            object.name, object.position.x, object.position.y, object.facing.x, object.facing.y
        );
    }
}

struct CliOptions {
    asset_root: PathBuf,
    map: String,
    ticks: u64,
    quests: Vec<String>,
    save_slot: Option<usize>,
    debug: bool,
    profile: bool,
    music_volume: f32,
    time_scale: f32,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(asset_root) = args.next() else {
            return Err(anyhow!(USAGE));
        };
        let mut options = Self {
            asset_root: PathBuf::from(asset_root),
            map: "demo".to_string(),
            ticks: 60,
            quests: Vec::new(),
            save_slot: None,
            debug: false,
            profile: false,
            music_volume: 1.0,
            time_scale: 1.0,
        };

        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("{flag} expects a value. {USAGE}"))
            };
            match arg.as_str() {
                "--map" => options.map = value("--map")?,
                "--quest" => options.quests.push(value("--quest")?),
                "--ticks" => {
                    options.ticks = value("--ticks")?
                        .parse()
                        .context("--ticks expects a whole number")?;
                }
                "--save" => {
                    options.save_slot = Some(
                        value("--save")?
                            .parse()
                            .context("--save expects a slot number")?,
                    );
                }
                "--musicvol" => {
                    let percent: f32 = value("--musicvol")?
                        .parse()
                        .context("--musicvol expects a number")?;
                    options.music_volume = (percent / 100.0).clamp(0.0, 1.0);
                }
                "--timescale" => {
                    options.time_scale = value("--timescale")?
                        .parse()
                        .context("--timescale expects a number")?;
                }
                "--debug" => options.debug = true,
                "--profile" => options.profile = true,
                other => return Err(anyhow!("Unknown argument: {other}. {USAGE}")),
            }
        }
        Ok(options)
    }

    fn config(&self) -> EngineConfig {
        EngineConfig {
            asset_root: self.asset_root.clone(),
            save_path: self.asset_root.join("gamesav.db"),
            debug: self.debug,
            profile: self.profile,
            music_volume: self.music_volume,
            time_scale: self.time_scale,
            ..EngineConfig::default()
        }
    }
}
