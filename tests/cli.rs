use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use once_cell::sync::Lazy;
use predicates::str::contains;
use tempfile::TempDir;

const DEMO_MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.2" orientation="orthogonal" width="2" height="2" tilewidth="16" tileheight="16" infinite="0">
 <layer name="ground" width="2" height="2">
  <data encoding="csv">0,0,
0,0</data>
 </layer>
 <objectgroup name="objects">
  <object id="1" name="player" type="target" x="16" y="16"/>
  <object id="2" name="door" type="target" x="32" y="0"/>
 </objectgroup>
</map>
"#;

const INTRO_QUEST: &str = "title: intro
qst:
  timer t 100
  fire t
  done t
  invoke notify (welcome)
  finish
";

fn write_assets(root: &Path) {
    fs::create_dir_all(root.join("map/demo")).expect("map dir");
    fs::create_dir_all(root.join("quests")).expect("quest dir");
    fs::write(root.join("map/demo/demo.tmx"), DEMO_MAP).expect("write map");
    fs::write(root.join("quests/intro.qst"), INTRO_QUEST).expect("write quest");
}

static ASSETS: Lazy<TempDir> = Lazy::new(|| {
    let dir = tempfile::tempdir().expect("temp assets");
    write_assets(dir.path());
    dir
});

#[test]
fn cli_loads_the_map_and_prints_final_state() {
    let mut cmd = Command::cargo_bin("tileworld").expect("binary exists");
    cmd.arg(ASSETS.path()).arg("--ticks").arg("5");
    cmd.assert()
        .success()
        .stdout(contains("Loaded map 'demo' with 3 objects (1 layers)"))
        .stdout(contains(" - player (target)"))
        .stdout(contains(" - main_camera (cam)"))
        .stdout(contains("Ran 5 tick(s)"))
        .stdout(contains(" - door pos=(32.00, 0.00) facing=(1.00, 0.00)"));
}

#[test]
fn cli_runs_quests_and_saves() {
    let dir = tempfile::tempdir().expect("temp assets");
    write_assets(dir.path());
    let mut cmd = Command::cargo_bin("tileworld").expect("binary exists");
    cmd.arg(dir.path())
        .args(["--map", "demo", "--quest", "intro", "--ticks", "10", "--save", "2"]);
    cmd.assert()
        .success()
        .stdout(contains("Started quest 'intro'"))
        .stdout(contains(" - quest 'intro' is Finished"))
        .stdout(contains("Saved slot 2"));

    let saves = fs::read_to_string(dir.path().join("gamesav.db")).expect("save file");
    assert!(saves.contains("\"saveName\":\"headless\""));
    assert!(saves.contains("\"currentMap\":\"demo\""));
}

#[test]
fn cli_rejects_unknown_flags() {
    let mut cmd = Command::cargo_bin("tileworld").expect("binary exists");
    cmd.arg(ASSETS.path()).arg("--fullscreen");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains("Unknown argument: --fullscreen"));
}

#[test]
fn cli_reports_missing_maps() {
    let mut cmd = Command::cargo_bin("tileworld").expect("binary exists");
    cmd.arg(ASSETS.path()).args(["--map", "nowhere"]);
    cmd.assert()
        .failure()
        .stderr(contains("failed to start map nowhere"));
}
