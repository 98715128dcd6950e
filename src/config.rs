use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Runtime tunables. Every field has a default so partial documents load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fixed simulation step in seconds.
    #[serde(default = "default_frame_time")]
    pub frame_time: f32,
    #[serde(default = "default_time_scale")]
    pub time_scale: f32,
    #[serde(default = "default_screen_width")]
    pub screen_width: u32,
    #[serde(default = "default_screen_height")]
    pub screen_height: u32,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_true")]
    pub culling: bool,
    /// Cap on simultaneously running non-background quests.
    #[serde(default = "default_max_quests")]
    pub max_quests: usize,
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,
    #[serde(default = "default_music_volume")]
    pub music_volume: f32,
    #[serde(default)]
    pub profile: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_time: default_frame_time(),
            time_scale: default_time_scale(),
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
            debug: false,
            culling: true,
            max_quests: default_max_quests(),
            asset_root: default_asset_root(),
            save_path: default_save_path(),
            music_volume: default_music_volume(),
            profile: false,
        }
    }
}

fn default_frame_time() -> f32 {
    1.0 / 60.0
}

fn default_time_scale() -> f32 {
    1.0
}

fn default_screen_width() -> u32 {
    640
}

fn default_screen_height() -> u32 {
    480
}

fn default_true() -> bool {
    true
}

fn default_max_quests() -> usize {
    5
}

fn default_asset_root() -> PathBuf {
    PathBuf::from("assets")
}

fn default_save_path() -> PathBuf {
    PathBuf::from("gamesav.db")
}

fn default_music_volume() -> f32 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_keep_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"debug": true, "max_quests": 2}"#).unwrap();
        assert!(config.debug);
        assert_eq!(config.max_quests, 2);
        assert_eq!(config.screen_width, 640);
        assert!(config.culling);
        assert_eq!(config.save_path, PathBuf::from("gamesav.db"));
    }
}
