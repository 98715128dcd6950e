//! Sprite sheets exported as JSON (frame array plus tagged ranges) and the
//! per-object playback cursor that walks them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::math::Rect;

/// Frame size used when an object has no sprite sheet.
pub const DEFAULT_SPRITE_SIZE: i32 = 32;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpriteSheet {
    pub frames: Vec<SpriteFrame>,
    #[serde(default)]
    pub meta: SpriteMeta,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpriteFrame {
    pub frame: FrameRect,
    #[serde(default = "default_duration")]
    pub duration: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FrameRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SpriteMeta {
    #[serde(default)]
    pub image: String,
    #[serde(default, rename = "frameTags")]
    pub frame_tags: Vec<FrameTag>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FrameTag {
    pub name: String,
    pub from: usize,
    pub to: usize,
    #[serde(default)]
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
    Pingpong,
}

fn default_duration() -> u32 {
    100
}

impl SpriteSheet {
    pub fn from_json(text: &str) -> Result<Self> {
        let sheet: SpriteSheet =
            serde_json::from_str(text).context("parse sprite sheet json")?;
        Ok(sheet)
    }

    pub fn tag(&self, name: &str) -> Option<&FrameTag> {
        self.meta.frame_tags.iter().find(|tag| tag.name == name)
    }

    /// Size of the first frame, or the default sprite size for empty sheets.
    pub fn frame_size(&self) -> (i32, i32) {
        self.frames
            .first()
            .map(|f| (f.frame.w, f.frame.h))
            .unwrap_or((DEFAULT_SPRITE_SIZE, DEFAULT_SPRITE_SIZE))
    }
}

/// Playback state of one animated object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimPlayer {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub frame: usize,
    #[serde(default)]
    pub elapsed: f32,
    #[serde(default)]
    pub playing: bool,
    #[serde(default = "default_forward")]
    pingpong_forward: bool,
}

fn default_forward() -> bool {
    true
}

impl AnimPlayer {
    /// Starts `tag`; replaying the running tag keeps its position.
    pub fn play(&mut self, sheet: &SpriteSheet, tag: &str) {
        if self.playing && self.tag.as_deref() == Some(tag) {
            return;
        }
        let Some(range) = sheet.tag(tag) else {
            log::warn!("sprite tag '{tag}' is not defined");
            return;
        };
        self.frame = match range.direction {
            Direction::Reverse => range.to,
            _ => range.from,
        };
        self.tag = Some(tag.to_string());
        self.elapsed = 0.0;
        self.playing = true;
        self.pingpong_forward = true;
    }

    /// Advances playback by `dt` seconds.
    pub fn update(&mut self, sheet: &SpriteSheet, dt: f32) {
        if !self.playing || sheet.frames.is_empty() {
            return;
        }
        let Some(range) = self.tag.as_deref().and_then(|t| sheet.tag(t)).cloned() else {
            return;
        };
        self.elapsed += dt * 1000.0;
        loop {
            let duration = sheet
                .frames
                .get(self.frame)
                .map(|f| f.duration.max(1) as f32)
                .unwrap_or(100.0);
            if self.elapsed < duration {
                break;
            }
            self.elapsed -= duration;
            self.step(&range);
        }
    }

    fn step(&mut self, range: &FrameTag) {
        match range.direction {
            Direction::Forward => {
                self.frame = if self.frame >= range.to { range.from } else { self.frame + 1 };
            }
            Direction::Reverse => {
                self.frame = if self.frame <= range.from { range.to } else { self.frame - 1 };
            }
            Direction::Pingpong => {
                if range.from == range.to {
                    return;
                }
                if self.pingpong_forward && self.frame >= range.to {
                    self.pingpong_forward = false;
                } else if !self.pingpong_forward && self.frame <= range.from {
                    self.pingpong_forward = true;
                }
                if self.pingpong_forward {
                    self.frame += 1;
                } else {
                    self.frame -= 1;
                }
            }
        }
    }

    /// Source rectangle of the current frame.
    pub fn source_rect(&self, sheet: &SpriteSheet) -> Rect {
        sheet
            .frames
            .get(self.frame)
            .map(|f| Rect::new(f.frame.x, f.frame.y, f.frame.w, f.frame.h))
            .unwrap_or_else(|| Rect::new(0, 0, DEFAULT_SPRITE_SIZE, DEFAULT_SPRITE_SIZE))
    }
}
