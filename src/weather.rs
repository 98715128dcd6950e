//! Per-map sky tint with an optional day cycle.
//!
//! The map's `skyColor` sets the starting tint. Each of `skyRiseColor`,
//! `skyDayColor`, `skyDawnColor` and `skyNightColor` that is present adds a
//! stage lasting the matching `riseDuration`/`dayDuration`/... (in minutes).
//! The tint blends from the previous stage colour to the current one over the
//! stage's duration and the cycle wraps around.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::math::Color;
use crate::render::Canvas;

const STAGES: [(&str, &str); 4] = [
    ("skyRiseColor", "riseDuration"),
    ("skyDayColor", "dayDuration"),
    ("skyDawnColor", "dawnDuration"),
    ("skyNightColor", "nightDuration"),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyStage {
    pub color: Vec3,
    /// Seconds.
    pub duration: f64,
}

/// Sky state of one map; serialized as the map's `weatherData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    pub use_time_cycle: bool,
    pub sky_time: f64,
    pub sky_target_time: f64,
    pub stage_index: usize,
    pub stages: Vec<SkyStage>,
    pub last_color: Vec3,
    pub current_color: Vec3,
    pub target_color: Vec3,
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            use_time_cycle: false,
            sky_time: 0.0,
            sky_target_time: 0.0,
            stage_index: 0,
            stages: Vec::new(),
            last_color: Vec3::ONE,
            current_color: Vec3::ONE,
            target_color: Vec3::ONE,
        }
    }
}

impl Weather {
    /// Reads the sky properties of a map through `property`.
    pub fn from_properties<'a>(property: impl Fn(&str) -> Option<&'a str>) -> Self {
        let mut weather = Self::default();
        let base = property("skyColor").and_then(Color::from_hex);
        if let Some(color) = base {
            weather.current_color = color.to_vec3();
        }

        for (color_key, duration_key) in STAGES {
            let Some(color) = property(color_key).and_then(Color::from_hex) else {
                continue;
            };
            let minutes: f64 = property(duration_key)
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(0.0);
            weather.use_time_cycle = true;
            weather.stages.push(SkyStage {
                color: color.to_vec3(),
                duration: minutes * 60.0,
            });
        }

        if let Some(first) = weather.stages.first().copied() {
            weather.last_color = weather.current_color;
            weather.target_color = first.color;
            weather.sky_time = first.duration;
            weather.sky_target_time = first.duration;
            weather.stage_index = 0;
            if base.is_none() {
                weather.current_color = weather.target_color;
                weather.next_stage();
            }
        }
        weather
    }

    /// Advances the cycle by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if !self.use_time_cycle || self.stages.is_empty() {
            return;
        }
        if self.sky_time <= 0.0 {
            self.next_stage();
        } else {
            self.sky_time -= dt as f64;
        }
        self.current_color = if self.sky_target_time != 0.0 {
            let t = (1.0 - self.sky_time / self.sky_target_time).clamp(0.0, 1.0);
            self.last_color.lerp(self.target_color, t as f32)
        } else {
            self.target_color
        };
    }

    fn next_stage(&mut self) {
        self.stage_index = (self.stage_index + 1) % self.stages.len();
        let stage = self.stages[self.stage_index];
        self.sky_time = stage.duration;
        self.sky_target_time = stage.duration;
        self.target_color = stage.color;
        self.last_color = self.current_color;
    }

    /// Tint applied to world tiles and sprites.
    pub fn sky_color(&self) -> Color {
        Color::from_vec3(self.current_color)
    }

    /// Debug readout of the cycle.
    pub fn draw(&self, canvas: &mut dyn Canvas, debug: bool) {
        if !debug || !self.use_time_cycle {
            return;
        }
        canvas.draw_text(
            &format!("Sky stage: {}", self.stage_index),
            glam::Vec2::new(5.0, 20.0),
            10.0,
            Color::WHITE,
        );
        canvas.draw_text(
            &format!("Sky time: {:.2}", self.sky_time),
            glam::Vec2::new(5.0, 30.0),
            10.0,
            Color::WHITE,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn weather(props: &[(&str, &str)]) -> Weather {
        let props: HashMap<&str, &str> = props.iter().copied().collect();
        Weather::from_properties(|key| props.get(key).copied())
    }

    #[test]
    fn no_properties_means_white_and_static() {
        let mut w = weather(&[]);
        w.update(1.0);
        assert_eq!(w.sky_color(), Color::WHITE);
        assert!(!w.use_time_cycle);
    }

    #[test]
    fn base_colour_sets_the_tint() {
        let w = weather(&[("skyColor", "#ff000000")]);
        assert_eq!(w.sky_color(), Color::BLACK);
    }

    #[test]
    fn cycle_blends_towards_the_next_stage() {
        let mut w = weather(&[
            ("skyColor", "#ff000000"),
            ("skyDayColor", "#ffffffff"),
            ("dayDuration", "1"),
            ("skyNightColor", "#ff000000"),
            ("nightDuration", "1"),
        ]);
        assert_eq!(w.sky_time, 60.0);
        w.update(30.0);
        let mid = w.sky_color();
        assert!(mid.r > 100 && mid.r < 155, "{mid:?}");
        w.update(30.0);
        w.update(0.0);
        assert_eq!(w.stage_index, 1);
    }

    #[test]
    fn survives_a_json_round_trip() {
        let w = weather(&[("skyDayColor", "#ff204060"), ("dayDuration", "2")]);
        let text = serde_json::to_string(&w).unwrap();
        let back: Weather = serde_json::from_str(&text).unwrap();
        assert_eq!(back, w);
    }
}
