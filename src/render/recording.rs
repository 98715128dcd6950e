use glam::Vec2;

use super::{CameraView, Canvas};
use crate::math::{Color, RectF};

/// A single recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Texture {
        texture: String,
        src: RectF,
        dst: RectF,
        origin: Vec2,
        rotation: f32,
        tint: Color,
    },
    Rectangle {
        rect: RectF,
        color: Color,
        filled: bool,
    },
    Circle {
        center: Vec2,
        radius: f32,
        color: Color,
    },
    Text {
        text: String,
        position: Vec2,
        size: f32,
        color: Color,
    },
    Camera(Option<CameraView>),
}

/// Canvas that stores every call; used by the headless runner and tests.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub commands: Vec<DrawCommand>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// All recorded text strings, in draw order.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn texture_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, DrawCommand::Texture { .. }))
            .count()
    }
}

impl Canvas for RecordingCanvas {
    fn draw_texture(
        &mut self,
        texture: &str,
        src: RectF,
        dst: RectF,
        origin: Vec2,
        rotation: f32,
        tint: Color,
    ) {
        self.commands.push(DrawCommand::Texture {
            texture: texture.to_string(),
            src,
            dst,
            origin,
            rotation,
            tint,
        });
    }

    fn draw_rectangle(&mut self, rect: RectF, color: Color) {
        self.commands.push(DrawCommand::Rectangle {
            rect,
            color,
            filled: true,
        });
    }

    fn draw_rectangle_lines(&mut self, rect: RectF, color: Color) {
        self.commands.push(DrawCommand::Rectangle {
            rect,
            color,
            filled: false,
        });
    }

    fn draw_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
        });
    }

    fn draw_text(&mut self, text: &str, position: Vec2, size: f32, color: Color) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            position,
            size,
            color,
        });
    }

    fn set_camera(&mut self, camera: Option<CameraView>) {
        self.commands.push(DrawCommand::Camera(camera));
    }
}
