//! Drawing boundary between the world and the host graphics library.
//!
//! The runtime never talks to a GPU directly. Objects, tiles and UI panels
//! issue calls against [`Canvas`]; the host implements it on top of its
//! blitting API and camera transform. [`RecordingCanvas`] keeps the calls in
//! memory for headless runs and tests.

mod frustum;
mod recording;

pub use frustum::{Frustum, FRUSTUM_SAFE_MARGIN};
pub use recording::{DrawCommand, RecordingCanvas};

use glam::Vec2;

use crate::math::{Color, RectF};

/// Immediate-mode drawing surface provided by the host.
pub trait Canvas {
    /// Blits `src` of the texture at `texture` (asset path) into `dst`.
    ///
    /// Negative source width/height flip the sprite; `origin` is relative to
    /// `dst` and `rotation` is in degrees.
    fn draw_texture(
        &mut self,
        texture: &str,
        src: RectF,
        dst: RectF,
        origin: Vec2,
        rotation: f32,
        tint: Color,
    );

    fn draw_rectangle(&mut self, rect: RectF, color: Color);

    fn draw_rectangle_lines(&mut self, rect: RectF, color: Color);

    fn draw_circle(&mut self, center: Vec2, radius: f32, color: Color);

    fn draw_text(&mut self, text: &str, position: Vec2, size: f32, color: Color);

    /// Width of `text` in pixels; hosts with real fonts should override this.
    fn measure_text(&self, text: &str, size: f32) -> f32 {
        text.chars().count() as f32 * size * 0.5
    }

    /// Sets the camera transform for world-space drawing. UI calls follow a
    /// `None` reset.
    fn set_camera(&mut self, _camera: Option<CameraView>) {}
}

/// World-to-screen transform of the main camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub target: Vec2,
    pub offset: Vec2,
    pub zoom: f32,
}
