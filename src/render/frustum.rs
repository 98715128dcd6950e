use glam::Vec2;

use crate::math::RectF;

/// Extra border around the visible area so sprites do not pop at the edges.
pub const FRUSTUM_SAFE_MARGIN: f32 = 32.0;

/// Axis-aligned visible rectangle around the main camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    bounds: Option<RectF>,
}

impl Frustum {
    /// Builds the frustum for a camera at `center` with `zoom` on a screen of
    /// `screen` pixels.
    pub fn new(center: Vec2, zoom: f32, screen: Vec2) -> Self {
        let zoom = if zoom > 0.0 { zoom } else { 1.0 };
        let half = screen / zoom / 2.0 + Vec2::splat(FRUSTUM_SAFE_MARGIN);
        Self {
            bounds: Some(RectF::new(
                center.x - half.x,
                center.y - half.y,
                half.x * 2.0,
                half.y * 2.0,
            )),
        }
    }

    /// A frustum that accepts every point (no camera or culling disabled).
    pub const fn unbounded() -> Self {
        Self { bounds: None }
    }

    pub fn bounds(&self) -> Option<RectF> {
        self.bounds
    }

    pub fn contains(&self, point: Vec2) -> bool {
        match &self.bounds {
            Some(rect) => rect.contains(point),
            None => true,
        }
    }
}
