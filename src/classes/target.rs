use crate::render::Canvas;
use crate::world::{DrawContext, Object, ObjectBehavior};

use super::draw_marker;

/// Named point in the map; only visible as a debug marker.
#[derive(Debug, Clone, Copy, Default)]
pub struct Target;

pub(super) fn build(_object: &mut Object) -> Box<dyn ObjectBehavior> {
    Box::new(Target)
}

impl ObjectBehavior for Target {
    fn draw(&self, object: &Object, ctx: &DrawContext<'_>, canvas: &mut dyn Canvas) {
        if ctx.debug() && object.debug_visible {
            draw_marker(canvas, object, 2.0, &[]);
        }
    }
}
