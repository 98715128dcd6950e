use crate::math::{Color, RectF};
use crate::render::Canvas;
use crate::world::{Collision, DrawContext, Object, ObjectBehavior, ObjectId, Shape};

use super::draw_centered;

/// Static blocking rectangle.
#[derive(Debug, Default)]
pub struct Collider {
    /// Set when something ran into this body since the last debug draw.
    hit: std::cell::Cell<bool>,
}

pub(super) fn build(object: &mut Object) -> Box<dyn ObjectBehavior> {
    object.is_collidable = true;
    object.shape = Shape::Solid;
    object.debug_visible = false;
    Box::new(Collider::default())
}

impl ObjectBehavior for Collider {
    fn handle_collision(&mut self, _object: &mut Object, _hit: &Collision, _other: ObjectId) {
        self.hit.set(true);
    }

    fn draw(&self, object: &Object, ctx: &DrawContext<'_>, canvas: &mut dyn Canvas) {
        if !ctx.debug() || !object.debug_visible {
            return;
        }
        let color = if self.hit.replace(false) {
            Color::RED
        } else {
            Color::WHITE
        };
        let aabb = object.aabb();
        canvas.draw_rectangle_lines(RectF::from(aabb), color);
        draw_centered(
            canvas,
            &object.name,
            glam::Vec2::new(aabb.center().x, aabb.bottom() as f32 + 2.0),
            Color::WHITE,
        );
    }
}
