use glam::Vec2;

use crate::map::{find_tileset, TileRef};
use crate::math::{Color, RectF};
use crate::render::Canvas;
use crate::world::{DrawContext, Object, ObjectBehavior, Shape};

use super::draw_centered;

/// A single tile stamped into the world.
#[derive(Debug, Clone, Copy)]
pub struct Tile {
    pub tile: TileRef,
}

pub(super) fn build(object: &mut Object) -> Box<dyn ObjectBehavior> {
    let tile = TileRef::from_raw(object.meta.gid);
    object.shape = Shape::Tile;
    object.debug_visible = false;
    object.is_collidable = object.collision_type != "none";
    Box::new(Tile { tile })
}

impl ObjectBehavior for Tile {
    fn draw(&self, object: &Object, ctx: &DrawContext<'_>, canvas: &mut dyn Canvas) {
        if ctx.debug() && object.debug_visible {
            let aabb = object.aabb();
            canvas.draw_rectangle_lines(RectF::from(aabb), Color::rgba(0, 121, 241, 255));
            draw_centered(
                canvas,
                &object.name,
                Vec2::new(aabb.center().x, aabb.bottom() as f32 + 2.0),
                Color::WHITE,
            );
        }

        let tileset = match &object.meta.tileset {
            Some(local) => Some(local),
            None => find_tileset(ctx.tilesets, self.tile.gid),
        };
        let Some(tileset) = tileset else {
            return;
        };
        let Some(src) = tileset.source_rect(self.tile.gid) else {
            return;
        };
        let (src, flip_rotation) = self.tile.apply_flips(src);
        let width = object.size.x as f32;
        let height = object.size.y as f32;
        canvas.draw_texture(
            &tileset.image,
            src,
            RectF::new(object.position.x, object.position.y, width, height),
            Vec2::new(0.0, height),
            flip_rotation + object.rotation,
            ctx.tint,
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::env::Env;
    use crate::map::{Tileset, FLIP_VERTICAL};
    use crate::render::{DrawCommand, RecordingCanvas};
    use crate::world::{ObjectMeta, World};

    #[test]
    fn flags_come_from_the_raw_gid() {
        let mut env = Env::default();
        let mut world = World::new("tiles");
        let mut meta = ObjectMeta::new("rock", "tile").at(0.0, 32.0).sized(16.0, 16.0);
        meta.gid = FLIP_VERTICAL | 3;
        let id = world.spawn(&mut env, meta).unwrap().unwrap();
        let tile = world.behavior_as::<Tile>(id).unwrap();
        assert_eq!(tile.tile.gid, 3);
        assert!(tile.tile.flip_v && !tile.tile.flip_h);
        assert!(world.get(id).unwrap().is_collidable);

        let tilesets = vec![Arc::new(Tileset {
            first_gid: 1,
            tile_width: 16,
            tile_height: 16,
            image: "gfx/rocks.png".into(),
            image_width: 64,
            ..Tileset::default()
        })];
        let mut canvas = RecordingCanvas::new();
        let mut ctx = DrawContext::new(&world, &env);
        ctx.tilesets = &tilesets;
        ctx.tint = Color::YELLOW;
        world.draw_objects(&ctx, &mut canvas);
        match &canvas.commands[..] {
            [DrawCommand::Texture { texture, src, origin, tint, .. }] => {
                assert_eq!(texture, "gfx/rocks.png");
                assert_eq!(*src, RectF::new(32.0, 0.0, 16.0, -16.0));
                assert_eq!(*origin, Vec2::new(0.0, 16.0));
                assert_eq!(*tint, Color::YELLOW);
            }
            other => panic!("unexpected commands {other:?}"),
        }
    }
}
