use std::sync::Arc;

use glam::Vec2;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::math::RectF;
use crate::render::Canvas;
use crate::sprite::{AnimPlayer, SpriteSheet, DEFAULT_SPRITE_SIZE};
use crate::world::{DrawContext, HookContext, Object, ObjectBehavior, ObjectId, Shape};

use super::draw_marker;

/// Sprite animator over `<file>.json` / `<file>.png`.
///
/// With a proxy set, the object stops advancing its own player and draws the
/// proxy's current frame at its own position.
#[derive(Debug, Clone, Default)]
pub struct Anim {
    pub sheet: Option<Arc<SpriteSheet>>,
    pub player: AnimPlayer,
    pub texture: String,
    pub tag: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnimData {
    player: AnimPlayer,
    started: bool,
}

pub(super) fn build(object: &mut Object) -> Box<dyn ObjectBehavior> {
    object.shape = Shape::Sprite { frame: None };
    Box::new(Anim {
        texture: format!("{}.png", object.file_name),
        tag: object.property("tag").map(str::to_string),
        ..Anim::default()
    })
}

impl Anim {
    pub fn play(&mut self, tag: &str) {
        match &self.sheet {
            Some(sheet) => self.player.play(sheet, tag),
            None => warn!("cannot play '{tag}' without a sprite sheet"),
        }
    }

    fn draw_frame(&self, object: &Object, ctx: &DrawContext<'_>, canvas: &mut dyn Canvas) {
        let at = object.position + object.offset;
        let (src, dst) = match &self.sheet {
            Some(sheet) => {
                let src = RectF::from(self.player.source_rect(sheet));
                let dst = RectF::new(
                    at.x - src.width / 2.0,
                    at.y - src.height / 2.0,
                    src.width,
                    src.height,
                );
                (src, dst)
            }
            None => {
                let size = DEFAULT_SPRITE_SIZE as f32;
                (
                    RectF::new(0.0, 0.0, size, size),
                    RectF::new(at.x, at.y - size, size, size),
                )
            }
        };
        canvas.draw_texture(&self.texture, src, dst, Vec2::ZERO, object.rotation, ctx.tint);
    }
}

impl ObjectBehavior for Anim {
    fn finish(&mut self, ctx: &mut HookContext<'_>) {
        let object = ctx.object();
        if object.file_name.is_empty() {
            return;
        }
        match ctx.env.assets.sprite_sheet(&object.file_name) {
            Ok(sheet) => {
                let frame = sheet.frame_size();
                self.sheet = Some(sheet);
                ctx.object_mut().shape = Shape::Sprite { frame: Some(frame) };
            }
            Err(err) => warn!("anim '{}' has no sprite sheet: {err:#}", object.name),
        }
    }

    fn init(&mut self, ctx: &mut HookContext<'_>) {
        let object = ctx.object();
        if object.auto_start && !object.started {
            self.trigger(ctx, None);
        }
    }

    fn update(&mut self, ctx: &mut HookContext<'_>, dt: f32) {
        if ctx.object().proxy.is_some() {
            return;
        }
        if let Some(sheet) = &self.sheet {
            self.player.update(sheet, dt);
        }
    }

    fn trigger(&mut self, ctx: &mut HookContext<'_>, _from: Option<ObjectId>) {
        let Some(tag) = self.tag.clone() else {
            warn!("anim '{}' has no tag to play", ctx.object().name);
            return;
        };
        self.play(&tag);
        ctx.object_mut().started = true;
    }

    fn draw(&self, object: &Object, ctx: &DrawContext<'_>, canvas: &mut dyn Canvas) {
        let source = object
            .proxy
            .and_then(|proxy| ctx.world.behavior_as::<Anim>(proxy))
            .unwrap_or(self);
        source.draw_frame(object, ctx, canvas);
        if ctx.debug() && object.debug_visible {
            let frame = self.player.frame;
            draw_marker(canvas, object, 2.0, &[format!("Frame: {frame}")]);
        }
    }

    fn serialize(&self, object: &Object) -> String {
        let data = AnimData {
            player: self.player.clone(),
            started: object.started,
        };
        serde_json::to_string(&data).unwrap_or_default()
    }

    fn deserialize(&mut self, object: &mut Object, blob: &str) {
        match serde_json::from_str::<AnimData>(blob) {
            Ok(data) => {
                self.player = data.player;
                object.started = data.started;
            }
            Err(err) => warn!("anim '{}' has a broken save blob: {err}", object.name),
        }
    }
}
