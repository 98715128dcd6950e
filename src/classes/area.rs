use log::{debug, warn};

use crate::math::Color;
use crate::render::Canvas;
use crate::world::{DrawContext, HookContext, Object, ObjectBehavior, ObjectId, ObjectMeta};

use super::draw_centered;

/// Seconds before a re-entered area may restart its talk.
const RETRIGGER_DELAY: f64 = 1.0;

/// Proximity trigger around the area (or its proxy).
///
/// When the local player stands inside `radius` and presses `use`, the area
/// starts its optional `talk` child and then fires its target.
#[derive(Debug, Clone, Default)]
pub struct Area {
    /// World units; twice the authored `radius`.
    pub radius: f32,
    talk: Option<ObjectId>,
}

pub(super) fn build(object: &mut Object) -> Box<dyn ObjectBehavior> {
    Box::new(Area {
        radius: object.meta.property_f32("radius").unwrap_or(0.0) * 2.0,
        talk: None,
    })
}

impl Area {
    fn origin(object: &Object, proxy: Option<&Object>) -> glam::Vec2 {
        match proxy {
            Some(proxy) => {
                let size = proxy.aabb().size();
                proxy.position + glam::Vec2::new(0.0, size.y as f32 / 2.0)
            }
            None => object.position,
        }
    }

    /// Reuses or spawns the `<name>_talk` child for the `talk` property.
    fn talk_child(&mut self, ctx: &mut HookContext<'_>) -> Option<ObjectId> {
        if self.talk.is_some() {
            return self.talk;
        }
        let file = ctx.object().property("talk")?.to_string();
        let name = format!("{}_talk", ctx.object().name);
        let child = match ctx.find(&name) {
            Some(existing) => Some(existing),
            None => ctx
                .spawn(ObjectMeta::new(&name, "talk").with_property("file", &file))
                .unwrap_or_else(|err| {
                    warn!("area '{}' could not create its talk: {err}", ctx.object().name);
                    None
                }),
        };
        if let Some(object) = child.and_then(|id| ctx.get_mut(id)) {
            object.is_persistent = false;
            object.can_repeat = true;
        }
        self.talk = child;
        child
    }
}

impl ObjectBehavior for Area {
    fn update(&mut self, ctx: &mut HookContext<'_>, _dt: f32) {
        let Some(player) = ctx.local_player() else {
            return;
        };
        let Some(player_position) = ctx.get(player).map(|p| p.position) else {
            return;
        };
        let object = ctx.object();
        let origin = Self::origin(object, object.proxy.and_then(|id| ctx.get(id)));
        if origin.distance(player_position) <= self.radius
            && ctx.input().is_action_pressed("use")
        {
            self.trigger(ctx, Some(player));
        }
    }

    fn trigger(&mut self, ctx: &mut HookContext<'_>, _from: Option<ObjectId>) {
        let locked = ctx
            .local_player()
            .and_then(|id| ctx.get(id))
            .is_some_and(|player| player.locked);
        if locked {
            debug!("area '{}' ignored: player is busy", ctx.object().name);
            return;
        }

        if let Some(talk) = self.talk_child(ctx) {
            let elapsed = ctx.env.elapsed;
            let ready = ctx
                .get(talk)
                .is_some_and(|t| !t.started && elapsed - t.last_trigger > RETRIGGER_DELAY);
            if ready {
                ctx.trigger(talk);
            }
        }
        ctx.trigger_target();
    }

    fn draw(&self, object: &Object, ctx: &DrawContext<'_>, canvas: &mut dyn Canvas) {
        if !ctx.debug() || !object.debug_visible {
            return;
        }
        let proxy = object.proxy.and_then(|id| ctx.world.get(id));
        let origin = Self::origin(object, proxy);
        canvas.draw_circle(origin, self.radius, Color::YELLOW.fade(0.3));
        draw_centered(canvas, &object.name, origin, Color::WHITE);
    }
}
