use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::render::Canvas;
use crate::world::{DrawContext, HookContext, Object, ObjectBehavior, ObjectId, ObjectMeta};

use super::draw_marker;

/// Remaining time below this many milliseconds counts as expired.
const EXPIRY_EPSILON_MS: f32 = 1e-3;

/// One-shot timer that triggers its target (and an optional companion
/// script) once `duration` milliseconds have passed since it was triggered.
#[derive(Debug, Clone, Default)]
pub struct Wait {
    /// Milliseconds.
    pub duration: f32,
    /// Milliseconds.
    pub remaining: f32,
    pub fired: bool,
    script: Option<ObjectId>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WaitData {
    remaining: f32,
    started: bool,
    fired: bool,
}

pub(super) fn build(object: &mut Object) -> Box<dyn ObjectBehavior> {
    Box::new(Wait {
        duration: object.meta.property_f32("duration").unwrap_or(0.0).max(0.0),
        ..Wait::default()
    })
}

impl Wait {
    fn fire(&mut self, ctx: &mut HookContext<'_>) {
        self.fired = true;
        let had_target = ctx.trigger_target();
        if let Some(script) = self.script {
            ctx.trigger(script);
        }
        if !had_target && self.script.is_none() {
            warn!("timer '{}' has no target attached", ctx.object().name);
        }
    }

    /// Reuses or spawns the `<name>_script` companion for the `file` property.
    fn attach_script(&mut self, ctx: &mut HookContext<'_>) {
        let Some(file) = ctx.object().property("file").map(str::to_string) else {
            return;
        };
        let name = format!("{}_script", ctx.object().name);
        let script = match ctx.find(&name) {
            Some(existing) => Some(existing),
            None => match ctx.spawn(ObjectMeta::new(&name, "script").with_property("file", &file)) {
                Ok(spawned) => spawned,
                Err(err) => {
                    warn!("timer '{}' could not create its script: {err}", ctx.object().name);
                    None
                }
            },
        };
        if let Some(object) = script.and_then(|id| ctx.get_mut(id)) {
            object.file_name = file;
            object.is_persistent = false;
        }
        self.script = script;
    }
}

impl ObjectBehavior for Wait {
    fn init(&mut self, ctx: &mut HookContext<'_>) {
        let object = ctx.object();
        if object.auto_start && !object.started && !self.fired {
            self.trigger(ctx, None);
        }
    }

    fn update(&mut self, ctx: &mut HookContext<'_>, dt: f32) {
        if !ctx.object().started {
            return;
        }
        if self.remaining <= EXPIRY_EPSILON_MS {
            ctx.object_mut().started = false;
            self.remaining = 0.0;
            self.fire(ctx);
            return;
        }
        self.remaining -= dt * 1000.0;
    }

    fn trigger(&mut self, ctx: &mut HookContext<'_>, _from: Option<ObjectId>) {
        self.attach_script(ctx);
        if self.duration <= 0.0 {
            self.fire(ctx);
            return;
        }
        debug!("timer '{}' started ({} ms)", ctx.object().name, self.duration);
        self.remaining = self.duration;
        self.fired = false;
        ctx.object_mut().started = true;
    }

    fn draw(&self, object: &Object, ctx: &DrawContext<'_>, canvas: &mut dyn Canvas) {
        if !ctx.debug() || !object.debug_visible {
            return;
        }
        draw_marker(
            canvas,
            object,
            5.0,
            &[format!("Remaining: {} ms", self.remaining.max(0.0) as i32)],
        );
    }

    fn serialize(&self, object: &Object) -> String {
        let data = WaitData {
            remaining: self.remaining,
            started: object.started,
            fired: self.fired,
        };
        serde_json::to_string(&data).unwrap_or_default()
    }

    fn deserialize(&mut self, object: &mut Object, blob: &str) {
        match serde_json::from_str::<WaitData>(blob) {
            Ok(data) => {
                self.remaining = data.remaining;
                self.fired = data.fired;
                object.started = data.started;
            }
            Err(err) => warn!("timer '{}' has a broken save blob: {err}", object.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Env;
    use crate::world::World;

    #[derive(Debug, Default)]
    struct Counter(u32);

    impl ObjectBehavior for Counter {
        fn trigger(&mut self, _ctx: &mut HookContext<'_>, _from: Option<ObjectId>) {
            self.0 += 1;
        }
    }

    fn counter(_: &mut Object) -> Box<dyn ObjectBehavior> {
        Box::new(Counter::default())
    }

    fn setup(duration: &str) -> (World, Env, ObjectId, ObjectId) {
        let mut env = Env::default();
        env.classes.register("counter", counter);
        let mut world = World::new("wait");
        world
            .create_objects(
                &mut env,
                vec![
                    ObjectMeta::new("hit", "counter"),
                    ObjectMeta::new("timer", "wait")
                        .with_property("duration", duration)
                        .with_property("autostart", "1")
                        .with_property("target", "hit"),
                ],
            )
            .unwrap();
        let timer = world.find_object("timer").unwrap().0;
        let hit = world.find_object("hit").unwrap().0;
        (world, env, timer, hit)
    }

    fn hits(world: &World, id: ObjectId) -> u32 {
        world.behavior_as::<Counter>(id).unwrap().0
    }

    #[test]
    fn fires_only_after_the_duration_has_elapsed() {
        let (mut world, mut env, _timer, hit) = setup("100");
        env.frame_time = 0.025;
        world.init_objects(&mut env);

        let mut elapsed_ms = 0.0;
        let mut fired_at = None;
        for tick in 1..=10 {
            world.update_objects(&mut env).unwrap();
            if hits(&world, hit) > 0 && fired_at.is_none() {
                fired_at = Some((tick, elapsed_ms));
            }
            elapsed_ms += 25.0;
        }
        let (tick, elapsed_before_tick) = fired_at.unwrap();
        assert!(elapsed_before_tick >= 100.0, "fired after {elapsed_before_tick} ms");
        assert_eq!(tick, 5);
        assert_eq!(hits(&world, hit), 1);
    }

    #[test]
    fn zero_duration_fires_inside_the_trigger() {
        let (mut world, mut env, timer, hit) = setup("0");
        world.init_objects(&mut env);
        assert_eq!(hits(&world, hit), 1);
        assert!(!world.get(timer).unwrap().started);
    }

    #[test]
    fn restored_timers_do_not_restart() {
        let (mut world, mut env, timer, hit) = setup("50");
        world.init_objects(&mut env);
        world.update_objects(&mut env).unwrap();
        let blob = world.serialize_object(timer);

        let (mut fresh, mut env2, timer2, hit2) = setup("50");
        fresh.deserialize_object(timer2, &blob);
        fresh.init_objects(&mut env2);
        let remaining = fresh.behavior_as::<Wait>(timer2).unwrap().remaining;
        assert!(remaining < 50.0 && remaining > 0.0);
        assert!(fresh.get(timer2).unwrap().started);
        assert_eq!(hits(&world, hit), 0);
        assert_eq!(hits(&fresh, hit2), 0);
    }

    #[test]
    fn file_property_spawns_a_transient_script() {
        let mut env = Env::default();
        let mut world = World::new("wait");
        let timer = world
            .spawn(
                &mut env,
                ObjectMeta::new("intro", "wait").with_property("file", "intro.lua"),
            )
            .unwrap()
            .unwrap();
        world.trigger(&mut env, timer, None);
        world.trigger(&mut env, timer, None);
        let (script, _) = world.find_object("intro_script").unwrap();
        let object = world.get(script).unwrap();
        assert_eq!(object.class, "script");
        assert_eq!(object.file_name, "intro.lua");
        assert!(!object.is_persistent);
        assert_eq!(world.objects_of_type("script", false).len(), 1);
    }
}
