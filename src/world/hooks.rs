use std::any::Any;
use std::sync::Arc;

use super::collision::Collision;
use super::object::{Object, ObjectId, ObjectMeta};
use super::World;
use crate::env::Env;
use crate::error::EngineError;
use crate::input::InputState;
use crate::map::Tileset;
use crate::math::Color;
use crate::render::{Canvas, Frustum};

/// Downcasting support for behaviours, so classes can read a proxy's state.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Capability set every object class implements. All hooks default to no-ops.
pub trait ObjectBehavior: AsAny + std::fmt::Debug {
    /// Runs from `InitObjects`, after every reference is resolved.
    fn init(&mut self, _ctx: &mut HookContext<'_>) {}

    /// Runs once the object is added and its references are resolved.
    fn finish(&mut self, _ctx: &mut HookContext<'_>) {}

    fn update(&mut self, _ctx: &mut HookContext<'_>, _dt: f32) {}

    fn draw(&self, _object: &Object, _ctx: &DrawContext<'_>, _canvas: &mut dyn Canvas) {}

    fn draw_ui(&self, _object: &Object, _ctx: &DrawContext<'_>, _canvas: &mut dyn Canvas) {}

    fn trigger(&mut self, _ctx: &mut HookContext<'_>, _from: Option<ObjectId>) {}

    fn handle_collision(&mut self, _object: &mut Object, _hit: &Collision, _other: ObjectId) {}

    /// Opaque per-class save blob.
    fn serialize(&self, _object: &Object) -> String {
        String::new()
    }

    fn deserialize(&mut self, _object: &mut Object, _blob: &str) {}
}

/// Behaviour with no hooks; useful for marker objects and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inert;

impl ObjectBehavior for Inert {}

/// Mutable view handed to update/trigger/init/finish hooks.
///
/// The running object's own behaviour is detached from the world while the
/// hook runs; everything else (including its `Object` record) is reachable.
pub struct HookContext<'a> {
    pub id: ObjectId,
    pub world: &'a mut World,
    pub env: &'a mut Env,
}

impl<'a> HookContext<'a> {
    pub fn object(&self) -> &Object {
        &self.world.objects[self.id.index()]
    }

    pub fn object_mut(&mut self) -> &mut Object {
        &mut self.world.objects[self.id.index()]
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.world.get(id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.world.get_mut(id)
    }

    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.world.find_object(name).map(|(id, _)| id)
    }

    pub fn input(&self) -> &InputState {
        &self.env.input
    }

    pub fn local_player(&self) -> Option<ObjectId> {
        self.world.local_player
    }

    /// Calls `target`'s trigger hook with this object as the caller.
    pub fn trigger(&mut self, target: ObjectId) {
        let from = self.id;
        self.world.trigger(self.env, target, Some(from));
    }

    /// Triggers this object's `Target`; returns whether one was set.
    pub fn trigger_target(&mut self) -> bool {
        match self.object().target {
            Some(target) => {
                self.trigger(target);
                true
            }
            None => false,
        }
    }

    /// Builds, adds and finalizes a new object in this world.
    pub fn spawn(&mut self, meta: ObjectMeta) -> Result<Option<ObjectId>, EngineError> {
        self.world.spawn(self.env, meta)
    }

    pub fn check_for_collision(&mut self, dx: i32, dy: i32) -> Option<Collision> {
        self.world.check_for_collision(self.id, dx, dy)
    }
}

/// Read-only view handed to draw hooks.
pub struct DrawContext<'a> {
    pub world: &'a World,
    pub env: &'a Env,
    pub tilesets: &'a [Arc<Tileset>],
    pub frustum: Frustum,
    /// Ambient tint (sky colour) applied to world sprites.
    pub tint: Color,
}

impl<'a> DrawContext<'a> {
    pub fn new(world: &'a World, env: &'a Env) -> Self {
        Self {
            world,
            env,
            tilesets: &[],
            frustum: Frustum::unbounded(),
            tint: Color::WHITE,
        }
    }

    pub fn debug(&self) -> bool {
        self.env.debug
    }
}
