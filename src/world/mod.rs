//! Object arena, reference resolution and the update/draw lifecycle.

mod collision;
mod hooks;
mod object;
mod registry;

pub use collision::Collision;
pub use hooks::{AsAny, DrawContext, HookContext, Inert, ObjectBehavior};
pub use object::{Object, ObjectId, ObjectMeta, PropertyValue, Shape};
pub use registry::{ClassCtor, ClassId, ClassRegistry};

use log::{debug, warn};

use crate::env::Env;
use crate::error::EngineError;
use crate::math::split_list;
use crate::render::Canvas;

/// The set of objects belonging to one map.
///
/// Objects live in an append-only arena and are addressed by [`ObjectId`].
/// Nothing is removed until the whole world is flushed, so ids stay valid.
#[derive(Debug, Default)]
pub struct World {
    pub name: String,
    objects: Vec<Object>,
    behaviors: Vec<Option<Box<dyn ObjectBehavior>>>,
    global_index: u32,
    pub local_player: Option<ObjectId>,
    pub main_camera: Option<ObjectId>,
}

impl World {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Next GID that will be handed out.
    pub fn global_index(&self) -> u32 {
        self.global_index
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> {
        (0..self.objects.len() as u32).map(ObjectId)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(index, object)| (ObjectId(index as u32), object))
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.index())
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id.index())
    }

    /// The object's behaviour, unless one of its own hooks is running.
    pub fn behavior(&self, id: ObjectId) -> Option<&dyn ObjectBehavior> {
        self.behaviors.get(id.index()).and_then(|b| b.as_deref())
    }

    /// Downcasts the object's behaviour to its concrete class state.
    pub fn behavior_as<T: ObjectBehavior>(&self, id: ObjectId) -> Option<&T> {
        self.behavior(id)?.as_any().downcast_ref::<T>()
    }

    pub fn behavior_as_mut<T: ObjectBehavior>(&mut self, id: ObjectId) -> Option<&mut T> {
        self.behaviors
            .get_mut(id.index())?
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Constructs an object with default flags and the next GID. The object
    /// is not added to the world.
    pub fn new_object(&mut self, meta: ObjectMeta) -> Object {
        let gid = self.global_index;
        self.global_index += 1;
        Object::from_meta(gid, meta)
    }

    /// Creates the object and its class behaviour from an authored record.
    pub fn build_object(
        &mut self,
        classes: &ClassRegistry,
        meta: ObjectMeta,
    ) -> Result<(Object, Box<dyn ObjectBehavior>), EngineError> {
        let mut object = self.new_object(meta);
        if object.name.is_empty() && object.class.is_empty() {
            object.class = "tile".to_string();
            object.name = format!("tile_{}", object.gid);
        } else if object.name.is_empty() && object.class == "col" {
            object.name = format!("col_{}", object.gid);
        }

        let Some((class_id, ctor)) = classes.lookup(&object.class) else {
            return Err(EngineError::UnknownClass {
                name: object.name.clone(),
                class: object.class.clone(),
            });
        };
        object.class_id = class_id;
        let behavior = ctor(&mut object);
        if !object.collision_type.is_empty() {
            object.is_collidable = object.collision_type != "none";
        }
        Ok((object, behavior))
    }

    /// Appends an object; refuses (with a warning) when the name is taken.
    pub fn add_object(
        &mut self,
        mut object: Object,
        behavior: Box<dyn ObjectBehavior>,
    ) -> Option<ObjectId> {
        if object.name.is_empty() {
            object.name = format!("unknown_{}", object.gid);
        }
        if self.find_object(&object.name).is_some() {
            warn!(
                "object '{}' already exists in world '{}', refusing to add it",
                object.name, self.name
            );
            return None;
        }
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(object);
        self.behaviors.push(Some(behavior));
        Some(id)
    }

    /// Adds the object, resolves its references and runs its `finish` hook.
    pub fn finalize_object(
        &mut self,
        env: &mut Env,
        object: Object,
        behavior: Box<dyn ObjectBehavior>,
    ) -> Result<Option<ObjectId>, EngineError> {
        let Some(id) = self.add_object(object, behavior) else {
            return Ok(None);
        };
        self.resolve_references(id)?;
        self.with_behavior(env, id, |behavior, ctx| behavior.finish(ctx));
        Ok(Some(id))
    }

    /// Builds and finalizes an object from an authored record.
    pub fn spawn(
        &mut self,
        env: &mut Env,
        meta: ObjectMeta,
    ) -> Result<Option<ObjectId>, EngineError> {
        let (object, behavior) = self.build_object(&env.classes, meta)?;
        self.finalize_object(env, object, behavior)
    }

    /// Builds and finalizes a bare object of `class` at the origin.
    pub fn new_object_pro(
        &mut self,
        env: &mut Env,
        name: &str,
        class: &str,
    ) -> Result<Option<ObjectId>, EngineError> {
        self.spawn(env, ObjectMeta::new(name, class))
    }

    /// Builds every record first, then resolves references and runs
    /// `finish` hooks, so records may refer to objects defined after them.
    pub fn create_objects(
        &mut self,
        env: &mut Env,
        metas: Vec<ObjectMeta>,
    ) -> Result<Vec<ObjectId>, EngineError> {
        let mut created = Vec::with_capacity(metas.len());
        for meta in metas {
            let (object, behavior) = self.build_object(&env.classes, meta)?;
            if let Some(id) = self.add_object(object, behavior) {
                created.push(id);
            }
        }
        for &id in &created {
            self.resolve_references(id)?;
        }
        for &id in &created {
            self.with_behavior(env, id, |behavior, ctx| behavior.finish(ctx));
        }
        Ok(created)
    }

    /// Turns the authored `depends`, `target` and `proxy` names into ids.
    pub fn resolve_references(&mut self, id: ObjectId) -> Result<(), EngineError> {
        let Some(object) = self.get(id) else {
            return Ok(());
        };
        let name = object.name.clone();
        let depends = object.meta.property("depends").map(split_list).unwrap_or_default();
        let target = object.meta.property("target").map(str::to_string);
        let proxy = object.meta.property("proxy").map(str::to_string);

        let mut resolved = Vec::with_capacity(depends.len());
        for dependency in &depends {
            if *dependency == name {
                return Err(EngineError::SelfDependency(name));
            }
            match self.find_object(dependency) {
                Some((dep, _)) => resolved.push(dep),
                None => warn!("object '{name}' depends on missing object '{dependency}'"),
            }
        }
        let target = target.and_then(|t| self.lookup_reference(&name, "target", &t));
        let proxy = proxy.and_then(|p| self.lookup_reference(&name, "proxy", &p));

        if let Some(object) = self.get_mut(id) {
            object.depends = resolved;
            object.target = target;
            object.proxy = proxy;
        }
        Ok(())
    }

    fn lookup_reference(&self, owner: &str, kind: &str, name: &str) -> Option<ObjectId> {
        let found = self.find_object(name).map(|(id, _)| id);
        if found.is_none() {
            warn!("object '{owner}' has missing {kind} '{name}'");
        }
        found
    }

    /// Linear scan by name.
    pub fn find_object(&self, name: &str) -> Option<(ObjectId, u32)> {
        self.objects
            .iter()
            .position(|o| o.name == name)
            .map(|index| (ObjectId(index as u32), self.objects[index].gid))
    }

    /// Objects whose class is `tag`, or every other object when `inverted`.
    pub fn objects_of_type(&self, tag: &str, inverted: bool) -> Vec<ObjectId> {
        self.objects()
            .filter(|(_, o)| (o.class == tag) != inverted)
            .map(|(id, _)| id)
            .collect()
    }

    /// Detaches the behaviour of `id` and runs `f` with a hook context.
    ///
    /// Returns `None` when the object does not exist or one of its hooks is
    /// already running (re-entrant calls are skipped).
    pub fn with_behavior<R>(
        &mut self,
        env: &mut Env,
        id: ObjectId,
        f: impl FnOnce(&mut dyn ObjectBehavior, &mut HookContext<'_>) -> R,
    ) -> Option<R> {
        let slot = self.behaviors.get_mut(id.index())?;
        let Some(mut behavior) = slot.take() else {
            debug!("skipping re-entrant hook on object {id}");
            return None;
        };
        let result = {
            let mut ctx = HookContext {
                id,
                world: &mut *self,
                env,
            };
            f(behavior.as_mut(), &mut ctx)
        };
        self.behaviors[id.index()] = Some(behavior);
        Some(result)
    }

    /// Calls `target`'s trigger hook.
    pub fn trigger(&mut self, env: &mut Env, target: ObjectId, from: Option<ObjectId>) {
        self.with_behavior(env, target, |behavior, ctx| behavior.trigger(ctx, from));
    }

    pub fn init_objects(&mut self, env: &mut Env) {
        let mut index = 0;
        while index < self.objects.len() {
            let id = ObjectId(index as u32);
            self.with_behavior(env, id, |behavior, ctx| behavior.init(ctx));
            index += 1;
        }
    }

    /// Runs one tick of object updates, dependencies first.
    ///
    /// A dependency cycle aborts the tick with [`EngineError::DependencyCycle`].
    /// With a time scale of zero the hooks are skipped but every object is
    /// still marked as updated.
    pub fn update_objects(&mut self, env: &mut Env) -> Result<(), EngineError> {
        for object in &mut self.objects {
            object.was_updated = false;
        }
        let dt = env.scaled_dt();
        let mut stack = Vec::new();
        let mut index = 0;
        while index < self.objects.len() {
            self.update_object(env, ObjectId(index as u32), dt, &mut stack)?;
            index += 1;
        }
        Ok(())
    }

    fn update_object(
        &mut self,
        env: &mut Env,
        id: ObjectId,
        dt: f32,
        stack: &mut Vec<ObjectId>,
    ) -> Result<(), EngineError> {
        if self.objects[id.index()].was_updated {
            return Ok(());
        }
        stack.push(id);
        let depends = self.objects[id.index()].depends.clone();
        for dependency in depends {
            if let Some(start) = stack.iter().position(|&s| s == dependency) {
                let mut path: Vec<String> = stack[start..]
                    .iter()
                    .map(|s| self.objects[s.index()].name.clone())
                    .collect();
                path.push(self.objects[dependency.index()].name.clone());
                log::error!("dependency cycle: {}", path.join(" -> "));
                stack.clear();
                return Err(EngineError::DependencyCycle { path });
            }
            self.update_object(env, dependency, dt, stack)?;
        }
        stack.pop();

        if env.time_scale != 0.0 {
            self.with_behavior(env, id, |behavior, ctx| behavior.update(ctx, dt));
        }
        self.objects[id.index()].was_updated = true;
        Ok(())
    }

    /// Draws visible objects sorted by Y, skipping those outside the frustum.
    /// Returns how many objects were drawn.
    pub fn draw_objects(&self, ctx: &DrawContext<'_>, canvas: &mut dyn Canvas) -> usize {
        let mut order: Vec<usize> = (0..self.objects.len()).collect();
        order.sort_by(|&a, &b| {
            self.objects[a]
                .position
                .y
                .total_cmp(&self.objects[b].position.y)
        });

        let mut drawn = 0;
        for index in order {
            let object = &self.objects[index];
            if !object.visible || !ctx.frustum.contains(object.center()) {
                continue;
            }
            if let Some(behavior) = self.behaviors[index].as_deref() {
                behavior.draw(object, ctx, canvas);
                drawn += 1;
            }
        }
        drawn
    }

    /// Draws UI overlays in insertion order.
    pub fn draw_object_ui(&self, ctx: &DrawContext<'_>, canvas: &mut dyn Canvas) {
        for (object, behavior) in self.objects.iter().zip(&self.behaviors) {
            if let Some(behavior) = behavior.as_deref() {
                behavior.draw_ui(object, ctx, canvas);
            }
        }
    }

    pub fn serialize_object(&self, id: ObjectId) -> String {
        match (self.get(id), self.behavior(id)) {
            (Some(object), Some(behavior)) => behavior.serialize(object),
            _ => String::new(),
        }
    }

    pub fn deserialize_object(&mut self, id: ObjectId, blob: &str) {
        let index = id.index();
        if let (Some(Some(behavior)), Some(object)) =
            (self.behaviors.get_mut(index), self.objects.get_mut(index))
        {
            behavior.deserialize(object, blob);
        }
    }

    /// Drops every object and resets the GID counter.
    pub fn flush(&mut self) {
        self.objects.clear();
        self.behaviors.clear();
        self.global_index = 0;
        self.local_player = None;
        self.main_camera = None;
    }
}

#[cfg(test)]
mod tests;
