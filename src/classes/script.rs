use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec2;
use log::{debug, error, info, warn};
use mlua::{HookTriggers, Lua, LuaSerdeExt, Result as LuaResult, Table, Value, Variadic};

use crate::events::Event;
use crate::world::{HookContext, Object, ObjectBehavior, ObjectId, PropertyValue};

use super::ExecutionState;

/// Instruction budget of one script run.
const INSTRUCTION_LIMIT: u32 = 10_000_000;
const HOOK_INTERVAL: u32 = 1_000;

/// Runs `scripts/<file>` in a fresh Lua state every time it is triggered.
///
/// Host functions do not touch the world directly: they queue calls that
/// are applied once the chunk has finished.
#[derive(Debug, Default)]
pub struct Script {
    pub runs: u32,
}

pub(super) fn build(_object: &mut Object) -> Box<dyn ObjectBehavior> {
    Box::new(Script::default())
}

#[derive(Debug, Clone, PartialEq)]
enum HostCall {
    SetProperty {
        object: String,
        field: String,
        value: PropertyValue,
    },
    Exit,
    Invoke {
        event: String,
        data: serde_json::Value,
    },
}

#[derive(Debug, Clone)]
struct ObjectInfo {
    name: String,
    class: String,
    gid: u32,
    position: Vec2,
    visible: bool,
}

impl ObjectInfo {
    fn from_object(object: &Object) -> Self {
        Self {
            name: object.name.clone(),
            class: object.class.clone(),
            gid: object.gid,
            position: object.position,
            visible: object.visible,
        }
    }

    fn to_table<'lua>(&self, lua: &'lua Lua) -> LuaResult<Table<'lua>> {
        let table = lua.create_table()?;
        table.set("name", self.name.as_str())?;
        table.set("class", self.class.as_str())?;
        table.set("gid", self.gid)?;
        table.set("x", self.position.x)?;
        table.set("y", self.position.y)?;
        table.set("visible", self.visible)?;
        Ok(table)
    }
}

/// Read-only copy of the world handed to the Lua state.
#[derive(Debug, Clone)]
struct WorldView {
    world: String,
    map: String,
    this: ObjectInfo,
    local_player: Option<ObjectInfo>,
    main_camera: Option<ObjectInfo>,
    objects: Vec<ObjectInfo>,
    frame_time: f32,
}

impl WorldView {
    fn capture(ctx: &HookContext<'_>) -> Self {
        let info = |id: Option<ObjectId>| id.and_then(|id| ctx.get(id)).map(ObjectInfo::from_object);
        Self {
            world: ctx.world.name.clone(),
            map: ctx.env.current_map.clone(),
            this: ObjectInfo::from_object(ctx.object()),
            local_player: info(ctx.world.local_player),
            main_camera: info(ctx.world.main_camera),
            objects: ctx.world.objects().map(|(_, o)| ObjectInfo::from_object(o)).collect(),
            frame_time: ctx.env.frame_time,
        }
    }
}

fn run_chunk(view: WorldView, source: &str, chunk: &str) -> LuaResult<Vec<HostCall>> {
    let lua = Lua::new();
    let executed = Cell::new(0u32);
    lua.set_hook(
        HookTriggers {
            every_nth_instruction: Some(HOOK_INTERVAL),
            ..Default::default()
        },
        move |_, _| {
            executed.set(executed.get() + HOOK_INTERVAL);
            if executed.get() > INSTRUCTION_LIMIT {
                Err(mlua::Error::RuntimeError(
                    "script exceeded its instruction budget".into(),
                ))
            } else {
                Ok(())
            }
        },
    );

    let calls = Rc::new(RefCell::new(Vec::new()));
    register_globals(&lua, Rc::new(view), &calls)?;
    lua.load(source).set_name(chunk).exec()?;
    let queued = std::mem::take(&mut *calls.borrow_mut());
    Ok(queued)
}

fn register_globals(
    lua: &Lua,
    view: Rc<WorldView>,
    calls: &Rc<RefCell<Vec<HostCall>>>,
) -> LuaResult<()> {
    let globals = lua.globals();
    globals.set("Self", view.this.to_table(lua)?)?;
    globals.set("CurrentWorld", view.world.as_str())?;
    globals.set("CurrentMap", view.map.as_str())?;
    globals.set("FrameTime", view.frame_time)?;
    match &view.local_player {
        Some(player) => globals.set("LocalPlayer", player.to_table(lua)?)?,
        None => globals.set("LocalPlayer", Value::Nil)?,
    }
    match &view.main_camera {
        Some(camera) => globals.set("MainCamera", camera.to_table(lua)?)?,
        None => globals.set("MainCamera", Value::Nil)?,
    }

    let chunk_name = view.this.name.clone();
    let log_fn = lua.create_function(move |lua, values: Variadic<Value>| {
        let mut parts = Vec::with_capacity(values.len());
        for value in values.iter() {
            let text = match value {
                Value::Nil => "nil".to_string(),
                Value::Boolean(b) => b.to_string(),
                Value::String(s) => s.to_str()?.to_string(),
                _ => match lua.coerce_string(value.clone())? {
                    Some(s) => s.to_str()?.to_string(),
                    None => format!("{value:?}"),
                },
            };
            parts.push(text);
        }
        info!("[{chunk_name}] {}", parts.join("\t"));
        Ok(())
    })?;
    globals.set("log", log_fn)?;

    let find_view = Rc::clone(&view);
    let find = lua.create_function(move |lua, name: String| {
        match find_view.objects.iter().find(|o| o.name == name) {
            Some(object) => Ok(Value::Table(object.to_table(lua)?)),
            None => Ok(Value::Nil),
        }
    })?;
    globals.set("findObject", find)?;

    let set_calls = Rc::clone(calls);
    let set_property =
        lua.create_function(move |_, (target, field, value): (Value, String, Value)| {
            let object = object_name(target)?;
            let value = property_value(value)?;
            set_calls.borrow_mut().push(HostCall::SetProperty {
                object,
                field,
                value,
            });
            Ok(())
        })?;
    globals.set("setProperty", set_property)?;

    let exit_calls = Rc::clone(calls);
    let exit = lua.create_function(move |_, ()| {
        exit_calls.borrow_mut().push(HostCall::Exit);
        Ok(())
    })?;
    globals.set("exitGame", exit)?;

    let invoke_calls = Rc::clone(calls);
    let invoke = lua.create_function(move |lua, (event, data): (String, Option<Value>)| {
        let data = match data {
            Some(value) => lua.from_value::<serde_json::Value>(value)?,
            None => serde_json::Value::Null,
        };
        invoke_calls
            .borrow_mut()
            .push(HostCall::Invoke { event, data });
        Ok(())
    })?;
    globals.set("invoke", invoke)?;
    Ok(())
}

fn object_name(target: Value) -> LuaResult<String> {
    match target {
        Value::String(name) => Ok(name.to_str()?.to_string()),
        Value::Table(table) => table.get::<_, String>("name"),
        other => Err(mlua::Error::FromLuaConversionError {
            from: other.type_name(),
            to: "object",
            message: Some("expected an object or an object name".into()),
        }),
    }
}

fn property_value(value: Value) -> LuaResult<PropertyValue> {
    match value {
        Value::Boolean(b) => Ok(PropertyValue::Bool(b)),
        Value::Integer(i) => Ok(PropertyValue::Number(i as f64)),
        Value::Number(n) => Ok(PropertyValue::Number(n)),
        Value::String(s) => Ok(PropertyValue::Text(s.to_str()?.to_string())),
        Value::Table(table) => Ok(PropertyValue::Vector(Vec2::new(
            table.get::<_, f32>("x")?,
            table.get::<_, f32>("y")?,
        ))),
        other => Err(mlua::Error::FromLuaConversionError {
            from: other.type_name(),
            to: "property value",
            message: None,
        }),
    }
}

fn apply_calls(ctx: &mut HookContext<'_>, calls: Vec<HostCall>) {
    for call in calls {
        match call {
            HostCall::SetProperty {
                object,
                field,
                value,
            } => {
                let Some(id) = ctx.find(&object) else {
                    warn!("setProperty: object '{object}' not found");
                    continue;
                };
                if let Some(target) = ctx.get_mut(id) {
                    if let Err(err) = target.set_property(&field, &value) {
                        warn!("setProperty on '{object}': {err}");
                    }
                }
            }
            HostCall::Exit => {
                info!("script requested exit");
                ctx.env.running = false;
            }
            HostCall::Invoke { event, data } => ctx.env.events.push(Event::with_data(&event, data)),
        }
    }
}

impl ObjectBehavior for Script {
    fn trigger(&mut self, ctx: &mut HookContext<'_>, _from: Option<ObjectId>) {
        let object = ctx.object();
        if object.was_executed && !object.can_repeat {
            debug!("script '{}' already ran", object.name);
            return;
        }
        let file = if object.file_name.is_empty() {
            object.property("file").unwrap_or_default().to_string()
        } else {
            object.file_name.clone()
        };
        let name = object.name.clone();
        if file.is_empty() {
            warn!("script '{name}' has no file attached");
            return;
        }
        let source = match ctx.env.assets.read_string(&format!("scripts/{file}")) {
            Ok(source) => source,
            Err(err) => {
                warn!("script '{name}' could not load {file}: {err:#}");
                return;
            }
        };

        info!("running script {file}");
        match run_chunk(WorldView::capture(ctx), &source, &file) {
            Ok(calls) => {
                self.runs += 1;
                ctx.object_mut().was_executed = true;
                apply_calls(ctx, calls);
            }
            Err(err) => error!("script error at '{name}':{file}: {err}"),
        }
    }

    fn serialize(&self, object: &Object) -> String {
        ExecutionState::save(object)
    }

    fn deserialize(&mut self, object: &mut Object, blob: &str) {
        ExecutionState::restore(object, blob);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Env;
    use crate::world::{ObjectMeta, World};

    fn setup(source: &str, repeat: bool) -> (World, Env, ObjectId) {
        let mut env = Env::default();
        env.assets.insert_file("scripts/test.lua", source);
        let mut world = World::new("town");
        let mut script = ObjectMeta::new("intro", "script").with_property("file", "test.lua");
        if repeat {
            script = script.with_property("canRepeat", "1");
        }
        world
            .create_objects(
                &mut env,
                vec![ObjectMeta::new("door", "target").at(4.0, 8.0), script],
            )
            .unwrap();
        let id = world.find_object("intro").unwrap().0;
        (world, env, id)
    }

    #[test]
    fn host_calls_apply_after_the_chunk() {
        let (mut world, mut env, id) = setup(
            r#"
            local door = findObject("door")
            log("door at", door.x, door.y, CurrentWorld)
            setProperty(door, "visible", false)
            setProperty("door", "position", {x = door.x + 1, y = 2})
            invoke("cameraInterpolate", {Speed = 2, Start = "door", Instant = true})
            if findObject("ghost") == nil and Self.name == "intro" then exitGame() end
            "#,
            false,
        );
        world.trigger(&mut env, id, None);

        let (door, _) = world.find_object("door").unwrap();
        let door = world.get(door).unwrap();
        assert!(!door.visible);
        assert_eq!(door.position, Vec2::new(5.0, 2.0));
        assert!(!env.running);
        let events = env.events.take();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "cameraInterpolate");
        assert_eq!(events[0].number("Speed", 0), Some(2.0));
        assert!(events[0].flag("Instant", 3));
        assert!(world.get(id).unwrap().was_executed);
    }

    #[test]
    fn runs_once_unless_repeatable() {
        let source = r#"invoke("tick")"#;
        let (mut world, mut env, id) = setup(source, false);
        world.trigger(&mut env, id, None);
        world.trigger(&mut env, id, None);
        assert_eq!(env.events.len(), 1);

        let (mut world, mut env, id) = setup(source, true);
        world.trigger(&mut env, id, None);
        world.trigger(&mut env, id, None);
        assert_eq!(env.events.len(), 2);
        assert_eq!(world.behavior_as::<Script>(id).unwrap().runs, 2);
    }

    #[test]
    fn lua_errors_are_contained() {
        let (mut world, mut env, id) = setup("error('boom')", false);
        world.trigger(&mut env, id, None);
        assert!(!world.get(id).unwrap().was_executed);
        assert!(env.running);

        let (mut world, mut env, id) = setup("while true do end", false);
        world.trigger(&mut env, id, None);
        assert!(!world.get(id).unwrap().was_executed);
    }
}
