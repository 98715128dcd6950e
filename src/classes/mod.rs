//! Built-in object classes.

mod anim;
mod area;
mod camera;
mod collision;
mod script;
mod talk;
mod target;
mod tile;
mod wait;

pub use anim::Anim;
pub use area::Area;
pub use camera::{Camera, CameraMode};
pub use collision::Collider;
pub use script::Script;
pub use talk::Talk;
pub use target::Target;
pub use tile::Tile;
pub use wait::Wait;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::math::Color;
use crate::render::Canvas;
use crate::world::{ClassRegistry, Object};

/// Registers every built-in class under its authored tag.
pub fn register_builtins(registry: &mut ClassRegistry) {
    registry.register("col", collision::build);
    registry.register("tile", tile::build);
    registry.register("cam", camera::build);
    registry.register("wait", wait::build);
    registry.register("script", script::build);
    registry.register("talk", talk::build);
    registry.register("anim", anim::build);
    registry.register("area", area::build);
    registry.register("target", target::build);
}

/// Save blob shared by run-once classes (`script`, `talk`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ExecutionState {
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub rep: bool,
}

impl ExecutionState {
    pub fn save(object: &Object) -> String {
        let state = Self {
            done: object.was_executed,
            rep: object.can_repeat,
        };
        serde_json::to_string(&state).unwrap_or_default()
    }

    pub fn restore(object: &mut Object, blob: &str) {
        match serde_json::from_str::<Self>(blob) {
            Ok(state) => {
                object.was_executed = state.done;
                object.can_repeat = state.rep;
            }
            Err(err) => log::warn!("object '{}' has a broken save blob: {err}", object.name),
        }
    }
}

/// Debug marker: a dot with the object's name and optional detail lines.
pub(crate) fn draw_marker(canvas: &mut dyn Canvas, object: &Object, radius: f32, lines: &[String]) {
    let at = object.position;
    canvas.draw_circle(at, radius, Color::WHITE);
    draw_centered(canvas, &object.name, at + Vec2::new(0.0, 5.0), Color::WHITE);
    for (index, line) in lines.iter().enumerate() {
        draw_centered(
            canvas,
            line,
            at + Vec2::new(0.0, 15.0 + 10.0 * index as f32),
            Color::WHITE,
        );
    }
}

pub(crate) fn draw_centered(canvas: &mut dyn Canvas, text: &str, at: Vec2, color: Color) {
    let width = canvas.measure_text(text, 10.0);
    canvas.draw_text(text, Vec2::new(at.x - width / 2.0, at.y), 10.0, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::ObjectMeta;

    #[test]
    fn execution_state_round_trips_through_the_blob() {
        let mut env = crate::env::Env::default();
        let mut world = crate::world::World::new("t");
        let id = world
            .spawn(&mut env, ObjectMeta::new("s", "script").with_property("canRepeat", "1"))
            .unwrap()
            .unwrap();
        world.get_mut(id).unwrap().was_executed = true;
        let blob = world.serialize_object(id);
        assert_eq!(blob, r#"{"done":true,"rep":true}"#);

        let object = world.get_mut(id).unwrap();
        object.was_executed = false;
        ExecutionState::restore(object, &blob);
        assert!(object.was_executed);
    }

    #[test]
    fn every_builtin_is_registered() {
        let registry = ClassRegistry::with_builtins();
        for tag in ["col", "tile", "cam", "wait", "script", "talk", "anim", "area", "target"] {
            assert!(registry.contains(tag), "{tag}");
        }
    }
}
