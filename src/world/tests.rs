use super::*;
use crate::math::Color;
use crate::render::{Frustum, RecordingCanvas};
use glam::Vec2;

#[derive(Debug)]
struct Summing;

impl ObjectBehavior for Summing {
    fn update(&mut self, ctx: &mut HookContext<'_>, _dt: f32) {
        let other = ctx
            .find("B")
            .and_then(|id| ctx.get(id))
            .map(|o| o.position.x)
            .unwrap_or(0.0);
        let me = ctx.object_mut();
        me.position.x = 1.0;
        me.position.x += other;
    }
}

#[derive(Debug)]
struct Setting;

impl ObjectBehavior for Setting {
    fn update(&mut self, ctx: &mut HookContext<'_>, _dt: f32) {
        ctx.object_mut().position.x = 10.0;
    }
}

#[derive(Debug)]
struct Labelled;

impl ObjectBehavior for Labelled {
    fn draw(&self, object: &Object, _ctx: &DrawContext<'_>, canvas: &mut dyn Canvas) {
        canvas.draw_text(&object.name, object.position, 10.0, Color::WHITE);
    }
}

fn summing(_: &mut Object) -> Box<dyn ObjectBehavior> {
    Box::new(Summing)
}

fn setting(_: &mut Object) -> Box<dyn ObjectBehavior> {
    Box::new(Setting)
}

fn labelled(_: &mut Object) -> Box<dyn ObjectBehavior> {
    Box::new(Labelled)
}

fn test_env() -> Env {
    let mut env = Env::default();
    env.classes.register("sum", summing);
    env.classes.register("set", setting);
    env.classes.register("label", labelled);
    env
}

#[test]
fn dependencies_update_first() {
    let mut env = test_env();
    let mut world = World::new("deps");
    world
        .create_objects(
            &mut env,
            vec![
                ObjectMeta::new("A", "sum").with_property("depends", "B"),
                ObjectMeta::new("B", "set"),
            ],
        )
        .unwrap();
    world.update_objects(&mut env).unwrap();
    let (a, _) = world.find_object("A").unwrap();
    assert_eq!(world.get(a).unwrap().position.x, 11.0);
    assert!(world.objects().all(|(_, o)| o.was_updated()));
}

#[test]
fn insertion_order_without_dependencies() {
    let mut env = test_env();
    let mut world = World::new("plain");
    world
        .create_objects(
            &mut env,
            vec![ObjectMeta::new("A", "sum"), ObjectMeta::new("B", "set")],
        )
        .unwrap();
    world.update_objects(&mut env).unwrap();
    let (a, _) = world.find_object("A").unwrap();
    assert_eq!(world.get(a).unwrap().position.x, 1.0);
}

#[test]
fn dependency_cycle_aborts_the_tick() {
    let mut env = test_env();
    let mut world = World::new("cycle");
    world
        .create_objects(
            &mut env,
            vec![
                ObjectMeta::new("A", "set").with_property("depends", "B"),
                ObjectMeta::new("B", "set").with_property("depends", "A"),
            ],
        )
        .unwrap();
    let err = world.update_objects(&mut env).unwrap_err();
    let message = err.to_string();
    assert!(message.contains('A') && message.contains('B'), "{message}");
    assert!(err.is_fatal());
}

#[test]
fn longer_cycles_not_through_the_root_are_detected() {
    let mut env = test_env();
    let mut world = World::new("cycle");
    world
        .create_objects(
            &mut env,
            vec![
                ObjectMeta::new("root", "set").with_property("depends", "B"),
                ObjectMeta::new("B", "set").with_property("depends", "C"),
                ObjectMeta::new("C", "set").with_property("depends", "B"),
            ],
        )
        .unwrap();
    match world.update_objects(&mut env) {
        Err(EngineError::DependencyCycle { path }) => assert_eq!(path, vec!["B", "C", "B"]),
        other => panic!("expected a cycle, got {other:?}"),
    }
}

#[test]
fn self_dependency_is_rejected_at_finalize() {
    let mut env = test_env();
    let mut world = World::new("self");
    let result = world.spawn(
        &mut env,
        ObjectMeta::new("loop", "set").with_property("depends", "loop"),
    );
    assert!(matches!(result, Err(EngineError::SelfDependency(name)) if name == "loop"));
}

#[test]
fn missing_references_stay_empty() {
    let mut env = test_env();
    let mut world = World::new("refs");
    let id = world
        .spawn(
            &mut env,
            ObjectMeta::new("A", "set")
                .with_property("depends", "ghost")
                .with_property("target", "nobody"),
        )
        .unwrap()
        .unwrap();
    let object = world.get(id).unwrap();
    assert!(object.depends.is_empty());
    assert!(object.target.is_none());
    world.update_objects(&mut env).unwrap();
}

#[test]
fn zero_time_scale_freezes_hooks_but_marks_updated() {
    let mut env = test_env();
    env.time_scale = 0.0;
    let mut world = World::new("frozen");
    let id = world
        .spawn(&mut env, ObjectMeta::new("B", "set"))
        .unwrap()
        .unwrap();
    world.update_objects(&mut env).unwrap();
    let object = world.get(id).unwrap();
    assert_eq!(object.position.x, 0.0);
    assert!(object.was_updated());
}

#[test]
fn duplicate_names_are_refused_and_gids_stay_unique() {
    let mut env = test_env();
    let mut world = World::new("dupes");
    let first = world.new_object_pro(&mut env, "A", "set").unwrap();
    let second = world.new_object_pro(&mut env, "A", "set").unwrap();
    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(world.len(), 1);
    assert_eq!(world.global_index(), 2);
}

#[test]
fn unknown_class_is_an_error() {
    let mut env = test_env();
    let mut world = World::new("unknown");
    let result = world.spawn(&mut env, ObjectMeta::new("x", "dragon"));
    assert!(matches!(result, Err(EngineError::UnknownClass { class, .. }) if class == "dragon"));
}

#[test]
fn anonymous_records_get_generated_names() {
    let mut env = test_env();
    let mut world = World::new("names");
    let ids = world
        .create_objects(
            &mut env,
            vec![
                ObjectMeta::default().sized(16.0, 16.0),
                ObjectMeta::new("", "col").sized(8.0, 8.0),
                ObjectMeta::new("", "set"),
            ],
        )
        .unwrap();
    let names: Vec<&str> = ids
        .iter()
        .map(|&id| world.get(id).unwrap().name.as_str())
        .collect();
    assert_eq!(names, vec!["tile_0", "col_1", "unknown_2"]);
    assert_eq!(world.objects_of_type("col", false).len(), 1);
    assert_eq!(world.objects_of_type("col", true).len(), 2);
}

#[test]
fn colltype_none_disables_collision() {
    let mut env = test_env();
    let mut world = World::new("col");
    let id = world
        .spawn(
            &mut env,
            ObjectMeta::new("wall", "col")
                .sized(8.0, 8.0)
                .with_property("colType", "none"),
        )
        .unwrap()
        .unwrap();
    assert!(!world.get(id).unwrap().is_collidable);
}

#[test]
fn draw_order_is_ascending_y_and_culled() {
    let mut env = test_env();
    let mut world = World::new("draw");
    world
        .create_objects(
            &mut env,
            vec![
                ObjectMeta::new("low", "label").at(0.0, 30.0),
                ObjectMeta::new("high", "label").at(0.0, 10.0),
                ObjectMeta::new("mid", "label").at(0.0, 20.0),
                ObjectMeta::new("far", "label").at(5000.0, 0.0),
                ObjectMeta::new("hidden", "label").at(0.0, 15.0),
            ],
        )
        .unwrap();
    let (hidden, _) = world.find_object("hidden").unwrap();
    world.get_mut(hidden).unwrap().visible = false;

    let mut canvas = RecordingCanvas::new();
    let mut ctx = DrawContext::new(&world, &env);
    ctx.frustum = Frustum::new(Vec2::ZERO, 1.0, Vec2::new(640.0, 480.0));
    let drawn = world.draw_objects(&ctx, &mut canvas);
    assert_eq!(drawn, 3);
    assert_eq!(canvas.texts(), vec!["high", "mid", "low"]);
}

#[test]
fn flushing_resets_the_arena() {
    let mut env = test_env();
    let mut world = World::new("flush");
    world.new_object_pro(&mut env, "A", "set").unwrap();
    world.flush();
    assert!(world.is_empty());
    assert_eq!(world.global_index(), 0);
    assert!(world.find_object("A").is_none());
}
