//! Vector commands. Vectors share the variable namespace with numbers.

use glam::Vec2;

use super::manager::{expect_args, expect_min_args, CommandContext, QuestManager};
use super::QuestError;

type CommandResult = Result<bool, QuestError>;

pub(super) fn register(manager: &mut QuestManager) {
    manager.register_command("vec", vec);
    manager.register_command("setvec", setvec);
    manager.register_command("copyvec", copyvec);
    manager.register_command("getvec", getvec);
    manager.register_command("addvec", addvec);
    manager.register_command("addivec", addivec);
    manager.register_command("subvec", subvec);
    manager.register_command("subivec", subivec);
    manager.register_command("divivec", divivec);
    manager.register_command("mulvec", mulvec);
    manager.register_command("dotvec", dotvec);
    manager.register_command("crossvec", crossvec);
    manager.register_command("normvec", normvec);
    manager.register_command("flipvec", flipvec);
    manager.register_command("lenvec", lenvec);
}

fn vec(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    expect_args(args, 1)?;
    ctx.set_vector(&args[0], Vec2::ZERO);
    Ok(true)
}

fn setvec(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    expect_min_args(args, 3)?;
    let x = ctx.number(&args[1])? as f32;
    let y = ctx.number(&args[2])? as f32;
    ctx.set_vector(&args[0], Vec2::new(x, y));
    Ok(true)
}

fn copyvec(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    expect_min_args(args, 2)?;
    let value = ctx.vector(&args[1])?;
    ctx.set_vector(&args[0], value);
    Ok(true)
}

/// `getvec <vec> <x> <y>`; a `0` name skips that component.
fn getvec(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    expect_min_args(args, 3)?;
    let value = ctx.vector(&args[0])?;
    if args[1] != "0" {
        ctx.set_number(&args[1], f64::from(value.x));
    }
    if args[2] != "0" {
        ctx.set_number(&args[2], f64::from(value.y));
    }
    Ok(true)
}

/// `<op> <dest> <lhs-vector> <rhs-vector>`
fn vector_pair(
    ctx: &mut CommandContext<'_, '_>,
    args: &[String],
    op: impl FnOnce(Vec2, Vec2) -> Vec2,
) -> CommandResult {
    expect_min_args(args, 3)?;
    let lhs = ctx.vector(&args[1])?;
    let rhs = ctx.vector(&args[2])?;
    ctx.set_vector(&args[0], op(lhs, rhs));
    Ok(true)
}

/// `<op> <dest> <lhs-vector> <number>`
fn vector_scalar(
    ctx: &mut CommandContext<'_, '_>,
    args: &[String],
    op: impl FnOnce(Vec2, f32) -> Result<Vec2, QuestError>,
) -> CommandResult {
    expect_min_args(args, 3)?;
    let lhs = ctx.vector(&args[1])?;
    let rhs = ctx.number(&args[2])? as f32;
    let value = op(lhs, rhs)?;
    ctx.set_vector(&args[0], value);
    Ok(true)
}

/// `<op> <dest-number> <lhs-vector> <rhs-vector>`
fn vector_product(
    ctx: &mut CommandContext<'_, '_>,
    args: &[String],
    op: impl FnOnce(Vec2, Vec2) -> f32,
) -> CommandResult {
    expect_min_args(args, 3)?;
    let lhs = ctx.vector(&args[1])?;
    let rhs = ctx.vector(&args[2])?;
    ctx.set_number(&args[0], f64::from(op(lhs, rhs)));
    Ok(true)
}

fn addvec(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    vector_pair(ctx, args, |a, b| a + b)
}

fn subvec(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    vector_pair(ctx, args, |a, b| a - b)
}

fn addivec(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    vector_scalar(ctx, args, |a, n| Ok(a + Vec2::splat(n)))
}

fn subivec(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    vector_scalar(ctx, args, |a, n| Ok(a - Vec2::splat(n)))
}

fn mulvec(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    vector_scalar(ctx, args, |a, n| Ok(a * n))
}

fn divivec(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    vector_scalar(ctx, args, |a, n| {
        if n == 0.0 {
            Err(QuestError::DivideByZero)
        } else {
            Ok(a / n)
        }
    })
}

fn dotvec(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    vector_product(ctx, args, |a, b| a.dot(b))
}

fn crossvec(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    vector_product(ctx, args, |a, b| a.perp_dot(b))
}

fn normvec(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    expect_min_args(args, 2)?;
    let value = ctx.vector(&args[1])?;
    ctx.set_vector(&args[0], value.normalize_or_zero());
    Ok(true)
}

fn flipvec(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    expect_min_args(args, 2)?;
    let value = ctx.vector(&args[1])?;
    ctx.set_vector(&args[0], Vec2::new(value.y, -value.x));
    Ok(true)
}

fn lenvec(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    expect_min_args(args, 2)?;
    let value = ctx.vector(&args[1])?;
    ctx.set_number(&args[0], f64::from(value.length()));
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use glam::Vec2;

    use crate::events::EventQueue;
    use crate::quest::{Quest, QuestHost, QuestManager};

    fn run(source: &str) -> Quest {
        let mut events = EventQueue::default();
        let mut host = QuestHost {
            events: &mut events,
            frame_time: 1.0 / 60.0,
            time: 0.0,
            player_position: Some(Vec2::new(10.0, 20.0)),
        };
        let mut manager = QuestManager::new(5);
        let id = manager
            .add_quest_source("vectors", source, &HashMap::new(), &mut host)
            .unwrap();
        manager.quest(id).unwrap().clone()
    }

    #[test]
    fn arithmetic() {
        let quest = run("\
qst:
  setvec a 3 4
  setvec b (1 + 1) 0
  addvec sum a b
  subvec diff a b
  addivec up a 1
  subivec down a 1
  mulvec twice a 2
  divivec half a 2
  dotvec dot a b
  crossvec cross a b
  lenvec len a
  normvec unit a
  flipvec flip a
  copyvec copy $pc.position
");
        assert_eq!(quest.vector("sum"), Some(Vec2::new(5.0, 4.0)));
        assert_eq!(quest.vector("diff"), Some(Vec2::new(1.0, 4.0)));
        assert_eq!(quest.vector("up"), Some(Vec2::new(4.0, 5.0)));
        assert_eq!(quest.vector("down"), Some(Vec2::new(2.0, 3.0)));
        assert_eq!(quest.vector("twice"), Some(Vec2::new(6.0, 8.0)));
        assert_eq!(quest.vector("half"), Some(Vec2::new(1.5, 2.0)));
        assert_eq!(quest.number("dot"), Some(6.0));
        assert_eq!(quest.number("cross"), Some(-8.0));
        assert_eq!(quest.number("len"), Some(5.0));
        assert!(quest
            .vector("unit")
            .is_some_and(|unit| unit.abs_diff_eq(Vec2::new(0.6, 0.8), 1e-6)));
        assert_eq!(quest.vector("flip"), Some(Vec2::new(4.0, -3.0)));
        assert_eq!(quest.vector("copy"), Some(Vec2::new(10.0, 20.0)));
        assert!(quest.tasks[0].done);
    }

    #[test]
    fn getvec_skips_zero_names() {
        let quest = run("qst:\n  variable y\n  setvec a 7 9\n  getvec a x 0\n");
        assert_eq!(quest.number("x"), Some(7.0));
        assert_eq!(quest.number("y"), Some(0.0));
    }

    #[test]
    fn division_by_zero_and_type_errors_stop_the_task() {
        let quest = run("qst:\n  vec a\n  divivec b a 0\n  setvar reached 1\n");
        assert_eq!(quest.vector("b"), None);
        assert_eq!(quest.number("reached"), None);
        assert!(quest.tasks[0].done);

        let quest = run("qst:\n  setvar n 3\n  lenvec len n\n  setvar reached 1\n");
        assert_eq!(quest.number("len"), None);
        assert_eq!(quest.number("reached"), None);
    }
}
