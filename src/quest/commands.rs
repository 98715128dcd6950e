//! Built-in control-flow and state commands.

use super::manager::{expect_args, expect_min_args, CommandContext, QuestManager};
use super::vm::{QuestState, Stage, Timer};
use super::QuestError;
use crate::events::Event;

type CommandResult = Result<bool, QuestError>;

pub(super) fn register(manager: &mut QuestManager) {
    manager.register_command("variable", variable);
    manager.register_command("setvar", setvar);
    manager.register_command("timer", timer);
    manager.register_command("fire", fire);
    manager.register_command("stop", stop);
    manager.register_command("done", done);
    manager.register_command("stage", stage);
    manager.register_command("stdone", stdone);
    manager.register_command("stfail", stfail);
    manager.register_command("repeat", repeat);
    manager.register_command("finish", finish);
    manager.register_command("fail", fail);
    manager.register_command("pop", pop);
    manager.register_command("when", when);
    manager.register_command("invoke", invoke);
}

fn not_found(thing: &'static str, name: &str) -> QuestError {
    QuestError::NotFound {
        thing,
        name: name.to_string(),
    }
}

fn variable(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    expect_args(args, 1)?;
    ctx.set_number(&args[0], 0.0);
    ctx.narrate(&format!("variable '{}' was declared", args[0]));
    Ok(true)
}

fn setvar(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    expect_args(args, 2)?;
    let value = ctx.number(&args[1])?;
    ctx.set_number(&args[0], value);
    ctx.narrate(&format!("variable '{}' was set to: {value}", args[0]));
    Ok(true)
}

fn timer(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    expect_args(args, 2)?;
    let duration = ctx.number(&args[1])?;
    ctx.quest.timers.insert(args[0].clone(), Timer::new(duration));
    ctx.narrate(&format!("timer '{}' was declared with duration: {duration}", args[0]));
    Ok(true)
}

fn fire(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    expect_args(args, 1)?;
    let timer = ctx
        .quest
        .timers
        .get_mut(&args[0])
        .ok_or_else(|| not_found("timer", &args[0]))?;
    timer.time = timer.duration;
    ctx.narrate(&format!("timer '{}' was fired", args[0]));
    Ok(true)
}

fn stop(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    expect_args(args, 1)?;
    let timer = ctx
        .quest
        .timers
        .get_mut(&args[0])
        .ok_or_else(|| not_found("timer", &args[0]))?;
    timer.time = -1.0;
    ctx.narrate(&format!("timer '{}' was stopped", args[0]));
    Ok(true)
}

fn done(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    expect_args(args, 1)?;
    let timer = ctx
        .quest
        .timers
        .get(&args[0])
        .ok_or_else(|| not_found("timer", &args[0]))?;
    let finished = timer.time == 0.0;
    if finished {
        ctx.narrate(&format!("timer '{}' is done", args[0]));
    }
    Ok(finished)
}

fn stage_id(arg: &str) -> Result<i64, QuestError> {
    arg.parse().map_err(|_| QuestError::ArgType {
        arg: arg.to_string(),
        need: "integer",
    })
}

fn stage(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    expect_args(args, 1)?;
    let id = stage_id(&args[0])?;
    let step = ctx
        .quest
        .resource(&args[0])
        .map(|resource| resource.content.clone())
        .ok_or_else(|| not_found("resource", &args[0]))?;
    ctx.quest.stages.insert(
        id,
        Stage {
            step,
            state: QuestState::InProgress,
        },
    );
    ctx.narrate(&format!("stage '{id}' has been added"));
    Ok(true)
}

fn set_stage_state(
    ctx: &mut CommandContext<'_, '_>,
    args: &[String],
    state: QuestState,
) -> CommandResult {
    expect_args(args, 1)?;
    let id = stage_id(&args[0])?;
    let stage = ctx
        .quest
        .stages
        .get_mut(&id)
        .ok_or_else(|| not_found("stage", &args[0]))?;
    stage.state = state;
    let verb = if state == QuestState::Finished {
        "succeeded"
    } else {
        "failed"
    };
    ctx.narrate(&format!("stage '{id}' has {verb}"));
    Ok(true)
}

fn stdone(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    set_stage_state(ctx, args, QuestState::Finished)
}

fn stfail(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    set_stage_state(ctx, args, QuestState::Failed)
}

fn repeat(ctx: &mut CommandContext<'_, '_>, _args: &[String]) -> CommandResult {
    ctx.task().rewind();
    ctx.narrate("repeating task");
    Ok(true)
}

fn finish(ctx: &mut CommandContext<'_, '_>, _args: &[String]) -> CommandResult {
    ctx.quest.state = QuestState::Finished;
    ctx.narrate("quest has been finished");
    Ok(true)
}

fn fail(ctx: &mut CommandContext<'_, '_>, _args: &[String]) -> CommandResult {
    ctx.quest.state = QuestState::Failed;
    ctx.narrate("quest has been failed");
    Ok(true)
}

fn pop(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    expect_args(args, 1)?;
    let value = ctx
        .task()
        .event_args
        .pop_front()
        .ok_or(QuestError::EventArgsEmpty)?;
    ctx.set_number(&args[0], value);
    ctx.narrate(&format!("event pop value '{value}' for: '{}'", args[0]));
    Ok(true)
}

/// `when <lhs>` holds while `lhs > 0`; `when <lhs> <op> <rhs>` compares.
fn when(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    expect_min_args(args, 1)?;
    let lhs = ctx.number(&args[0])?;
    if args.len() == 1 {
        return Ok(lhs > 0.0);
    }
    expect_min_args(args, 3)?;
    let rhs = ctx.number(&args[2])?;
    let (l, r) = (lhs != 0.0, rhs != 0.0);
    Ok(match args[1].to_ascii_lowercase().as_str() {
        "below" => lhs < rhs,
        "above" => lhs > rhs,
        "equals" => lhs == rhs,
        "!equals" => lhs != rhs,
        "and" => l && r,
        "or" => l || r,
        "xor" => l != r,
        _ => return Err(QuestError::BadComparator(args[1].clone())),
    })
}

fn strip_parens(arg: &str) -> &str {
    arg.strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(arg)
}

/// Pushes `<event>` onto the host's event bus with the remaining arguments.
fn invoke(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> CommandResult {
    expect_min_args(args, 1)?;
    let rest = args[1..]
        .iter()
        .map(|arg| ctx.quest.process_text(strip_parens(arg)))
        .collect();
    ctx.host.events.push(Event::new(&args[0], rest));
    ctx.narrate(&format!("invoked event '{}'", args[0]));
    Ok(true)
}
