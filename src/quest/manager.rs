use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use glam::Vec2;
use log::{error, info, warn};

use super::parser::parse_quest;
use super::vm::{Quest, QuestId, QuestVar, Task};
use super::{commands, vector, QuestError};
use crate::assets::AssetStore;
use crate::events::EventQueue;

/// Commands run this many times in one tick without suspending are cut off.
const MAX_STEPS_PER_TICK: usize = 10_000;

/// A quest opcode. `Ok(true)` advances the task, `Ok(false)` suspends it on
/// the same command until the next tick, an error ends the task.
pub type QuestCommand = fn(&mut CommandContext<'_, '_>, &[String]) -> Result<bool, QuestError>;

/// Hook that publishes game-specific variables before every command.
pub type CustomVariables = Box<dyn Fn(&mut Quest)>;

/// What quests see of the running game.
pub struct QuestHost<'a> {
    pub events: &'a mut EventQueue,
    /// Seconds per tick.
    pub frame_time: f32,
    pub time: f64,
    pub player_position: Option<Vec2>,
}

pub struct CommandContext<'q, 'h> {
    pub quest: &'q mut Quest,
    pub host: &'q mut QuestHost<'h>,
}

pub fn expect_args(args: &[String], need: usize) -> Result<(), QuestError> {
    if args.len() == need {
        Ok(())
    } else {
        Err(QuestError::ArgCount {
            need,
            got: args.len(),
        })
    }
}

pub fn expect_min_args(args: &[String], need: usize) -> Result<(), QuestError> {
    if args.len() >= need {
        Ok(())
    } else {
        Err(QuestError::ArgCount {
            need,
            got: args.len(),
        })
    }
}

impl CommandContext<'_, '_> {
    pub fn task(&mut self) -> &mut Task {
        self.quest.active_task_mut()
    }

    pub fn number(&self, arg: &str) -> Result<f64, QuestError> {
        self.quest.number_or_variable(arg)
    }

    pub fn vector(&self, name: &str) -> Result<Vec2, QuestError> {
        match self.quest.variable(name) {
            Some(QuestVar::Vector(value)) => Ok(value),
            Some(QuestVar::Number(_)) => Err(QuestError::ArgType {
                arg: name.to_string(),
                need: "vector",
            }),
            None => Err(QuestError::NotFound {
                thing: "vector",
                name: name.to_string(),
            }),
        }
    }

    pub fn set_number(&mut self, name: &str, value: f64) {
        self.quest.set_number(name, value);
    }

    pub fn set_vector(&mut self, name: &str, value: Vec2) {
        self.quest.set_vector(name, value);
    }

    pub fn narrate(&self, text: &str) {
        self.quest.narrate(text);
    }
}

/// Owns every running quest and the opcode table.
pub struct QuestManager {
    commands: HashMap<String, QuestCommand>,
    custom_variables: Option<CustomVariables>,
    quests: Vec<Quest>,
    max_quests: usize,
    next_id: QuestId,
    step: u64,
}

impl QuestManager {
    pub fn new(max_quests: usize) -> Self {
        let mut manager = Self {
            commands: HashMap::new(),
            custom_variables: None,
            quests: Vec::new(),
            max_quests,
            next_id: 0,
            step: 0,
        };
        commands::register(&mut manager);
        vector::register(&mut manager);
        manager
    }

    pub fn register_command(&mut self, name: &str, command: QuestCommand) {
        self.commands.insert(name.to_ascii_lowercase(), command);
    }

    pub fn set_custom_variables(&mut self, callback: CustomVariables) {
        self.custom_variables = Some(callback);
    }

    /// Loads `quests/<name>.qst` and starts it.
    pub fn add_quest(
        &mut self,
        assets: &AssetStore,
        name: &str,
        details: &HashMap<String, f64>,
        host: &mut QuestHost<'_>,
    ) -> Result<QuestId> {
        let path = format!("quests/{}.qst", name.to_ascii_lowercase());
        let source = assets
            .read_string(&path)
            .with_context(|| format!("quest template '{name}' could not be found"))?;
        self.add_quest_source(name, &source, details, host)
            .with_context(|| format!("failed to add quest '{name}'"))
    }

    /// Parses `source`, seeds the entry task with `details` and runs the
    /// entry point until it first suspends.
    pub fn add_quest_source(
        &mut self,
        name: &str,
        source: &str,
        details: &HashMap<String, f64>,
        host: &mut QuestHost<'_>,
    ) -> Result<QuestId, QuestError> {
        let def = parse_quest(source)?;
        if !def.background && self.active_quests() >= self.max_quests {
            return Err(QuestError::TooManyQuests(self.max_quests));
        }

        let id = self.next_id;
        self.next_id += 1;
        let mut quest = Quest::new(id, name, def, details);
        self.run_task(&mut quest, 0, host);
        info!("Quest '{name}' with title '{}' has been added", quest.title());
        self.quests.push(quest);
        Ok(id)
    }

    /// In-progress quests that count against the cap.
    pub fn active_quests(&self) -> usize {
        self.quests
            .iter()
            .filter(|q| q.is_in_progress() && !q.is_background())
            .count()
    }

    pub fn quest(&self, id: QuestId) -> Option<&Quest> {
        self.quests.iter().find(|q| q.id == id)
    }

    pub fn quests(&self) -> &[Quest] {
        &self.quests
    }

    pub fn remove_finished(&mut self) -> Vec<Quest> {
        let (done, running): (Vec<Quest>, Vec<Quest>) = std::mem::take(&mut self.quests)
            .into_iter()
            .partition(|q| !q.is_in_progress());
        self.quests = running;
        done
    }

    pub fn reset(&mut self) {
        self.quests.clear();
    }

    /// One simulation tick: timers, then every non-event task.
    pub fn process(&mut self, host: &mut QuestHost<'_>) {
        let elapsed_ms = f64::from(host.frame_time) * 1000.0;
        let mut quests = std::mem::take(&mut self.quests);
        for quest in quests.iter_mut().filter(|q| q.is_in_progress()) {
            quest.process_timers(elapsed_ms);
            for index in 0..quest.tasks.len() {
                let task = &quest.tasks[index];
                if task.done || task.is_event {
                    continue;
                }
                self.run_task(quest, index, host);

                let task = &quest.tasks[index];
                let (name, done) = (task.name.clone(), task.done);
                quest.set_entry_variable(&name, QuestVar::Number(if done { 1.0 } else { 0.0 }));
            }
        }
        self.quests = quests;
        self.step += 1;
    }

    /// Restarts event task `name` with `args` on quest `id`, or on every
    /// quest when `id` is `None`.
    pub fn call_event(
        &mut self,
        id: Option<QuestId>,
        name: &str,
        args: &[f64],
        host: &mut QuestHost<'_>,
    ) {
        let mut quests = std::mem::take(&mut self.quests);
        for quest in quests.iter_mut() {
            if id.is_some_and(|id| id != quest.id) {
                continue;
            }
            let Some(index) = quest.task_index(name) else {
                continue;
            };
            let task = &mut quest.tasks[index];
            task.done = false;
            task.pc = 0;
            task.event_args = args.iter().copied().collect();
            self.run_task(quest, index, host);
        }
        self.quests = quests;
    }

    fn run_task(&self, quest: &mut Quest, index: usize, host: &mut QuestHost<'_>) {
        let mut steps = 0;
        while self.step_task(quest, index, host) {
            steps += 1;
            if steps >= MAX_STEPS_PER_TICK {
                warn!(
                    "Quest '{}':'{}' ran {steps} commands without suspending, deferring to the next tick",
                    quest.name, quest.tasks[index].name
                );
                break;
            }
        }
    }

    fn step_task(&self, quest: &mut Quest, index: usize, host: &mut QuestHost<'_>) -> bool {
        let commands = Arc::clone(&quest.tasks[index].commands);
        let Some(command) = commands.get(quest.tasks[index].pc) else {
            quest.tasks[index].done = true;
            return false;
        };

        quest.set_active(index);
        self.refresh_variables(quest, host);

        let result = match self.commands.get(&command.name) {
            Some(run) => run(
                &mut CommandContext {
                    quest: &mut *quest,
                    host: &mut *host,
                },
                &command.args,
            ),
            None => Err(QuestError::UnknownCommand),
        };
        match result {
            Ok(true) => {
                quest.tasks[index].advance();
                true
            }
            Ok(false) => false,
            Err(err) => {
                let task = &quest.tasks[index];
                error!(
                    "Command '{}' failed at Quest '{}':'{}'({}): {err}",
                    command.name, quest.name, task.name, task.pc
                );
                quest.tasks[index].done = true;
                false
            }
        }
    }

    fn refresh_variables(&self, quest: &mut Quest, host: &QuestHost<'_>) {
        quest.set_entry_variable("$random", QuestVar::Number(f64::from(rand::random::<u32>())));
        quest.set_entry_variable("$frandom", QuestVar::Number(rand::random::<f64>()));
        quest.set_entry_variable("$step", QuestVar::Number(self.step as f64));
        quest.set_entry_variable("$time", QuestVar::Number(host.time));
        quest.set_entry_variable(
            "$pc.position",
            QuestVar::Vector(host.player_position.unwrap_or(Vec2::ZERO)),
        );

        if let Some(callback) = &self.custom_variables {
            let active = quest.active_index();
            quest.set_active(0);
            callback(quest);
            quest.set_active(active);
        }
    }
}

impl Default for QuestManager {
    fn default() -> Self {
        Self::new(5)
    }
}

impl fmt::Debug for QuestManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestManager")
            .field("quests", &self.quests.len())
            .field("commands", &self.commands.len())
            .field("max_quests", &self.max_quests)
            .field("step", &self.step)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::{QuestState, ENTRY_TASK};

    const TIMER_STAGE: &str = "\
title: test
qrc:
  stage: 1 go there
qst:
  timer t 100
  fire t
  done t
  stage 1
  stdone 1
  finish
";

    fn host(events: &mut EventQueue) -> QuestHost<'_> {
        QuestHost {
            events,
            frame_time: 0.06,
            time: 0.0,
            player_position: Some(Vec2::new(3.0, 4.0)),
        }
    }

    #[test]
    fn timer_then_stage_finishes_after_two_ticks() {
        let mut events = EventQueue::default();
        let mut host = host(&mut events);
        let mut manager = QuestManager::new(5);
        let id = manager
            .add_quest_source("test", TIMER_STAGE, &HashMap::new(), &mut host)
            .unwrap();

        let quest = manager.quest(id).unwrap();
        assert_eq!(quest.state, QuestState::InProgress);
        assert_eq!(quest.tasks[0].pc, 2);

        manager.process(&mut host);
        assert_eq!(manager.quest(id).unwrap().state, QuestState::InProgress);
        manager.process(&mut host);

        let quest = manager.quest(id).unwrap();
        assert_eq!(quest.stages[&1].state, QuestState::Finished);
        assert_eq!(quest.stages[&1].step, "go there");
        assert_eq!(quest.state, QuestState::Finished);
        assert_eq!(quest.number(ENTRY_TASK), Some(1.0));
    }

    #[test]
    fn when_equals_advances_once_on_the_matching_tick() {
        let source = "\
qst:
  variable n
task count:
  when $step equals 3
  invoke reached (step %$step%)
";
        let mut events = EventQueue::default();
        let mut manager = QuestManager::new(5);
        manager
            .add_quest_source("count", source, &HashMap::new(), &mut host(&mut events))
            .unwrap();

        let mut fired = Vec::new();
        for tick in 1..=6 {
            manager.process(&mut host(&mut events));
            for event in events.take() {
                fired.push((tick, event));
            }
        }
        assert_eq!(fired.len(), 1);
        let (tick, event) = &fired[0];
        assert_eq!(*tick, 4);
        assert_eq!(event.name, "reached");
        assert_eq!(event.args, vec!["step 3"]);

        let quest = &manager.quests()[0];
        assert!(quest.tasks[1].done);
        assert_eq!(quest.number("count"), Some(1.0));
    }

    #[test]
    fn events_pop_their_arguments_in_order() {
        let source = "\
qst:
  variable total
event add:
  pop a
  pop b
  setvar total (total + a * b)
";
        let mut events = EventQueue::default();
        let mut host = host(&mut events);
        let mut manager = QuestManager::new(5);
        let id = manager
            .add_quest_source("events", source, &HashMap::new(), &mut host)
            .unwrap();

        manager.process(&mut host);
        assert_eq!(manager.quest(id).unwrap().number("total"), Some(0.0));

        manager.call_event(Some(id), "add", &[2.0, 5.0], &mut host);
        manager.call_event(None, "add", &[1.0, 1.0], &mut host);
        assert_eq!(manager.quest(id).unwrap().number("total"), Some(11.0));

        // too few arguments: `pop b` fails and ends the task
        manager.call_event(Some(id), "add", &[4.0], &mut host);
        let quest = manager.quest(id).unwrap();
        assert_eq!(quest.number("total"), Some(11.0));
        assert!(quest.tasks[1].done);
        assert_eq!(quest.tasks[1].pc, 1);
    }

    #[test]
    fn cap_ignores_background_quests() {
        let mut events = EventQueue::default();
        let mut host = host(&mut events);
        let mut manager = QuestManager::new(1);
        manager
            .add_quest_source("a", "qst:\n  when 0\n", &HashMap::new(), &mut host)
            .unwrap();
        let err = manager
            .add_quest_source("b", "qst:\n  when 0\n", &HashMap::new(), &mut host)
            .unwrap_err();
        assert_eq!(err, QuestError::TooManyQuests(1));
        manager
            .add_quest_source("c", "+background\nqst:\n  when 0\n", &HashMap::new(), &mut host)
            .unwrap();
        assert_eq!(manager.quests().len(), 2);
        assert_eq!(manager.active_quests(), 1);
    }

    #[test]
    fn unknown_commands_end_the_task_but_not_the_quest() {
        let mut events = EventQueue::default();
        let mut host = host(&mut events);
        let mut manager = QuestManager::new(5);
        let id = manager
            .add_quest_source("bad", "qst:\n  dance wildly\n  finish\n", &HashMap::new(), &mut host)
            .unwrap();
        let quest = manager.quest(id).unwrap();
        assert!(quest.tasks[0].done);
        assert_eq!(quest.state, QuestState::InProgress);
    }

    #[test]
    fn endless_loops_are_cut_off_each_tick() {
        let mut events = EventQueue::default();
        let mut host = host(&mut events);
        let mut manager = QuestManager::new(5);
        let id = manager
            .add_quest_source("loop", "qst:\n  setvar x 1\n  repeat\n", &HashMap::new(), &mut host)
            .unwrap();
        manager.process(&mut host);
        let quest = manager.quest(id).unwrap();
        assert!(!quest.tasks[0].done);
        assert_eq!(quest.number("x"), Some(1.0));
    }

    #[test]
    fn custom_commands_and_variables() {
        fn double(ctx: &mut CommandContext<'_, '_>, args: &[String]) -> Result<bool, QuestError> {
            expect_args(args, 1)?;
            let value = ctx.number(&args[0])?;
            ctx.set_number(&args[0], value * 2.0);
            Ok(true)
        }

        let mut events = EventQueue::default();
        let mut host = host(&mut events);
        let mut manager = QuestManager::new(5);
        manager.register_command("Double", double);
        manager.set_custom_variables(Box::new(|quest: &mut Quest| quest.set_number("$gold", 21.0)));
        let details = HashMap::from([("seed".to_string(), 4.0)]);
        let id = manager
            .add_quest_source(
                "custom",
                "qst:\n  setvar g $gold\n  double g\n  double seed\n  getvec $pc.position px 0\n",
                &details,
                &mut host,
            )
            .unwrap();
        let quest = manager.quest(id).unwrap();
        assert_eq!(quest.number("g"), Some(42.0));
        assert_eq!(quest.number("seed"), Some(8.0));
        assert_eq!(quest.number("px"), Some(3.0));
    }

    #[test]
    fn finished_quests_can_be_removed() {
        let mut events = EventQueue::default();
        let mut host = host(&mut events);
        let mut manager = QuestManager::new(5);
        manager
            .add_quest_source("done", "qst:\n  fail\n", &HashMap::new(), &mut host)
            .unwrap();
        manager
            .add_quest_source("open", "qst:\n  when 0\n", &HashMap::new(), &mut host)
            .unwrap();
        let removed = manager.remove_finished();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].state, QuestState::Failed);
        assert_eq!(manager.quests().len(), 1);
    }

    #[test]
    fn quests_load_from_the_asset_store() {
        let assets = AssetStore::new("unused");
        assets.insert_file("quests/intro.qst", TIMER_STAGE);
        let mut events = EventQueue::default();
        let mut host = host(&mut events);
        let mut manager = QuestManager::new(5);
        let id = manager
            .add_quest(&assets, "Intro", &HashMap::new(), &mut host)
            .unwrap();
        assert_eq!(manager.quest(id).unwrap().title(), "test");
        assert!(manager
            .add_quest(&assets, "missing", &HashMap::new(), &mut host)
            .is_err());
    }
}
