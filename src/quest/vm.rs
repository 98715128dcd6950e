use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use glam::Vec2;
use log::debug;

use super::expr::evaluate;
use super::parser::{Command, QuestDef, Resource};
use super::QuestError;

pub type QuestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestState {
    InProgress,
    Finished,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuestVar {
    Number(f64),
    Vector(Vec2),
}

impl QuestVar {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<Vec2> {
        match self {
            Self::Vector(value) => Some(*value),
            Self::Number(_) => None,
        }
    }
}

impl fmt::Display for QuestVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) if value.fract() == 0.0 && value.is_finite() => {
                write!(f, "{}", *value as i64)
            }
            Self::Number(value) => write!(f, "{value:.6}"),
            Self::Vector(v) => write!(f, "[{:.6}, {:.6}]", v.x, v.y),
        }
    }
}

/// Countdown in milliseconds. A negative `time` means the timer is stopped;
/// exactly `0` means it ran out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timer {
    pub time: f64,
    pub duration: f64,
}

impl Timer {
    pub fn new(duration: f64) -> Self {
        Self {
            time: -1.0,
            duration,
        }
    }

    pub fn is_running(&self) -> bool {
        self.time >= 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub step: String,
    pub state: QuestState,
}

#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub commands: Arc<[Command]>,
    pub pc: usize,
    pub done: bool,
    pub is_event: bool,
    pub event_args: VecDeque<f64>,
    pub variables: HashMap<String, QuestVar>,
    rewind: bool,
}

impl Task {
    /// Makes the next advance jump back to the first command.
    pub fn rewind(&mut self) {
        self.rewind = true;
    }

    pub(super) fn advance(&mut self) {
        if std::mem::take(&mut self.rewind) {
            self.pc = 0;
        } else {
            self.pc += 1;
        }
    }

    pub(super) fn current(&self) -> Option<&Command> {
        self.commands.get(self.pc)
    }
}

/// Running instance of a [`QuestDef`].
#[derive(Debug, Clone)]
pub struct Quest {
    pub id: QuestId,
    pub name: String,
    pub def: Arc<QuestDef>,
    pub state: QuestState,
    pub timers: BTreeMap<String, Timer>,
    pub stages: BTreeMap<i64, Stage>,
    pub tasks: Vec<Task>,
    active: usize,
}

impl Quest {
    pub fn new(id: QuestId, name: &str, def: QuestDef, details: &HashMap<String, f64>) -> Self {
        let def = Arc::new(def);
        let mut tasks: Vec<Task> = def
            .tasks
            .iter()
            .map(|task| Task {
                name: task.name.clone(),
                commands: task.commands.clone().into(),
                pc: 0,
                done: false,
                is_event: task.is_event,
                event_args: VecDeque::new(),
                variables: HashMap::new(),
                rewind: false,
            })
            .collect();
        if let Some(entry) = tasks.first_mut() {
            entry.variables = details
                .iter()
                .map(|(key, value)| (key.clone(), QuestVar::Number(*value)))
                .collect();
        }

        let mut quest = Self {
            id,
            name: name.to_string(),
            def,
            state: QuestState::InProgress,
            timers: BTreeMap::new(),
            stages: BTreeMap::new(),
            tasks,
            active: 0,
        };
        let names: Vec<String> = quest.tasks.iter().map(|t| t.name.clone()).collect();
        for name in names {
            quest.set_entry_variable(&name, QuestVar::Number(0.0));
        }
        quest
    }

    pub fn title(&self) -> &str {
        &self.def.title
    }

    pub fn is_background(&self) -> bool {
        self.def.background
    }

    pub fn is_in_progress(&self) -> bool {
        self.state == QuestState::InProgress
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub(super) fn set_active(&mut self, index: usize) {
        self.active = index;
    }

    pub fn active_task(&self) -> &Task {
        &self.tasks[self.active]
    }

    pub fn active_task_mut(&mut self) -> &mut Task {
        &mut self.tasks[self.active]
    }

    pub fn task_index(&self, name: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.name == name)
    }

    /// Looks `name` up in the active task first, then in the entry task.
    pub fn variable(&self, name: &str) -> Option<QuestVar> {
        self.tasks[self.active]
            .variables
            .get(name)
            .or_else(|| self.tasks[0].variables.get(name))
            .copied()
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.variable(name).and_then(|v| v.as_number())
    }

    pub fn vector(&self, name: &str) -> Option<Vec2> {
        self.variable(name).and_then(|v| v.as_vector())
    }

    /// Writes to the entry task when it already owns `name`, otherwise to
    /// the active task.
    pub fn set_variable(&mut self, name: &str, value: QuestVar) {
        let index = if self.tasks[0].variables.contains_key(name) {
            0
        } else {
            self.active
        };
        self.tasks[index].variables.insert(name.to_string(), value);
    }

    pub fn set_number(&mut self, name: &str, value: f64) {
        self.set_variable(name, QuestVar::Number(value));
    }

    pub fn set_vector(&mut self, name: &str, value: Vec2) {
        self.set_variable(name, QuestVar::Vector(value));
    }

    pub(super) fn set_entry_variable(&mut self, name: &str, value: QuestVar) {
        self.tasks[0].variables.insert(name.to_string(), value);
    }

    /// A literal number, or an expression over the visible numeric variables.
    pub fn number_or_variable(&self, arg: &str) -> Result<f64, QuestError> {
        if let Ok(value) = arg.trim().parse::<f64>() {
            return Ok(value);
        }
        Ok(evaluate(arg, |name| self.number(name))?)
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        id.parse::<i64>()
            .ok()
            .and_then(|id| self.def.resources.get(&id))
    }

    /// Replaces every `%name%` with the variable's value.
    pub fn process_text(&self, content: &str) -> String {
        let mut visible: HashMap<&str, QuestVar> = self.tasks[0]
            .variables
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        for (key, value) in &self.tasks[self.active].variables {
            visible.insert(key.as_str(), *value);
        }

        let mut out = String::with_capacity(content.len());
        let mut rest = content;
        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('%') {
                Some(end) if visible.contains_key(&after[..end]) => {
                    out.push_str(&visible[&after[..end]].to_string());
                    rest = &after[end + 1..];
                }
                _ => {
                    out.push('%');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Counts live timers down by `elapsed_ms` and mirrors every timer's
    /// remaining time into a same-named entry variable.
    pub fn process_timers(&mut self, elapsed_ms: f64) {
        let mut mirrored = Vec::with_capacity(self.timers.len());
        for (name, timer) in self.timers.iter_mut() {
            if timer.is_running() {
                timer.time = (timer.time - elapsed_ms).max(0.0);
            }
            mirrored.push((name.clone(), timer.time.round()));
        }
        for (name, time) in mirrored {
            self.set_entry_variable(&name, QuestVar::Number(time));
        }
    }

    pub fn narrate(&self, text: &str) {
        let task = self.active_task();
        debug!("Quest '{}':'{}'({}): {}", self.name, task.name, task.pc, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::parse_quest;

    fn quest(source: &str) -> Quest {
        let details = HashMap::from([("reward".to_string(), 5.0)]);
        Quest::new(1, "test", parse_quest(source).unwrap(), &details)
    }

    #[test]
    fn numbers_print_without_trailing_zeros_when_whole() {
        assert_eq!(QuestVar::Number(3.0).to_string(), "3");
        assert_eq!(QuestVar::Number(-2.5).to_string(), "-2.500000");
        assert_eq!(
            QuestVar::Vector(Vec2::new(1.0, 0.5)).to_string(),
            "[1.000000, 0.500000]"
        );
    }

    #[test]
    fn task_variables_shadow_entry_variables() {
        let mut q = quest("qst:\n  finish\ntask side:\n  finish\n");
        assert_eq!(q.number("reward"), Some(5.0));
        assert_eq!(q.number("side"), Some(0.0));

        q.set_active(1);
        q.set_number("local", 2.0);
        q.set_number("reward", 7.0);
        assert_eq!(q.tasks[1].variables.get("local"), Some(&QuestVar::Number(2.0)));
        assert_eq!(q.tasks[0].variables.get("reward"), Some(&QuestVar::Number(7.0)));

        q.set_active(0);
        assert_eq!(q.number("local"), None);
    }

    #[test]
    fn expressions_and_text_see_variables() {
        let mut q = quest("qst:\n  finish\n");
        q.set_number("count", 3.0);
        assert_eq!(q.number_or_variable("12.5").unwrap(), 12.5);
        assert_eq!(q.number_or_variable("(count * 2) + reward").unwrap(), 11.0);
        assert!(q.number_or_variable("nope").is_err());
        assert_eq!(
            q.process_text("got %count% of %reward%, 100% sure %unknown%"),
            "got 3 of 5, 100% sure %unknown%"
        );
    }

    #[test]
    fn timers_clamp_to_zero_and_mirror_into_variables() {
        let mut q = quest("qst:\n  finish\n");
        q.timers.insert("t".into(), Timer { time: 100.0, duration: 100.0 });
        q.timers.insert("idle".into(), Timer::new(50.0));
        q.process_timers(60.0);
        assert_eq!(q.number("t"), Some(40.0));
        q.process_timers(60.0);
        assert_eq!(q.timers["t"].time, 0.0);
        assert_eq!(q.number("idle"), Some(-1.0));
    }
}
