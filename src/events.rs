//! Event bus fed by quest `invoke` commands and script `invoke` calls.
//!
//! Events are queued while the tick runs and dispatched by the engine once
//! every world has been updated, so handlers never observe a half-updated
//! world.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::env::Env;
use crate::world::World;

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    /// Positional arguments (quest `invoke`).
    pub args: Vec<String>,
    /// Structured payload (script `invoke`).
    pub data: Value,
}

impl Event {
    pub fn new(name: &str, args: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            args,
            data: Value::Null,
        }
    }

    pub fn with_data(name: &str, data: Value) -> Self {
        Self {
            name: name.to_string(),
            args: Vec::new(),
            data,
        }
    }

    /// Numeric field `key` of the payload, or positional argument `index`.
    pub fn number(&self, key: &str, index: usize) -> Option<f64> {
        match self.data.get(key) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.parse().ok(),
            Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
            _ => self.args.get(index).and_then(|arg| arg.parse().ok()),
        }
    }

    /// Text field `key` of the payload, or positional argument `index`.
    pub fn text(&self, key: &str, index: usize) -> Option<String> {
        match self.data.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => self.args.get(index).cloned(),
            Some(other) => Some(other.to_string()),
        }
    }

    pub fn flag(&self, key: &str, index: usize) -> bool {
        self.number(key, index).map(|n| n != 0.0).unwrap_or(false)
    }
}

/// Events raised during the current tick.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: Vec<Event>,
}

impl EventQueue {
    pub fn push(&mut self, event: Event) {
        log::debug!("event '{}' queued", event.name);
        self.pending.push(event);
    }

    pub fn take(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

pub type EventHandler = Box<dyn FnMut(&mut World, &mut Env, &Event)>;

/// Game-registered handlers keyed by event name.
#[derive(Default)]
pub struct EventHandlers {
    handlers: HashMap<String, Vec<EventHandler>>,
}

impl EventHandlers {
    pub fn register(&mut self, name: &str, handler: EventHandler) {
        self.handlers
            .entry(name.to_string())
            .or_default()
            .push(handler);
    }

    /// Runs every handler for the event; returns whether any ran.
    pub fn dispatch(&mut self, world: &mut World, env: &mut Env, event: &Event) -> bool {
        match self.handlers.get_mut(&event.name) {
            Some(handlers) if !handlers.is_empty() => {
                for handler in handlers.iter_mut() {
                    handler(world, env, event);
                }
                true
            }
            _ => false,
        }
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("events", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
