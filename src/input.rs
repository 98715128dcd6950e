use std::collections::{HashMap, HashSet};

use glam::Vec2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

pub mod winit;

/// Gamepad stick values inside this radius read as zero.
pub const GAMEPAD_DEAD_ZONE: f32 = 0.25;

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Digit(u8),
    Function(u8),
}

impl KeyCode {
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key) = parse_named_key(name) {
            return Some(key);
        }
        let mut chars = name.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            if ch.is_ascii_alphabetic() {
                return Some(Self::Character(ch.to_ascii_uppercase()));
            }
            if ch.is_ascii_digit() {
                return Some(Self::Digit(ch as u8 - b'0'));
            }
        }
        if let Some(function) = name.strip_prefix('F').or_else(|| name.strip_prefix('f')) {
            if let Ok(index) = function.parse::<u8>() {
                if (1..=25).contains(&index) {
                    return Some(Self::Function(index));
                }
            }
        }
        None
    }

    const fn ch(c: char) -> Self {
        Self::Character(c)
    }

    const fn named(key: NamedKey) -> Self {
        Self::Named(key)
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        "Space" => Space,
        "Enter" | "Return" => Enter,
        "Tab" => Tab,
        "Left" => Left,
        "Right" => Right,
        "Up" => Up,
        "Down" => Down,
        "Escape" | "Esc" => Escape,
        "Backspace" => Backspace,
        "LeftShift" | "LShift" => LeftShift,
        "RightShift" | "RShift" => RightShift,
        "LeftCtrl" | "LControl" => LeftCtrl,
        "RightCtrl" | "RControl" => RightCtrl,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

/// Friendly names for the non-character keys the runtime binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Space,
    Enter,
    Tab,
    Left,
    Right,
    Up,
    Down,
    Escape,
    Backspace,
    LeftShift,
    RightShift,
    LeftCtrl,
    RightCtrl,
}

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);
    pub const RIGHT: Self = Self(1);
    pub const MIDDLE: Self = Self(2);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

/// A named gameplay action bound to keys and gamepad inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum InputAction {
    Button {
        keys: Vec<KeyCode>,
        gamepad_buttons: Vec<u8>,
    },
    Axis {
        negative: Vec<KeyCode>,
        positive: Vec<KeyCode>,
        gamepad_axis: Option<u8>,
    },
}

/// Bindings for `horizontal`, `vertical`, `up`, `down` and `use`.
pub fn default_actions() -> HashMap<String, InputAction> {
    use NamedKey::*;
    let mut actions = HashMap::new();
    actions.insert(
        "horizontal".to_string(),
        InputAction::Axis {
            negative: vec![KeyCode::ch('A'), KeyCode::named(Left)],
            positive: vec![KeyCode::ch('D'), KeyCode::named(Right)],
            gamepad_axis: Some(0),
        },
    );
    actions.insert(
        "vertical".to_string(),
        InputAction::Axis {
            negative: vec![KeyCode::ch('W'), KeyCode::named(Up)],
            positive: vec![KeyCode::ch('S'), KeyCode::named(Down)],
            gamepad_axis: Some(1),
        },
    );
    actions.insert(
        "up".to_string(),
        InputAction::Button {
            keys: vec![KeyCode::ch('W'), KeyCode::named(Up)],
            gamepad_buttons: Vec::new(),
        },
    );
    actions.insert(
        "down".to_string(),
        InputAction::Button {
            keys: vec![KeyCode::ch('S'), KeyCode::named(Down)],
            gamepad_buttons: Vec::new(),
        },
    );
    actions.insert(
        "use".to_string(),
        InputAction::Button {
            keys: vec![KeyCode::ch('E'), KeyCode::named(Enter)],
            gamepad_buttons: vec![0],
        },
    );
    actions
}

#[derive(Debug, Default, Clone)]
struct Buttons {
    keys: HashSet<KeyCode>,
    mouse: HashSet<MouseButton>,
    gamepad: HashSet<u8>,
}

/// Thread-safe input snapshot polled by objects during a tick.
///
/// The host writes key/mouse/gamepad state as platform events arrive and
/// calls [`InputState::advance_frame`] after every tick so that pressed and
/// released edges are reported exactly once.
#[derive(Debug)]
pub struct InputState {
    current: RwLock<Buttons>,
    previous: RwLock<Buttons>,
    mouse_position: RwLock<Vec2>,
    gamepad_axes: RwLock<HashMap<u8, f32>>,
    actions: RwLock<HashMap<String, InputAction>>,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            current: RwLock::new(Buttons::default()),
            previous: RwLock::new(Buttons::default()),
            mouse_position: RwLock::new(Vec2::ZERO),
            gamepad_axes: RwLock::new(HashMap::new()),
            actions: RwLock::new(default_actions()),
        }
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&self, key: KeyCode) {
        self.current.write().keys.insert(key);
    }

    pub fn set_key_up(&self, key: KeyCode) {
        self.current.write().keys.remove(&key);
    }

    pub fn set_mouse_button_down(&self, button: MouseButton) {
        self.current.write().mouse.insert(button);
    }

    pub fn set_mouse_button_up(&self, button: MouseButton) {
        self.current.write().mouse.remove(&button);
    }

    pub fn set_mouse_position(&self, position: Vec2) {
        *self.mouse_position.write() = position;
    }

    pub fn set_gamepad_button(&self, button: u8, down: bool) {
        let mut current = self.current.write();
        if down {
            current.gamepad.insert(button);
        } else {
            current.gamepad.remove(&button);
        }
    }

    pub fn set_gamepad_axis(&self, axis: u8, value: f32) {
        self.gamepad_axes.write().insert(axis, value.clamp(-1.0, 1.0));
    }

    /// Replaces (or adds) the binding for an action.
    pub fn bind_action(&self, name: &str, action: InputAction) {
        self.actions.write().insert(name.to_string(), action);
    }

    /// Rolls the current state into the previous-frame snapshot.
    pub fn advance_frame(&self) {
        let current = self.current.read().clone();
        *self.previous.write() = current;
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.current.read().keys.contains(&key)
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.is_key_down(key) && !self.previous.read().keys.contains(&key)
    }

    pub fn is_key_released(&self, key: KeyCode) -> bool {
        !self.is_key_down(key) && self.previous.read().keys.contains(&key)
    }

    pub fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.current.read().mouse.contains(&button)
    }

    pub fn is_mouse_button_released(&self, button: MouseButton) -> bool {
        !self.is_mouse_button_down(button) && self.previous.read().mouse.contains(&button)
    }

    pub fn is_key_down_by_name(&self, name: &str) -> bool {
        match parse_input_name(name) {
            Some(InputName::Key(key)) => self.is_key_down(key),
            Some(InputName::Mouse(button)) => self.is_mouse_button_down(button),
            None => false,
        }
    }

    pub fn mouse_position(&self) -> Vec2 {
        *self.mouse_position.read()
    }

    pub fn gamepad_axis(&self, axis: u8) -> f32 {
        let value = self.gamepad_axes.read().get(&axis).copied().unwrap_or(0.0);
        if value.abs() < GAMEPAD_DEAD_ZONE {
            0.0
        } else {
            value
        }
    }

    pub fn is_action_down(&self, name: &str) -> bool {
        self.action_state(name, Snapshot::Current)
    }

    pub fn is_action_pressed(&self, name: &str) -> bool {
        self.action_state(name, Snapshot::Current) && !self.action_state(name, Snapshot::Previous)
    }

    pub fn is_action_released(&self, name: &str) -> bool {
        !self.action_state(name, Snapshot::Current) && self.action_state(name, Snapshot::Previous)
    }

    /// Reads an axis action in -1..1; the gamepad wins when outside the dead zone.
    pub fn action_axis(&self, name: &str) -> f32 {
        let action = self.actions.read().get(name).cloned();
        match action {
            Some(InputAction::Axis {
                negative,
                positive,
                gamepad_axis,
            }) => {
                if let Some(axis) = gamepad_axis {
                    let value = self.gamepad_axis(axis);
                    if value != 0.0 {
                        return value;
                    }
                }
                let current = self.current.read();
                let held = |keys: &[KeyCode]| keys.iter().any(|k| current.keys.contains(k));
                let mut value = 0.0;
                if held(negative.as_slice()) {
                    value -= 1.0;
                }
                if held(positive.as_slice()) {
                    value += 1.0;
                }
                value
            }
            Some(InputAction::Button { .. }) => {
                if self.is_action_down(name) {
                    1.0
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }

    fn action_state(&self, name: &str, snapshot: Snapshot) -> bool {
        let Some(action) = self.actions.read().get(name).cloned() else {
            return false;
        };
        let buttons = match snapshot {
            Snapshot::Current => self.current.read().clone(),
            Snapshot::Previous => self.previous.read().clone(),
        };
        match &action {
            InputAction::Button {
                keys,
                gamepad_buttons,
            } => {
                keys.iter().any(|k| buttons.keys.contains(k))
                    || gamepad_buttons.iter().any(|b| buttons.gamepad.contains(b))
            }
            InputAction::Axis {
                negative, positive, ..
            } => negative
                .iter()
                .chain(positive.iter())
                .any(|k| buttons.keys.contains(k)),
        }
    }
}

#[derive(Clone, Copy)]
enum Snapshot {
    Current,
    Previous,
}

enum InputName {
    Key(KeyCode),
    Mouse(MouseButton),
}

fn parse_input_name(name: &str) -> Option<InputName> {
    if let Some(button) = parse_mouse_button(name) {
        return Some(InputName::Mouse(button));
    }
    KeyCode::from_name(name).map(InputName::Key)
}

fn parse_mouse_button(name: &str) -> Option<MouseButton> {
    let prefix = name.get(..5)?;
    if !prefix.eq_ignore_ascii_case("mouse") {
        return None;
    }
    let suffix = &name[5..];
    if suffix.is_empty() {
        return Some(MouseButton::LEFT);
    }
    let index = suffix.parse::<u8>().ok()?;
    Some(MouseButton::new(index.saturating_sub(1)))
}
