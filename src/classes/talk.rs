use std::sync::Arc;

use glam::Vec2;
use log::{debug, warn};

use crate::dialogue::Dialogue;
use crate::events::Event;
use crate::input::MouseButton;
use crate::math::{split_list, Color, RectF};
use crate::render::Canvas;
use crate::save::SaveBlockers;
use crate::world::{DrawContext, HookContext, Object, ObjectBehavior, ObjectId};

use super::{draw_marker, ExecutionState};

/// Seconds within which a second click on the same choice confirms it.
const DOUBLE_CLICK_WINDOW: f32 = 0.5;

const PANEL_MARGIN: f32 = 16.0;
const PANEL_HEIGHT: f32 = 160.0;
const CHOICE_TOP: f32 = 64.0;
const CHOICE_HEIGHT: f32 = 18.0;
const TEXT_SIZE: f32 = 10.0;

/// Screen-space layout of the dialogue panel, shared by drawing and mouse
/// hit-testing.
struct PanelLayout {
    panel: RectF,
    choices: Vec<RectF>,
}

impl PanelLayout {
    fn new(screen: Vec2, choices: usize) -> Self {
        let panel = RectF::new(
            PANEL_MARGIN,
            screen.y - PANEL_HEIGHT - PANEL_MARGIN,
            screen.x - PANEL_MARGIN * 2.0,
            PANEL_HEIGHT,
        );
        let choices = (0..choices)
            .map(|row| {
                RectF::new(
                    panel.x + 8.0,
                    panel.y + CHOICE_TOP + row as f32 * CHOICE_HEIGHT,
                    panel.width - 16.0,
                    CHOICE_HEIGHT,
                )
            })
            .collect();
        Self { panel, choices }
    }
}

/// Dialogue runner over a `texts/<file>` tree.
///
/// While running, the local player is locked and saving is blocked. The
/// talk ends when a confirmed node has nothing to advance to.
#[derive(Debug, Default)]
pub struct Talk {
    root: Option<Arc<Dialogue>>,
    current: Option<Dialogue>,
    pub choice: usize,
    click_timer: f32,
    player_was_locked: bool,
    /// The `use` press that opened the talk must not also confirm its first node.
    swallow_use: bool,
}

pub(super) fn build(_object: &mut Object) -> Box<dyn ObjectBehavior> {
    Box::new(Talk::default())
}

impl Talk {
    pub fn current(&self) -> Option<&Dialogue> {
        self.current.as_ref()
    }

    fn load(&mut self, ctx: &HookContext<'_>) -> Option<Arc<Dialogue>> {
        if let Some(root) = &self.root {
            return Some(Arc::clone(root));
        }
        let object = ctx.object();
        if object.file_name.is_empty() {
            warn!("talk '{}' has no dialogue file", object.name);
            return None;
        }
        match ctx.env.assets.dialogue(&ctx.env.current_map, &object.file_name) {
            Ok(root) => {
                self.root = Some(Arc::clone(&root));
                Some(root)
            }
            Err(err) => {
                warn!("talk '{}' could not load its dialogue: {err:#}", object.name);
                None
            }
        }
    }

    fn confirm(&mut self, ctx: &mut HookContext<'_>) {
        let Some(node) = self.current.take() else {
            return;
        };
        if !node.target.is_empty() {
            match ctx.find(&node.target) {
                Some(target) => ctx.trigger(target),
                None => warn!("dialogue target '{}' not found", node.target),
            }
        }
        if !node.event.is_empty() {
            ctx.env
                .events
                .push(Event::new(&node.event, split_list(&node.event_args)));
        }
        self.current = node.advance(self.choice).cloned();
        self.choice = 0;
        self.click_timer = 0.0;
        if self.current.is_none() {
            self.end(ctx);
        }
    }

    fn end(&mut self, ctx: &mut HookContext<'_>) {
        debug!("talk '{}' finished", ctx.object().name);
        let object = ctx.object_mut();
        object.started = false;
        object.was_executed = true;
        let was_locked = self.player_was_locked;
        if let Some(player) = ctx.local_player().and_then(|id| ctx.get_mut(id)) {
            player.locked = was_locked;
        }
        ctx.env.can_save.clear(SaveBlockers::IN_DIALOGUE);
        ctx.trigger_target();
    }
}

impl ObjectBehavior for Talk {
    fn init(&mut self, ctx: &mut HookContext<'_>) {
        let object = ctx.object();
        if object.auto_start && !object.was_executed {
            self.trigger(ctx, None);
        }
    }

    fn update(&mut self, ctx: &mut HookContext<'_>, dt: f32) {
        if !ctx.object().started {
            return;
        }
        self.click_timer = (self.click_timer - dt).max(0.0);
        let Some(count) = self.current.as_ref().map(|node| node.choices.len()) else {
            self.end(ctx);
            return;
        };

        let input = Arc::clone(&ctx.env.input);
        if count > 0 {
            if input.is_action_pressed("up") {
                self.choice = (self.choice + count - 1) % count;
            }
            if input.is_action_pressed("down") {
                self.choice = (self.choice + 1) % count;
            }
        }

        let swallow = std::mem::take(&mut self.swallow_use);
        let mut confirm = input.is_action_pressed("use") && !swallow;
        if input.is_mouse_button_released(MouseButton::LEFT) {
            let layout = PanelLayout::new(ctx.env.screen, count);
            let mouse = input.mouse_position();
            match layout.choices.iter().position(|row| row.contains(mouse)) {
                Some(row) if row == self.choice && self.click_timer > 0.0 => confirm = true,
                Some(row) => {
                    self.choice = row;
                    self.click_timer = DOUBLE_CLICK_WINDOW;
                }
                None if count == 0 && layout.panel.contains(mouse) => confirm = true,
                None => {}
            }
        }
        if confirm {
            self.confirm(ctx);
        }
    }

    fn trigger(&mut self, ctx: &mut HookContext<'_>, _from: Option<ObjectId>) {
        let object = ctx.object();
        if object.started || (object.was_executed && !object.can_repeat) {
            return;
        }
        let Some(root) = self.load(ctx) else {
            return;
        };
        self.current = Some((*root).clone());
        self.choice = 0;
        self.click_timer = 0.0;
        self.swallow_use = ctx.input().is_action_down("use");

        let player = ctx.local_player();
        if let Some(player) = player.and_then(|id| ctx.get_mut(id)) {
            self.player_was_locked = player.locked;
            player.locked = true;
        }
        let elapsed = ctx.env.elapsed;
        let object = ctx.object_mut();
        object.started = true;
        object.last_trigger = elapsed;
        ctx.env.can_save.set(SaveBlockers::IN_DIALOGUE);
    }

    fn draw(&self, object: &Object, ctx: &DrawContext<'_>, canvas: &mut dyn Canvas) {
        if ctx.debug() && object.debug_visible {
            draw_marker(canvas, object, 3.0, &[]);
        }
    }

    fn draw_ui(&self, object: &Object, ctx: &DrawContext<'_>, canvas: &mut dyn Canvas) {
        let (true, Some(node)) = (object.started, self.current.as_ref()) else {
            return;
        };
        let layout = PanelLayout::new(ctx.env.screen, node.choices.len());
        let panel = layout.panel;
        canvas.draw_rectangle(panel, Color::PANEL);
        canvas.draw_rectangle_lines(panel, Color::WHITE);
        if !node.avatar.is_empty() {
            canvas.draw_texture(
                &node.avatar,
                RectF::new(0.0, 0.0, 48.0, 48.0),
                RectF::new(panel.x + panel.width - 56.0, panel.y + 8.0, 48.0, 48.0),
                Vec2::ZERO,
                0.0,
                Color::WHITE,
            );
        }
        canvas.draw_text(
            &node.name,
            Vec2::new(panel.x + 8.0, panel.y + 8.0),
            TEXT_SIZE * 1.5,
            Color::YELLOW,
        );
        canvas.draw_text(
            &node.text,
            Vec2::new(panel.x + 8.0, panel.y + 32.0),
            TEXT_SIZE,
            Color::WHITE,
        );
        for (index, (choice, row)) in node.choices.iter().zip(&layout.choices).enumerate() {
            let color = if index == self.choice {
                Color::YELLOW
            } else {
                Color::WHITE
            };
            canvas.draw_text(&choice.text, Vec2::new(row.x, row.y + 4.0), TEXT_SIZE, color);
        }
    }

    fn serialize(&self, object: &Object) -> String {
        ExecutionState::save(object)
    }

    fn deserialize(&mut self, object: &mut Object, blob: &str) {
        ExecutionState::restore(object, blob);
    }
}
