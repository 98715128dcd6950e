//! On-screen notification queue. Only the head entry is shown: it fades in,
//! stays for its duration, fades out and is then dropped.

use std::collections::VecDeque;

use glam::Vec2;

use crate::math::{Color, RectF};
use crate::render::Canvas;

pub const DEFAULT_NOTIFICATION_DURATION: f32 = 5.0;
const PANEL_WIDTH: f32 = 280.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fade {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub text: String,
    pub color: Color,
    pub duration: f32,
    remaining: f32,
    active: bool,
    fade: Fade,
    /// 0 = invisible, 1 = fully shown.
    opacity: f32,
}

#[derive(Debug, Default)]
pub struct Notifications {
    queue: VecDeque<Notification>,
}

impl Notifications {
    pub fn push(&mut self, text: &str, color: Color) {
        self.push_with_duration(text, DEFAULT_NOTIFICATION_DURATION, color);
    }

    pub fn push_with_duration(&mut self, text: &str, duration: f32, color: Color) {
        log::info!("notification: {text}");
        self.queue.push_back(Notification {
            text: text.to_string(),
            color,
            duration,
            remaining: duration,
            active: false,
            fade: Fade::In,
            opacity: 0.0,
        });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn current(&self) -> Option<&Notification> {
        self.queue.front()
    }

    pub fn update(&mut self, dt: f32) {
        let Some(head) = self.queue.front_mut() else {
            return;
        };
        if !head.active {
            head.active = true;
            head.remaining = head.duration;
            head.fade = Fade::In;
        }

        match head.fade {
            Fade::In if head.opacity >= 1.0 => head.remaining -= dt,
            Fade::In => head.opacity += dt,
            Fade::Out => head.opacity -= dt,
        }

        if head.fade == Fade::In && head.remaining <= 0.0 {
            head.fade = Fade::Out;
            head.opacity = 1.0;
        }
        if head.fade == Fade::Out && head.opacity <= 0.0 {
            self.queue.pop_front();
        }
    }

    pub fn draw(&self, canvas: &mut dyn Canvas, screen_width: f32) {
        let Some(head) = self.queue.front() else {
            return;
        };
        let opacity = head.opacity.clamp(0.0, 1.0);
        canvas.draw_rectangle(
            RectF::new(screen_width / 2.0 - PANEL_WIDTH / 2.0, 15.0, PANEL_WIDTH, 22.0),
            Color::PANEL.fade(opacity),
        );
        let width = canvas.measure_text(&head.text, 14.0);
        canvas.draw_text(
            &head.text,
            Vec2::new(screen_width / 2.0 - width / 2.0, 20.0),
            14.0,
            head.color.fade(opacity),
        );
    }
}
