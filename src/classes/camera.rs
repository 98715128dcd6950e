use glam::Vec2;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::math::{lerp, lerp_vec2};
use crate::render::{Canvas, CameraView};
use crate::save::SaveBlockers;
use crate::world::{DrawContext, HookContext, Object, ObjectBehavior, ObjectId};

use super::draw_marker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    Static,
    #[default]
    Follow,
    Lerp,
}

impl CameraMode {
    /// Unknown names fall back to `Static`.
    pub fn parse(text: &str) -> Self {
        match text {
            "follow" => Self::Follow,
            "lerp" => Self::Lerp,
            _ => Self::Static,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Follow => "follow",
            Self::Lerp => "lerp",
        }
    }
}

/// Camera state machine.
///
/// `Follow` eases toward the followed object every tick (the first tick
/// snaps). `Lerp` walks from `start` to `end` as `progress` goes from 0 to 1,
/// then turns `Static` and triggers the camera's target once. Zoom eases
/// toward `target_zoom` in every mode.
#[derive(Debug, Clone)]
pub struct Camera {
    pub mode: CameraMode,
    pub follow_name: String,
    pub follow: Option<ObjectId>,
    pub start: Option<ObjectId>,
    pub end: Option<ObjectId>,
    pub speed: f32,
    pub progress: f32,
    pub zoom: f32,
    pub target_zoom: f32,
    pub zoom_speed: f32,
    pub first: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CameraData {
    follow: String,
    speed: f32,
    progress: f32,
    target_zoom: f32,
    zoom_speed: f32,
    mode: CameraMode,
    first: bool,
    #[serde(default = "default_zoom")]
    zoom: f32,
}

fn default_zoom() -> f32 {
    1.0
}

pub(super) fn build(object: &mut Object) -> Box<dyn ObjectBehavior> {
    object.debug_visible = false;
    let speed = object
        .meta
        .property_f32("speed")
        .filter(|speed| *speed != 0.0)
        .unwrap_or(1.0);
    Box::new(Camera {
        mode: object
            .property("mode")
            .map(CameraMode::parse)
            .unwrap_or_default(),
        follow_name: object.property("follow").unwrap_or("player").to_string(),
        follow: None,
        start: None,
        end: None,
        speed,
        progress: 0.0,
        zoom: 1.0,
        target_zoom: 1.0,
        zoom_speed: 0.8,
        first: true,
    })
}

impl Camera {
    /// Switches to following `target`. A non-zero `speed` replaces the
    /// current one.
    pub fn follow_object(&mut self, target: Option<ObjectId>, name: &str, speed: f32) {
        if speed != 0.0 {
            self.speed = speed;
        }
        self.mode = CameraMode::Follow;
        self.follow = target;
        self.follow_name = name.to_string();
    }

    /// Starts a transition between two objects. Every tick of the transition
    /// places the camera between `start` and `end`, so it leaves its current
    /// position on the next tick.
    pub fn interpolate(&mut self, start: Option<ObjectId>, end: Option<ObjectId>, speed: f32) {
        if speed != 0.0 {
            self.speed = speed;
        }
        self.mode = CameraMode::Lerp;
        self.start = start;
        self.end = end;
        self.progress = 0.0;
    }

    /// Overrides the zoom without easing.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom;
        self.target_zoom = zoom;
    }

    pub fn view(&self, object: &Object, screen: Vec2) -> CameraView {
        CameraView {
            target: object.position,
            offset: screen / 2.0,
            zoom: self.zoom,
        }
    }

    fn resolve(&mut self, ctx: &HookContext<'_>) {
        match self.mode {
            CameraMode::Follow => {
                self.follow = ctx.find(&self.follow_name);
            }
            CameraMode::Lerp => {
                self.start = ctx.object().property("start").and_then(|name| ctx.find(name));
                self.end = ctx.object().property("end").and_then(|name| ctx.find(name));
            }
            CameraMode::Static => {}
        }
    }

    fn update_lerp(&mut self, ctx: &mut HookContext<'_>, dt: f32) {
        let endpoints = (
            self.start.and_then(|id| ctx.get(id)).map(|o| o.position),
            self.end.and_then(|id| ctx.get(id)).map(|o| o.position),
        );
        let (Some(start), Some(end)) = endpoints else {
            warn!("camera '{}' lerps between missing objects", ctx.object().name);
            return;
        };
        ctx.env.can_save.set(SaveBlockers::SEQUENCE);

        self.progress += self.speed * dt;
        if self.progress >= 1.0 {
            self.progress = 1.0;
            self.mode = CameraMode::Static;
            ctx.object_mut().position = end;
            ctx.env.can_save.clear(SaveBlockers::SEQUENCE);
            ctx.trigger_target();
        } else {
            ctx.object_mut().position = lerp_vec2(start, end, self.progress);
        }
    }
}

impl ObjectBehavior for Camera {
    fn finish(&mut self, ctx: &mut HookContext<'_>) {
        ctx.world.main_camera = Some(ctx.id);
        self.resolve(ctx);
        if self.mode == CameraMode::Follow && self.first {
            if let Some(position) = self.follow.and_then(|id| ctx.get(id)).map(|o| o.position) {
                ctx.object_mut().position = position;
            }
        }
    }

    fn update(&mut self, ctx: &mut HookContext<'_>, dt: f32) {
        match self.mode {
            CameraMode::Follow => {
                if self.follow.is_none() {
                    self.follow = ctx.find(&self.follow_name);
                }
                match self.follow.and_then(|id| ctx.get(id)).map(|o| o.position) {
                    Some(target) => {
                        let target = target.round();
                        let position = if self.first {
                            target
                        } else {
                            lerp_vec2(ctx.object().position, target, self.speed.min(1.0))
                        };
                        ctx.object_mut().position = position;
                    }
                    None => warn!("camera '{}' follows a missing object", ctx.object().name),
                }
            }
            CameraMode::Lerp => self.update_lerp(ctx, dt),
            CameraMode::Static => {}
        }
        self.zoom = lerp(self.zoom, self.target_zoom, self.zoom_speed * dt);
        self.first = false;
    }

    fn draw(&self, object: &Object, ctx: &DrawContext<'_>, canvas: &mut dyn Canvas) {
        if !ctx.debug() || !object.debug_visible {
            return;
        }
        draw_marker(canvas, object, 2.0, &[format!("Mode: {}", self.mode.label())]);
    }

    fn serialize(&self, _object: &Object) -> String {
        let data = CameraData {
            follow: self.follow_name.clone(),
            speed: self.speed,
            progress: self.progress,
            target_zoom: self.target_zoom,
            zoom_speed: self.zoom_speed,
            mode: self.mode,
            first: self.first,
            zoom: self.zoom,
        };
        serde_json::to_string(&data).unwrap_or_default()
    }

    fn deserialize(&mut self, object: &mut Object, blob: &str) {
        let data: CameraData = match serde_json::from_str(blob) {
            Ok(data) => data,
            Err(err) => {
                warn!("camera '{}' has a broken save blob: {err}", object.name);
                return;
            }
        };
        self.follow_name = data.follow;
        self.follow = None;
        self.speed = data.speed;
        self.progress = data.progress;
        self.target_zoom = data.target_zoom;
        self.zoom_speed = data.zoom_speed;
        self.mode = data.mode;
        self.first = data.first;
        self.zoom = data.zoom;
    }
}
