use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use super::registry::ClassId;
use crate::map::Tileset;
use crate::math::{parse_vec2, Color, Rect};
use crate::sprite::DEFAULT_SPRITE_SIZE;

/// Index of an object inside its world's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The authored record an object was built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectMeta {
    pub name: String,
    pub class: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    /// Tile id with flip bits, zero when the object is not a tile.
    pub gid: u32,
    pub template: String,
    pub properties: BTreeMap<String, String>,
    /// Tileset brought in by a template, used only for this object's sprite.
    pub tileset: Option<Arc<Tileset>>,
}

impl ObjectMeta {
    pub fn new(name: &str, class: &str) -> Self {
        Self {
            name: name.to_string(),
            class: class.to_string(),
            ..Self::default()
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn sized(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }

    /// Property value; empty strings count as absent.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn property_f32(&self, key: &str) -> Option<f32> {
        self.property(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn property_i32(&self, key: &str) -> Option<i32> {
        self.property(key).and_then(|v| {
            let v = v.trim();
            v.parse::<i32>()
                .ok()
                .or_else(|| v.parse::<f32>().ok().map(|f| f as i32))
        })
    }
}

/// How an object's bounding box is derived from its state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Zero-sized box at the origin.
    None,
    /// Authored rectangle at the object's position.
    Solid,
    /// Tile stamp anchored bottom-left and rotated around that anchor.
    Tile,
    /// Foot box of a sprite frame, or a 32×32 box above the anchor.
    Sprite { frame: Option<(i32, i32)> },
    /// Class-provided bounding box.
    Custom(fn(&Object) -> Rect),
}

/// Dynamic property value written by scripts.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Vector(Vec2),
}

impl PropertyValue {
    fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Number(n) => Some(*n as f32),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(t) => t.trim().parse().ok(),
            Self::Vector(_) => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Number(n) => Some(*n != 0.0),
            Self::Text(t) => Some(t == "1" || t.eq_ignore_ascii_case("true")),
            Self::Vector(_) => None,
        }
    }

    fn as_vec2(&self) -> Option<Vec2> {
        match self {
            Self::Vector(v) => Some(*v),
            Self::Text(t) => Some(parse_vec2(t)),
            _ => None,
        }
    }
}

/// A world entity. Class-specific state lives in the paired behaviour.
#[derive(Debug, Clone)]
pub struct Object {
    pub gid: u32,
    pub name: String,
    pub class: String,
    pub class_id: ClassId,

    pub position: Vec2,
    pub movement: Vec2,
    pub facing: Vec2,
    pub rotation: f32,
    pub size: IVec2,
    pub shape: Shape,

    pub depends: Vec<ObjectId>,
    pub target: Option<ObjectId>,
    pub proxy: Option<ObjectId>,
    pub meta: ObjectMeta,

    pub file_name: String,
    pub collision_type: String,
    pub visible: bool,
    pub debug_visible: bool,
    pub is_collidable: bool,
    pub is_persistent: bool,
    pub auto_start: bool,
    pub can_repeat: bool,
    pub started: bool,
    pub was_executed: bool,
    /// Player input lock while a dialogue or sequence runs.
    pub locked: bool,
    /// Simulated time (seconds) of the last accepted trigger.
    pub last_trigger: f64,

    pub color: Option<Color>,
    pub tint: Color,
    pub radius: f32,
    pub attenuation: f32,
    pub offset: Vec2,

    pub(crate) was_updated: bool,
}

impl Object {
    /// Builds an object from its authored record with default flags.
    pub(crate) fn from_meta(gid: u32, meta: ObjectMeta) -> Self {
        let color = meta.property("color").and_then(Color::from_hex);
        let tint = meta
            .property("tint")
            .and_then(Color::from_hex)
            .unwrap_or(Color::WHITE);
        Self {
            gid,
            name: meta.name.clone(),
            class: meta.class.clone(),
            class_id: ClassId::UNRESOLVED,
            position: Vec2::new(meta.x, meta.y),
            movement: Vec2::ZERO,
            facing: Vec2::new(1.0, 0.0),
            rotation: meta.rotation,
            size: IVec2::new(meta.width as i32, meta.height as i32),
            shape: Shape::None,
            depends: Vec::new(),
            target: None,
            proxy: None,
            file_name: meta.property("file").unwrap_or_default().to_string(),
            collision_type: meta.property("colType").unwrap_or_default().to_string(),
            visible: true,
            debug_visible: true,
            is_collidable: false,
            is_persistent: true,
            auto_start: meta.property("autostart") == Some("1"),
            can_repeat: meta.property("canRepeat") == Some("1"),
            started: false,
            was_executed: false,
            locked: false,
            last_trigger: f64::NEG_INFINITY,
            color,
            tint,
            radius: meta.property_f32("radius").unwrap_or(0.0),
            attenuation: meta.property_f32("atten").or_else(|| meta.property_f32("attenuation")).unwrap_or(0.0),
            offset: meta.property("offset").map(parse_vec2).unwrap_or(Vec2::ZERO),
            meta,
            was_updated: false,
        }
    }

    pub fn was_updated(&self) -> bool {
        self.was_updated
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.meta.property(key)
    }

    pub fn aabb(&self) -> Rect {
        let x = self.position.x as i32;
        let y = self.position.y as i32;
        match self.shape {
            Shape::None => Rect::default(),
            Shape::Solid => Rect::new(x, y, self.size.x, self.size.y),
            Shape::Tile => {
                let center_x = self.size.x as f32 / 2.0;
                let center_y = -(self.size.y as f32) / 2.0;
                let (sin, cos) = self.rotation.to_radians().sin_cos();
                let rot_x = (center_x * cos - center_y * sin) as i32;
                let rot_y = (center_x * sin + center_y * cos) as i32;
                Rect::new(
                    x + rot_x - center_x as i32,
                    y + rot_y + center_y as i32,
                    self.size.x,
                    self.size.y,
                )
            }
            Shape::Sprite { frame: None } => {
                Rect::new(x, y - DEFAULT_SPRITE_SIZE, DEFAULT_SPRITE_SIZE, DEFAULT_SPRITE_SIZE)
            }
            Shape::Sprite {
                frame: Some((w, h)),
            } => Rect::new(x - w / 2 + w / 4, y, w / 2, h / 2),
            Shape::Custom(aabb) => aabb(self),
        }
    }

    /// Point used for culling and proximity: position plus half the box size.
    pub fn center(&self) -> Vec2 {
        let size = self.aabb().size();
        self.position + Vec2::new(size.x as f32, size.y as f32) / 2.0
    }

    /// Writes one named field; used by scripts.
    pub fn set_property(&mut self, field: &str, value: &PropertyValue) -> Result<(), String> {
        let bad = || format!("invalid value {value:?} for field '{field}'");
        match field {
            "x" => self.position.x = value.as_f32().ok_or_else(bad)?,
            "y" => self.position.y = value.as_f32().ok_or_else(bad)?,
            "position" | "Position" => self.position = value.as_vec2().ok_or_else(bad)?,
            "movement" | "Movement" => self.movement = value.as_vec2().ok_or_else(bad)?,
            "facing" | "Facing" => self.facing = value.as_vec2().ok_or_else(bad)?,
            "rotation" | "Rotation" => self.rotation = value.as_f32().ok_or_else(bad)?,
            "visible" | "Visible" => self.visible = value.as_bool().ok_or_else(bad)?,
            "collidable" | "IsCollidable" => {
                self.is_collidable = value.as_bool().ok_or_else(bad)?
            }
            "persistent" | "IsPersistent" => {
                self.is_persistent = value.as_bool().ok_or_else(bad)?
            }
            "autostart" | "AutoStart" => self.auto_start = value.as_bool().ok_or_else(bad)?,
            "canRepeat" | "CanRepeat" => self.can_repeat = value.as_bool().ok_or_else(bad)?,
            "locked" | "Locked" => self.locked = value.as_bool().ok_or_else(bad)?,
            "radius" | "Radius" => self.radius = value.as_f32().ok_or_else(bad)?,
            "file" | "FileName" => match value {
                PropertyValue::Text(text) => self.file_name = text.clone(),
                _ => return Err(bad()),
            },
            "color" | "Color" => match value {
                PropertyValue::Text(text) => {
                    self.color = Some(Color::from_hex(text).ok_or_else(bad)?)
                }
                _ => return Err(bad()),
            },
            _ => return Err(format!("unknown field '{field}'")),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(meta: ObjectMeta) -> Object {
        Object::from_meta(0, meta)
    }

    #[test]
    fn defaults_follow_authored_properties() {
        let o = object(
            ObjectMeta::new("door", "anim")
                .with_property("autostart", "1")
                .with_property("file", "gfx/door")
                .with_property("offset", "2 3"),
        );
        assert!(o.visible && o.is_persistent && o.auto_start);
        assert!(!o.can_repeat && !o.is_collidable);
        assert_eq!(o.file_name, "gfx/door");
        assert_eq!(o.offset, Vec2::new(2.0, 3.0));
    }

    #[test]
    fn tile_box_is_anchored_bottom_left() {
        let mut o = object(ObjectMeta::new("t", "tile").at(10.0, 50.0).sized(16.0, 16.0));
        o.shape = Shape::Tile;
        assert_eq!(o.aabb(), Rect::new(10, 34, 16, 16));
    }

    #[test]
    fn sprite_box_defaults_to_32_above_anchor() {
        let mut o = object(ObjectMeta::new("a", "anim").at(5.0, 40.0));
        o.shape = Shape::Sprite { frame: None };
        assert_eq!(o.aabb(), Rect::new(5, 8, 32, 32));
        o.shape = Shape::Sprite {
            frame: Some((16, 24)),
        };
        assert_eq!(o.aabb(), Rect::new(1, 40, 8, 12));
    }

    #[test]
    fn set_property_validates_values() {
        let mut o = object(ObjectMeta::new("a", "col"));
        o.set_property("x", &PropertyValue::Number(4.0)).unwrap();
        o.set_property("visible", &PropertyValue::Bool(false)).unwrap();
        assert_eq!(o.position.x, 4.0);
        assert!(!o.visible);
        assert!(o.set_property("x", &PropertyValue::Vector(Vec2::ONE)).is_err());
        assert!(o.set_property("bogus", &PropertyValue::Bool(true)).is_err());
    }
}
