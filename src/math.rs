//! Small geometry and colour helpers shared by the world, map and classes.

use glam::{IVec2, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Integer axis-aligned rectangle used for bounding boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn size(&self) -> IVec2 {
        IVec2::new(self.width, self.height)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Strict overlap test; rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

/// Floating point rectangle used for draw calls.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RectF {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Strict containment: points on the border are outside.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x > self.x
            && point.x < self.x + self.width
            && point.y > self.y
            && point.y < self.y + self.height
    }
}

impl From<Rect> for RectF {
    fn from(rect: Rect) -> Self {
        Self::new(
            rect.x as f32,
            rect.y as f32,
            rect.width as f32,
            rect.height as f32,
        )
    }
}

/// 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);
    pub const RED: Self = Self::rgba(230, 41, 55, 255);
    pub const YELLOW: Self = Self::rgba(253, 249, 0, 255);
    pub const PANEL: Self = Self::rgba(46, 46, 84, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses Tiled colours (`#AARRGGBB` or `#RRGGBB`); alpha is ignored.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.is_ascii() {
            return None;
        }
        let rgb = match digits.len() {
            8 => &digits[2..],
            6 => digits,
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(rgb.get(i..i + 2)?, 16).ok();
        Some(Self::rgba(channel(0)?, channel(2)?, channel(4)?, 255))
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }

    pub fn from_vec3(v: Vec3) -> Self {
        let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0) as u8;
        Self::rgba(to_byte(v.x), to_byte(v.y), to_byte(v.z), 255)
    }

    /// Returns the colour with its alpha scaled by `amount` (0..1).
    pub fn fade(self, amount: f32) -> Self {
        Self {
            a: (amount.clamp(0.0, 1.0) * 255.0) as u8,
            ..self
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn lerp_vec2(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a + (b - a) * t
}

/// Parses a `"x y"` pair; missing or malformed components become zero.
pub fn parse_vec2(text: &str) -> Vec2 {
    let mut parts = text.split_whitespace().map(|p| p.parse::<f32>().unwrap_or(0.0));
    let x = parts.next().unwrap_or(0.0);
    let y = parts.next().unwrap_or(0.0);
    Vec2::new(x, y)
}

/// Splits a `;`-separated argument list, dropping empty entries.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_contact_is_not_an_intersection() {
        let a = Rect::new(0, 0, 4, 4);
        assert!(!a.intersects(&Rect::new(4, 0, 4, 4)));
        assert!(a.intersects(&Rect::new(3, 3, 4, 4)));
    }

    #[test]
    fn malformed_hex_colours_are_rejected() {
        assert_eq!(Color::from_hex("#ff102030"), Some(Color::rgba(16, 32, 48, 255)));
        assert_eq!(Color::from_hex("102030"), Some(Color::rgba(16, 32, 48, 255)));
        assert_eq!(Color::from_hex("#a\u{e9}12345"), None);
        assert_eq!(Color::from_hex("#\u{e9}\u{e9}\u{e9}"), None);
        assert_eq!(Color::from_hex("#fff"), None);
        assert_eq!(Color::from_hex("#gg0000"), None);
    }

    #[test]
    fn point_on_border_is_outside() {
        let r = RectF::new(0.0, 0.0, 10.0, 10.0);
        assert!(!r.contains(Vec2::new(0.0, 5.0)));
        assert!(r.contains(Vec2::new(5.0, 5.0)));
    }

    #[test]
    fn parses_tiled_argb_colours() {
        assert_eq!(Color::from_hex("#ff102030"), Some(Color::rgba(0x10, 0x20, 0x30, 255)));
        assert_eq!(Color::from_hex("102030"), Some(Color::rgba(0x10, 0x20, 0x30, 255)));
        assert_eq!(Color::from_hex("#zz"), None);
    }

    #[test]
    fn vector_and_list_parsing_are_lenient() {
        assert_eq!(parse_vec2("3 -4"), Vec2::new(3.0, -4.0));
        assert_eq!(parse_vec2("7"), Vec2::new(7.0, 0.0));
        assert_eq!(split_list("a; b;;c"), vec!["a", "b", "c"]);
    }
}
