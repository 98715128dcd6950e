use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use roxmltree::{Document, Node};

use crate::math::RectF;

pub const FLIP_HORIZONTAL: u32 = 0x8000_0000;
pub const FLIP_VERTICAL: u32 = 0x4000_0000;
pub const FLIP_DIAGONAL: u32 = 0x2000_0000;
/// Low 28 bits of a raw cell value address the tile.
pub const GID_MASK: u32 = 0x0FFF_FFFF;

/// A raw 32-bit tile value split into its global id and flip flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileRef {
    pub gid: u32,
    pub flip_h: bool,
    pub flip_v: bool,
    pub flip_d: bool,
}

impl TileRef {
    pub fn from_raw(raw: u32) -> Self {
        Self {
            gid: raw & GID_MASK,
            flip_h: raw & FLIP_HORIZONTAL != 0,
            flip_v: raw & FLIP_VERTICAL != 0,
            flip_d: raw & FLIP_DIAGONAL != 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gid == 0
    }

    /// Flips the source rectangle and returns the extra rotation in degrees.
    pub fn apply_flips(&self, mut src: RectF) -> (RectF, f32) {
        let mut rotation = 0.0;
        if self.flip_h {
            src.width = -src.width;
        }
        if self.flip_v {
            src.height = -src.height;
        }
        if self.flip_d {
            src.width = -src.width;
            rotation = 90.0;
        }
        (src, rotation)
    }
}

/// Tile atlas metadata from a `.tsx` document (or an inline `<tileset>`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tileset {
    pub first_gid: u32,
    pub name: String,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tile_count: u32,
    pub columns: u32,
    /// Atlas texture path relative to the asset root.
    pub image: String,
    pub image_width: u32,
    pub image_height: u32,
}

impl Tileset {
    /// Parses a standalone tileset document. `dir` is the asset-relative
    /// directory of the document, used to resolve the image path.
    pub fn from_tsx(xml: &str, first_gid: u32, dir: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid tileset XML")?;
        let root = document.root_element();
        if !root.has_tag_name("tileset") {
            return Err(anyhow!("expected <tileset>, found <{}>", root.tag_name().name()));
        }
        Self::from_node(&root, first_gid, dir)
    }

    pub(crate) fn from_node(node: &Node<'_, '_>, first_gid: u32, dir: &str) -> Result<Self> {
        let image = node
            .children()
            .find(|child| child.has_tag_name("image"))
            .ok_or_else(|| anyhow!("tileset has no <image>"))?;
        let source = image
            .attribute("source")
            .ok_or_else(|| anyhow!("tileset image has no source"))?;
        Ok(Self {
            first_gid,
            name: node.attribute("name").unwrap_or_default().to_string(),
            tile_width: attr_u32(node, "tilewidth")?,
            tile_height: attr_u32(node, "tileheight")?,
            tile_count: attr_u32(node, "tilecount").unwrap_or(0),
            columns: attr_u32(node, "columns").unwrap_or(0),
            image: join_asset_path(dir, source),
            image_width: attr_u32(&image, "width")?,
            image_height: attr_u32(&image, "height").unwrap_or(0),
        })
    }

    /// Tiles per atlas row.
    pub fn tiles_per_row(&self) -> u32 {
        if self.tile_width == 0 {
            return 0;
        }
        self.image_width / self.tile_width
    }

    /// Atlas rectangle of the tile with global id `gid`.
    pub fn source_rect(&self, gid: u32) -> Option<RectF> {
        let row = self.tiles_per_row();
        if row == 0 || gid < self.first_gid {
            return None;
        }
        let local = gid - self.first_gid;
        Some(RectF::new(
            (local % row * self.tile_width) as f32,
            (local / row * self.tile_height) as f32,
            self.tile_width as f32,
            self.tile_height as f32,
        ))
    }
}

/// The tileset owning `gid`: the one with the greatest `first_gid <= gid`.
pub fn find_tileset(tilesets: &[Arc<Tileset>], gid: u32) -> Option<&Arc<Tileset>> {
    tilesets
        .iter()
        .filter(|tileset| tileset.first_gid <= gid)
        .max_by_key(|tileset| tileset.first_gid)
}

pub(crate) fn attr_u32(node: &Node<'_, '_>, name: &str) -> Result<u32> {
    let value = node
        .attribute(name)
        .ok_or_else(|| anyhow!("<{}> is missing '{name}'", node.tag_name().name()))?;
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid '{name}' value '{value}'"))
}

/// Joins `relative` onto the asset directory `dir`, folding `.` and `..`.
pub(crate) fn join_asset_path(dir: &str, relative: &str) -> String {
    let mut parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
    for part in relative.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Directory component of an asset path.
pub(crate) fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TSX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset version="1.2" name="terrain" tilewidth="16" tileheight="16" tilecount="64" columns="8">
  <image source="../../gfx/terrain.png" width="128" height="128"/>
</tileset>"#;

    #[test]
    fn parses_tsx_and_resolves_image_path() {
        let tileset = Tileset::from_tsx(TSX, 1, "map/town").unwrap();
        assert_eq!(tileset.name, "terrain");
        assert_eq!(tileset.image, "gfx/terrain.png");
        assert_eq!(tileset.tiles_per_row(), 8);
    }

    #[test]
    fn source_rect_wraps_rows() {
        let tileset = Tileset::from_tsx(TSX, 1, "map/town").unwrap();
        assert_eq!(tileset.source_rect(1), Some(RectF::new(0.0, 0.0, 16.0, 16.0)));
        assert_eq!(tileset.source_rect(10), Some(RectF::new(16.0, 16.0, 16.0, 16.0)));
        assert_eq!(tileset.source_rect(0), None);
    }

    #[test]
    fn owning_tileset_has_greatest_first_gid() {
        let sets: Vec<Arc<Tileset>> = [1, 65, 200]
            .into_iter()
            .map(|first_gid| {
                Arc::new(Tileset {
                    first_gid,
                    ..Tileset::default()
                })
            })
            .collect();
        assert_eq!(find_tileset(&sets, 64).unwrap().first_gid, 1);
        assert_eq!(find_tileset(&sets, 65).unwrap().first_gid, 65);
        assert_eq!(find_tileset(&sets, 1000).unwrap().first_gid, 200);
        assert!(find_tileset(&sets, 0).is_none());
    }

    #[test]
    fn flip_bits_negate_the_source() {
        let tile = TileRef::from_raw(FLIP_HORIZONTAL | FLIP_DIAGONAL | 5);
        assert_eq!(tile.gid, 5);
        let (src, rotation) = tile.apply_flips(RectF::new(0.0, 0.0, 16.0, 16.0));
        assert_eq!(src.width, 16.0);
        assert_eq!(rotation, 90.0);
        let (src, _) = TileRef::from_raw(FLIP_VERTICAL | 5).apply_flips(RectF::new(0.0, 0.0, 16.0, 16.0));
        assert_eq!(src.height, -16.0);
    }
}
