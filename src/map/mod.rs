//! Tiled map documents and the loaded-map bundle (tiles, world and sky).

mod template;
mod tileset;
mod tmx;

pub use template::Template;
pub use tileset::{
    find_tileset, TileRef, Tileset, FLIP_DIAGONAL, FLIP_HORIZONTAL, FLIP_VERTICAL, GID_MASK,
};
pub use tmx::{TileLayer, TileMap};

use anyhow::{Context, Result};
use glam::Vec2;
use log::info;

use crate::env::Env;
use crate::math::{Color, RectF};
use crate::render::{Canvas, Frustum};
use crate::weather::Weather;
use crate::world::World;

/// A loaded map: its tile data, its simulation region and its sky.
#[derive(Debug)]
pub struct Map {
    pub name: String,
    pub tilemap: TileMap,
    pub world: World,
    pub weather: Weather,
}

impl Map {
    /// Parses `map/<name>/<name>.tmx` and builds its objects.
    pub fn load(env: &mut Env, name: &str) -> Result<Self> {
        let tilemap = TileMap::load(&env.assets, name)?;
        Self::from_tilemap(env, name, tilemap)
    }

    pub fn from_tilemap(env: &mut Env, name: &str, tilemap: TileMap) -> Result<Self> {
        let mut world = World::new(name);
        world
            .create_objects(env, tilemap.objects.clone())
            .with_context(|| format!("objects of map {name} could not be created"))?;
        let weather = Weather::from_properties(|key| tilemap.property(key));
        info!(
            "map '{name}' loaded: {}x{} tiles, {} layers, {} objects",
            tilemap.width,
            tilemap.height,
            tilemap.layers.len(),
            world.len()
        );
        Ok(Self {
            name: name.to_string(),
            tilemap,
            world,
            weather,
        })
    }

    /// Blits the visible layers of one pass (overlay or not). Cells whose
    /// centre falls outside `frustum` are skipped. Returns the blit count.
    pub fn draw_tiles(
        &self,
        canvas: &mut dyn Canvas,
        frustum: &Frustum,
        tint: Color,
        overlays: bool,
    ) -> usize {
        let map = &self.tilemap;
        let tile_w = map.tile_width as f32;
        let tile_h = map.tile_height as f32;
        let mut drawn = 0;

        for layer in map.layers.iter().filter(|l| l.visible && l.is_overlay() == overlays) {
            for (index, &raw) in layer.cells.iter().enumerate() {
                let tile = TileRef::from_raw(raw);
                if tile.is_empty() {
                    continue;
                }
                let (x, y) = map.position_from_index(index);
                let center = Vec2::new(x + tile_w / 2.0, y + tile_h / 2.0);
                if !frustum.contains(center) {
                    continue;
                }
                let Some(tileset) = find_tileset(&map.tilesets, tile.gid) else {
                    log::warn!("tile {} of layer '{}' has no tileset", tile.gid, layer.name);
                    continue;
                };
                let Some(src) = tileset.source_rect(tile.gid) else {
                    continue;
                };
                let src = RectF::new(src.x, src.y, tile_w, tile_h);
                let (src, rotation) = tile.apply_flips(src);
                canvas.draw_texture(
                    &tileset.image,
                    src,
                    RectF::new(center.x, center.y, tile_w, tile_h),
                    Vec2::new(tile_w / 2.0, tile_h / 2.0),
                    rotation,
                    tint,
                );
                drawn += 1;
            }
        }
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DrawCommand, RecordingCanvas};
    use crate::world::ObjectMeta;
    use std::sync::Arc;

    fn tilemap() -> TileMap {
        TileMap {
            width: 2,
            height: 2,
            tile_width: 16,
            tile_height: 16,
            tilesets: vec![Arc::new(Tileset {
                first_gid: 1,
                tile_width: 16,
                tile_height: 16,
                image: "map/demo/t.png".into(),
                image_width: 32,
                image_height: 32,
                ..Tileset::default()
            })],
            layers: vec![
                TileLayer {
                    name: "ground".into(),
                    width: 2,
                    height: 2,
                    visible: true,
                    cells: vec![1, 0, FLIP_HORIZONTAL | 4, 2],
                    ..TileLayer::default()
                },
                TileLayer {
                    name: "roof".into(),
                    width: 2,
                    height: 2,
                    visible: true,
                    properties: [("isOverlay".to_string(), "1".to_string())].into(),
                    cells: vec![3, 3, 3, 3],
                },
            ],
            ..TileMap::default()
        }
    }

    #[test]
    fn draws_each_pass_separately() {
        let mut env = Env::default();
        let map = Map::from_tilemap(&mut env, "demo", tilemap()).unwrap();
        let mut canvas = RecordingCanvas::new();
        assert_eq!(map.draw_tiles(&mut canvas, &Frustum::unbounded(), Color::WHITE, false), 3);
        assert_eq!(map.draw_tiles(&mut canvas, &Frustum::unbounded(), Color::WHITE, true), 4);

        match &canvas.commands[1] {
            DrawCommand::Texture { src, dst, .. } => {
                assert_eq!(*src, RectF::new(16.0, 16.0, -16.0, 16.0));
                assert_eq!((dst.x, dst.y), (8.0, 24.0));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cells_outside_the_frustum_are_culled() {
        let mut env = Env::default();
        let map = Map::from_tilemap(&mut env, "demo", tilemap()).unwrap();
        let mut canvas = RecordingCanvas::new();
        let frustum = Frustum::new(Vec2::new(-300.0, -300.0), 1.0, Vec2::new(64.0, 64.0));
        assert_eq!(map.draw_tiles(&mut canvas, &frustum, Color::WHITE, false), 0);
    }

    #[test]
    fn malformed_colours_fall_back_instead_of_failing_the_load() {
        let mut env = Env::default();
        let mut map = tilemap();
        map.properties.insert("skyColor".into(), "#a\u{e9}12345".into());
        map.objects.push(ObjectMeta {
            name: "lamp".into(),
            class: "target".into(),
            properties: [
                ("color".to_string(), "#a\u{e9}12345".to_string()),
                ("tint".to_string(), "#12".to_string()),
            ]
            .into(),
            ..ObjectMeta::default()
        });

        let map = Map::from_tilemap(&mut env, "demo", map).unwrap();
        assert_eq!(map.weather.sky_color(), Color::WHITE);
        let (lamp, _) = map.world.find_object("lamp").unwrap();
        let lamp = map.world.get(lamp).unwrap();
        assert_eq!(lamp.color, None);
        assert_eq!(lamp.tint, Color::WHITE);
    }
}
