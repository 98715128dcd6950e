use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use roxmltree::{Document, Node};

use super::template::Template;
use super::tileset::{attr_u32, join_asset_path, parent_dir, Tileset};
use crate::assets::AssetStore;
use crate::world::ObjectMeta;

/// One grid layer of raw cell values (gid plus flip bits, 0 = empty).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TileLayer {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub visible: bool,
    pub properties: BTreeMap<String, String>,
    pub cells: Vec<u32>,
}

impl TileLayer {
    /// Overlay layers are drawn after the objects.
    pub fn is_overlay(&self) -> bool {
        self.properties.get("isOverlay").map(String::as_str) == Some("1")
    }
}

/// Parsed `.tmx` document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TileMap {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub properties: BTreeMap<String, String>,
    /// Ordered by first gid.
    pub tilesets: Vec<Arc<Tileset>>,
    pub layers: Vec<TileLayer>,
    /// Object records from every object group, templates already merged.
    pub objects: Vec<ObjectMeta>,
}

impl TileMap {
    /// Loads `map/<name>/<name>.tmx` with its external tilesets and templates.
    pub fn load(assets: &AssetStore, name: &str) -> Result<Self> {
        let path = format!("map/{name}/{name}.tmx");
        let xml = assets
            .read_string(&path)
            .with_context(|| format!("map {name} could not be loaded"))?;
        Self::parse(assets, &xml, &format!("map/{name}"))
            .with_context(|| format!("map {name} could not be parsed"))
    }

    /// Parses a map document located in the asset directory `dir`.
    pub fn parse(assets: &AssetStore, xml: &str, dir: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid map XML")?;
        let root = document.root_element();
        if !root.has_tag_name("map") {
            bail!("expected <map>, found <{}>", root.tag_name().name());
        }
        if root.attribute("infinite") == Some("1") {
            bail!("infinite maps are not supported");
        }

        let mut loader = Loader {
            assets,
            dir,
            tilesets: HashMap::new(),
            templates: HashMap::new(),
        };
        let mut map = TileMap {
            width: attr_u32(&root, "width")?,
            height: attr_u32(&root, "height")?,
            tile_width: attr_u32(&root, "tilewidth")?,
            tile_height: attr_u32(&root, "tileheight")?,
            properties: parse_properties(&root),
            ..TileMap::default()
        };

        for node in root.children().filter(|n| n.has_tag_name("tileset")) {
            let first_gid = attr_u32(&node, "firstgid")?;
            let tileset = match node.attribute("source") {
                Some(source) => loader.tileset(dir, source, first_gid)?,
                None => Arc::new(Tileset::from_node(&node, first_gid, dir)?),
            };
            map.tilesets.push(tileset);
        }
        map.tilesets.sort_by_key(|tileset| tileset.first_gid);

        collect_layers(&root, &mut loader, &mut map)?;
        Ok(map)
    }

    /// World-space top-left corner of the cell at `index`.
    pub fn position_from_index(&self, index: usize) -> (f32, f32) {
        let width = self.width.max(1) as usize;
        (
            (index % width) as f32 * self.tile_width as f32,
            (index / width) as f32 * self.tile_height as f32,
        )
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

struct Loader<'a> {
    assets: &'a AssetStore,
    dir: &'a str,
    tilesets: HashMap<(String, u32), Arc<Tileset>>,
    templates: HashMap<String, Arc<Template>>,
}

impl Loader<'_> {
    fn tileset(&mut self, dir: &str, source: &str, first_gid: u32) -> Result<Arc<Tileset>> {
        let path = join_asset_path(dir, source);
        if let Some(tileset) = self.tilesets.get(&(path.clone(), first_gid)) {
            return Ok(Arc::clone(tileset));
        }
        let xml = self
            .assets
            .read_string(&path)
            .with_context(|| format!("tileset {path} could not be loaded"))?;
        let tileset = Arc::new(
            Tileset::from_tsx(&xml, first_gid, parent_dir(&path))
                .with_context(|| format!("tileset {path} could not be parsed"))?,
        );
        self.tilesets
            .insert((path, first_gid), Arc::clone(&tileset));
        Ok(tileset)
    }

    fn apply_template(&mut self, meta: &mut ObjectMeta) -> Result<()> {
        let path = join_asset_path(self.dir, &meta.template);
        let template = match self.templates.get(&path) {
            Some(template) => Arc::clone(template),
            None => {
                let xml = self
                    .assets
                    .read_string(&path)
                    .with_context(|| format!("template {path} could not be loaded"))?;
                let template = Arc::new(
                    Template::from_xml(&xml)
                        .with_context(|| format!("template {path} could not be parsed"))?,
                );
                self.templates.insert(path.clone(), Arc::clone(&template));
                template
            }
        };
        let tileset = match &template.tileset_ref {
            Some((first_gid, source)) => Some(self.tileset(parent_dir(&path), source, *first_gid)?),
            None => None,
        };
        template.apply(meta, tileset);
        Ok(())
    }
}

fn collect_layers(parent: &Node<'_, '_>, loader: &mut Loader<'_>, map: &mut TileMap) -> Result<()> {
    for node in parent.children().filter(Node::is_element) {
        match node.tag_name().name() {
            "layer" => map.layers.push(parse_layer(&node, map.width, map.height)?),
            "objectgroup" => {
                for object in node.children().filter(|n| n.has_tag_name("object")) {
                    let mut meta = parse_object(&object)?;
                    if !meta.template.is_empty() {
                        loader.apply_template(&mut meta)?;
                    }
                    map.objects.push(meta);
                }
            }
            "group" => collect_layers(&node, loader, map)?,
            _ => {}
        }
    }
    Ok(())
}

fn parse_layer(node: &Node<'_, '_>, map_width: u32, map_height: u32) -> Result<TileLayer> {
    let name = node.attribute("name").unwrap_or_default().to_string();
    let width = attr_u32(node, "width").unwrap_or(map_width);
    let height = attr_u32(node, "height").unwrap_or(map_height);
    let data = node
        .children()
        .find(|child| child.has_tag_name("data"))
        .ok_or_else(|| anyhow!("layer '{name}' has no <data>"))?;
    let cells = parse_data(&data).with_context(|| format!("layer '{name}'"))?;
    let expected = width
        .checked_mul(height)
        .and_then(|cells| usize::try_from(cells).ok())
        .ok_or_else(|| anyhow!("layer '{name}' is too large ({width}x{height})"))?;
    if cells.len() != expected {
        bail!(
            "layer '{name}' has {} cells, expected {expected}",
            cells.len()
        );
    }
    Ok(TileLayer {
        visible: node.attribute("visible") != Some("0"),
        properties: parse_properties(node),
        name,
        width,
        height,
        cells,
    })
}

fn parse_data(data: &Node<'_, '_>) -> Result<Vec<u32>> {
    let text = data.text().unwrap_or_default().trim();
    match (data.attribute("encoding"), data.attribute("compression")) {
        (_, Some(compression)) => bail!("unsupported layer compression '{compression}'"),
        (Some("csv"), None) => text
            .split(',')
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .map(|cell| {
                cell.parse::<u32>()
                    .with_context(|| format!("invalid cell value '{cell}'"))
            })
            .collect(),
        (Some("base64"), None) => {
            let bytes = STANDARD
                .decode(text.split_whitespace().collect::<String>())
                .context("invalid base64 layer data")?;
            if bytes.len() % 4 != 0 {
                bail!("base64 layer data is not a multiple of 4 bytes");
            }
            Ok(bytes
                .chunks_exact(4)
                .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect())
        }
        (None, None) => data
            .children()
            .filter(|n| n.has_tag_name("tile"))
            .map(|tile| match tile.attribute("gid") {
                Some(gid) => gid
                    .parse::<u32>()
                    .with_context(|| format!("invalid tile gid '{gid}'")),
                None => Ok(0),
            })
            .collect(),
        (Some(other), None) => bail!("unsupported layer encoding '{other}'"),
    }
}

/// Reads an `<object>` element into a record. Accepts both the `type` and
/// the newer `class` attribute for the class tag.
pub(crate) fn parse_object(node: &Node<'_, '_>) -> Result<ObjectMeta> {
    let number = |name: &str| -> Result<f32> {
        match node.attribute(name) {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| format!("invalid object '{name}' value '{value}'")),
            None => Ok(0.0),
        }
    };
    let gid = match node.attribute("gid") {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("invalid object gid '{value}'"))?,
        None => 0,
    };
    Ok(ObjectMeta {
        name: node.attribute("name").unwrap_or_default().to_string(),
        class: node
            .attribute("type")
            .or_else(|| node.attribute("class"))
            .unwrap_or_default()
            .to_string(),
        x: number("x")?,
        y: number("y")?,
        width: number("width")?,
        height: number("height")?,
        rotation: number("rotation")?,
        gid,
        template: node.attribute("template").unwrap_or_default().to_string(),
        properties: parse_properties(node),
        tileset: None,
    })
}

/// Collects `<properties>` of an element. Multi-line values are stored as
/// element text instead of the `value` attribute.
pub(crate) fn parse_properties(node: &Node<'_, '_>) -> BTreeMap<String, String> {
    node.children()
        .filter(|child| child.has_tag_name("properties"))
        .flat_map(|properties| properties.children())
        .filter(|property| property.has_tag_name("property"))
        .filter_map(|property| {
            let name = property.attribute("name")?;
            let value = property
                .attribute("value")
                .or_else(|| property.text())
                .unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}
