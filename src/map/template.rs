use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use roxmltree::Document;

use super::tileset::Tileset;
use super::tmx::parse_object;
use crate::world::ObjectMeta;

/// Reusable object record from a `.tx` document.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub object: ObjectMeta,
    /// First gid and external source of the template's own tileset.
    pub tileset_ref: Option<(u32, String)>,
}

impl Template {
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid template XML")?;
        let root = document.root_element();
        if !root.has_tag_name("template") {
            return Err(anyhow!("expected <template>, found <{}>", root.tag_name().name()));
        }
        let object = root
            .children()
            .find(|child| child.has_tag_name("object"))
            .ok_or_else(|| anyhow!("template has no <object>"))?;
        let tileset_ref = root
            .children()
            .find(|child| child.has_tag_name("tileset"))
            .and_then(|node| {
                let first_gid = node.attribute("firstgid")?.parse().ok()?;
                Some((first_gid, node.attribute("source")?.to_string()))
            });
        Ok(Self {
            object: parse_object(&object)?,
            tileset_ref,
        })
    }

    /// Merges the template into an instance record. Instance properties win;
    /// gid, size, name and class are inherited only when the instance leaves
    /// them unset.
    pub fn apply(&self, meta: &mut ObjectMeta, tileset: Option<Arc<Tileset>>) {
        let base = &self.object;
        for (key, value) in &base.properties {
            meta.properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        if meta.gid == 0 {
            meta.gid = base.gid;
        }
        if meta.width == 0.0 {
            meta.width = base.width;
        }
        if meta.height == 0.0 {
            meta.height = base.height;
        }
        if meta.name.is_empty() {
            meta.name = base.name.clone();
        }
        if meta.class.is_empty() {
            meta.class = base.class.clone();
        }
        if tileset.is_some() {
            meta.tileset = tileset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<template>
 <tileset firstgid="1" source="../props.tsx"/>
 <object name="chest" type="anim" gid="5" width="16" height="24">
  <properties>
   <property name="file" value="gfx/chest"/>
   <property name="tag" value="closed"/>
  </properties>
 </object>
</template>"#;

    #[test]
    fn instance_properties_win() {
        let template = Template::from_xml(TX).unwrap();
        assert_eq!(template.tileset_ref, Some((1, "../props.tsx".to_string())));

        let mut meta = ObjectMeta::new("chest_2", "").with_property("tag", "open");
        template.apply(&mut meta, None);
        assert_eq!(meta.name, "chest_2");
        assert_eq!(meta.class, "anim");
        assert_eq!(meta.gid, 5);
        assert_eq!((meta.width, meta.height), (16.0, 24.0));
        assert_eq!(meta.property("tag"), Some("open"));
        assert_eq!(meta.property("file"), Some("gfx/chest"));
    }
}
