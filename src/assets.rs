use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;

use crate::dialogue::Dialogue;
use crate::error::EngineError;
use crate::sprite::SpriteSheet;

/// Lazily populated caches for files, sprite sheets and dialogues.
///
/// Entries are loaded on first access and kept until the store is dropped.
/// Cloning the store shares the caches.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: Arc<PathBuf>,
    files: Arc<RwLock<HashMap<String, Arc<[u8]>>>>,
    sprites: Arc<RwLock<HashMap<String, Arc<SpriteSheet>>>>,
    dialogues: Arc<RwLock<HashMap<String, Arc<Dialogue>>>>,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
            files: Arc::new(RwLock::new(HashMap::new())),
            sprites: Arc::new(RwLock::new(HashMap::new())),
            dialogues: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Seeds the file cache; used for embedded assets and tests.
    pub fn insert_file(&self, path: &str, data: impl Into<Vec<u8>>) {
        let data: Vec<u8> = data.into();
        self.files
            .write()
            .insert(normalize(path), Arc::from(data.into_boxed_slice()));
    }

    pub fn exists(&self, path: &str) -> bool {
        let key = normalize(path);
        self.files.read().contains_key(&key) || self.root.join(&key).is_file()
    }

    /// Reads a file relative to the asset root.
    pub fn read(&self, path: &str) -> Result<Arc<[u8]>, EngineError> {
        let key = normalize(path);
        if let Some(data) = self.files.read().get(&key) {
            return Ok(Arc::clone(data));
        }
        let full = self.root.join(&key);
        if !full.is_file() {
            return Err(EngineError::MissingAsset(key));
        }
        let data: Arc<[u8]> = Arc::from(fs::read(&full)?.into_boxed_slice());
        self.files.write().insert(key, Arc::clone(&data));
        Ok(data)
    }

    pub fn read_string(&self, path: &str) -> Result<String> {
        let data = self.read(path)?;
        String::from_utf8(data.to_vec()).with_context(|| format!("{path} is not valid UTF-8"))
    }

    /// Reads a file that belongs to `map`, falling back to the asset root.
    pub fn read_map_file(&self, map: &str, path: &str) -> Result<String> {
        let local = format!("map/{map}/{path}");
        if self.exists(&local) {
            return self.read_string(&local);
        }
        self.read_string(path)
    }

    /// Sprite sheet stored at `<name>.json`.
    pub fn sprite_sheet(&self, name: &str) -> Result<Arc<SpriteSheet>> {
        if let Some(sheet) = self.sprites.read().get(name) {
            return Ok(Arc::clone(sheet));
        }
        let text = self.read_string(&format!("{name}.json"))?;
        let sheet = Arc::new(
            SpriteSheet::from_json(&text).with_context(|| format!("sprite sheet {name}"))?,
        );
        self.sprites
            .write()
            .insert(name.to_string(), Arc::clone(&sheet));
        Ok(sheet)
    }

    /// Dialogue tree stored under `texts/` of `map` (or of the asset root).
    pub fn dialogue(&self, map: &str, name: &str) -> Result<Arc<Dialogue>> {
        let key = format!("{map}/{name}");
        if let Some(dialogue) = self.dialogues.read().get(&key) {
            return Ok(Arc::clone(dialogue));
        }
        let text = self.read_map_file(map, &format!("texts/{name}"))?;
        let dialogue =
            Arc::new(Dialogue::from_json(&text).with_context(|| format!("dialogue {name}"))?);
        self.dialogues.write().insert(key, Arc::clone(&dialogue));
        Ok(dialogue)
    }
}

impl Default for AssetStore {
    fn default() -> Self {
        Self::new("assets")
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches("./").to_string()
}
