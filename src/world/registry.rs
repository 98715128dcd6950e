use std::collections::HashMap;

use super::hooks::ObjectBehavior;
use super::object::Object;
use crate::classes;

/// Interned class tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u16);

impl ClassId {
    pub const UNRESOLVED: Self = Self(u16::MAX);
}

/// Builds the behaviour for a freshly created object and may adjust its
/// flags (collidability, shape, size).
pub type ClassCtor = fn(&mut Object) -> Box<dyn ObjectBehavior>;

#[derive(Debug, Clone, Copy)]
struct ClassEntry {
    id: ClassId,
    ctor: ClassCtor,
}

/// Table of class constructors keyed by authored tag.
#[derive(Debug, Clone)]
pub struct ClassRegistry {
    entries: HashMap<String, ClassEntry>,
    tags: Vec<String>,
}

impl ClassRegistry {
    /// Registry without any classes.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            tags: Vec::new(),
        }
    }

    /// Registry holding the built-in classes.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        classes::register_builtins(&mut registry);
        registry
    }

    /// Registers (or replaces) the constructor for `tag`.
    pub fn register(&mut self, tag: &str, ctor: ClassCtor) -> ClassId {
        if let Some(entry) = self.entries.get_mut(tag) {
            entry.ctor = ctor;
            return entry.id;
        }
        let id = ClassId(self.tags.len() as u16);
        self.tags.push(tag.to_string());
        self.entries.insert(tag.to_string(), ClassEntry { id, ctor });
        id
    }

    pub fn lookup(&self, tag: &str) -> Option<(ClassId, ClassCtor)> {
        self.entries.get(tag).map(|entry| (entry.id, entry.ctor))
    }

    pub fn id(&self, tag: &str) -> Option<ClassId> {
        self.entries.get(tag).map(|entry| entry.id)
    }

    pub fn tag(&self, id: ClassId) -> Option<&str> {
        self.tags.get(id.0 as usize).map(String::as_str)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::hooks::Inert;

    fn inert(_: &mut Object) -> Box<dyn ObjectBehavior> {
        Box::new(Inert)
    }

    #[test]
    fn tags_are_interned_once() {
        let mut registry = ClassRegistry::empty();
        let a = registry.register("door", inert);
        let b = registry.register("lever", inert);
        assert_ne!(a, b);
        assert_eq!(registry.register("door", inert), a);
        assert_eq!(registry.tag(b), Some("lever"));
        assert!(registry.lookup("missing").is_none());
    }

    #[test]
    fn builtins_cover_core_tags() {
        let registry = ClassRegistry::with_builtins();
        for tag in [
            "col", "tile", "cam", "wait", "script", "talk", "anim", "area", "target",
        ] {
            assert!(registry.contains(tag), "{tag} missing");
        }
    }
}
