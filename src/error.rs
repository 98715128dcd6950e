use thiserror::Error;

/// Errors raised by the world runtime.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown object class '{class}' for object '{name}'")]
    UnknownClass { name: String, class: String },
    #[error("object '{0}' depends on itself")]
    SelfDependency(String),
    #[error("dependency cycle detected: {}", .path.join(" -> "))]
    DependencyCycle { path: Vec<String> },
    #[error("asset '{0}' could not be found")]
    MissingAsset(String),
    #[error("map data is malformed: {0}")]
    MalformedMap(String),
    #[error("saving is currently blocked (state mask {0:#x})")]
    SaveRefused(u32),
    #[error("save slot {0} is out of range")]
    BadSlot(usize),
    #[error("save slot {0} is empty")]
    EmptySlot(usize),
    #[error("map '{0}' is not loaded")]
    MapNotLoaded(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Whether the error should stop the simulation loop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DependencyCycle { .. } | Self::SelfDependency(_) | Self::UnknownClass { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_error_names_every_object_on_the_path() {
        let err = EngineError::DependencyCycle {
            path: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle detected: A -> B -> A");
        assert!(err.is_fatal());
    }
}
