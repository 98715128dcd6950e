//! World runtime for 2D tile-based games.
//!
//! The crate owns everything between the map files on disk and the host's
//! drawing calls: the object arena and its update ordering, the built-in
//! object classes, collision, the quest scripting VM and save slots.
//! Windowing and the GPU stay outside of the crate; hosts implement
//! [`render::Canvas`] and feed [`input::InputState`], which keeps the whole
//! simulation testable and easy to run headless.

pub mod assets;
pub mod classes;
pub mod config;
pub mod dialogue;
pub mod engine;
pub mod env;
pub mod error;
pub mod events;
pub mod input;
pub mod map;
pub mod math;
pub mod notifications;
pub mod profiler;
pub mod quest;
pub mod render;
pub mod runtime;
pub mod save;
pub mod sprite;
pub mod weather;
pub mod world;

pub use assets::AssetStore;
pub use config::EngineConfig;
pub use engine::Engine;
pub use env::Env;
pub use error::EngineError;
pub use events::{Event, EventQueue};
pub use input::{InputState, KeyCode, MouseButton, NamedKey};
pub use map::{Map, TileMap};
pub use quest::{QuestError, QuestManager};
pub use render::{Canvas, CameraView, Frustum, RecordingCanvas};
pub use runtime::{DefaultMode, GameMode, Runtime};
pub use save::{GameState, SaveBlockers, SaveStore};
pub use world::{Object, ObjectBehavior, ObjectId, ObjectMeta, World};
