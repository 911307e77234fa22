#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod document;
pub mod element;
pub mod error;
pub mod filters;
pub mod geometry;
pub mod groups;
pub mod history;
pub mod id;
pub mod input;
pub mod navigation;
pub mod persistence;
pub mod platform;
pub mod renderer;
pub mod scene;
pub mod selection;
pub mod textures;
pub mod tooltip;
pub mod tree;
pub mod viewport;

pub use app::BoardApp;
pub use document::Canvas;
pub use element::{Element, ElementKind};
pub use error::BoardError;
pub use filters::{FilterEditor, FilterKey, FilterStack};
pub use history::History;
pub use input::{InputEvent, InteractionController, InteractionState};
pub use navigation::Navigator;
pub use persistence::{AutoSaver, LocalStore, MemoryStore, Store};
pub use renderer::Renderer;
pub use scene::{Scene, SceneChange};
pub use selection::{SelectMode, Selection};
pub use tree::TreeData;
pub use viewport::{ViewBox, Viewport};
