pub mod color;
pub mod engine;
pub mod game;
pub mod geom;

pub use color::Color;
pub use engine::core::{Backend, DialogMode, EngineConfig};
pub use engine::error::EngineError;
pub use engine::{launch, Engine};
pub use game::{Context, Game};
pub use geom::{Point, Rect, Shape};
