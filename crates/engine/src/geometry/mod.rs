mod index;
mod tmx;

pub use index::{MapGeometryIndex, Poi, PoiId, Rect, Rectangle, WALKABLE_CLASS_ID};
pub use tmx::{parse_tmx_rectangles, TmxMapSource};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Supplies the authored rectangles of a map. The index is built once from
/// whatever a source returns; the source is not consulted again.
pub trait GeometrySource {
    fn load_rectangles(&self) -> Result<Vec<Rectangle>, MapLoadError>;
}

/// Already-materialized geometry, used for tests and built-in maps.
#[derive(Debug, Clone, Default)]
pub struct StaticGeometrySource {
    rectangles: Vec<Rectangle>,
}

impl StaticGeometrySource {
    pub fn new(rectangles: Vec<Rectangle>) -> Self {
        Self { rectangles }
    }
}

impl GeometrySource for StaticGeometrySource {
    fn load_rectangles(&self) -> Result<Vec<Rectangle>, MapLoadError> {
        Ok(self.rectangles.clone())
    }
}

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("failed to read map file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed map XML in {path} (line {line}, column {column}): {message}")]
    Xml {
        path: PathBuf,
        line: u32,
        column: u32,
        message: String,
    },
    #[error("map root element must be <map>, found <{found}> in {path}")]
    InvalidRoot { path: PathBuf, found: String },
    #[error("map contains no walkable area (class id {})", WALKABLE_CLASS_ID)]
    NoWalkableArea,
}
