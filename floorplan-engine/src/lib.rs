//! Floor-plan reconstruction from raw drawing primitives.
//!
//! Lines, rectangles and text anchors extracted from a CAD/PDF page or a
//! raster image are classified, scaled to meters and merged into walls and
//! labeled rooms. See [`FloorPlanEngine::reconstruct`].

pub mod classifier;
pub mod config;
pub mod contour_rooms;
pub mod detections;
pub mod geometry;
pub mod model;
pub mod pipeline;
pub mod primitives;
pub mod rooms;
pub mod scale;
pub mod taxonomy;
pub mod text;
pub mod walls;

pub use classifier::{Category, ClassifiedLine};
pub use config::EngineConfig;
pub use detections::{Detection, SymbolClass};
pub use geometry::{BBox, Point};
pub use model::{FloorPlanModel, RoomStrategy};
pub use pipeline::{FloorPlanEngine, PlanInput};
pub use primitives::{FrameSize, Line, PathItem, PrimitiveSet, RasterSegment, SourceKind, TextAnchor};
pub use rooms::{RoomGeometry, RoomSpace};
pub use scale::ScaleFactor;
pub use taxonomy::RoomTaxonomy;
pub use text::TextCategory;
pub use walls::{Orientation, WallSegment};
