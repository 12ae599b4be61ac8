use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::classifier::{Category, CategoryCounts, Classification, WidthThresholds};
use crate::config::ClassifierConfig;
use crate::detections::{PlacedDetection, PlacedDetections};
use crate::geometry::{BBox, Point};
use crate::primitives::{FrameSize, PrimitiveSet};
use crate::rooms::RoomSpace;
use crate::scale::{Calibration, ScaleFactor, ScaleSource};
use crate::text::{area_value, dimension_value};
use crate::walls::{WallSegment, WallSynthesis};

/// Longest wall lines carried in [`VectorHints`].
pub const MAX_HINT_WALL_LINES: usize = 200;

pub const NO_ROOMS_WARNING: &str =
    "Room names not detected; external visual or label-based room detection recommended";
pub const NO_WALLS_WARNING: &str = "No wall pairs found; check input geometry";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStrategy {
    TextAnchored,
    Contour,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HintLine {
    pub start: Point,
    pub end: Point,
    pub width: f64,
    pub category: Category,
    pub length_real: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionHint {
    pub text: String,
    pub value_mm: u32,
    pub position: Point,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaHint {
    pub text: String,
    /// Square meters
    pub area: f64,
    pub position: Point,
}

/// Source-coordinate geometry handed to downstream consumers that want to
/// refine the model themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorHints {
    pub wall_lines: Vec<HintLine>,
    pub dimension_texts: Vec<DimensionHint>,
    pub area_texts: Vec<AreaHint>,
    pub page_size: FrameSize,
    pub scale: f64,
    pub offset: Point,
}

/// Diagnostics only; nothing in the pipeline reads these back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub total_lines: usize,
    pub total_rects: usize,
    pub total_texts: usize,
    pub skipped_primitives: usize,
    pub classified: CategoryCounts,
    pub width_distribution: BTreeMap<String, usize>,
    pub thresholds: WidthThresholds,
    pub drawing_bounds: Option<BBox>,
    pub walls_paired: usize,
    pub walls_single: usize,
    pub walls_before_dedup: usize,
    pub walls_merged: usize,
    pub wall_fragments_joined: usize,
    pub pairing_truncated: usize,
    pub rooms_detected: usize,
    pub room_strategy: RoomStrategy,
    pub doors_detected: usize,
    pub windows_detected: usize,
    pub fixtures_detected: usize,
    pub detections_ignored: usize,
    pub scale: f64,
    pub scale_source: ScaleSource,
    pub scale_samples: usize,
    /// Source-unit extent the scale was measured over
    pub bbox: BBox,
    /// Per-stage wall-clock time in milliseconds
    pub stage_timings: Vec<(String, u128)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloorPlanModel {
    pub walls: Vec<WallSegment>,
    pub rooms: Vec<RoomSpace>,
    pub doors: Vec<PlacedDetection>,
    pub windows: Vec<PlacedDetection>,
    pub fixtures: Vec<PlacedDetection>,
    pub total_area: f64,
    pub scale: ScaleFactor,
    pub confidence: f64,
    pub warnings: Vec<String>,
    pub stats: Stats,
    pub hints: VectorHints,
}

/// Everything the stages produced for one invocation.
pub struct StageOutputs<'a> {
    pub primitives: &'a PrimitiveSet,
    pub classification: &'a Classification,
    pub calibration: Calibration,
    pub walls: WallSynthesis,
    pub rooms: Vec<RoomSpace>,
    pub total_area: f64,
    pub strategy: RoomStrategy,
    pub detections: PlacedDetections,
}

pub fn model_confidence(has_rooms: bool, has_walls: bool) -> f64 {
    match (has_rooms, has_walls) {
        (true, true) => 0.7,
        (false, true) => 0.5,
        (true, false) | (false, false) => 0.3,
    }
}

fn build_hints(outputs: &StageOutputs<'_>, config: &ClassifierConfig) -> VectorHints {
    let cal = &outputs.calibration;

    let mut wall_lines: Vec<_> = outputs
        .classification
        .lines
        .iter()
        .filter(|cl| {
            cl.category.is_wall()
                && cl.line.length() >= config.min_wall_length
                && cl.line.is_axis_aligned(config.axis_tolerance)
        })
        .collect();
    wall_lines.sort_by(|a, b| b.line.length().total_cmp(&a.line.length()));
    wall_lines.truncate(MAX_HINT_WALL_LINES);

    let texts = &outputs.primitives.texts;
    VectorHints {
        wall_lines: wall_lines
            .into_iter()
            .map(|cl| HintLine {
                start: cl.line.start,
                end: cl.line.end,
                width: cl.line.width,
                category: cl.category,
                length_real: cal.to_real_length(cl.line.length()),
            })
            .collect(),
        dimension_texts: texts
            .iter()
            .filter_map(|t| {
                dimension_value(&t.text).map(|value_mm| DimensionHint {
                    text: t.text.trim().to_string(),
                    value_mm,
                    position: t.position,
                })
            })
            .collect(),
        area_texts: texts
            .iter()
            .filter_map(|t| {
                area_value(&t.text).map(|area| AreaHint { text: t.text.trim().to_string(), area, position: t.position })
            })
            .collect(),
        page_size: outputs.primitives.frame,
        scale: cal.scale.value(),
        offset: cal.origin,
    }
}

/// Assemble the final model, its warnings and diagnostics.
pub fn build_model(outputs: StageOutputs<'_>, config: &ClassifierConfig) -> FloorPlanModel {
    let hints = build_hints(&outputs, config);
    let primitives = outputs.primitives;
    let classification = outputs.classification;
    let cal = outputs.calibration;
    let walls = outputs.walls;
    let rooms = outputs.rooms;
    let detections = outputs.detections;

    let mut warnings = Vec::new();
    if rooms.is_empty() {
        warn!("{}", NO_ROOMS_WARNING);
        warnings.push(NO_ROOMS_WARNING.to_string());
    }
    if walls.walls.is_empty() {
        warn!("{}", NO_WALLS_WARNING);
        warnings.push(NO_WALLS_WARNING.to_string());
    }
    let confidence = model_confidence(!rooms.is_empty(), !walls.walls.is_empty());

    let stats = Stats {
        total_lines: primitives.lines.len(),
        total_rects: primitives.rects.len(),
        total_texts: primitives.texts.len(),
        skipped_primitives: primitives.skipped,
        classified: CategoryCounts::from_lines(&classification.lines),
        width_distribution: primitives
            .width_histogram()
            .into_iter()
            .map(|(w, n)| (format!("{:.3}", w.into_inner()), n))
            .collect(),
        thresholds: classification.thresholds,
        drawing_bounds: classification.drawing_bounds,
        walls_paired: walls.paired,
        walls_single: walls.single,
        walls_before_dedup: walls.before_dedup,
        walls_merged: walls.walls.len(),
        wall_fragments_joined: walls.fragments_merged,
        pairing_truncated: walls.truncated,
        rooms_detected: rooms.len(),
        room_strategy: outputs.strategy,
        doors_detected: detections.doors.len(),
        windows_detected: detections.windows.len(),
        fixtures_detected: detections.fixtures.len(),
        detections_ignored: detections.ignored,
        scale: cal.scale.value(),
        scale_source: cal.source,
        scale_samples: cal.samples,
        bbox: cal.extent,
        stage_timings: Vec::new(),
    };

    info!(
        "Floor plan model: {} walls, {} rooms, {:.2} m² total, confidence {}",
        walls.walls.len(),
        rooms.len(),
        outputs.total_area,
        confidence
    );

    FloorPlanModel {
        walls: walls.walls,
        rooms,
        doors: detections.doors,
        windows: detections.windows,
        fixtures: detections.fixtures,
        total_area: outputs.total_area,
        scale: cal.scale,
        confidence,
        warnings,
        stats,
        hints,
    }
}
