use anyhow::Result;
use image::GrayImage;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::classifier::classify_lines;
use crate::config::EngineConfig;
use crate::contour_rooms::rooms_from_mask;
use crate::detections::{place_detections, Detection};
use crate::model::{build_model, FloorPlanModel, RoomStrategy, StageOutputs};
use crate::primitives::PrimitiveSet;
use crate::rooms::{reconcile_areas, resolve_master_bed, rooms_from_text, RoomSpace};
use crate::scale::resolve_scale;
use crate::walls::synthesize_walls;

/// Everything the caller knows about one document page or image.
#[derive(Debug, Clone)]
pub struct PlanInput {
    pub primitives: PrimitiveSet,
    /// Passed through to doors, windows and fixtures
    pub detections: Vec<Detection>,
    /// Known total floor area in square meters
    pub known_area: Option<f64>,
    /// Binarized wall mask (walls nonzero) in the primitives' pixel frame
    pub wall_mask: Option<GrayImage>,
}

impl PlanInput {
    pub fn new(primitives: PrimitiveSet) -> Self {
        Self { primitives, detections: Vec::new(), known_area: None, wall_mask: None }
    }

    pub fn with_detections(mut self, detections: Vec<Detection>) -> Self {
        self.detections = detections;
        self
    }

    pub fn with_known_area(mut self, area: f64) -> Self {
        self.known_area = Some(area);
        self
    }

    pub fn with_wall_mask(mut self, mask: GrayImage) -> Self {
        self.wall_mask = Some(mask);
        self
    }

    /// Contour rooms when a wall mask is available, text-anchored otherwise.
    pub fn room_strategy(&self) -> RoomStrategy {
        match self.wall_mask {
            Some(_) => RoomStrategy::Contour,
            None => RoomStrategy::TextAnchored,
        }
    }
}

/// Runs classification, scale resolution, wall and room synthesis in order
/// and assembles the model. Holds no state between calls.
pub struct FloorPlanEngine {
    config: EngineConfig,
}

impl FloorPlanEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    pub fn from_config_file(path: &Path) -> Result<Self> {
        Ok(Self::new(EngineConfig::from_json_file(path)?))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn reconstruct(&self, input: &PlanInput) -> FloorPlanModel {
        let cfg = &self.config;
        let primitives = &input.primitives;
        let mut timings = Vec::new();
        info!(
            "Reconstructing {:?} plan: {} lines, {} rects, {} texts ({} skipped)",
            primitives.source,
            primitives.lines.len(),
            primitives.rects.len(),
            primitives.texts.len(),
            primitives.skipped
        );

        let start = Instant::now();
        let classification = classify_lines(primitives, &cfg.classifier);
        timings.push(("classify".to_string(), start.elapsed().as_millis()));

        let start = Instant::now();
        let calibration =
            resolve_scale(&classification.lines, primitives, input.known_area, &cfg.classifier, &cfg.scale);
        timings.push(("scale".to_string(), start.elapsed().as_millis()));

        let start = Instant::now();
        let walls = synthesize_walls(&classification.lines, &calibration, &cfg.classifier, &cfg.walls);
        timings.push(("walls".to_string(), start.elapsed().as_millis()));

        let start = Instant::now();
        let strategy = input.room_strategy();
        let mut rooms = match &input.wall_mask {
            Some(mask) => rooms_from_mask(mask, &primitives.texts, &calibration, &cfg.rooms),
            None => rooms_from_text(&primitives.texts, &walls.walls, &calibration, &cfg.rooms),
        };
        let total_area = finish_rooms(&mut rooms, input.known_area, &cfg.rooms.master_bed_label);
        timings.push(("rooms".to_string(), start.elapsed().as_millis()));

        let detections = place_detections(&input.detections, &walls.walls, &calibration);
        debug!(
            "Placed {} doors, {} windows, {} fixtures",
            detections.doors.len(),
            detections.windows.len(),
            detections.fixtures.len()
        );

        let mut model = build_model(
            StageOutputs {
                primitives,
                classification: &classification,
                calibration,
                walls,
                rooms,
                total_area,
                strategy,
                detections,
            },
            &cfg.classifier,
        );
        model.stats.stage_timings = timings;
        model
    }
}

/// Master-bedroom resolution, positive-area filter and area reconciliation.
fn finish_rooms(rooms: &mut Vec<RoomSpace>, known_area: Option<f64>, master_label: &str) -> f64 {
    rooms.retain(|r| r.area.is_finite() && r.area > 0.0);
    resolve_master_bed(rooms, master_label);
    for (i, room) in rooms.iter_mut().enumerate() {
        room.id = format!("room-{}", i);
    }
    reconcile_areas(rooms, known_area)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BBox, Point};
    use crate::primitives::{FrameSize, Line, SourceKind, TextAnchor};
    use crate::rooms::RoomGeometry;
    use crate::taxonomy::RoomTaxonomy;

    fn create_room(room_type: RoomTaxonomy, area: f64) -> RoomSpace {
        RoomSpace {
            id: String::new(),
            room_type,
            name: room_type.as_str().to_string(),
            area,
            geometry: RoomGeometry::Rect { bbox: BBox::new(0.0, 0.0, 1.0, area) },
        }
    }

    #[test]
    fn test_finish_rooms_filters_and_renumbers() {
        let mut rooms = vec![
            create_room(RoomTaxonomy::Bed, 9.0),
            create_room(RoomTaxonomy::Living, 0.0),
            create_room(RoomTaxonomy::Bed, 12.5),
        ];
        let total = finish_rooms(&mut rooms, None, "안방");

        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[1].id, "room-1");
        assert_eq!(rooms[1].room_type, RoomTaxonomy::MasterBed);
        assert_eq!(rooms[1].name, "안방");
        assert!((total - 21.5).abs() < 1e-9);
    }

    #[test]
    fn test_strategy_follows_mask() {
        let set = PrimitiveSet::new(SourceKind::Raster, FrameSize { width: 10.0, height: 10.0 });
        let input = PlanInput::new(set);
        assert_eq!(input.room_strategy(), RoomStrategy::TextAnchored);
        let input = input.with_wall_mask(GrayImage::new(10, 10));
        assert_eq!(input.room_strategy(), RoomStrategy::Contour);
    }

    #[test]
    fn test_empty_input_never_fails() {
        let set = PrimitiveSet::new(SourceKind::Vector, FrameSize { width: 595.0, height: 842.0 });
        let model = FloorPlanEngine::with_defaults().reconstruct(&PlanInput::new(set));

        assert!(model.walls.is_empty());
        assert!(model.rooms.is_empty());
        assert_eq!(model.confidence, 0.3);
        assert_eq!(model.warnings.len(), 2);
        assert_eq!(model.total_area, 0.0);
        assert_eq!(model.stats.stage_timings.len(), 4);
    }

    #[test]
    fn test_engine_from_config_file() {
        let path = std::env::temp_dir().join(format!("floorplan-engine-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "walls": { "max_pair_gap": 18.0 }, "rooms": { "master_bed_label": "Master" } }"#)
            .unwrap();
        let engine = FloorPlanEngine::from_config_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(engine.config().walls.max_pair_gap, 18.0);
        assert_eq!(engine.config().rooms.master_bed_label, "Master");
        assert!(FloorPlanEngine::from_config_file(&path).is_err());
    }

    #[test]
    fn test_labels_without_walls_still_produce_rooms() {
        let mut set = PrimitiveSet::new(SourceKind::Vector, FrameSize { width: 595.0, height: 842.0 });
        set.push_line(Line::new(Point::new(0.0, 0.0), Point::new(2.0, 0.0), 0.5));
        set.push_text(TextAnchor::new("거실", Point::new(100.0, 100.0), 10.0));
        set.push_text(TextAnchor::new("주방", Point::new(300.0, 100.0), 10.0));
        let model = FloorPlanEngine::with_defaults().reconstruct(&PlanInput::new(set).with_known_area(84.0));

        assert!(model.walls.is_empty());
        assert_eq!(model.rooms.len(), 2);
        assert_eq!(model.confidence, 0.3);
        assert_eq!(model.total_area, 84.0);
        let sum: f64 = model.rooms.iter().map(|r| r.area).sum();
        assert!((sum - 84.0).abs() < 1e-9);
    }
}
