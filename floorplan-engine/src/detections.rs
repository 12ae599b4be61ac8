use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::BBox;
use crate::scale::Calibration;
use crate::walls::WallSegment;

/// Classes emitted by the external symbol detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolClass {
    Wall,
    DoorSwing,
    DoorSliding,
    DoorEntrance,
    Window,
    Column,
    Toilet,
    Bathtub,
    Sink,
    KitchenSink,
    Stairs,
    Elevator,
    DimensionLine,
}

/// Output list a detection is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Door,
    Window,
    Fixture,
    /// Structural or annotation classes already covered by the engine
    Ignored,
}

impl SymbolClass {
    pub fn placement(&self) -> Placement {
        match self {
            SymbolClass::DoorSwing | SymbolClass::DoorSliding | SymbolClass::DoorEntrance => Placement::Door,
            SymbolClass::Window => Placement::Window,
            SymbolClass::Column
            | SymbolClass::Toilet
            | SymbolClass::Bathtub
            | SymbolClass::Sink
            | SymbolClass::KitchenSink
            | SymbolClass::Stairs
            | SymbolClass::Elevator => Placement::Fixture,
            SymbolClass::Wall | SymbolClass::DimensionLine => Placement::Ignored,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolClass::Wall => "wall",
            SymbolClass::DoorSwing => "door_swing",
            SymbolClass::DoorSliding => "door_sliding",
            SymbolClass::DoorEntrance => "door_entrance",
            SymbolClass::Window => "window",
            SymbolClass::Column => "column",
            SymbolClass::Toilet => "toilet",
            SymbolClass::Bathtub => "bathtub",
            SymbolClass::Sink => "sink",
            SymbolClass::KitchenSink => "kitchen_sink",
            SymbolClass::Stairs => "stairs",
            SymbolClass::Elevator => "elevator",
            SymbolClass::DimensionLine => "dimension_line",
        }
    }
}

/// A detector hit in source coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: SymbolClass,
    pub bbox: BBox,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedDetection {
    pub class: SymbolClass,
    pub bbox: BBox,
    pub real_bbox: BBox,
    pub confidence: f64,
    /// Nearest wall for doors and windows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_wall: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacedDetections {
    pub doors: Vec<PlacedDetection>,
    pub windows: Vec<PlacedDetection>,
    pub fixtures: Vec<PlacedDetection>,
    pub ignored: usize,
}

fn nearest_wall(real_bbox: &BBox, walls: &[WallSegment]) -> Option<String> {
    let center = real_bbox.center();
    walls
        .iter()
        .min_by(|a, b| a.midpoint().distance_to(&center).total_cmp(&b.midpoint().distance_to(&center)))
        .map(|w| w.id.clone())
}

/// Route detections into doors, windows and fixtures without changing
/// their class.
pub fn place_detections(detections: &[Detection], walls: &[WallSegment], calibration: &Calibration) -> PlacedDetections {
    let mut placed = PlacedDetections::default();

    for det in detections {
        let real_bbox = calibration.to_real_bbox(&det.bbox);
        let placement = det.class.placement();
        let host_wall = match placement {
            Placement::Door | Placement::Window => nearest_wall(&real_bbox, walls),
            Placement::Fixture | Placement::Ignored => None,
        };
        let item = PlacedDetection {
            class: det.class,
            bbox: det.bbox,
            real_bbox,
            confidence: det.confidence,
            host_wall,
        };
        match placement {
            Placement::Door => placed.doors.push(item),
            Placement::Window => placed.windows.push(item),
            Placement::Fixture => placed.fixtures.push(item),
            Placement::Ignored => {
                debug!("Ignoring {} detection", det.class.as_str());
                placed.ignored += 1;
            }
        }
    }

    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::scale::{ScaleFactor, ScaleSource};

    fn calibration() -> Calibration {
        Calibration {
            scale: ScaleFactor::bounded(0.01, 0.00005, 0.1),
            source: ScaleSource::Default,
            samples: 0,
            origin: Point::new(0.0, 0.0),
            extent: BBox::new(0.0, 0.0, 1000.0, 1000.0),
        }
    }

    fn create_detection(class: SymbolClass, x: f64, y: f64) -> Detection {
        Detection { class, bbox: BBox::new(x, y, x + 20.0, y + 20.0), confidence: 0.9 }
    }

    fn create_wall(id: &str, x1: f64, y1: f64, x2: f64, y2: f64) -> WallSegment {
        let mut wall = WallSegment::new(Point::new(x1, y1), Point::new(x2, y2), 0.2, false, 10.0);
        wall.id = id.to_string();
        wall
    }

    #[test]
    fn test_routing_by_class() {
        let detections = vec![
            create_detection(SymbolClass::DoorSwing, 0.0, 0.0),
            create_detection(SymbolClass::DoorSliding, 100.0, 0.0),
            create_detection(SymbolClass::Window, 200.0, 0.0),
            create_detection(SymbolClass::Toilet, 300.0, 0.0),
            create_detection(SymbolClass::KitchenSink, 400.0, 0.0),
            create_detection(SymbolClass::Wall, 500.0, 0.0),
            create_detection(SymbolClass::DimensionLine, 600.0, 0.0),
        ];
        let placed = place_detections(&detections, &[], &calibration());

        assert_eq!(placed.doors.len(), 2);
        assert_eq!(placed.windows.len(), 1);
        assert_eq!(placed.fixtures.len(), 2);
        assert_eq!(placed.ignored, 2);
        assert_eq!(placed.doors[1].class, SymbolClass::DoorSliding);
        assert_eq!(placed.fixtures[1].class, SymbolClass::KitchenSink);
    }

    #[test]
    fn test_host_wall_for_openings_only() {
        let walls = vec![
            create_wall("wall-0", 0.0, 0.0, 4.0, 0.0),
            create_wall("wall-1", 0.0, 5.0, 4.0, 5.0),
        ];
        let detections = vec![
            create_detection(SymbolClass::Window, 190.0, 480.0),
            create_detection(SymbolClass::Sink, 190.0, 480.0),
        ];
        let placed = place_detections(&detections, &walls, &calibration());

        assert_eq!(placed.windows[0].host_wall.as_deref(), Some("wall-1"));
        assert!(placed.fixtures[0].host_wall.is_none());
        let real = placed.windows[0].real_bbox;
        assert!((real.min_x - 1.9).abs() < 1e-9);
        assert!((real.width() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_class_names_round_trip_through_serde() {
        let json = serde_json::to_string(&SymbolClass::KitchenSink).unwrap();
        assert_eq!(json, format!("\"{}\"", SymbolClass::KitchenSink.as_str()));
        let parsed: SymbolClass = serde_json::from_str("\"door_entrance\"").unwrap();
        assert_eq!(parsed.placement(), Placement::Door);
    }
}
