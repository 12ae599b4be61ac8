use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RoomConfig;
use crate::geometry::{BBox, Point};
use crate::primitives::TextAnchor;
use crate::scale::Calibration;
use crate::taxonomy::{match_room_type, RoomTaxonomy};
use crate::text::TextCategory;
use crate::walls::WallSegment;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoomGeometry {
    Polygon { points: Vec<Point> },
    Rect { bbox: BBox },
}

impl RoomGeometry {
    pub fn bbox(&self) -> Option<BBox> {
        match self {
            RoomGeometry::Polygon { points } => BBox::from_points(points),
            RoomGeometry::Rect { bbox } => Some(*bbox),
        }
    }
}

/// A labeled room in real units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSpace {
    pub id: String,
    #[serde(rename = "type")]
    pub room_type: RoomTaxonomy,
    pub name: String,
    /// Square meters
    pub area: f64,
    pub geometry: RoomGeometry,
}

/// Room type for a text anchor, if it names a room.
///
/// Text an upstream recognizer marked as a room name but that matches no
/// pattern becomes `Other`.
pub fn room_type_for(text: &TextAnchor) -> Option<RoomTaxonomy> {
    match match_room_type(&text.text) {
        Some(t) => Some(t),
        None if text.effective_category() == TextCategory::RoomName => Some(RoomTaxonomy::Other),
        None => None,
    }
}

/// Build one room per room-name text, bounded by the walls around its anchor.
///
/// The footprint is always an axis-aligned rectangle: the outermost wall
/// endpoints within `axis_window` of the anchor on each side, or
/// `open_side_extent` from the anchor where a side has none. L-shaped and
/// other non-rectangular rooms are approximated by that rectangle. A label
/// with no walls within `wall_search_radius` gets a square of its type's
/// default area centered on the anchor.
pub fn rooms_from_text(
    texts: &[TextAnchor],
    walls: &[WallSegment],
    calibration: &Calibration,
    config: &RoomConfig,
) -> Vec<RoomSpace> {
    let mut rooms = Vec::new();

    for text in texts {
        let Some(room_type) = room_type_for(text) else {
            continue;
        };
        let anchor = calibration.to_real(&text.position);
        let bbox = wall_bounded_rect(&anchor, walls, config)
            .unwrap_or_else(|| default_footprint(&anchor, room_type));
        debug!(
            "Room '{}' ({}) at ({:.2}, {:.2}): {:.2} x {:.2}",
            text.text.trim(),
            room_type.as_str(),
            anchor.x,
            anchor.y,
            bbox.width(),
            bbox.height()
        );

        rooms.push(RoomSpace {
            id: format!("room-{}", rooms.len()),
            room_type,
            name: text.text.trim().to_string(),
            area: bbox.area(),
            geometry: RoomGeometry::Rect { bbox },
        });
    }

    info!("Text-anchored rooms: {}", rooms.len());
    rooms
}

fn default_footprint(anchor: &Point, room_type: RoomTaxonomy) -> BBox {
    let side = room_type.default_area().sqrt();
    BBox::new(anchor.x - side / 2.0, anchor.y - side / 2.0, anchor.x + side / 2.0, anchor.y + side / 2.0)
}

fn wall_bounded_rect(anchor: &Point, walls: &[WallSegment], config: &RoomConfig) -> Option<BBox> {
    let nearby: Vec<&WallSegment> = walls
        .iter()
        .filter(|w| w.midpoint().distance_to(anchor) < config.wall_search_radius)
        .collect();
    if nearby.is_empty() {
        return None;
    }

    let near_xs: Vec<f64> = nearby
        .iter()
        .flat_map(|w| [w.start.x, w.end.x])
        .filter(|x| (x - anchor.x).abs() < config.axis_window)
        .collect();
    let near_ys: Vec<f64> = nearby
        .iter()
        .flat_map(|w| [w.start.y, w.end.y])
        .filter(|y| (y - anchor.y).abs() < config.axis_window)
        .collect();
    if near_xs.is_empty() || near_ys.is_empty() {
        return None;
    }

    let open = config.open_side_extent;
    let left = near_xs.iter().copied().filter(|&x| x <= anchor.x).reduce(f64::min).unwrap_or(anchor.x - open);
    let right = near_xs.iter().copied().filter(|&x| x >= anchor.x).reduce(f64::max).unwrap_or(anchor.x + open);
    let top = near_ys.iter().copied().filter(|&y| y <= anchor.y).reduce(f64::min).unwrap_or(anchor.y - open);
    let bottom = near_ys.iter().copied().filter(|&y| y >= anchor.y).reduce(f64::max).unwrap_or(anchor.y + open);

    let width = (right - left).max(config.min_side);
    let height = (bottom - top).max(config.min_side);
    Some(BBox::new(left, top, left + width, top + height))
}

/// With two or more bedroom-like rooms, the largest becomes the master
/// bedroom and takes `master_label` as its name; the rest become plain beds.
pub fn resolve_master_bed(rooms: &mut [RoomSpace], master_label: &str) {
    let bedrooms: Vec<usize> = rooms
        .iter()
        .enumerate()
        .filter(|(_, r)| r.room_type.is_bedroom())
        .map(|(i, _)| i)
        .collect();
    if bedrooms.len() < 2 {
        return;
    }

    let mut largest = bedrooms[0];
    for &idx in &bedrooms[1..] {
        if rooms[idx].area > rooms[largest].area {
            largest = idx;
        }
    }

    for &idx in &bedrooms {
        if idx == largest {
            rooms[idx].room_type = RoomTaxonomy::MasterBed;
            rooms[idx].name = master_label.to_string();
        } else {
            rooms[idx].room_type = RoomTaxonomy::Bed;
        }
    }
    debug!("Master bedroom resolved to {}", rooms[largest].id);
}

/// Rescale room areas so they sum to `known_area` when it is given and the
/// current sum is positive. Returns the total area to report.
pub fn reconcile_areas(rooms: &mut [RoomSpace], known_area: Option<f64>) -> f64 {
    let sum: f64 = rooms.iter().map(|r| r.area).sum();
    match known_area {
        Some(known) if known > 0.0 && sum > 0.0 => {
            let ratio = known / sum;
            for room in rooms.iter_mut() {
                room.area *= ratio;
            }
            info!("Room areas rescaled by {:.3} to match {:.2} m²", ratio, known);
            known
        }
        _ => sum,
    }
}
