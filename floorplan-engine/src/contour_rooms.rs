//! Room synthesis for raster sources: rooms are the enclosed regions left
//! between walls on a binarized wall mask.

use anyhow::{Context, Result};
use geo::{Area, Centroid, Coord, LineString, Polygon};
use image::imageops::invert;
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::morphology::close;
use imageproc::point::Point as PixelPoint;
use tracing::{debug, info};

use crate::config::RoomConfig;
use crate::geometry::{BBox, Point};
use crate::primitives::TextAnchor;
use crate::rooms::{room_type_for, RoomGeometry, RoomSpace};
use crate::scale::Calibration;
use crate::taxonomy::RoomTaxonomy;

/// Gray level separating wall ink from paper.
pub const WALL_MASK_THRESHOLD: u8 = 128;

/// An enclosed region found on the mask, in pixel coordinates.
#[derive(Debug, Clone)]
pub struct RoomRegion {
    pub polygon: Vec<Point>,
    pub area: f64,
    pub centroid: Point,
    pub bbox: BBox,
}

/// Dark pixels become wall (255), everything else 0.
pub fn binarize_walls(img: &GrayImage, threshold: u8) -> GrayImage {
    let mut binary = GrayImage::new(img.width(), img.height());
    for (x, y, pixel) in img.enumerate_pixels() {
        let val = if pixel[0] <= threshold { 255 } else { 0 };
        binary.put_pixel(x, y, Luma([val]));
    }
    binary
}

/// Decode an encoded drawing (PNG, JPEG) with dark walls on a light
/// background into a wall mask.
pub fn decode_wall_mask(bytes: &[u8]) -> Result<GrayImage> {
    let img = image::load_from_memory(bytes).context("Failed to decode wall mask image")?;
    let gray = img.to_luma8();
    debug!("Decoded wall mask {}x{}", gray.width(), gray.height());
    Ok(binarize_walls(&gray, WALL_MASK_THRESHOLD))
}

/// Enclosed regions of a wall mask (walls nonzero), largest first.
pub fn find_room_regions(mask: &GrayImage, config: &RoomConfig) -> Vec<RoomRegion> {
    let mut space = close(mask, Norm::LInf, config.closing_radius);
    invert(&mut space);

    let image_area = mask.width() as f64 * mask.height() as f64;
    let min_area = image_area * config.min_area_ratio;
    let max_area = image_area * config.max_area_ratio;

    let mut regions = Vec::new();
    for contour in find_contours::<i32>(&space) {
        if contour.border_type != BorderType::Outer {
            continue;
        }
        let polygon = pixel_polygon(&contour.points);
        let area = polygon.unsigned_area();
        if area < min_area || area > max_area {
            continue;
        }

        let epsilon = config.simplify_epsilon_ratio * arc_length(&contour.points, true);
        let simplified = approximate_polygon_dp(&contour.points, epsilon, true);
        if simplified.len() < config.min_polygon_vertices {
            debug!("Dropping region with {} vertices after simplification", simplified.len());
            continue;
        }

        let Some(centroid) = polygon.centroid() else {
            continue;
        };
        let outline: Vec<Point> = contour.points.iter().map(to_point).collect();
        let Some(bbox) = BBox::from_points(&outline) else {
            continue;
        };

        regions.push(RoomRegion {
            polygon: simplified.iter().map(to_point).collect(),
            area,
            centroid: Point::new(centroid.x(), centroid.y()),
            bbox,
        });
    }

    regions.sort_by(|a, b| b.area.total_cmp(&a.area));
    regions
}

fn to_point(p: &PixelPoint<i32>) -> Point {
    Point::new(p.x as f64, p.y as f64)
}

fn pixel_polygon(points: &[PixelPoint<i32>]) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = points.iter().map(|p| Coord { x: p.x as f64, y: p.y as f64 }).collect();
    Polygon::new(LineString::from(coords), vec![])
}

/// The room-name text inside `bbox` closest to `centroid`.
fn nearest_label<'a>(region: &RoomRegion, texts: &'a [TextAnchor]) -> Option<(&'a TextAnchor, RoomTaxonomy)> {
    texts
        .iter()
        .filter(|t| region.bbox.contains(&t.position))
        .filter_map(|t| room_type_for(t).map(|ty| (t, ty)))
        .min_by(|a, b| {
            let da = a.0.position.distance_to(&region.centroid);
            let db = b.0.position.distance_to(&region.centroid);
            da.total_cmp(&db)
        })
}

/// Build rooms from the enclosed regions of `mask`, labeled by the text
/// anchors that fall inside them. Texts are in the mask's pixel frame.
pub fn rooms_from_mask(
    mask: &GrayImage,
    texts: &[TextAnchor],
    calibration: &Calibration,
    config: &RoomConfig,
) -> Vec<RoomSpace> {
    let regions = find_room_regions(mask, config);
    let mut rooms = Vec::with_capacity(regions.len());

    for (i, region) in regions.iter().enumerate() {
        let (room_type, name) = match nearest_label(region, texts) {
            Some((text, ty)) => (ty, text.text.trim().to_string()),
            None => (RoomTaxonomy::Other, format!("Room {}", i + 1)),
        };
        let points = region.polygon.iter().map(|p| calibration.to_real(p)).collect();

        rooms.push(RoomSpace {
            id: format!("room-{}", i),
            room_type,
            name,
            area: calibration.to_real_area(region.area),
            geometry: RoomGeometry::Polygon { points },
        });
    }

    info!(
        "Contour rooms: {} ({} labeled)",
        rooms.len(),
        rooms.iter().filter(|r| r.room_type != RoomTaxonomy::Other).count()
    );
    rooms
}
