use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn to_nalgebra(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Axis-aligned bounding box, `[min, max]` inclusive on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Bounding box of a point cloud; `None` when the iterator is empty.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = BBox::new(first.x, first.y, first.x, first.y);
        for p in iter {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        Some(bbox)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point::new((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    pub fn expanded(&self, margin: f64) -> Self {
        BBox::new(
            self.min_x - margin,
            self.min_y - margin,
            self.max_x + margin,
            self.max_y + margin,
        )
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }
}

/// Distance from `p` to the segment `a`-`b`, projecting onto the segment with
/// the parameter clamped to `[0, 1]`. A zero-length segment degrades to the
/// point distance.
pub fn point_to_segment_distance(p: &Point, a: &Point, b: &Point) -> f64 {
    let ab: Vector2<f64> = b.to_nalgebra() - a.to_nalgebra();
    let ap: Vector2<f64> = p.to_nalgebra() - a.to_nalgebra();
    let len_sq = ab.norm_squared();
    if len_sq == 0.0 {
        return ap.norm();
    }
    let t = (ap.dot(&ab) / len_sq).clamp(0.0, 1.0);
    let projection = a.to_nalgebra() + ab * t;
    (p.to_nalgebra() - projection).norm()
}

/// Direction of `a`->`b` in degrees, folded into `[0, 180)`.
pub fn angle_deg(a: &Point, b: &Point) -> f64 {
    (b.y - a.y).atan2(b.x - a.x).to_degrees().rem_euclid(180.0)
}

/// Median of a sample set; even-sized sets average the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Linear-interpolated percentile (`q` in `[0, 100]`) over an already sorted slice.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = (q / 100.0).clamp(0.0, 1.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let (lo_v, hi_v) = (*sorted.get(lo)?, *sorted.get(hi)?);
    Some(lo_v + (hi_v - lo_v) * (rank - lo as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_to_segment_projection_inside() {
        let d = point_to_segment_distance(
            &Point::new(50.0, 10.0),
            &Point::new(0.0, 0.0),
            &Point::new(100.0, 0.0),
        );
        assert!((d - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_point_to_segment_clamps_to_endpoint() {
        let d = point_to_segment_distance(
            &Point::new(103.0, 4.0),
            &Point::new(0.0, 0.0),
            &Point::new(100.0, 0.0),
        );
        assert!((d - 5.0).abs() < 1e-9); // 3-4-5 triangle past the end
    }

    #[test]
    fn test_point_to_degenerate_segment() {
        let a = Point::new(1.0, 1.0);
        let d = point_to_segment_distance(&Point::new(4.0, 5.0), &a, &a);
        assert!((d - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_angle_folds_direction() {
        let a = Point::new(0.0, 0.0);
        assert!((angle_deg(&a, &Point::new(1.0, 1.0)) - 45.0).abs() < 1e-9);
        assert!((angle_deg(&Point::new(1.0, 1.0), &a) - 45.0).abs() < 1e-9);
        assert!(angle_deg(&a, &Point::new(-5.0, 0.0)).abs() < 1e-9);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [0.1, 0.2, 0.3, 0.4, 0.5];
        assert!((percentile_sorted(&sorted, 50.0).unwrap() - 0.3).abs() < 1e-12);
        assert!((percentile_sorted(&sorted, 90.0).unwrap() - 0.46).abs() < 1e-12);
        assert_eq!(percentile_sorted(&[], 90.0), None);
    }

    #[test]
    fn test_bbox_from_points() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(0.0, 5.0),
        ];
        let bbox = BBox::from_points(&points).unwrap();
        assert_eq!(bbox, BBox::new(0.0, 0.0, 10.0, 5.0));
        assert!(bbox.contains(&Point::new(10.0, 5.0)));
        assert!(!bbox.expanded(1.0).contains(&Point::new(12.0, 0.0)));
    }
}
