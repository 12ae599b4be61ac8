use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::{Category, ClassifiedLine};
use crate::config::{ClassifierConfig, WallConfig};
use crate::geometry::{angle_deg, Point};
use crate::primitives::Line;
use crate::scale::{wall_candidates, Calibration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
    Diagonal,
}

impl Orientation {
    pub fn from_points(start: &Point, end: &Point, tolerance_deg: f64) -> Self {
        let angle = angle_deg(start, end);
        if angle < tolerance_deg || (180.0 - angle) < tolerance_deg {
            Orientation::Horizontal
        } else if (angle - 90.0).abs() < tolerance_deg {
            Orientation::Vertical
        } else {
            Orientation::Diagonal
        }
    }
}

/// A wall in real units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallSegment {
    pub id: String,
    pub start: Point,
    pub end: Point,
    pub thickness: f64,
    pub orientation: Orientation,
    pub is_exterior: bool,
    pub length_real: f64,
}

impl WallSegment {
    pub fn new(start: Point, end: Point, thickness: f64, is_exterior: bool, tolerance_deg: f64) -> Self {
        Self {
            id: String::new(),
            start,
            end,
            thickness,
            orientation: Orientation::from_points(&start, &end, tolerance_deg),
            is_exterior,
            length_real: start.distance_to(&end),
        }
    }

    pub fn midpoint(&self) -> Point {
        self.start.midpoint(&self.end)
    }

    /// Same endpoints within `tolerance`, in either direction.
    pub fn coincides_with(&self, other: &WallSegment, tolerance: f64) -> bool {
        let direct = self.start.distance_to(&other.start) < tolerance
            && self.end.distance_to(&other.end) < tolerance;
        let swapped = self.start.distance_to(&other.end) < tolerance
            && self.end.distance_to(&other.start) < tolerance;
        direct || swapped
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallSynthesis {
    pub walls: Vec<WallSegment>,
    /// Double-stroke walls emitted by pairing
    pub paired: usize,
    /// Single-stroke walls emitted from unpaired lines
    pub single: usize,
    /// Wall count before dedup and the length filter
    pub before_dedup: usize,
    /// Candidate lines dropped by the pairing cap
    pub truncated: usize,
    /// Collinear fragments absorbed into a longer stroke before pairing
    pub fragments_merged: usize,
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    /// Coordinate across the stroke (y for horizontal lines).
    fn offset(&self, cl: &ClassifiedLine) -> f64 {
        match self {
            Axis::Horizontal => (cl.line.start.y + cl.line.end.y) / 2.0,
            Axis::Vertical => (cl.line.start.x + cl.line.end.x) / 2.0,
        }
    }

    /// Extent along the stroke.
    fn span(&self, cl: &ClassifiedLine) -> (f64, f64) {
        match self {
            Axis::Horizontal => cl.line.x_range(),
            Axis::Vertical => cl.line.y_range(),
        }
    }

    fn of(line: &Line, tolerance: f64) -> Option<Axis> {
        if line.is_horizontal(tolerance) {
            Some(Axis::Horizontal)
        } else if line.is_vertical(tolerance) {
            Some(Axis::Vertical)
        } else {
            None
        }
    }

    fn endpoints(&self, offset: f64, lo: f64, hi: f64) -> (Point, Point) {
        match self {
            Axis::Horizontal => (Point::new(lo, offset), Point::new(hi, offset)),
            Axis::Vertical => (Point::new(offset, lo), Point::new(offset, hi)),
        }
    }
}

/// Merge wall-tagged lines into wall segments: join collinear fragments, pair
/// double strokes, keep long single strokes, then deduplicate and drop walls
/// too short to be real.
pub fn synthesize_walls(
    lines: &[ClassifiedLine],
    calibration: &Calibration,
    classifier: &ClassifierConfig,
    config: &WallConfig,
) -> WallSynthesis {
    let candidates = wall_candidates(lines, classifier);
    let before_merge = candidates.len();
    let joined = merge_collinear(&candidates, classifier.axis_tolerance, config);
    let fragments_merged = before_merge - joined.len();
    if fragments_merged > 0 {
        debug!("Joined {} collinear wall fragments", fragments_merged);
    }

    let mut candidates: Vec<&ClassifiedLine> = joined.iter().collect();
    let mut truncated = 0;
    if candidates.len() > config.max_pairing_lines {
        candidates.sort_by(|a, b| b.line.length().total_cmp(&a.line.length()));
        truncated = candidates.len() - config.max_pairing_lines;
        candidates.truncate(config.max_pairing_lines);
        warn!(
            "Pairing capped at {} longest wall lines ({} dropped)",
            config.max_pairing_lines, truncated
        );
    }

    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();
    for (idx, cl) in candidates.iter().enumerate() {
        match Axis::of(&cl.line, classifier.axis_tolerance) {
            Some(Axis::Horizontal) => horizontal.push(idx),
            Some(Axis::Vertical) => vertical.push(idx),
            None => {}
        }
    }

    let mut consumed = vec![false; candidates.len()];
    let mut walls = Vec::new();
    walls.extend(pair_parallel(&candidates, horizontal, Axis::Horizontal, &mut consumed, calibration, config));
    walls.extend(pair_parallel(&candidates, vertical, Axis::Vertical, &mut consumed, calibration, config));
    let paired = walls.len();

    let min_single_length = classifier.min_wall_length * config.single_stroke_length_factor;
    for (idx, cl) in candidates.iter().enumerate() {
        if consumed[idx] || cl.line.length() < min_single_length {
            continue;
        }
        let thickness = (cl.line.width * calibration.scale.value() * config.single_stroke_thickness_factor)
            .max(config.min_thickness);
        walls.push(WallSegment::new(
            calibration.to_real(&cl.line.start),
            calibration.to_real(&cl.line.end),
            thickness,
            cl.category == Category::ExteriorWall,
            config.orientation_tolerance_deg,
        ));
    }
    let single = walls.len() - paired;
    let before_dedup = walls.len();

    let mut walls: Vec<WallSegment> = deduplicate_walls(walls, config.dedup_tolerance)
        .into_iter()
        .filter(|w| w.length_real >= config.min_real_length)
        .collect();
    for (i, wall) in walls.iter_mut().enumerate() {
        wall.id = format!("wall-{}", i);
    }

    info!(
        "Synthesized {} walls ({} paired, {} single-stroke, {} before dedup)",
        walls.len(),
        paired,
        single,
        before_dedup
    );

    WallSynthesis { walls, paired, single, before_dedup, truncated, fragments_merged }
}

/// Join same-orientation strokes that sit on one line and touch or nearly
/// touch along it. Line detectors on scans break a wall face into pieces that
/// would otherwise fail the overlap test against the opposite face.
///
/// Strokes within `merge_offset_tolerance` across the axis form a row; inside
/// a row, spans separated by less than `merge_gap_tolerance` become one
/// stroke. Diagonal lines pass through untouched.
fn merge_collinear(candidates: &[&ClassifiedLine], axis_tolerance: f64, config: &WallConfig) -> Vec<ClassifiedLine> {
    let mut merged = Vec::with_capacity(candidates.len());
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();
    for &cl in candidates {
        match Axis::of(&cl.line, axis_tolerance) {
            Some(Axis::Horizontal) => horizontal.push(cl),
            Some(Axis::Vertical) => vertical.push(cl),
            None => merged.push(cl.clone()),
        }
    }

    for (axis, mut group) in [(Axis::Horizontal, horizontal), (Axis::Vertical, vertical)] {
        group.sort_by(|a, b| axis.offset(a).total_cmp(&axis.offset(b)));
        let mut used = vec![false; group.len()];

        for i in 0..group.len() {
            if used[i] {
                continue;
            }
            let base = axis.offset(group[i]);
            let mut row: Vec<usize> = (i..group.len())
                .take_while(|&j| axis.offset(group[j]) - base <= config.merge_offset_tolerance)
                .filter(|&j| !used[j])
                .collect();
            for &j in &row {
                used[j] = true;
            }
            row.sort_by(|&a, &b| axis.span(group[a]).0.total_cmp(&axis.span(group[b]).0));

            let mut run: Vec<&ClassifiedLine> = Vec::new();
            let mut run_hi = f64::NEG_INFINITY;
            for j in row {
                let (lo, hi) = axis.span(group[j]);
                if !run.is_empty() && lo - run_hi >= config.merge_gap_tolerance {
                    merged.push(join_run(&run, axis));
                    run.clear();
                    run_hi = f64::NEG_INFINITY;
                }
                run.push(group[j]);
                run_hi = run_hi.max(hi);
            }
            if !run.is_empty() {
                merged.push(join_run(&run, axis));
            }
        }
    }

    merged
}

/// One stroke covering every span in `run`, placed at the length-weighted
/// mean offset and carrying the widest stroke width.
fn join_run(run: &[&ClassifiedLine], axis: Axis) -> ClassifiedLine {
    if let [only] = run {
        return (*only).clone();
    }

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    let mut weighted = 0.0;
    let mut total = 0.0;
    let mut width: f64 = 0.0;
    let mut confidence: f64 = 0.0;
    let mut category = run[0].category;
    let mut longest = run[0];
    for &cl in run {
        let (a, b) = axis.span(cl);
        lo = lo.min(a);
        hi = hi.max(b);
        let length = cl.line.length().max(f64::EPSILON);
        weighted += axis.offset(cl) * length;
        total += length;
        width = width.max(cl.line.width);
        confidence = confidence.max(cl.confidence);
        if cl.category == Category::ExteriorWall {
            category = Category::ExteriorWall;
        }
        if cl.line.length() > longest.line.length() {
            longest = cl;
        }
    }

    let (start, end) = axis.endpoints(weighted / total, lo, hi);
    let mut line = longest.line.clone();
    line.start = start;
    line.end = end;
    line.width = width;
    ClassifiedLine { line, category, confidence }
}

/// Pair parallel strokes of one orientation into double-line walls.
///
/// Lines are sorted by their cross-axis offset, so the scan for a partner
/// stops as soon as the gap exceeds `max_pair_gap`.
fn pair_parallel(
    candidates: &[&ClassifiedLine],
    mut group: Vec<usize>,
    axis: Axis,
    consumed: &mut [bool],
    calibration: &Calibration,
    config: &WallConfig,
) -> Vec<WallSegment> {
    group.sort_by(|&a, &b| axis.offset(candidates[a]).total_cmp(&axis.offset(candidates[b])));
    let mut walls = Vec::new();

    for (pos, &i) in group.iter().enumerate() {
        if consumed[i] {
            continue;
        }
        let first = candidates[i];
        let (a_lo, a_hi) = axis.span(first);

        for &j in &group[pos + 1..] {
            if consumed[j] {
                continue;
            }
            let second = candidates[j];
            let gap = (axis.offset(second) - axis.offset(first)).abs();
            if gap > config.max_pair_gap {
                break;
            }
            if gap <= config.min_pair_gap {
                continue;
            }

            let (b_lo, b_hi) = axis.span(second);
            let overlap = (a_hi.min(b_hi) - a_lo.max(b_lo)).max(0.0);
            let span = (a_hi - a_lo).max(b_hi - b_lo).max(1.0);
            if overlap / span <= config.min_overlap_ratio {
                continue;
            }

            let mid = (axis.offset(first) + axis.offset(second)) / 2.0;
            let (start, end) = axis.endpoints(mid, a_lo.min(b_lo), a_hi.max(b_hi));
            let is_exterior =
                first.category == Category::ExteriorWall || second.category == Category::ExteriorWall;
            debug!("Paired {:?} strokes with gap {:.2} at {:.1}", axis, gap, mid);

            walls.push(WallSegment::new(
                calibration.to_real(&start),
                calibration.to_real(&end),
                calibration.to_real_length(gap),
                is_exterior,
                config.orientation_tolerance_deg,
            ));
            consumed[i] = true;
            consumed[j] = true;
            break;
        }
    }

    walls
}

/// Collapse walls whose endpoints coincide (directly or swapped), keeping the
/// first occurrence with the thickest thickness among its duplicates.
pub fn deduplicate_walls(walls: Vec<WallSegment>, tolerance: f64) -> Vec<WallSegment> {
    let mut result: Vec<WallSegment> = Vec::with_capacity(walls.len());
    for wall in walls {
        match result.iter_mut().find(|kept| kept.coincides_with(&wall, tolerance)) {
            Some(kept) => kept.thickness = kept.thickness.max(wall.thickness),
            None => result.push(wall),
        }
    }
    result
}
