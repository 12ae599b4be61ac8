use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::config::ClassifierConfig;
use crate::geometry::{percentile_sorted, point_to_segment_distance, BBox, Point};
use crate::primitives::{Line, PrimitiveSet, TextAnchor};
use crate::text::dimension_value;

/// Semantic tag for a line primitive. Every line receives exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ExteriorWall,
    InteriorWall,
    Dimension,
    Hatch,
    Furniture,
    Unknown,
}

impl Category {
    pub fn is_wall(&self) -> bool {
        match self {
            Category::ExteriorWall | Category::InteriorWall => true,
            Category::Dimension | Category::Hatch | Category::Furniture | Category::Unknown => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedLine {
    pub line: Line,
    pub category: Category,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WidthThresholds {
    pub exterior: f64,
    pub interior: f64,
}

/// Output of the classification stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub lines: Vec<ClassifiedLine>,
    pub thresholds: WidthThresholds,
    /// Extent of the thick, long strokes plus a margin; `None` when no line qualifies
    pub drawing_bounds: Option<BBox>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub exterior_wall: usize,
    pub interior_wall: usize,
    pub dimension: usize,
    pub hatch: usize,
    pub furniture: usize,
    pub unknown: usize,
}

impl CategoryCounts {
    pub fn from_lines(lines: &[ClassifiedLine]) -> Self {
        let mut counts = CategoryCounts::default();
        for cl in lines {
            match cl.category {
                Category::ExteriorWall => counts.exterior_wall += 1,
                Category::InteriorWall => counts.interior_wall += 1,
                Category::Dimension => counts.dimension += 1,
                Category::Hatch => counts.hatch += 1,
                Category::Furniture => counts.furniture += 1,
                Category::Unknown => counts.unknown += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.exterior_wall + self.interior_wall + self.dimension + self.hatch + self.furniture + self.unknown
    }
}

/// Derive exterior / interior stroke-width thresholds from the width histogram.
pub fn compute_width_thresholds(
    histogram: &BTreeMap<OrderedFloat<f64>, usize>,
    config: &ClassifierConfig,
) -> WidthThresholds {
    // Keys iterate ascending, so the last entries are the thickest strokes.
    let distinct: Vec<f64> = histogram.keys().map(|w| w.into_inner()).collect();
    let eps = config.width_epsilon;

    match distinct.as_slice() {
        [] => WidthThresholds {
            exterior: config.fallback_exterior_width,
            interior: config.fallback_interior_width,
        },
        [only] => WidthThresholds {
            exterior: only - eps,
            interior: only * 0.6 - eps,
        },
        [thinner, thickest] => WidthThresholds {
            exterior: thickest - eps,
            interior: thinner - eps,
        },
        _ => {
            let weighted: Vec<f64> = histogram
                .iter()
                .flat_map(|(w, count)| std::iter::repeat(w.into_inner()).take(*count))
                .collect();
            let p_ext = percentile_sorted(&weighted, config.exterior_percentile).unwrap_or(0.0);
            let p_int = percentile_sorted(&weighted, config.interior_percentile).unwrap_or(0.0);
            WidthThresholds {
                exterior: p_ext.max(config.exterior_floor),
                interior: p_int.max(config.interior_floor),
            }
        }
    }
}

/// Bounding box of the lines thick and long enough to be walls, plus a margin.
pub fn drawing_bounds(lines: &[Line], thresholds: &WidthThresholds, config: &ClassifierConfig) -> Option<BBox> {
    let points: Vec<Point> = lines
        .iter()
        .filter(|l| l.width >= thresholds.interior && l.length() >= config.min_wall_length)
        .flat_map(|l| [l.start, l.end])
        .collect();
    BBox::from_points(&points).map(|b| b.expanded(config.bounds_margin))
}

/// Positions of texts that read as millimeter dimensions.
pub fn dimension_anchor_points(texts: &[TextAnchor]) -> Vec<Point> {
    texts
        .iter()
        .filter(|t| dimension_value(&t.text).is_some())
        .map(|t| t.position)
        .collect()
}

pub fn classify_lines(primitives: &PrimitiveSet, config: &ClassifierConfig) -> Classification {
    let thresholds = compute_width_thresholds(&primitives.width_histogram(), config);
    let bounds = drawing_bounds(&primitives.lines, &thresholds, config);
    let anchors = dimension_anchor_points(&primitives.texts);

    debug!(
        "Width thresholds: exterior {:.3}, interior {:.3}; {} dimension anchors",
        thresholds.exterior,
        thresholds.interior,
        anchors.len()
    );

    let mut lines: Vec<ClassifiedLine> = primitives
        .lines
        .iter()
        .map(|line| {
            let (category, confidence) = classify_one(line, &thresholds, bounds.as_ref(), &anchors, config);
            ClassifiedLine { line: line.clone(), category, confidence }
        })
        .collect();

    let hatched = mark_hatch(&mut lines, config);

    let counts = CategoryCounts::from_lines(&lines);
    info!(
        "Classified {} lines: {} exterior, {} interior, {} dimension, {} hatch ({} reclassified), {} furniture, {} unknown",
        lines.len(),
        counts.exterior_wall,
        counts.interior_wall,
        counts.dimension,
        counts.hatch,
        hatched,
        counts.furniture,
        counts.unknown
    );

    Classification { lines, thresholds, drawing_bounds: bounds }
}

/// First matching rule wins.
fn classify_one(
    line: &Line,
    thresholds: &WidthThresholds,
    bounds: Option<&BBox>,
    anchors: &[Point],
    config: &ClassifierConfig,
) -> (Category, f64) {
    if line.length() < config.min_wall_length {
        return (Category::Furniture, 0.5);
    }

    if let Some(bounds) = bounds {
        if !bounds.contains(&line.start) && !bounds.contains(&line.end) {
            return (Category::Dimension, 0.7);
        }
    }

    if anchors
        .iter()
        .any(|p| point_to_segment_distance(p, &line.start, &line.end) < config.dimension_text_proximity)
    {
        return (Category::Dimension, 0.75);
    }

    let axis_aligned = line.is_axis_aligned(config.axis_tolerance);
    if line.width >= thresholds.exterior {
        if axis_aligned {
            (Category::ExteriorWall, 0.85)
        } else {
            (Category::ExteriorWall, 0.6)
        }
    } else if line.width >= thresholds.interior {
        if axis_aligned {
            (Category::InteriorWall, 0.75)
        } else {
            (Category::Unknown, 0.4)
        }
    } else {
        (Category::Unknown, 0.3)
    }
}

/// Reclassify dense families of parallel diagonal strokes as hatch fill.
/// Returns the number of lines reclassified.
fn mark_hatch(lines: &mut [ClassifiedLine], config: &ClassifierConfig) -> usize {
    let mut buckets: HashMap<i64, Vec<usize>> = HashMap::new();

    for (idx, cl) in lines.iter().enumerate() {
        if !matches!(cl.category, Category::Unknown | Category::Furniture) {
            continue;
        }
        let angle = cl.line.angle_deg();
        if angle > config.hatch_min_angle && angle < config.hatch_max_angle {
            let bucket = (angle / config.hatch_bucket_degrees).round() as i64;
            buckets.entry(bucket).or_default().push(idx);
        }
    }

    let mut reclassified = 0;
    for members in buckets.values() {
        if members.len() < config.hatch_min_bucket_size {
            continue;
        }
        for &idx in members {
            if let Some(cl) = lines.get_mut(idx) {
                cl.category = Category::Hatch;
                cl.confidence = 0.85;
                reclassified += 1;
            }
        }
    }
    reclassified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{FrameSize, SourceKind};
    use crate::text::TextCategory;

    fn create_line(x1: f64, y1: f64, x2: f64, y2: f64, width: f64) -> Line {
        Line::new(Point::new(x1, y1), Point::new(x2, y2), width)
    }

    fn create_set(lines: Vec<Line>, texts: Vec<TextAnchor>) -> PrimitiveSet {
        let mut set = PrimitiveSet::new(SourceKind::Vector, FrameSize { width: 1000.0, height: 1000.0 });
        for line in lines {
            set.push_line(line);
        }
        for text in texts {
            set.push_text(text);
        }
        set
    }

    fn histogram(widths: &[(f64, usize)]) -> BTreeMap<OrderedFloat<f64>, usize> {
        widths.iter().map(|(w, c)| (OrderedFloat(*w), *c)).collect()
    }

    #[test]
    fn test_two_widths_thresholds() {
        let config = ClassifierConfig::default();
        let t = compute_width_thresholds(&histogram(&[(0.2, 40), (0.5, 10)]), &config);
        assert!((t.exterior - 0.499).abs() < 1e-12);
        assert!((t.interior - 0.199).abs() < 1e-12);
    }

    #[test]
    fn test_single_width_thresholds() {
        let config = ClassifierConfig::default();
        let t = compute_width_thresholds(&histogram(&[(0.5, 3)]), &config);
        assert!((t.exterior - 0.499).abs() < 1e-12);
        assert!((t.interior - 0.299).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_thresholds_with_floors() {
        let config = ClassifierConfig::default();
        // Mostly hairlines: percentiles fall under the floors
        let t = compute_width_thresholds(&histogram(&[(0.05, 90), (0.08, 5), (0.12, 5)]), &config);
        assert_eq!(t.exterior, 0.2);
        assert_eq!(t.interior, 0.1);

        let t = compute_width_thresholds(&histogram(&[(0.1, 6), (0.3, 2), (0.7, 2)]), &config);
        // weighted sorted: 0.1 x6, 0.3 x2, 0.7 x2 -> p90 rank 8.1, p70 rank 6.3
        assert!((t.exterior - 0.7).abs() < 1e-12);
        assert!((t.interior - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_empty_histogram_fallback() {
        let config = ClassifierConfig::default();
        let t = compute_width_thresholds(&BTreeMap::new(), &config);
        assert_eq!(t.exterior, config.fallback_exterior_width);
        assert_eq!(t.interior, config.fallback_interior_width);
    }

    #[test]
    fn test_short_line_always_furniture() {
        let config = ClassifierConfig::default();
        let set = create_set(
            vec![
                create_line(0.0, 0.0, 300.0, 0.0, 0.5),
                create_line(100.0, 100.0, 102.0, 100.0, 5.0),
            ],
            Vec::new(),
        );
        let result = classify_lines(&set, &config);
        assert_eq!(result.lines[1].category, Category::Furniture);
    }

    #[test]
    fn test_classification_is_total() {
        let config = ClassifierConfig::default();
        let mut lines = Vec::new();
        for i in 0..40 {
            let f = i as f64;
            lines.push(create_line(f * 7.0, 0.0, f * 7.0 + f * 3.0 + 1.0, f * 11.0, 0.1 + (i % 4) as f64 * 0.1));
        }
        let set = create_set(lines, vec![TextAnchor::new("3600", Point::new(50.0, 50.0), 8.0)]);
        let result = classify_lines(&set, &config);
        assert_eq!(result.lines.len(), set.lines.len());
        assert_eq!(CategoryCounts::from_lines(&result.lines).total(), set.lines.len());
    }

    #[test]
    fn test_dimension_text_marks_nearby_line() {
        let config = ClassifierConfig::default();
        let set = create_set(
            vec![
                create_line(0.0, 0.0, 400.0, 0.0, 0.5),
                create_line(0.0, 0.0, 0.0, 400.0, 0.5),
                create_line(0.0, 400.0, 400.0, 400.0, 0.2),
            ],
            vec![TextAnchor::new("4,000", Point::new(200.0, 390.0), 8.0)],
        );
        let result = classify_lines(&set, &config);
        assert_eq!(result.lines[0].category, Category::ExteriorWall);
        assert_eq!(result.lines[1].category, Category::ExteriorWall);
        assert_eq!(result.lines[2].category, Category::Dimension);
    }

    #[test]
    fn test_upstream_label_digits_still_anchor() {
        let mut text = TextAnchor::new("4000", Point::new(200.0, 390.0), 8.0);
        text.category = Some(TextCategory::Label);
        let set = create_set(
            vec![
                create_line(0.0, 0.0, 400.0, 0.0, 0.5),
                create_line(0.0, 0.0, 0.0, 400.0, 0.5),
                create_line(0.0, 400.0, 400.0, 400.0, 0.2),
            ],
            vec![text],
        );
        let result = classify_lines(&set, &ClassifierConfig::default());
        assert_eq!(result.lines[2].category, Category::Dimension);
        assert_eq!(dimension_anchor_points(&set.texts), vec![Point::new(200.0, 390.0)]);
    }

    #[test]
    fn test_line_outside_bounds_is_dimension() {
        let config = ClassifierConfig::default();
        let set = create_set(
            vec![
                create_line(100.0, 100.0, 500.0, 100.0, 0.5),
                create_line(100.0, 100.0, 100.0, 500.0, 0.5),
                create_line(300.0, 100.0, 300.0, 500.0, 0.3),
                // thin, far below the walls: both endpoints outside
                create_line(100.0, 700.0, 500.0, 700.0, 0.05),
            ],
            Vec::new(),
        );
        let result = classify_lines(&set, &config);
        assert_eq!(result.thresholds.interior, 0.5);
        assert_eq!(result.drawing_bounds, Some(BBox::new(80.0, 80.0, 520.0, 520.0)));
        assert_eq!(result.lines[3].category, Category::Dimension);
    }

    #[test]
    fn test_diagonal_interior_width_is_unknown() {
        let config = ClassifierConfig::default();
        let set = create_set(
            vec![
                create_line(0.0, 0.0, 400.0, 0.0, 0.5),
                create_line(0.0, 0.0, 0.0, 400.0, 0.2),
                create_line(10.0, 10.0, 200.0, 150.0, 0.2),
            ],
            Vec::new(),
        );
        let result = classify_lines(&set, &config);
        assert_eq!(result.lines[1].category, Category::InteriorWall);
        assert_eq!(result.lines[2].category, Category::Unknown);
    }

    fn hatch_set(count: usize) -> PrimitiveSet {
        let mut lines = vec![
            create_line(0.0, 0.0, 400.0, 0.0, 0.5),
            create_line(0.0, 0.0, 0.0, 400.0, 0.5),
        ];
        for i in 0..count {
            let x = 20.0 + i as f64 * 10.0;
            lines.push(create_line(x, 20.0, x + 20.0, 40.0, 0.05)); // 45 degrees
        }
        create_set(lines, Vec::new())
    }

    #[test]
    fn test_hatch_bucket_of_eight() {
        let config = ClassifierConfig::default();
        let result = classify_lines(&hatch_set(8), &config);
        let hatch = result.lines.iter().filter(|l| l.category == Category::Hatch).count();
        assert_eq!(hatch, 8);
    }

    #[test]
    fn test_hatch_bucket_of_seven_not_marked() {
        let config = ClassifierConfig::default();
        let result = classify_lines(&hatch_set(7), &config);
        assert!(result.lines.iter().all(|l| l.category != Category::Hatch));
    }
}
