use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::ClassifiedLine;
use crate::config::{ClassifierConfig, ScaleConfig};
use crate::geometry::{median, point_to_segment_distance, BBox, Point};
use crate::primitives::{PrimitiveSet, TextAnchor};
use crate::text::dimension_value;

/// Lines used to size the drawing when no wall candidates exist.
const FALLBACK_EXTENT_LINES: usize = 100;

/// Real units (meters) per source unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleFactor(f64);

impl ScaleFactor {
    /// Clamp into `[min, max]`; non-finite or non-positive values become `min`.
    pub fn bounded(value: f64, min: f64, max: f64) -> Self {
        if value.is_finite() && value > 0.0 {
            ScaleFactor(value.clamp(min, max))
        } else {
            ScaleFactor(min)
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleSource {
    DimensionText,
    KnownArea,
    Default,
}

/// Resolved mapping from source coordinates to real units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub scale: ScaleFactor,
    pub source: ScaleSource,
    /// Accepted dimension-text samples behind `scale`
    pub samples: usize,
    /// Subtracted from source coordinates before scaling
    pub origin: Point,
    /// Source-unit extent of the wall candidates
    pub extent: BBox,
}

impl Calibration {
    pub fn to_real(&self, p: &Point) -> Point {
        let s = self.scale.value();
        Point::new((p.x - self.origin.x) * s, (p.y - self.origin.y) * s)
    }

    pub fn to_real_length(&self, d: f64) -> f64 {
        d * self.scale.value()
    }

    pub fn to_real_area(&self, a: f64) -> f64 {
        let s = self.scale.value();
        a * s * s
    }

    pub fn to_real_bbox(&self, b: &BBox) -> BBox {
        let min = self.to_real(&Point::new(b.min_x, b.min_y));
        let max = self.to_real(&Point::new(b.max_x, b.max_y));
        BBox::new(min.x, min.y, max.x, max.y)
    }
}

/// Axis-aligned, wall-tagged lines long enough to be walls; any wall-tagged
/// line when none of those exist.
pub fn wall_candidates<'a>(lines: &'a [ClassifiedLine], config: &ClassifierConfig) -> Vec<&'a ClassifiedLine> {
    let strict: Vec<&ClassifiedLine> = lines
        .iter()
        .filter(|cl| {
            cl.category.is_wall()
                && cl.line.is_axis_aligned(config.axis_tolerance)
                && cl.line.length() >= config.min_wall_length
        })
        .collect();

    if !strict.is_empty() {
        return strict;
    }
    lines.iter().filter(|cl| cl.category.is_wall()).collect()
}

/// Source-unit extent used for the origin offset and the known-area fallback.
fn source_extent(candidates: &[&ClassifiedLine], primitives: &PrimitiveSet) -> BBox {
    let from_candidates = BBox::from_points(candidates.iter().flat_map(|cl| [&cl.line.start, &cl.line.end]));
    if let Some(bbox) = from_candidates {
        return bbox;
    }
    let from_lines = BBox::from_points(
        primitives
            .lines
            .iter()
            .take(FALLBACK_EXTENT_LINES)
            .flat_map(|l| [&l.start, &l.end]),
    );
    from_lines.unwrap_or_else(|| BBox::new(0.0, 0.0, primitives.frame.width, primitives.frame.height))
}

/// Scale samples from millimeter dimension texts matched to their nearest wall line.
pub fn dimension_samples(candidates: &[&ClassifiedLine], texts: &[TextAnchor], config: &ScaleConfig) -> Vec<f64> {
    let mut samples = Vec::new();

    for text in texts {
        let Some(value_mm) = dimension_value(&text.text) else {
            continue;
        };
        if value_mm < config.min_dimension_mm {
            continue;
        }

        let nearest = candidates
            .iter()
            .map(|cl| {
                let d = point_to_segment_distance(&text.position, &cl.line.start, &cl.line.end);
                (d, cl)
            })
            .filter(|(d, _)| *d <= config.text_search_radius)
            .min_by(|a, b| a.0.total_cmp(&b.0));

        let Some((_, cl)) = nearest else {
            continue;
        };
        let length = cl.line.length();
        if length <= config.min_sample_line_length {
            continue;
        }

        let sample = (value_mm as f64 / 1000.0) / length;
        if (config.min_sample..=config.max_sample).contains(&sample) {
            debug!("Scale sample {:.6} from '{}' on a {:.1}-unit line", sample, text.text, length);
            samples.push(sample);
        } else {
            debug!("Rejected scale sample {:.6} from '{}'", sample, text.text);
        }
    }

    samples
}

/// Resolve the scale: dimension-text median, then known total area, then the default.
pub fn resolve_scale(
    lines: &[ClassifiedLine],
    primitives: &PrimitiveSet,
    known_area: Option<f64>,
    classifier: &ClassifierConfig,
    config: &ScaleConfig,
) -> Calibration {
    let candidates = wall_candidates(lines, classifier);
    let extent = source_extent(&candidates, primitives);
    let origin = Point::new(extent.min_x, extent.min_y);
    let bound = |v: f64| ScaleFactor::bounded(v, config.min_scale, config.max_scale);

    let samples = dimension_samples(&candidates, &primitives.texts, config);
    let (scale, source) = if let Some(m) = median(&samples) {
        (bound(m), ScaleSource::DimensionText)
    } else {
        match known_area.filter(|a| a.is_finite() && *a > 0.0) {
            Some(area) if extent.width() > 0.0 && extent.height() > 0.0 => {
                let raw = (area / extent.area()).sqrt();
                let scale = bound(raw);
                if scale.value() != raw {
                    warn!("Known-area scale {:.6} clamped to {:.6}", raw, scale.value());
                }
                (scale, ScaleSource::KnownArea)
            }
            _ => {
                warn!("No dimension text or usable known area; using default scale {}", config.default_scale);
                (bound(config.default_scale), ScaleSource::Default)
            }
        }
    };

    info!(
        "Resolved scale {:.6} m/unit from {:?} ({} samples, {} wall candidates)",
        scale.value(),
        source,
        samples.len(),
        candidates.len()
    );

    Calibration { scale, source, samples: samples.len(), origin, extent }
}
