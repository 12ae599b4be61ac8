use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable thresholds for every pipeline stage.
///
/// Distances in `classifier`, `scale` and the pairing part of `walls` are in
/// source units (PDF points, CAD units or pixels); everything in `rooms` and
/// the dedup/length filters of `walls` are in real units (meters).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub classifier: ClassifierConfig,
    pub scale: ScaleConfig,
    pub walls: WallConfig,
    pub rooms: RoomConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Lines shorter than this are never walls
    pub min_wall_length: f64,
    /// Max |dx| or |dy| for a line to count as vertical / horizontal
    pub axis_tolerance: f64,
    /// Subtracted from histogram widths when only one or two widths exist
    pub width_epsilon: f64,
    pub exterior_percentile: f64,
    pub interior_percentile: f64,
    pub exterior_floor: f64,
    pub interior_floor: f64,
    /// Used when the input carries no lines at all
    pub fallback_exterior_width: f64,
    pub fallback_interior_width: f64,
    pub bounds_margin: f64,
    pub dimension_text_proximity: f64,
    pub hatch_min_angle: f64,
    pub hatch_max_angle: f64,
    pub hatch_bucket_degrees: f64,
    pub hatch_min_bucket_size: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_wall_length: 15.0,
            axis_tolerance: 3.0,
            width_epsilon: 0.001,
            exterior_percentile: 90.0,
            interior_percentile: 70.0,
            exterior_floor: 0.2,
            interior_floor: 0.1,
            fallback_exterior_width: 0.35,
            fallback_interior_width: 0.18,
            bounds_margin: 20.0,
            dimension_text_proximity: 15.0,
            hatch_min_angle: 10.0,
            hatch_max_angle: 80.0,
            hatch_bucket_degrees: 5.0,
            hatch_min_bucket_size: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    pub text_search_radius: f64,
    pub min_dimension_mm: u32,
    /// Lines shorter than this never yield a scale sample
    pub min_sample_line_length: f64,
    pub min_sample: f64,
    pub max_sample: f64,
    /// Assumed 1:100 drawing at 72 DPI
    pub default_scale: f64,
    pub min_scale: f64,
    pub max_scale: f64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            text_search_radius: 30.0,
            min_dimension_mm: 100,
            min_sample_line_length: 10.0,
            min_sample: 0.0005,
            max_sample: 0.05,
            default_scale: 0.0035,
            min_scale: 0.000_05,
            max_scale: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallConfig {
    /// Pair gaps must be strictly greater than this
    pub min_pair_gap: f64,
    pub max_pair_gap: f64,
    /// Overlap relative to the longer span required to pair
    pub min_overlap_ratio: f64,
    /// Collinear fragments whose offsets differ by at most this are joined
    pub merge_offset_tolerance: f64,
    /// Largest hole along the stroke bridged when joining fragments
    pub merge_gap_tolerance: f64,
    /// Longest lines kept per orientation before the quadratic pairing pass
    pub max_pairing_lines: usize,
    /// Unpaired lines need this multiple of `min_wall_length` to survive
    pub single_stroke_length_factor: f64,
    pub single_stroke_thickness_factor: f64,
    pub min_thickness: f64,
    pub dedup_tolerance: f64,
    pub min_real_length: f64,
    pub orientation_tolerance_deg: f64,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            min_pair_gap: 2.0,
            max_pair_gap: 25.0,
            min_overlap_ratio: 0.4,
            merge_offset_tolerance: 1.5,
            merge_gap_tolerance: 10.0,
            max_pairing_lines: 1500,
            single_stroke_length_factor: 2.0,
            single_stroke_thickness_factor: 2.0,
            min_thickness: 0.08,
            dedup_tolerance: 0.05,
            min_real_length: 0.3,
            orientation_tolerance_deg: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Walls whose midpoint lies within this radius of a label bound its room
    pub wall_search_radius: f64,
    /// Per-axis window around the label for wall endpoints
    pub axis_window: f64,
    /// Half-extent used on a side with no wall endpoint
    pub open_side_extent: f64,
    pub min_side: f64,
    pub min_area_ratio: f64,
    pub max_area_ratio: f64,
    /// Square closing radius applied to the wall mask before contouring
    pub closing_radius: u8,
    pub simplify_epsilon_ratio: f64,
    pub min_polygon_vertices: usize,
    pub master_bed_label: String,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            wall_search_radius: 8.0,
            axis_window: 6.0,
            open_side_extent: 2.0,
            min_side: 1.0,
            min_area_ratio: 0.005,
            max_area_ratio: 0.5,
            closing_radius: 6,
            simplify_epsilon_ratio: 0.02,
            min_polygon_vertices: 4,
            master_bed_label: "안방".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).context("Failed to parse engine config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine config {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Reject settings that would make a stage meaningless.
    pub fn validate(&self) -> Result<()> {
        let c = &self.classifier;
        ensure!(c.min_wall_length > 0.0, "classifier.min_wall_length must be positive");
        ensure!(c.axis_tolerance >= 0.0, "classifier.axis_tolerance must not be negative");
        ensure!(
            (0.0..=100.0).contains(&c.interior_percentile)
                && (0.0..=100.0).contains(&c.exterior_percentile),
            "classifier percentiles must lie in [0, 100]"
        );
        ensure!(c.hatch_bucket_degrees > 0.0, "classifier.hatch_bucket_degrees must be positive");
        ensure!(
            c.hatch_min_angle < c.hatch_max_angle,
            "classifier hatch angle range is empty"
        );

        let s = &self.scale;
        ensure!(s.min_sample > 0.0 && s.min_sample <= s.max_sample, "scale sample band is invalid");
        ensure!(s.min_scale > 0.0 && s.min_scale <= s.max_scale, "scale clamp range is invalid");
        ensure!(
            (s.min_scale..=s.max_scale).contains(&s.default_scale),
            "scale.default_scale lies outside [min_scale, max_scale]"
        );

        let w = &self.walls;
        ensure!(w.min_pair_gap < w.max_pair_gap, "walls pair gap range is empty");
        ensure!(
            (0.0..=w.min_pair_gap).contains(&w.merge_offset_tolerance),
            "walls.merge_offset_tolerance must lie in [0, min_pair_gap]"
        );
        ensure!(w.merge_gap_tolerance >= 0.0, "walls.merge_gap_tolerance must not be negative");
        ensure!(w.max_pairing_lines > 0, "walls.max_pairing_lines must be positive");
        ensure!(w.min_thickness > 0.0, "walls.min_thickness must be positive");
        ensure!(w.dedup_tolerance >= 0.0, "walls.dedup_tolerance must not be negative");

        let r = &self.rooms;
        ensure!(
            r.min_area_ratio < r.max_area_ratio,
            "rooms contour area ratio range is empty"
        );
        ensure!(r.min_side > 0.0, "rooms.min_side must be positive");
        Ok(())
    }
}
