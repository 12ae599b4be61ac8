//! Common primitive schema shared by vector (CAD/PDF) and raster (Hough)
//! adapters. Everything downstream reads only these types.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::geometry::{angle_deg, BBox, Point};
use crate::text::{classify_text, TextCategory};

/// Stroke width given to vector paths that carry none.
pub const DEFAULT_VECTOR_WIDTH: f64 = 0.5;
/// Stroke width given to raster segments with no thickness estimate.
pub const DEFAULT_RASTER_WIDTH: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Vector,
    Raster,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub start: Point,
    pub end: Point,
    pub width: f64,
    #[serde(default)]
    pub color: Color,
}

impl Line {
    pub fn new(start: Point, end: Point, width: f64) -> Self {
        Self { start, end, width, color: Color::default() }
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    pub fn is_horizontal(&self, tolerance: f64) -> bool {
        (self.end.y - self.start.y).abs() < tolerance
    }

    pub fn is_vertical(&self, tolerance: f64) -> bool {
        (self.end.x - self.start.x).abs() < tolerance
    }

    pub fn is_axis_aligned(&self, tolerance: f64) -> bool {
        self.is_horizontal(tolerance) || self.is_vertical(tolerance)
    }

    pub fn angle_deg(&self) -> f64 {
        angle_deg(&self.start, &self.end)
    }

    pub fn midpoint(&self) -> Point {
        self.start.midpoint(&self.end)
    }

    pub fn x_range(&self) -> (f64, f64) {
        (self.start.x.min(self.end.x), self.start.x.max(self.end.x))
    }

    pub fn y_range(&self) -> (f64, f64) {
        (self.start.y.min(self.end.y), self.start.y.max(self.end.y))
    }

    fn is_well_formed(&self) -> bool {
        self.start.is_finite()
            && self.end.is_finite()
            && self.width.is_finite()
            && self.width >= 0.0
            && self.length() > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub width: f64,
    pub filled: bool,
}

impl Rect {
    pub fn bbox(&self) -> BBox {
        BBox::new(self.x0, self.y0, self.x1, self.y1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnchor {
    pub text: String,
    pub position: Point,
    pub font_size: f64,
    pub bbox: BBox,
    /// Category assigned by an upstream text recognizer, if any
    #[serde(default)]
    pub category: Option<TextCategory>,
}

impl TextAnchor {
    pub fn new(text: impl Into<String>, position: Point, font_size: f64) -> Self {
        Self {
            text: text.into(),
            position,
            font_size,
            bbox: BBox::new(position.x, position.y, position.x, position.y),
            category: None,
        }
    }

    /// The upstream category when present, otherwise the engine's own.
    pub fn effective_category(&self) -> TextCategory {
        self.category.unwrap_or_else(|| classify_text(&self.text))
    }
}

/// One drawing command as emitted by a vector document adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathItem {
    Line { from: Point, to: Point },
    Rect { min: Point, max: Point },
    /// Four corners in any order, approximated by their bounding rectangle
    Quad { corners: [Point; 4] },
    Polyline { points: Vec<Point>, closed: bool },
}

/// A line detected in a raster image (Hough / morphology output), in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterSegment {
    pub start: Point,
    pub end: Point,
    #[serde(default)]
    pub thickness: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: f64,
    pub height: f64,
}

/// Normalized primitives of one document page or image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimitiveSet {
    pub source: SourceKind,
    pub frame: FrameSize,
    pub lines: Vec<Line>,
    pub rects: Vec<Rect>,
    pub texts: Vec<TextAnchor>,
    /// Malformed primitives dropped during normalization
    pub skipped: usize,
}

impl PrimitiveSet {
    pub fn new(source: SourceKind, frame: FrameSize) -> Self {
        Self {
            source,
            frame,
            lines: Vec::new(),
            rects: Vec::new(),
            texts: Vec::new(),
            skipped: 0,
        }
    }

    /// Add a line, skipping it when it is zero-length or non-finite.
    pub fn push_line(&mut self, line: Line) -> bool {
        if line.is_well_formed() {
            self.lines.push(line);
            true
        } else {
            debug!("Skipping malformed line {:?}", line);
            self.skipped += 1;
            false
        }
    }

    /// Add a rectangle with corners in any order, skipping degenerate ones.
    pub fn push_rect(&mut self, a: Point, b: Point, width: f64, filled: bool) -> bool {
        let rect = Rect {
            x0: a.x.min(b.x),
            y0: a.y.min(b.y),
            x1: a.x.max(b.x),
            y1: a.y.max(b.y),
            width,
            filled,
        };
        let bbox = rect.bbox();
        if a.is_finite() && b.is_finite() && !bbox.is_degenerate() {
            self.rects.push(rect);
            true
        } else {
            debug!("Skipping degenerate rect {:?}", rect);
            self.skipped += 1;
            false
        }
    }

    pub fn push_text(&mut self, anchor: TextAnchor) -> bool {
        if anchor.text.trim().is_empty() || !anchor.position.is_finite() {
            self.skipped += 1;
            return false;
        }
        self.texts.push(anchor);
        true
    }

    /// Expand the drawing commands of one vector path into primitives.
    ///
    /// A missing or zero stroke width is replaced by [`DEFAULT_VECTOR_WIDTH`].
    pub fn push_path(&mut self, items: &[PathItem], width: Option<f64>, color: Color, filled: bool) {
        let width = match width {
            Some(w) if w > 0.0 => w,
            _ => DEFAULT_VECTOR_WIDTH,
        };

        for item in items {
            match item {
                PathItem::Line { from, to } => {
                    self.push_line(Line { start: *from, end: *to, width, color });
                }
                PathItem::Rect { min, max } => {
                    self.push_rect(*min, *max, width, filled);
                }
                PathItem::Quad { corners } => match BBox::from_points(corners.iter()) {
                    Some(b) => {
                        self.push_rect(Point::new(b.min_x, b.min_y), Point::new(b.max_x, b.max_y), width, filled);
                    }
                    None => self.skipped += 1,
                },
                PathItem::Polyline { points, closed } => {
                    for pair in points.windows(2) {
                        self.push_line(Line { start: pair[0], end: pair[1], width, color });
                    }
                    if *closed && points.len() > 2 {
                        if let (Some(last), Some(first)) = (points.last(), points.first()) {
                            self.push_line(Line { start: *last, end: *first, width, color });
                        }
                    }
                }
            }
        }
    }

    pub fn push_raster_segment(&mut self, segment: &RasterSegment) -> bool {
        let width = segment
            .thickness
            .filter(|t| t.is_finite() && *t > 0.0)
            .unwrap_or(DEFAULT_RASTER_WIDTH);
        self.push_line(Line::new(segment.start, segment.end, width))
    }

    /// Build a raster-sourced set from detected segments and recognized text.
    pub fn from_raster(frame: FrameSize, segments: &[RasterSegment], texts: Vec<TextAnchor>) -> Self {
        let mut set = PrimitiveSet::new(SourceKind::Raster, frame);
        for segment in segments {
            set.push_raster_segment(segment);
        }
        for text in texts {
            set.push_text(text);
        }
        set
    }

    /// Stroke widths rounded to 3 decimals, weighted by occurrence count.
    pub fn width_histogram(&self) -> BTreeMap<OrderedFloat<f64>, usize> {
        let mut histogram = BTreeMap::new();
        for line in &self.lines {
            let key = OrderedFloat((line.width * 1000.0).round() / 1000.0);
            *histogram.entry(key).or_insert(0) += 1;
        }
        histogram
    }
}
