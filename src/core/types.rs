// Shared data model for the bubble numbering workflow

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Edges shorter than this are treated as collapsed
pub const GEOMETRY_EPSILON: f32 = 1e-3;

/// A point in source-image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn offset(self, dx: f32, dy: f32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Point::new(x, y)
    }
}

/// Axis-aligned bounds (min_x, min_y, max_x, max_y)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    /// Inclusive containment on all four edges
    pub fn contains(&self, p: Point) -> bool {
        (self.min_x..=self.max_x).contains(&p.x) && (self.min_y..=self.max_y).contains(&p.y)
    }
}

/// Bounding quadrilateral of a text region, exactly four points.
///
/// Point order comes from the detection engine and is not guaranteed to be
/// convex or clockwise; nothing here relies on winding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quad(pub [Point; 4]);

impl Quad {
    /// Build a quad from an arbitrary point list. Anything other than
    /// exactly four points yields `None`.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        match points {
            [a, b, c, d] => Some(Quad([*a, *b, *c, *d])),
            _ => None,
        }
    }

    pub fn centroid(&self) -> Point {
        let (sx, sy) = self.0.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point::new(sx / 4.0, sy / 4.0)
    }

    pub fn bounds(&self) -> Bounds {
        self.0.iter().fold(
            Bounds {
                min_x: f32::MAX,
                min_y: f32::MAX,
                max_x: f32::MIN,
                max_y: f32::MIN,
            },
            |b, p| Bounds {
                min_x: b.min_x.min(p.x),
                min_y: b.min_y.min(p.y),
                max_x: b.max_x.max(p.x),
                max_y: b.max_y.max(p.y),
            },
        )
    }

    /// The closed outline: (p0,p1) (p1,p2) (p2,p3) (p3,p0)
    pub fn edges(&self) -> [(Point, Point); 4] {
        let p = &self.0;
        [(p[0], p[1]), (p[1], p[2]), (p[2], p[3]), (p[3], p[0])]
    }

    /// True when every edge has collapsed to (nearly) zero length
    pub fn is_degenerate(&self) -> bool {
        self.edges()
            .iter()
            .all(|(a, b)| a.distance(*b) < GEOMETRY_EPSILON)
    }
}

/// Dimension category assigned by text classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TextType {
    Dia,
    R,
    Ang,
    Len,
    Rough,
    Thread,
}

impl TextType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextType::Dia => "DIA",
            TextType::R => "R",
            TextType::Ang => "ANG",
            TextType::Len => "LEN",
            TextType::Rough => "ROUGH",
            TextType::Thread => "THREAD",
        }
    }

    /// Radius, diameter and angle callouts survive exclusion-zone filtering
    pub fn survives_exclusion(&self) -> bool {
        matches!(self, TextType::R | TextType::Dia | TextType::Ang)
    }
}

impl fmt::Display for TextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recognized text region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub text: String,
    pub confidence: f32,
    pub quad: Option<Quad>,
    pub center: Point,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub text_type: Option<TextType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bubble_id: Option<u32>,
}

impl Detection {
    /// Detection whose center is the centroid of its quad
    pub fn from_quad(text: impl Into<String>, confidence: f32, quad: Quad) -> Self {
        Self {
            text: text.into(),
            confidence,
            center: quad.centroid(),
            quad: Some(quad),
            text_type: None,
            bubble_id: None,
        }
    }

    /// Detection without geometry beyond a supplied center point
    pub fn from_center(text: impl Into<String>, confidence: f32, center: Point) -> Self {
        Self {
            text: text.into(),
            confidence,
            quad: None,
            center,
            text_type: None,
            bubble_id: None,
        }
    }

    /// Where the marker points at: the quad centroid when present
    pub fn target(&self) -> Point {
        self.quad.map(|q| q.centroid()).unwrap_or(self.center)
    }
}

/// Phase 1 output: detections worth numbering, typed, in input order
#[derive(Debug, Clone)]
pub struct Phase1Output {
    pub detections: Vec<Detection>,
    pub dropped: usize,
}

/// Phase 2 output: detections in reading order with bubble ids assigned
#[derive(Debug, Clone)]
pub struct Phase2Output {
    pub detections: Vec<Detection>,
    pub rows: usize,
}

/// Phase 3 output: the annotated copy of the source image
#[derive(Debug, Clone)]
pub struct Phase3Output {
    pub image: RgbaImage,
    pub overlap_fallbacks: usize,
    pub connectors_drawn: usize,
}

/// Phase 4 output: files written for one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase4Output {
    pub image_path: PathBuf,
    pub table_path: PathBuf,
    pub json_path: PathBuf,
}

/// Per-run timings and counts, logged at the end of a pipeline pass
#[derive(Debug, Clone, Default)]
pub struct PerformanceMetrics {
    pub cleaning_time: Duration,
    pub sequencing_time: Duration,
    pub layout_time: Duration,
    pub export_time: Duration,
    pub detections_in: usize,
    pub detections_kept: usize,
    pub rows: usize,
    pub overlap_fallbacks: usize,
    pub connectors_drawn: usize,
}

impl PerformanceMetrics {
    pub fn total_time(&self) -> Duration {
        self.cleaning_time + self.sequencing_time + self.layout_time + self.export_time
    }
}
