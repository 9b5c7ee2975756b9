// Collision probing and connector geometry

use std::f32::consts::FRAC_PI_4;

use crate::core::types::{Point, Quad, GEOMETRY_EPSILON};

/// Minimum center spacing, as a multiple of the radius
pub const MIN_SPACING_FACTOR: f32 = 2.2;
/// Outermost probe ring, as a multiple of the radius
pub const MAX_PROBE_FACTOR: f32 = 3.0;
/// Ring spacing is radius / PROBE_STEP_DIVISOR
pub const PROBE_STEP_DIVISOR: f32 = 3.0;
/// Compass directions probed on every ring
pub const PROBE_DIRECTIONS: usize = 8;

/// Marker centers accepted so far in one layout pass
#[derive(Debug, Clone)]
pub struct PlacedMarkers {
    centers: Vec<Point>,
    min_spacing: f32,
}

impl PlacedMarkers {
    pub fn new(radius: f32) -> Self {
        Self {
            centers: Vec::new(),
            min_spacing: radius * MIN_SPACING_FACTOR,
        }
    }

    /// True when `p` is farther than the minimum spacing from every marker
    pub fn is_clear(&self, p: Point) -> bool {
        self.centers.iter().all(|c| c.distance(p) > self.min_spacing)
    }

    pub fn push(&mut self, p: Point) {
        self.centers.push(p);
    }
}

/// Outcome of probing for a free marker position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Probe {
    /// The point is clear of every placed marker
    Clear(Point),
    /// Probing was exhausted; the original candidate is kept and may overlap
    Fallback(Point),
}

impl Probe {
    pub fn point(self) -> Point {
        match self {
            Probe::Clear(p) | Probe::Fallback(p) => p,
        }
    }
}

/// Find a marker center near `candidate` that keeps clear of `placed`.
///
/// The candidate itself is tried first, then rings at `k * radius / 3` for
/// `k = 1..=9` (out to `3 * radius`), eight compass angles per ring starting
/// at 0 degrees.
pub fn resolve_collision(candidate: Point, radius: f32, placed: &PlacedMarkers) -> Probe {
    if placed.is_clear(candidate) {
        return Probe::Clear(candidate);
    }

    let rings = (MAX_PROBE_FACTOR * PROBE_STEP_DIVISOR).round() as usize;
    let step = radius / PROBE_STEP_DIVISOR;

    for k in 1..=rings {
        let ring = step * k as f32;
        for dir in 0..PROBE_DIRECTIONS {
            let angle = dir as f32 * FRAC_PI_4;
            let p = candidate.offset(ring * angle.cos(), ring * angle.sin());
            if placed.is_clear(p) {
                return Probe::Clear(p);
            }
        }
    }

    Probe::Fallback(candidate)
}

/// Closest point to `p` on segment `a`-`b`
pub fn nearest_point_on_segment(p: Point, a: Point, b: Point) -> Point {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let len_sq = abx * abx + aby * aby;
    if len_sq < GEOMETRY_EPSILON * GEOMETRY_EPSILON {
        return a;
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / len_sq).clamp(0.0, 1.0);
    Point::new(a.x + t * abx, a.y + t * aby)
}

/// Closest point to `p` on the outline of `quad`
pub fn nearest_point_on_quad(p: Point, quad: &Quad) -> Point {
    quad.edges()
        .iter()
        .map(|&(a, b)| nearest_point_on_segment(p, a, b))
        .min_by(|a, b| a.distance(p).total_cmp(&b.distance(p)))
        .unwrap_or(quad.0[0])
}

/// Dashed line from the marker rim to the region outline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connector {
    pub start: Point,
    pub end: Point,
}

impl Connector {
    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }
}

/// Connector from a marker at `center` to the nearest point of `quad`.
///
/// Starts `radius + 1` out from the center along the connector direction.
/// Returns `None` for degenerate quads, and when the outline is inside that
/// rim so the remaining segment would be empty or point backwards.
pub fn connector_for(center: Point, radius: f32, quad: &Quad) -> Option<Connector> {
    if quad.is_degenerate() {
        return None;
    }

    let end = nearest_point_on_quad(center, quad);
    let dist = center.distance(end);
    let rim = radius + 1.0;
    if dist - rim < GEOMETRY_EPSILON {
        return None;
    }

    let (ux, uy) = ((end.x - center.x) / dist, (end.y - center.y) / dist);
    Some(Connector {
        start: center.offset(ux * rim, uy * rim),
        end,
    })
}
