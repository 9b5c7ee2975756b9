// Anchor modes and their resolution to a concrete corner

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::errors::ConfigError;
use crate::core::types::{Detection, Point};

/// Marker gap from the target, as a multiple of the radius, for `Auto`
pub const AUTO_GAP_FACTOR: f32 = 1.2;

/// Requested marker anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    /// Push the marker away from the nearest image edge
    Auto,
}

/// Concrete corner a marker is biased toward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// Unit direction in image space (x right, y down)
    pub fn signs(self) -> (f32, f32) {
        match self {
            Corner::TopLeft => (-1.0, -1.0),
            Corner::TopRight => (1.0, -1.0),
            Corner::BottomLeft => (-1.0, 1.0),
            Corner::BottomRight => (1.0, 1.0),
        }
    }
}

impl Anchor {
    /// Normalize to a concrete corner. `Auto` splits the image into a 3x3
    /// grid and biases corner-band targets toward the image interior; every
    /// other cell gets `TopRight`.
    pub fn resolve(self, target: Point, width: u32, height: u32) -> Corner {
        match self {
            Anchor::TopLeft => Corner::TopLeft,
            Anchor::TopRight => Corner::TopRight,
            Anchor::BottomLeft => Corner::BottomLeft,
            Anchor::BottomRight => Corner::BottomRight,
            Anchor::Auto => {
                let rx = target.x / width.max(1) as f32;
                let ry = target.y / height.max(1) as f32;
                let left = rx < 1.0 / 3.0;
                let right = rx > 2.0 / 3.0;
                let top = ry < 1.0 / 3.0;
                let bottom = ry > 2.0 / 3.0;

                match (left, right, top, bottom) {
                    (true, _, true, _) => Corner::BottomRight,
                    (_, true, true, _) => Corner::BottomLeft,
                    (true, _, _, true) => Corner::TopRight,
                    (_, true, _, true) => Corner::TopLeft,
                    _ => Corner::TopRight,
                }
            }
        }
    }

    pub fn is_auto(self) -> bool {
        matches!(self, Anchor::Auto)
    }
}

impl FromStr for Anchor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "top-left" | "tl" => Ok(Anchor::TopLeft),
            "top-right" | "tr" => Ok(Anchor::TopRight),
            "bottom-left" | "bl" => Ok(Anchor::BottomLeft),
            "bottom-right" | "br" => Ok(Anchor::BottomRight),
            "auto" => Ok(Anchor::Auto),
            _ => Err(ConfigError::InvalidAnchor(s.to_string())),
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Anchor::TopLeft => "top-left",
            Anchor::TopRight => "top-right",
            Anchor::BottomLeft => "bottom-left",
            Anchor::BottomRight => "bottom-right",
            Anchor::Auto => "auto",
        };
        f.write_str(s)
    }
}

/// Signed pixel displacement from the anchor point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub dx: f32,
    pub dy: f32,
}

impl Default for Offset {
    fn default() -> Self {
        Self { dx: 10.0, dy: -10.0 }
    }
}

impl FromStr for Offset {
    type Err = ConfigError;

    /// `dx,dy`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidOffset(s.to_string());
        let (dx, dy) = s.split_once(',').ok_or_else(invalid)?;
        let dx: f32 = dx.trim().parse().map_err(|_| invalid())?;
        let dy: f32 = dy.trim().parse().map_err(|_| invalid())?;
        if !(dx.is_finite() && dy.is_finite()) {
            return Err(invalid());
        }
        Ok(Offset { dx, dy })
    }
}

/// Naive marker center before collision resolution.
///
/// Fixed anchors sit on the matching corner of the quad's axis-aligned
/// bounds (the target itself without a quad) shifted by `offset`. `Auto`
/// steps away from the target along the resolved corner's direction by
/// `1.2 * radius` plus the offset magnitude on each axis.
pub fn candidate_center(
    detection: &Detection,
    anchor: Anchor,
    corner: Corner,
    radius: f32,
    offset: Offset,
) -> Point {
    let target = detection.target();

    if anchor.is_auto() {
        let (sx, sy) = corner.signs();
        let gap = radius * AUTO_GAP_FACTOR;
        return target.offset(sx * (gap + offset.dx.abs()), sy * (gap + offset.dy.abs()));
    }

    let corner_point = match detection.quad {
        Some(quad) => {
            let b = quad.bounds();
            match corner {
                Corner::TopLeft => Point::new(b.min_x, b.min_y),
                Corner::TopRight => Point::new(b.max_x, b.min_y),
                Corner::BottomLeft => Point::new(b.min_x, b.max_y),
                Corner::BottomRight => Point::new(b.max_x, b.max_y),
            }
        }
        None => target,
    };

    corner_point.offset(offset.dx, offset.dy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Quad;

    fn square_det(cx: f32, cy: f32, half: f32) -> Detection {
        Detection::from_quad(
            "10",
            1.0,
            Quad([
                Point::new(cx - half, cy - half),
                Point::new(cx + half, cy - half),
                Point::new(cx + half, cy + half),
                Point::new(cx - half, cy + half),
            ]),
        )
    }

    #[test]
    fn test_parse_anchor() {
        assert_eq!("top-right".parse::<Anchor>().unwrap(), Anchor::TopRight);
        assert_eq!("TL".parse::<Anchor>().unwrap(), Anchor::TopLeft);
        assert_eq!("bottom_left".parse::<Anchor>().unwrap(), Anchor::BottomLeft);
        assert_eq!("auto".parse::<Anchor>().unwrap(), Anchor::Auto);
        assert!("middle".parse::<Anchor>().is_err());
        assert_eq!(Anchor::BottomRight.to_string(), "bottom-right");
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!("10,-10".parse::<Offset>().unwrap(), Offset { dx: 10.0, dy: -10.0 });
        assert_eq!(" 3 , 4 ".parse::<Offset>().unwrap(), Offset { dx: 3.0, dy: 4.0 });
        assert!("10".parse::<Offset>().is_err());
        assert!("a,b".parse::<Offset>().is_err());
    }

    #[test]
    fn test_auto_pushes_away_from_edges() {
        let (w, h) = (900, 900);
        let auto = Anchor::Auto;
        assert_eq!(auto.resolve(Point::new(50.0, 50.0), w, h), Corner::BottomRight);
        assert_eq!(auto.resolve(Point::new(850.0, 50.0), w, h), Corner::BottomLeft);
        assert_eq!(auto.resolve(Point::new(50.0, 850.0), w, h), Corner::TopRight);
        assert_eq!(auto.resolve(Point::new(850.0, 850.0), w, h), Corner::TopLeft);
        // edge-middle and center cells fall back to top-right
        assert_eq!(auto.resolve(Point::new(450.0, 450.0), w, h), Corner::TopRight);
        assert_eq!(auto.resolve(Point::new(50.0, 450.0), w, h), Corner::TopRight);
    }

    #[test]
    fn test_fixed_anchor_ignores_position() {
        let corner = Anchor::BottomLeft.resolve(Point::new(1.0, 1.0), 100, 100);
        assert_eq!(corner, Corner::BottomLeft);
    }

    #[test]
    fn test_fixed_candidate_uses_bbox_corner() {
        let det = square_det(100.0, 100.0, 10.0);
        let offset = Offset { dx: 10.0, dy: -10.0 };
        let p = candidate_center(&det, Anchor::TopRight, Corner::TopRight, 18.0, offset);
        assert_eq!(p, Point::new(120.0, 80.0));

        let p = candidate_center(&det, Anchor::BottomLeft, Corner::BottomLeft, 18.0, offset);
        assert_eq!(p, Point::new(100.0, 100.0));
    }

    #[test]
    fn test_candidate_without_quad_uses_center() {
        let det = Detection::from_center("5", 1.0, Point::new(40.0, 40.0));
        let p = candidate_center(&det, Anchor::TopLeft, Corner::TopLeft, 18.0, Offset { dx: -2.0, dy: -3.0 });
        assert_eq!(p, Point::new(38.0, 37.0));
    }

    #[test]
    fn test_auto_candidate_steps_along_corner() {
        let det = square_det(50.0, 50.0, 5.0);
        let p = candidate_center(&det, Anchor::Auto, Corner::BottomRight, 10.0, Offset { dx: 4.0, dy: -6.0 });
        assert!((p.x - (50.0 + 12.0 + 4.0)).abs() < 1e-4);
        assert!((p.y - (50.0 + 12.0 + 6.0)).abs() < 1e-4);
    }
}
