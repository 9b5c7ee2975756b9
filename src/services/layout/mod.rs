// Collision-free bubble layout
//
// Placement is pure geometry (`plan_placements`); `layout` renders the plan
// onto a copy of the source image.

pub mod anchor;
pub mod placement;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::core::types::{Detection, Point};
use crate::services::rendering::{normalize_alpha, MarkerRenderer};

pub use anchor::{candidate_center, Anchor, Corner, Offset};
pub use placement::{
    connector_for, nearest_point_on_quad, resolve_collision, Connector, PlacedMarkers, Probe,
};

/// Radii below this are clamped so probing always advances
const MIN_RADIUS: f32 = 1.0;

/// Marker colors and optional decorations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub fill_color: [u8; 3],
    pub fill_alpha: f32,
    pub connector_color: [u8; 3],
    pub connector_alpha: f32,
    pub outline_color: [u8; 3],
    pub outline_alpha: f32,
    pub number_color: [u8; 3],
    /// Outline the source quadrilaterals
    pub draw_quads: bool,
    /// TTF/OTF used for numbers; the embedded DejaVu Sans Mono is used otherwise
    pub font_path: Option<PathBuf>,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            fill_color: [0xee, 0x33, 0x33],
            fill_alpha: 0.85,
            connector_color: [0xee, 0x33, 0x33],
            connector_alpha: 1.0,
            outline_color: [0xee, 0x33, 0x33],
            outline_alpha: 255.0,
            number_color: [0xff, 0xff, 0xff],
            draw_quads: false,
            font_path: None,
        }
    }
}

impl MarkerStyle {
    pub fn fill(&self) -> Rgba<u8> {
        rgba(self.fill_color, self.fill_alpha)
    }

    pub fn connector(&self) -> Rgba<u8> {
        rgba(self.connector_color, self.connector_alpha)
    }

    pub fn outline(&self) -> Rgba<u8> {
        rgba(self.outline_color, self.outline_alpha)
    }

    pub fn number(&self) -> Rgba<u8> {
        rgba(self.number_color, 255.0)
    }

    /// Quad outlines reuse the connector color at half strength
    pub fn quad(&self) -> Rgba<u8> {
        let Rgba([r, g, b, a]) = self.connector();
        Rgba([r, g, b, a / 2])
    }
}

fn rgba([r, g, b]: [u8; 3], alpha: f32) -> Rgba<u8> {
    Rgba([r, g, b, normalize_alpha(alpha)])
}

/// Options for one layout pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptions {
    pub radius: f32,
    /// Font size relative to the radius
    pub text_scale: f32,
    pub anchor: Anchor,
    pub offset: Offset,
    pub avoid_overlap: bool,
    pub style: MarkerStyle,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            radius: 18.0,
            text_scale: 1.2,
            anchor: Anchor::TopRight,
            offset: Offset::default(),
            avoid_overlap: true,
            style: MarkerStyle::default(),
        }
    }
}

impl LayoutOptions {
    pub fn effective_radius(&self) -> f32 {
        if self.radius.is_finite() {
            self.radius.max(MIN_RADIUS)
        } else {
            MIN_RADIUS
        }
    }

    pub fn font_size(&self) -> f32 {
        (self.effective_radius() * self.text_scale).max(1.0)
    }
}

/// Resolved marker for one detection
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Index into the detection slice
    pub index: usize,
    /// Display number: `bubble_id`, else the 1-based index
    pub number: u32,
    pub corner: Corner,
    pub center: Point,
    pub connector: Option<Connector>,
    /// Collision probing was exhausted and the candidate was kept
    pub overlap_fallback: bool,
}

impl Placement {
    pub fn label(&self) -> String {
        self.number.to_string()
    }
}

/// Compute marker placements for detections already in reading order.
///
/// Later detections avoid markers placed for earlier ones; the set of placed
/// centers lives only for this call.
pub fn plan_placements(
    width: u32,
    height: u32,
    detections: &[Detection],
    options: &LayoutOptions,
) -> Vec<Placement> {
    let radius = options.effective_radius();
    let mut placed = PlacedMarkers::new(radius);
    let mut placements = Vec::with_capacity(detections.len());

    for (index, det) in detections.iter().enumerate() {
        let target = det.target();
        let corner = options.anchor.resolve(target, width, height);
        let candidate = candidate_center(det, options.anchor, corner, radius, options.offset);

        let (center, overlap_fallback) = if options.avoid_overlap {
            match resolve_collision(candidate, radius, &placed) {
                Probe::Clear(p) => (p, false),
                Probe::Fallback(p) => {
                    warn!(
                        "No free position for bubble {} near ({:.1}, {:.1}); allowing overlap",
                        index + 1,
                        p.x,
                        p.y
                    );
                    (p, true)
                }
            }
        } else {
            (candidate, false)
        };
        placed.push(center);

        let connector = det.quad.and_then(|q| connector_for(center, radius, &q));
        let number = det.bubble_id.unwrap_or(index as u32 + 1);

        debug!(
            "Bubble {} '{}' -> ({:.1}, {:.1}) corner={:?} connector={}",
            number,
            det.text,
            center.x,
            center.y,
            corner,
            connector.is_some()
        );

        placements.push(Placement {
            index,
            number,
            corner,
            center,
            connector,
            overlap_fallback,
        });
    }

    placements
}

/// Annotate a copy of `image` with numbered bubbles for `detections`.
///
/// The input is never modified. With no detections the result is an exact
/// copy of the input.
pub fn layout(image: &RgbaImage, detections: &[Detection], options: &LayoutOptions) -> RgbaImage {
    layout_with_plan(image, detections, options).0
}

/// `layout`, also returning the placements that were drawn
pub fn layout_with_plan(
    image: &RgbaImage,
    detections: &[Detection],
    options: &LayoutOptions,
) -> (RgbaImage, Vec<Placement>) {
    if detections.is_empty() {
        return (image.clone(), Vec::new());
    }

    let placements = plan_placements(image.width(), image.height(), detections, options);
    let mut renderer = MarkerRenderer::new(options.style.font_path.as_deref());
    let annotated = renderer.render(image, detections, &placements, options);
    (annotated, placements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Quad;
    use crate::services::layout::placement::MIN_SPACING_FACTOR;

    fn square_det(cx: f32, cy: f32, half: f32) -> Detection {
        Detection::from_quad(
            "12.5",
            0.9,
            Quad([
                Point::new(cx - half, cy - half),
                Point::new(cx + half, cy - half),
                Point::new(cx + half, cy + half),
                Point::new(cx - half, cy + half),
            ]),
        )
    }

    fn blank(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn test_single_marker_up_and_right() {
        let options = LayoutOptions {
            radius: 18.0,
            anchor: Anchor::TopRight,
            offset: Offset { dx: 10.0, dy: -10.0 },
            ..LayoutOptions::default()
        };
        let dets = vec![square_det(100.0, 100.0, 15.0)];
        let plan = plan_placements(400, 400, &dets, &options);

        assert_eq!(plan.len(), 1);
        assert!(plan[0].center.x > 100.0);
        assert!(plan[0].center.y < 100.0);
        assert_eq!(plan[0].label(), "1");
        assert!(!plan[0].overlap_fallback);
    }

    #[test]
    fn test_bubble_id_wins_over_index() {
        let mut det = square_det(100.0, 100.0, 15.0);
        det.bubble_id = Some(42);
        let plan = plan_placements(400, 400, &[det], &LayoutOptions::default());
        assert_eq!(plan[0].number, 42);
    }

    #[test]
    fn test_coincident_candidates_are_separated() {
        let options = LayoutOptions::default();
        let dets = vec![square_det(200.0, 200.0, 10.0), square_det(200.0, 200.0, 10.0)];
        let plan = plan_placements(400, 400, &dets, &options);

        let d = plan[0].center.distance(plan[1].center);
        assert!(d >= options.radius * MIN_SPACING_FACTOR);
    }

    #[test]
    fn test_overlap_allowed_when_disabled() {
        let options = LayoutOptions {
            avoid_overlap: false,
            ..LayoutOptions::default()
        };
        let dets = vec![square_det(200.0, 200.0, 10.0), square_det(200.0, 200.0, 10.0)];
        let plan = plan_placements(400, 400, &dets, &options);
        assert_eq!(plan[0].center, plan[1].center);
    }

    #[test]
    fn test_spacing_holds_for_a_row_of_regions() {
        let options = LayoutOptions::default();
        let dets: Vec<Detection> = (0..12)
            .map(|i| square_det(60.0 + i as f32 * 12.0, 200.0, 5.0))
            .collect();
        let plan = plan_placements(800, 400, &dets, &options);

        for (i, a) in plan.iter().enumerate() {
            for b in &plan[i + 1..] {
                if !a.overlap_fallback && !b.overlap_fallback {
                    assert!(a.center.distance(b.center) >= options.radius * MIN_SPACING_FACTOR);
                }
            }
        }
    }

    #[test]
    fn test_center_only_detection_has_no_connector() {
        let det = Detection::from_center("R3", 0.8, Point::new(50.0, 50.0));
        let plan = plan_placements(200, 200, &[det], &LayoutOptions::default());
        assert!(plan[0].connector.is_none());
    }

    #[test]
    fn test_empty_layout_is_identical_copy() {
        let mut img = blank(32, 24);
        img.put_pixel(3, 4, Rgba([1, 2, 3, 255]));
        let out = layout(&img, &[], &LayoutOptions::default());
        assert_eq!(out, img);
    }

    #[test]
    fn test_layout_does_not_touch_input_and_draws() {
        let img = blank(300, 300);
        let dets = vec![square_det(120.0, 150.0, 20.0)];
        let out = layout(&img, &dets, &LayoutOptions::default());

        assert_eq!(img, blank(300, 300));
        assert_eq!(out.dimensions(), img.dimensions());

        let plan = plan_placements(300, 300, &dets, &LayoutOptions::default());
        let c = plan[0].center;
        // sample inside the disc but off the digit strokes
        let px = out.get_pixel(c.x as u32, (c.y + 14.0) as u32);
        assert_ne!(*px, Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_layout_is_repeatable() {
        let img = blank(300, 300);
        let mut dets = vec![square_det(80.0, 80.0, 10.0), square_det(90.0, 85.0, 10.0)];
        dets[0].bubble_id = Some(7);
        dets[1].bubble_id = Some(8);

        let options = LayoutOptions::default();
        let first = layout(&img, &dets, &options);
        let second = layout(&img, &dets, &options);
        assert_eq!(first, second);

        let numbers: Vec<u32> = plan_placements(300, 300, &dets, &options)
            .iter()
            .map(|p| p.number)
            .collect();
        assert_eq!(numbers, vec![7, 8]);
    }

    #[test]
    fn test_layout_with_plan_matches_layout() {
        let img = blank(300, 300);
        let dets = vec![square_det(80.0, 80.0, 10.0), square_det(90.0, 85.0, 10.0)];
        let options = LayoutOptions::default();

        let (annotated, plan) = layout_with_plan(&img, &dets, &options);
        assert_eq!(plan, plan_placements(300, 300, &dets, &options));
        assert_eq!(annotated, layout(&img, &dets, &options));

        let (copy, empty) = layout_with_plan(&img, &[], &options);
        assert_eq!(copy, img);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_style_alpha_normalization() {
        let style = MarkerStyle {
            fill_alpha: 0.5,
            outline_alpha: 128.0,
            ..MarkerStyle::default()
        };
        assert_eq!(style.fill()[3], 128);
        assert_eq!(style.outline()[3], 128);
    }
}
