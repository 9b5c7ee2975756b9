// Phase 3: Bubble layout & rendering

use image::RgbaImage;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::core::config::Config;
use crate::core::types::{Detection, Phase3Output};
use crate::services::layout::{layout_with_plan, LayoutOptions};

/// Phase 3 pipeline: place numbered bubbles and draw them
pub struct Phase3Pipeline {
    options: LayoutOptions,
}

impl Phase3Pipeline {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            options: config.layout_options(),
        }
    }

    pub fn with_options(options: LayoutOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Annotate a copy of `image`; the input is left untouched.
    ///
    /// The renderer (and its font system) lives only for this call.
    #[instrument(skip(self, image, detections), fields(
        width = image.width(),
        height = image.height(),
        detections = detections.len()
    ))]
    pub fn execute(&self, image: &RgbaImage, detections: &[Detection]) -> Phase3Output {
        if detections.is_empty() {
            debug!("Phase 3: nothing to place");
        }

        let (annotated, placements) = layout_with_plan(image, detections, &self.options);
        let overlap_fallbacks = placements.iter().filter(|p| p.overlap_fallback).count();
        let connectors_drawn = placements.iter().filter(|p| p.connector.is_some()).count();

        debug!(
            "Phase 3: {} bubbles, {} connectors, {} overlap fallbacks",
            placements.len(),
            connectors_drawn,
            overlap_fallbacks
        );

        Phase3Output {
            image: annotated,
            overlap_fallbacks,
            connectors_drawn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Point, Quad};
    use crate::services::layout::{layout, Offset};
    use image::Rgba;

    #[test]
    fn test_empty_detections_return_identical_copy() {
        let image = RgbaImage::from_pixel(20, 10, Rgba([9, 8, 7, 255]));
        let out = Phase3Pipeline::new(Arc::new(Config::default())).execute(&image, &[]);
        assert_eq!(out.image, image);
        assert_eq!(out.connectors_drawn, 0);
    }

    #[test]
    fn test_counts_connectors() {
        let image = RgbaImage::from_pixel(400, 400, Rgba([255, 255, 255, 255]));
        let quad = Quad([
            Point::new(200.0, 200.0),
            Point::new(240.0, 200.0),
            Point::new(240.0, 220.0),
            Point::new(200.0, 220.0),
        ]);
        let dets = vec![Detection::from_quad("30", 0.9, quad)];
        let phase = Phase3Pipeline::with_options(LayoutOptions {
            offset: Offset { dx: 50.0, dy: -60.0 },
            ..LayoutOptions::default()
        });

        let out = phase.execute(&image, &dets);
        assert_eq!(out.connectors_drawn, 1);
        assert_eq!(out.overlap_fallbacks, 0);
        assert_ne!(out.image, image);
        assert_eq!(out.image, layout(&image, &dets, phase.options()));
    }
}
