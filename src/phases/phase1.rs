// Phase 1: Cleaning & Classification

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::core::config::Config;
use crate::core::types::{Detection, Phase1Output};
use crate::services::cleaning::clean_detections;

/// Phase 1 pipeline: drop noise, keep typed dimension callouts
pub struct Phase1Pipeline {
    config: Arc<Config>,
}

impl Phase1Pipeline {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Execute Phase 1 on the raw detections of one `width x height` image.
    ///
    /// Order is preserved; kept detections carry their `text_type`.
    #[instrument(skip(self, detections), fields(input = detections.len()))]
    pub fn execute(&self, detections: Vec<Detection>, width: u32, height: u32) -> Phase1Output {
        let total = detections.len();
        let kept = clean_detections(detections, width, height, &self.config.cleaning);
        let dropped = total - kept.len();

        debug!(
            "Phase 1: kept {}/{} detections (min conf {:.2})",
            kept.len(),
            total,
            self.config.min_confidence()
        );

        Phase1Output {
            detections: kept,
            dropped,
        }
    }
}
