// Phase 2: Reading order & numbering

use tracing::{debug, instrument};

use crate::core::types::{Detection, Phase2Output};
use crate::services::sequencing::{assign_bubble_ids, flatten_rows, group_rows};

/// Phase 2 pipeline: sort into rows and number 1..=n
#[derive(Debug, Default)]
pub struct Phase2Pipeline;

impl Phase2Pipeline {
    pub fn new() -> Self {
        Self
    }

    /// Reorder detections top-to-bottom, left-to-right and assign bubble ids
    /// in that order. Ids already present are overwritten.
    #[instrument(skip(self, detections), fields(input = detections.len()))]
    pub fn execute(&self, detections: Vec<Detection>) -> Phase2Output {
        let rows = group_rows(&detections);
        let mut ordered = flatten_rows(detections, &rows);
        assign_bubble_ids(&mut ordered);

        debug!("Phase 2: {} detections in {} rows", ordered.len(), rows.len());

        Phase2Output {
            detections: ordered,
            rows: rows.len(),
        }
    }
}
