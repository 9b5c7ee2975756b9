// Phase 4: Export of the annotated image, table and JSON

use image::RgbaImage;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::core::config::Config;
use crate::core::errors::{ErrorContext, PipelineResult};
use crate::core::types::{Detection, Phase4Output};
use crate::services::export::{export_json, export_table, save_image};

/// Phase 4 pipeline: write `<stem>_bubbled.jpg`, `<stem>_dims.csv` and
/// `<stem>_dims.json` into the output directory
pub struct Phase4Pipeline {
    config: Arc<Config>,
}

impl Phase4Pipeline {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    #[instrument(skip(self, image, detections), fields(detections = detections.len()))]
    pub fn execute(
        &self,
        image: &RgbaImage,
        detections: &[Detection],
        stem: &str,
        image_name: &str,
    ) -> PipelineResult<Phase4Output> {
        let out_dir: &Path = self.config.out_dir();

        let image_path = out_dir.join(format!("{}_bubbled.jpg", stem));
        save_image(image, &image_path, self.config.jpeg_quality()).with_image_context(image_name)?;

        let table_path = export_table(detections, &out_dir.join(format!("{}_dims", stem)), image_name)
            .with_image_context(image_name)?;

        let json_path = out_dir.join(format!("{}_dims.json", stem));
        export_json(detections, &json_path).with_image_context(image_name)?;

        info!("✓ Exported {} → {}", image_name, out_dir.display());

        Ok(Phase4Output {
            image_path,
            table_path,
            json_path,
        })
    }
}
