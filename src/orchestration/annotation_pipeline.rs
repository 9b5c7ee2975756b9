// Annotation pipeline: cleaning → sequencing → layout → export

use image::{DynamicImage, RgbaImage};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::core::config::Config;
use crate::core::errors::{PipelineError, PipelineResult};
use crate::core::types::{Detection, PerformanceMetrics, Phase4Output};
use crate::phases::{Phase1Pipeline, Phase2Pipeline, Phase3Pipeline, Phase4Pipeline};
use crate::services::detection::{JsonDetections, TextDetector};
use crate::utils::image_ops::load_dynamic_image;

/// In-memory result of one annotation pass
#[derive(Debug, Clone)]
pub struct AnnotationOutput {
    pub image: RgbaImage,
    /// Kept detections in reading order, numbered from 1
    pub detections: Vec<Detection>,
    pub metrics: PerformanceMetrics,
}

/// Result of annotating and exporting one image file
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub files: Phase4Output,
    pub metrics: PerformanceMetrics,
}

/// Main pipeline coordinator
pub struct AnnotationPipeline {
    config: Arc<Config>,
    phase1: Phase1Pipeline,
    phase2: Phase2Pipeline,
    phase3: Phase3Pipeline,
    phase4: Phase4Pipeline,
}

impl AnnotationPipeline {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            phase1: Phase1Pipeline::new(config.clone()),
            phase2: Phase2Pipeline::new(),
            phase3: Phase3Pipeline::new(config.clone()),
            phase4: Phase4Pipeline::new(config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run phases 1-3 on an in-memory image. The input image is not modified.
    #[instrument(skip(self, image, detections), fields(
        width = image.width(),
        height = image.height(),
        detections = detections.len()
    ))]
    pub fn annotate(&self, image: &RgbaImage, detections: Vec<Detection>) -> AnnotationOutput {
        let mut metrics = PerformanceMetrics {
            detections_in: detections.len(),
            ..PerformanceMetrics::default()
        };

        let start = Instant::now();
        let phase1 = self.phase1.execute(detections, image.width(), image.height());
        metrics.cleaning_time = start.elapsed();
        metrics.detections_kept = phase1.detections.len();

        if phase1.detections.is_empty() && metrics.detections_in > 0 {
            warn!("All {} detections were filtered out", metrics.detections_in);
        }

        let start = Instant::now();
        let phase2 = self.phase2.execute(phase1.detections);
        metrics.sequencing_time = start.elapsed();
        metrics.rows = phase2.rows;

        let start = Instant::now();
        let phase3 = self.phase3.execute(image, &phase2.detections);
        metrics.layout_time = start.elapsed();
        metrics.overlap_fallbacks = phase3.overlap_fallbacks;
        metrics.connectors_drawn = phase3.connectors_drawn;

        AnnotationOutput {
            image: phase3.image,
            detections: phase2.detections,
            metrics,
        }
    }

    /// Detect on a decoded image, annotate, and export under `stem`
    pub fn run_with_detector(
        &self,
        image: &DynamicImage,
        detector: &dyn TextDetector,
        stem: &str,
        image_name: &str,
    ) -> PipelineResult<RunSummary> {
        let detections = detector
            .detect(image)
            .map_err(|source| PipelineError::DetectionFailed {
                path: image_name.into(),
                source,
            })?;

        let output = self.annotate(&image.to_rgba8(), detections);
        let mut metrics = output.metrics;

        let start = Instant::now();
        let files = self
            .phase4
            .execute(&output.image, &output.detections, stem, image_name)?;
        metrics.export_time = start.elapsed();

        log_metrics(image_name, &metrics);
        Ok(RunSummary { files, metrics })
    }

    /// Load an image and its exported detections, annotate, and write
    /// `<stem>_bubbled.jpg`, `<stem>_dims.csv` and `<stem>_dims.json`.
    #[instrument(skip(self))]
    pub fn run_files(&self, image_path: &Path, detections_path: &Path) -> PipelineResult<RunSummary> {
        let image = load_dynamic_image(image_path)?;
        let detector =
            JsonDetections::from_path(detections_path).map_err(|source| PipelineError::DetectionFailed {
                path: detections_path.to_path_buf(),
                source,
            })?;

        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let image_name = image_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| stem.clone());

        self.run_with_detector(&image, &detector, &stem, &image_name)
    }
}

fn log_metrics(image_name: &str, metrics: &PerformanceMetrics) {
    info!(
        "✓ {}: {}/{} detections, {} rows, {} connectors, {} overlap fallbacks in {:.2}ms",
        image_name,
        metrics.detections_kept,
        metrics.detections_in,
        metrics.rows,
        metrics.connectors_drawn,
        metrics.overlap_fallbacks,
        metrics.total_time().as_secs_f64() * 1000.0
    );
    info!(
        "  cleaning {:.2}ms | sequencing {:.2}ms | layout {:.2}ms | export {:.2}ms",
        metrics.cleaning_time.as_secs_f64() * 1000.0,
        metrics.sequencing_time.as_secs_f64() * 1000.0,
        metrics.layout_time.as_secs_f64() * 1000.0,
        metrics.export_time.as_secs_f64() * 1000.0
    );
}
