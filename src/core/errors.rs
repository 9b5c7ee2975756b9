// Custom error types for the bubble numbering workflow
//
// Using thiserror for ergonomic error definitions with:
// - Context preservation
// - Type-safe error matching
// - Source error chaining

use std::path::PathBuf;
use thiserror::Error;

/// Errors loading detections from the external recognition engine
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Failed to read detections from {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid detections JSON: {0}")]
    ParseFailed(#[from] serde_json::Error),
}

/// Rendering service errors
#[derive(Debug, Error)]
pub enum RenderingError {
    #[error("Font not found: {family} (searched paths: {paths:?})")]
    FontNotFound { family: String, paths: Vec<String> },

    #[error("Font loading failed: {0}")]
    FontLoadError(String),
}

/// Export errors (table, JSON, annotated image)
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image export failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Pipeline orchestration errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image loading failed for {path}: {source}")]
    ImageLoadFailed {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Detection loading failed for {path}: {source}")]
    DetectionFailed {
        path: PathBuf,
        #[source]
        source: DetectionError,
    },

    #[error("Export failed for {image}: {source}")]
    ExportFailed {
        image: String,
        #[source]
        source: ExportError,
    },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Bubble radius must be > 0, got {0}")]
    InvalidRadius(f32),

    #[error("Label scale must be > 0, got {0}")]
    InvalidTextScale(f32),

    #[error("Alpha must be within [0, 1] or [0, 255], got {0}")]
    InvalidAlpha(f32),

    #[error("Minimum confidence must be finite, got {0}")]
    InvalidConfidenceThreshold(f32),

    #[error("JPEG quality must be in 1..=100, got {0}")]
    InvalidJpegQuality(u8),

    #[error("Invalid color '{0}' (expected #rgb or #rrggbb)")]
    InvalidColor(String),

    #[error("Invalid anchor '{0}' (expected top-left, top-right, bottom-left, bottom-right or auto)")]
    InvalidAnchor(String),

    #[error("Invalid offset '{0}' (expected dx,dy)")]
    InvalidOffset(String),

    #[error("Invalid exclusion zone: {0}")]
    InvalidExclusionZone(String),
}

// Convenience type aliases for Results
pub type DetectionResult<T> = Result<T, DetectionError>;
pub type RenderingResult<T> = Result<T, RenderingError>;
pub type ExportResult<T> = Result<T, ExportError>;
pub type PipelineResult<T> = Result<T, PipelineError>;

// Helper trait for attaching pipeline context to service errors
pub trait ErrorContext<T> {
    fn with_image_context(self, image: &str) -> PipelineResult<T>;
}

impl<T> ErrorContext<T> for ExportResult<T> {
    fn with_image_context(self, image: &str) -> PipelineResult<T> {
        self.map_err(|e| PipelineError::ExportFailed {
            image: image.to_string(),
            source: e,
        })
    }
}
