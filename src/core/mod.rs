pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items for convenience
pub use config::Config;
pub use errors::{
    ConfigError, DetectionError, ExportError, PipelineError, RenderingError,
};
pub use types::{
    Bounds, Detection, PerformanceMetrics, Phase1Output, Phase2Output, Phase3Output,
    Phase4Output, Point, Quad, TextType,
};
