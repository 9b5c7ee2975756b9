// Library exports for the bubble numbering workflow
//
// Recognized dimension text is cleaned, sorted into reading order and
// annotated with numbered bubbles; results are exported as image, CSV and JSON.

// Core modules
pub mod core;
pub mod orchestration;
pub mod phases;
pub mod services;
pub mod utils;

// Re-export commonly used types and functions
pub use core::{
    config::Config,
    errors::{ConfigError, DetectionError, ExportError, PipelineError, RenderingError},
    types::{
        Bounds, Detection, PerformanceMetrics, Phase1Output, Phase2Output, Phase3Output,
        Phase4Output, Point, Quad, TextType,
    },
};

pub use orchestration::{AnnotationOutput, AnnotationPipeline, RunSummary};

pub use services::{
    classify_text, clean_detections, layout, plan_placements, sequence, Anchor, JsonDetections,
    LayoutOptions, MarkerRenderer, MarkerStyle, Offset, Placement, TextDetector,
};

pub use utils::{load_image, load_image_from_memory};
