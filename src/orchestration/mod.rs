pub mod annotation_pipeline;

pub use annotation_pipeline::{AnnotationOutput, AnnotationPipeline, RunSummary};
