pub mod classification;
pub mod cleaning;
pub mod detection;
pub mod export;
pub mod layout;
pub mod rendering;
pub mod sequencing;

// Re-export commonly used services
pub use classification::classify_text;
pub use cleaning::{clean_detections, default_exclusion_zones};
pub use detection::{JsonDetections, TextDetector};
pub use export::{export_json, export_table, save_image};
pub use layout::{layout, plan_placements, Anchor, LayoutOptions, MarkerStyle, Offset, Placement};
pub use rendering::MarkerRenderer;
pub use sequencing::{assign_bubble_ids, group_rows, sequence};
