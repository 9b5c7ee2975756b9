// Detection cleaning: confidence, classification and exclusion-zone filters

use tracing::debug;

use crate::core::config::CleaningConfig;
use crate::core::types::{Bounds, Detection};
use crate::services::classification::classify_text;

/// Outer margin as a fraction of each image dimension
const MARGIN_RATIO: f32 = 0.025;
/// Border bars where frame rulers and grid labels usually sit
const TOP_BAR_RATIO: f32 = 0.06;
const LEFT_BAR_RATIO: f32 = 0.06;
const BOTTOM_BAR_START: f32 = 0.94;
const RIGHT_BAR_START: f32 = 0.96;
/// Title block occupies the bottom-right corner from here on
const TITLE_BLOCK_START: f32 = 0.62;

fn rect(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Bounds {
    Bounds {
        min_x,
        min_y,
        max_x,
        max_y,
    }
}

/// Frame margins, border bars and the title block of a `width x height` sheet
pub fn default_exclusion_zones(width: u32, height: u32) -> Vec<Bounds> {
    let (w, h) = (width as f32, height as f32);
    let m = MARGIN_RATIO;

    vec![
        rect(0.0, 0.0, m * w, h),
        rect(0.0, 0.0, w, m * h),
        rect((1.0 - m) * w, 0.0, w, h),
        rect(0.0, (1.0 - m) * h, w, h),
        rect(0.0, 0.0, w, TOP_BAR_RATIO * h),
        rect(0.0, 0.0, LEFT_BAR_RATIO * w, h),
        rect(0.0, BOTTOM_BAR_START * h, w, h),
        rect(RIGHT_BAR_START * w, 0.0, w, h),
        rect(TITLE_BLOCK_START * w, TITLE_BLOCK_START * h, w, h),
    ]
}

/// Zones applied to an image: defaults (when enabled) followed by user zones
pub fn exclusion_zones(width: u32, height: u32, config: &CleaningConfig) -> Vec<Bounds> {
    let mut zones = if config.default_zones {
        default_exclusion_zones(width, height)
    } else {
        Vec::new()
    };
    zones.extend(config.exclude_zones.iter().copied());
    zones
}

/// Keep dimension callouts worth numbering, in their original order.
///
/// Drops a bare "0", low-confidence and unclassifiable text, and anything
/// centered inside an exclusion zone unless it is a radius, diameter or
/// angle. Kept detections get their `text_type` set.
pub fn clean_detections(
    detections: Vec<Detection>,
    width: u32,
    height: u32,
    config: &CleaningConfig,
) -> Vec<Detection> {
    let zones = exclusion_zones(width, height, config);

    detections
        .into_iter()
        .filter_map(|mut det| {
            let text = det.text.trim();
            if text == "0" {
                debug!("Dropped '{}': bare zero", det.text);
                return None;
            }
            if det.confidence < config.min_confidence {
                debug!("Dropped '{}': conf {:.3} < {:.3}", det.text, det.confidence, config.min_confidence);
                return None;
            }
            let Some(text_type) = classify_text(text) else {
                debug!("Dropped '{}': not a dimension", det.text);
                return None;
            };
            if !text_type.survives_exclusion() && zones.iter().any(|z| z.contains(det.center)) {
                debug!(
                    "Dropped '{}' ({}) at ({:.1}, {:.1}): exclusion zone",
                    det.text, text_type, det.center.x, det.center.y
                );
                return None;
            }

            det.text_type = Some(text_type);
            Some(det)
        })
        .collect()
}
