// Detection input: the seam to the external text-recognition engine

use image::DynamicImage;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::errors::{DetectionError, DetectionResult};
use crate::core::types::{Detection, Point, Quad};

/// Source of recognized text regions for an image
pub trait TextDetector {
    fn detect(&self, image: &DynamicImage) -> DetectionResult<Vec<Detection>>;
}

/// One record as exported by the recognition engine
#[derive(Debug, Deserialize)]
struct RawDetection {
    #[serde(default)]
    text: String,
    #[serde(default = "default_confidence", alias = "confidence")]
    conf: f32,
    #[serde(default, rename = "box", alias = "quad")]
    points: Option<Vec<[f32; 2]>>,
    #[serde(default)]
    center: Option<[f32; 2]>,
    #[serde(default)]
    bubble_id: Option<u32>,
}

fn default_confidence() -> f32 {
    1.0
}

impl RawDetection {
    /// `None` when the record carries neither a usable quad nor a center
    fn into_detection(self) -> Option<Detection> {
        let quad = self
            .points
            .as_deref()
            .and_then(|pts| Quad::from_points(&pts.iter().copied().map(Point::from).collect::<Vec<_>>()));

        if quad.is_none() {
            if let Some(pts) = &self.points {
                debug!("'{}': {} box points, expected 4; quad dropped", self.text, pts.len());
            }
        }

        // a valid quad defines the center; the exported center only stands in without one
        let center = match (quad, self.center) {
            (Some(q), _) => q.centroid(),
            (None, Some(c)) => Point::from(c),
            (None, None) => return None,
        };

        Some(Detection {
            text: self.text,
            confidence: self.conf,
            quad,
            center,
            text_type: None,
            bubble_id: self.bubble_id,
        })
    }
}

/// Detections exported as JSON by the recognition engine.
///
/// The file is read once; `detect` hands out the same records for any image.
#[derive(Debug, Clone)]
pub struct JsonDetections {
    source: Option<PathBuf>,
    detections: Vec<Detection>,
}

impl JsonDetections {
    pub fn from_path(path: &Path) -> DetectionResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| DetectionError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let mut loaded = Self::from_json(&json)?;
        loaded.source = Some(path.to_path_buf());

        info!("Loaded {} detections from {}", loaded.detections.len(), path.display());
        Ok(loaded)
    }

    /// Parse a JSON array of records. Records with no geometry are skipped.
    pub fn from_json(json: &str) -> DetectionResult<Self> {
        let raw: Vec<RawDetection> = serde_json::from_str(json)?;
        let total = raw.len();

        let detections: Vec<Detection> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(i, record)| {
                let text = record.text.clone();
                let det = record.into_detection();
                if det.is_none() {
                    warn!("Skipping detection #{} '{}': no box and no center", i, text);
                }
                det
            })
            .collect();

        if detections.len() < total {
            debug!("Kept {}/{} detection records", detections.len(), total);
        }

        Ok(Self {
            source: None,
            detections,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn into_detections(self) -> Vec<Detection> {
        self.detections
    }
}

impl TextDetector for JsonDetections {
    fn detect(&self, _image: &DynamicImage) -> DetectionResult<Vec<Detection>> {
        Ok(self.detections.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_engine_records() {
        let json = r#"[
            {"text": "12.5", "conf": 0.93, "box": [[0,0],[20,0],[20,10],[0,10]], "center": [10, 5]},
            {"text": "R3", "confidence": 0.8, "quad": [[40,40],[60,40],[60,50],[40,50]]},
            {"text": "⌀6", "center": [7.5, 8.5]}
        ]"#;
        let dets = JsonDetections::from_json(json).unwrap().into_detections();

        assert_eq!(dets.len(), 3);
        assert_eq!(dets[0].confidence, 0.93);
        assert_eq!(dets[0].center, Point::new(10.0, 5.0));
        assert!(dets[0].quad.is_some());

        assert_eq!(dets[1].confidence, 0.8);
        assert_eq!(dets[1].center, Point::new(50.0, 45.0));

        assert_eq!(dets[2].confidence, 1.0);
        assert!(dets[2].quad.is_none());
        assert_eq!(dets[2].center, Point::new(7.5, 8.5));
    }

    #[test]
    fn test_quad_centroid_overrides_exported_center() {
        let json = r#"[
            {"text": "12", "box": [[0,0],[20,0],[20,10],[0,10]], "center": [500, 500]}
        ]"#;
        let dets = JsonDetections::from_json(json).unwrap().into_detections();

        assert_eq!(dets[0].center, Point::new(10.0, 5.0));
        assert_eq!(dets[0].center, dets[0].target());
    }

    #[test]
    fn test_malformed_geometry_is_data() {
        let json = r#"[
            {"text": "5", "box": [[0,0],[1,0],[1,1]], "center": [3, 3]},
            {"text": "6", "box": [[0,0],[1,0]]},
            {"conf": 0.5, "center": [1, 1]}
        ]"#;
        let dets = JsonDetections::from_json(json).unwrap().into_detections();

        // three-point box keeps its center; no box and no center is skipped
        assert_eq!(dets.len(), 2);
        assert!(dets[0].quad.is_none());
        assert_eq!(dets[0].center, Point::new(3.0, 3.0));
        assert_eq!(dets[1].text, "");
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(matches!(
            JsonDetections::from_json("{not json"),
            Err(DetectionError::ParseFailed(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = JsonDetections::from_path(Path::new("/nonexistent/dets.json")).unwrap_err();
        assert!(matches!(err, DetectionError::ReadFailed { .. }));
    }

    #[test]
    fn test_detect_returns_loaded_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dets.json");
        std::fs::write(&path, r#"[{"text": "40", "center": [1, 2], "bubble_id": 9}]"#).unwrap();

        let source = JsonDetections::from_path(&path).unwrap();
        assert_eq!(source.source(), Some(path.as_path()));

        let image = DynamicImage::new_rgba8(4, 4);
        let dets = source.detect(&image).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bubble_id, Some(9));
    }
}
