//! Conversion of object-detector output into annotations.
//!
//! The detector itself runs outside the engine; it hands over a list of
//! `{ bbox: [x, y, w, h], class, score }` records in image pixels.

use crate::model::{Annotation, AnnotationKind};
use crate::transform::{Bounds, Point};
use serde::{Deserialize, Serialize};

/// One detector proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// `[x, y, width, height]` in world (image pixel) space.
    pub bbox: [f32; 4],
    pub class: String,
    /// Confidence in `[0, 1]`. Detectors that don't report one get 1.0.
    #[serde(default = "full_confidence")]
    pub score: f32,
}

fn full_confidence() -> f32 {
    1.0
}

impl Detection {
    pub fn new(bbox: [f32; 4], class: impl Into<String>) -> Self {
        Self {
            bbox,
            class: class.into(),
            score: 1.0,
        }
    }

    pub fn bounds(&self) -> Bounds {
        let [x, y, w, h] = self.bbox;
        Bounds::new(Point::new(x, y), Point::new(x + w, y + h))
    }

    /// Convert to a fresh annotation. Returns `None` for zero-area or
    /// non-finite boxes, which must never reach the store.
    pub fn to_annotation(&self) -> Option<Annotation> {
        if self.bbox.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let bounds = self.bounds();
        if bounds.is_degenerate() {
            return None;
        }
        Some(Annotation::new(
            AnnotationKind::Rectangle,
            self.class.clone(),
            bounds,
        ))
    }
}

/// Parse a JSON array of detections.
pub fn parse_detections(json: &str) -> Result<Vec<Detection>, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_becomes_corner_pair() {
        let det = Detection::new([10.0, 20.0, 30.0, 40.0], "car");
        let ann = det.to_annotation().unwrap();
        assert_eq!(ann.bounds.start(), Point::new(10.0, 20.0));
        assert_eq!(ann.bounds.end(), Point::new(40.0, 60.0));
        assert_eq!(ann.name, "car");
        assert_eq!(ann.kind, AnnotationKind::Rectangle);
    }

    #[test]
    fn degenerate_boxes_are_dropped() {
        assert!(Detection::new([5.0, 5.0, 0.0, 10.0], "car").to_annotation().is_none());
        assert!(Detection::new([f32::NAN, 5.0, 3.0, 10.0], "car").to_annotation().is_none());
    }

    #[test]
    fn parse_json_with_optional_score() {
        let json = r#"[
            { "bbox": [0, 0, 10, 10], "class": "person", "score": 0.42 },
            { "bbox": [5, 5, 1, 1], "class": "dog" }
        ]"#;
        let dets = parse_detections(json).unwrap();
        assert_eq!(dets.len(), 2);
        assert!((dets[0].score - 0.42).abs() < 1e-6);
        assert_eq!(dets[1].score, 1.0);
    }
}
