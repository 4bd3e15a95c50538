//! Vision/OCR Layer
//!
//! Fetches post images, runs text detection over them, normalizes the raw
//! detector output and renders annotated overlays for manual checking.
//!
//! The text detector is an injected capability (`TextDetector`); the
//! tesseract-backed implementation lives in `ocr`.

pub mod annotate;
pub mod detection;
pub mod fetch;
pub mod ocr;
pub mod present;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::http::HttpError;

pub use annotate::Annotator;
pub use detection::normalize;
pub use fetch::{decode, ImageFetcher};
pub use ocr::{StaticDetector, TesseractDetector, TextDetector};
pub use present::{Processed, ResultPresenter};

/// Raw record as emitted by a text detector
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    /// Corner points in detector order (winding not guaranteed)
    pub points: Vec<[f64; 2]>,
    /// Recognized text
    pub text: String,
    /// Detector confidence, nominally 0.0 - 1.0 but not clamped
    pub confidence: f64,
}

impl RawDetection {
    pub fn new(points: Vec<[f64; 2]>, text: impl Into<String>, confidence: f64) -> Self {
        Self {
            points,
            text: text.into(),
            confidence,
        }
    }
}

/// Canonical OCR result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Recognized text
    pub text: String,
    /// Detector confidence, passed through unmodified
    pub confidence: f64,
    /// Flattened quadrilateral `x1,y1,x2,y2,x3,y3,x4,y4` in detector point order
    pub bbox: Vec<f64>,
}

impl Detection {
    /// Axis-aligned bounds `(min_x, min_y, max_x, max_y)` of the quadrilateral.
    ///
    /// Returns `None` when fewer than two points are present or any
    /// coordinate is not finite. Rotation is discarded.
    pub fn axis_aligned_bounds(&self) -> Option<(f64, f64, f64, f64)> {
        if self.bbox.len() < 4 || self.bbox.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let xs = self.bbox.iter().step_by(2);
        let ys = self.bbox.iter().skip(1).step_by(2);

        let min_x = xs.clone().copied().fold(f64::INFINITY, f64::min);
        let max_x = xs.copied().fold(f64::NEG_INFINITY, f64::max);
        let min_y = ys.clone().copied().fold(f64::INFINITY, f64::min);
        let max_y = ys.copied().fold(f64::NEG_INFINITY, f64::max);

        Some((min_x, min_y, max_x, max_y))
    }

    /// Overlay label: confidence to two decimals, then the text
    pub fn label(&self) -> String {
        format!("{:.2} {}", self.confidence, self.text)
    }
}

/// Annotated bitmap plus the detections actually drawn on it
#[derive(Debug, Clone)]
pub struct AnnotatedImage {
    pub image: RgbImage,
    pub detections: Vec<Detection>,
}

/// Errors that abort the pipeline for one image
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("failed to fetch {url}: HTTP {status}")]
    Fetch { url: String, status: u16 },

    #[error("network error: {0}")]
    Network(#[from] HttpError),

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("text detection failed: {0:#}")]
    Detector(anyhow::Error),

    #[error("failed to allocate output file: {0}")]
    Output(#[from] std::io::Error),

    #[error("failed to save annotated image to {path:?}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(bbox: Vec<f64>) -> Detection {
        Detection {
            text: "SALE".to_string(),
            confidence: 0.87,
            bbox,
        }
    }

    #[test]
    fn test_axis_aligned_bounds_of_rotated_quad() {
        // Diamond: rotation is discarded
        let det = detection(vec![30.0, 10.0, 50.0, 30.0, 30.0, 50.0, 10.0, 30.0]);
        assert_eq!(det.axis_aligned_bounds(), Some((10.0, 10.0, 50.0, 50.0)));
    }

    #[test]
    fn test_axis_aligned_bounds_degenerate() {
        assert_eq!(detection(vec![]).axis_aligned_bounds(), None);
        assert_eq!(detection(vec![1.0, 2.0, 3.0]).axis_aligned_bounds(), None);
        assert_eq!(
            detection(vec![1.0, f64::NAN, 3.0, 4.0]).axis_aligned_bounds(),
            None
        );
    }

    #[test]
    fn test_label_format() {
        let det = detection(vec![10.0, 20.0, 50.0, 20.0, 50.0, 40.0, 10.0, 40.0]);
        assert_eq!(det.label(), "0.87 SALE");

        let det = Detection {
            text: "Free pizza".to_string(),
            confidence: 1.0,
            bbox: vec![],
        };
        assert_eq!(det.label(), "1.00 Free pizza");
    }

    #[test]
    fn test_detection_json_shape() {
        let det = detection(vec![10.0, 20.0, 50.0, 20.0, 50.0, 40.0, 10.0, 40.0]);
        let json = serde_json::to_value(&det).unwrap();

        assert_eq!(json["text"], "SALE");
        assert_eq!(json["confidence"], 0.87);
        assert_eq!(json["bbox"].as_array().unwrap().len(), 8);
        assert_eq!(json["bbox"][2], 50.0);
    }
}
