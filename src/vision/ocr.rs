//! OCR (Optical Character Recognition) module
//!
//! Text detection is an external capability behind `TextDetector`. The
//! production implementation shells out to the system tesseract binary via
//! rusty-tesseract; `StaticDetector` replays a fixed list.

use anyhow::{anyhow, Result};
use image::{DynamicImage, RgbImage};
use rusty_tesseract::{Args, Image};
use std::collections::HashMap;
use tracing::{debug, info};

use super::{Detection, RawDetection};
use crate::config::DetectorConfig;

/// Text detection capability
pub trait TextDetector {
    /// Detect text regions. Output order is the detector's own and is kept
    /// by every downstream stage.
    fn detect(&self, image: &RgbImage) -> Result<Vec<RawDetection>>;
}

/// Tesseract-backed text detector (word granularity)
pub struct TesseractDetector {
    config: DetectorConfig,
}

impl TesseractDetector {
    /// Create a detector; the tesseract binary is resolved on first use
    pub fn new(config: &DetectorConfig) -> Self {
        info!(
            "Initializing tesseract detector (lang={}, psm={:?})",
            config.language, config.psm
        );
        Self {
            config: config.clone(),
        }
    }

    fn args(&self) -> Args {
        Args {
            lang: self.config.language.clone(),
            config_variables: HashMap::new(),
            dpi: self.config.dpi,
            psm: self.config.psm,
            oem: self.config.oem,
        }
    }
}

impl TextDetector for TesseractDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<RawDetection>> {
        debug!(
            "Running tesseract on {}x{} image",
            image.width(),
            image.height()
        );

        let dynamic = DynamicImage::ImageRgb8(image.clone());
        let tess_image = Image::from_dynamic_image(&dynamic)
            .map_err(|e| anyhow!("Failed to create tesseract image: {}", e))?;

        let output = rusty_tesseract::image_to_data(&tess_image, &self.args())
            .map_err(|e| anyhow!("Tesseract OCR failed: {}", e))?;

        let detections: Vec<RawDetection> = output
            .data
            .iter()
            .filter(|word| !word.text.trim().is_empty() && word.conf > 0.0)
            .map(|word| {
                RawDetection::new(
                    word_quad(word.left, word.top, word.width, word.height),
                    word.text.trim(),
                    tesseract_confidence(word.conf),
                )
            })
            .collect();

        info!(
            "Tesseract returned {} entries, {} words",
            output.data.len(),
            detections.len()
        );
        Ok(detections)
    }
}

/// Corners of a tesseract word box, clockwise from top-left
fn word_quad(left: i32, top: i32, width: i32, height: i32) -> Vec<[f64; 2]> {
    let (x0, y0) = (left as f64, top as f64);
    let (x1, y1) = ((left + width) as f64, (top + height) as f64);
    vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]
}

/// Tesseract scores words 0-100
fn tesseract_confidence(conf: f32) -> f64 {
    conf as f64 / 100.0
}

/// Deterministic detector that returns a fixed list
#[derive(Debug, Clone, Default)]
pub struct StaticDetector {
    detections: Vec<RawDetection>,
}

impl StaticDetector {
    pub fn new(detections: Vec<RawDetection>) -> Self {
        Self { detections }
    }

    /// Replay canonical detections, e.g. a previously saved JSON result
    pub fn from_detections(detections: &[Detection]) -> Self {
        let raw = detections
            .iter()
            .map(|d| {
                let points = d.bbox.chunks_exact(2).map(|pair| [pair[0], pair[1]]).collect();
                RawDetection::new(points, d.text.as_str(), d.confidence)
            })
            .collect();
        Self::new(raw)
    }
}

impl TextDetector for StaticDetector {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<RawDetection>> {
        Ok(self.detections.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::normalize;

    #[test]
    fn test_word_quad_clockwise_from_top_left() {
        let quad = word_quad(10, 20, 40, 20);
        assert_eq!(
            quad,
            vec![[10.0, 20.0], [50.0, 20.0], [50.0, 40.0], [10.0, 40.0]]
        );
    }

    #[test]
    fn test_tesseract_confidence_scale() {
        assert!((tesseract_confidence(87.0) - 0.87).abs() < 1e-6);
        assert_eq!(tesseract_confidence(0.0), 0.0);
    }

    #[test]
    fn test_detector_args_follow_config() {
        let detector = TesseractDetector::new(&DetectorConfig {
            language: "eng+spa".to_string(),
            psm: Some(6),
            oem: None,
            dpi: Some(300),
        });
        let args = detector.args();
        assert_eq!(args.lang, "eng+spa");
        assert_eq!(args.psm, Some(6));
        assert_eq!(args.oem, None);
        assert_eq!(args.dpi, Some(300));
    }

    #[test]
    fn test_static_detector_replays_in_order() {
        let raw = vec![
            RawDetection::new(vec![[0.0, 0.0]; 4], "b", 0.2),
            RawDetection::new(vec![[1.0, 1.0]; 4], "a", 0.9),
        ];
        let detector = StaticDetector::new(raw.clone());
        let image = RgbImage::new(2, 2);

        assert_eq!(detector.detect(&image).unwrap(), raw);
    }

    #[test]
    fn test_static_detector_from_detections_round_trips_through_normalize() {
        let saved = vec![Detection {
            text: "SALE".to_string(),
            confidence: 0.87,
            bbox: vec![10.0, 20.0, 50.0, 20.0, 50.0, 40.0, 10.0, 40.0],
        }];
        let detector = StaticDetector::from_detections(&saved);
        let raw = detector.detect(&RgbImage::new(1, 1)).unwrap();

        assert_eq!(raw[0].points.len(), 4);
        assert_eq!(normalize(&raw), saved);
    }
}
