//! Fetch → detect → normalize → annotate → save orchestration

use image::RgbImage;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use super::{normalize, Annotator, Detection, ImageFetcher, TextDetector, VisionError};
use crate::config::OutputConfig;
use crate::storage;

/// Outcome of one pipeline run
#[derive(Debug, Clone)]
pub struct Processed {
    /// Where the annotated image was saved
    pub path: PathBuf,
    /// Every normalized detection, including those below the drawing threshold
    pub detections: Vec<Detection>,
}

/// Runs the OCR pipeline for one image at a time
pub struct ResultPresenter<'a> {
    fetcher: ImageFetcher,
    detector: &'a dyn TextDetector,
    annotator: Annotator,
    output: OutputConfig,
}

impl<'a> ResultPresenter<'a> {
    /// Create a presenter around an already initialized detector
    pub fn new(
        fetcher: ImageFetcher,
        detector: &'a dyn TextDetector,
        annotator: Annotator,
        output: OutputConfig,
    ) -> Self {
        Self {
            fetcher,
            detector,
            annotator,
            output,
        }
    }

    /// Run the full pipeline on `url` and return the annotated image's path
    /// along with the detections.
    ///
    /// A fresh temporary `.png` is allocated when `output_path` is `None`.
    /// Nothing is detected if the download fails.
    pub fn process(
        &self,
        url: &str,
        min_confidence: f64,
        output_path: Option<&Path>,
    ) -> Result<Processed, VisionError> {
        let image = self.fetcher.fetch(url)?;
        self.process_image(&image, min_confidence, output_path)
    }

    /// Pipeline minus the download
    pub fn process_image(
        &self,
        image: &RgbImage,
        min_confidence: f64,
        output_path: Option<&Path>,
    ) -> Result<Processed, VisionError> {
        let detections = self.detect(image)?;
        let path = self.save_annotated(image, &detections, min_confidence, output_path)?;
        Ok(Processed { path, detections })
    }

    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, VisionError> {
        let raw = self.detector.detect(image).map_err(VisionError::Detector)?;
        let detections = normalize(&raw);
        debug!(
            "Normalized {} of {} raw detections",
            detections.len(),
            raw.len()
        );
        Ok(detections)
    }

    fn save_annotated(
        &self,
        image: &RgbImage,
        detections: &[Detection],
        min_confidence: f64,
        output_path: Option<&Path>,
    ) -> Result<PathBuf, VisionError> {
        let annotated = self.annotator.annotate(image, detections, min_confidence);

        let path = match output_path {
            Some(path) => path.to_path_buf(),
            None => storage::temp_output_path(self.output.directory.as_deref())?,
        };

        annotated.image.save(&path).map_err(|source| VisionError::Save {
            path: path.clone(),
            source,
        })?;
        info!(
            "Saved annotated image with {} detections to {:?}",
            annotated.detections.len(),
            path
        );

        if self.output.open_viewer {
            if let Err(e) = open_in_viewer(&path, self.output.viewer.as_deref()) {
                debug!("No image viewer available: {}", e);
            }
        }

        Ok(path)
    }
}

/// Hand `path` to `viewer` (or the platform's default image viewer) without
/// waiting
fn open_in_viewer(path: &Path, viewer: Option<&str>) -> std::io::Result<()> {
    let mut command = match viewer {
        Some(program) => Command::new(program),
        None => platform_viewer(),
    };
    command.arg(path).spawn().map(|_| ())
}

fn platform_viewer() -> Command {
    #[cfg(target_os = "macos")]
    let command = Command::new("open");
    #[cfg(target_os = "windows")]
    let command = {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let command = Command::new("xdg-open");

    command
}
