//! Overlay rendering for OCR results
//!
//! Draws an axis-aligned box around every detection and a
//! `"{confidence} {text}"` label above it on a copy of the source bitmap.

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::{debug, info, warn};

use super::{AnnotatedImage, Detection};
use crate::config::AnnotationConfig;

/// Distance of the label's top edge above the box's top edge
const LABEL_OFFSET: i32 = 12;
/// Extra label background size beyond the measured text (width, height)
const LABEL_PADDING: (u32, u32) = (4, 2);

/// Default label font (DejaVu Sans), compiled in so labels render anywhere
const BUILTIN_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Resolve the label font: `configured` first, then the built-in font.
///
/// Returns `None` only if neither parses; labels are then skipped.
pub fn load_label_font(configured: Option<&Path>) -> Option<FontArc> {
    if let Some(path) = configured {
        match read_font(path) {
            Some(font) => return Some(font),
            None => warn!("Configured font {:?} unusable, using built-in font", path),
        }
    }

    match FontArc::try_from_slice(BUILTIN_FONT) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!("Built-in font unusable: {}", e);
            None
        }
    }
}

fn read_font(path: &Path) -> Option<FontArc> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Font {:?} not readable: {}", path, e);
            return None;
        }
    };

    match FontArc::try_from_vec(bytes) {
        Ok(font) => Some(font),
        Err(e) => {
            debug!("Font {:?} not parseable: {}", path, e);
            None
        }
    }
}

/// Renders detection overlays
pub struct Annotator {
    style: AnnotationConfig,
    font: Option<FontArc>,
}

impl Annotator {
    /// Create an annotator, resolving the label font from `style`
    pub fn new(style: AnnotationConfig) -> Self {
        let font = load_label_font(style.font_path.as_deref());
        if font.is_none() {
            warn!("No label font available; only boxes will be drawn");
        }
        Self { style, font }
    }

    /// Draw every detection with `confidence >= min_confidence` onto a copy
    /// of `image`, in list order. `image` is left untouched.
    pub fn annotate(
        &self,
        image: &RgbImage,
        detections: &[Detection],
        min_confidence: f64,
    ) -> AnnotatedImage {
        let mut canvas = image.clone();
        let mut drawn = Vec::new();

        for detection in detections {
            if detection.confidence < min_confidence {
                continue;
            }

            let Some((x0, y0, x1, y1)) = detection.axis_aligned_bounds() else {
                debug!("Skipping detection {:?}: degenerate bbox", detection.text);
                continue;
            };

            self.draw_box(&mut canvas, x0, y0, x1, y1);
            self.draw_label(&mut canvas, &detection.label(), x0, y0);
            drawn.push(detection.clone());
        }

        info!(
            "Annotated {} of {} detections (min confidence {:.2})",
            drawn.len(),
            detections.len(),
            min_confidence
        );

        AnnotatedImage {
            image: canvas,
            detections: drawn,
        }
    }

    /// Outline drawn inward from the box edges, `stroke_width` pixels thick
    fn draw_box(&self, canvas: &mut RgbImage, x0: f64, y0: f64, x1: f64, y1: f64) {
        let color = Rgb(self.style.box_color);
        let (left, top) = (to_px(x0), to_px(y0));
        let width = to_px(x1) - left + 1;
        let height = to_px(y1) - top + 1;

        for inset in 0..self.style.stroke_width as i32 {
            let w = width - 2 * inset;
            let h = height - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(left + inset, top + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(canvas, rect, color);
        }
    }

    fn draw_label(&self, canvas: &mut RgbImage, label: &str, x0: f64, y0: f64) {
        let Some(font) = &self.font else {
            return;
        };

        let (x, y) = label_origin(x0, y0);
        let scale = PxScale::from(self.style.font_scale);
        let (text_w, text_h) = text_size(scale, font, label);

        let background = Rect::at(x, y).of_size(text_w + LABEL_PADDING.0, text_h + LABEL_PADDING.1);
        draw_filled_rect_mut(canvas, background, Rgb(self.style.label_background));
        draw_text_mut(
            canvas,
            Rgb(self.style.label_color),
            x + 2,
            y + 1,
            scale,
            font,
            label,
        );
    }
}

/// Top-left of the label for a box whose top-left is `(x0, y0)`; never above
/// the image's top edge
fn label_origin(x0: f64, y0: f64) -> (i32, i32) {
    (to_px(x0), (to_px(y0) - LABEL_OFFSET).max(0))
}

/// Round to a pixel coordinate, bounded so box arithmetic cannot overflow
fn to_px(v: f64) -> i32 {
    const LIMIT: f64 = (1 << 24) as f64;
    v.round().clamp(-LIMIT, LIMIT) as i32
}
