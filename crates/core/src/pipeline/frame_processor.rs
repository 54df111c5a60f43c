use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::assets::overlay_catalog::OverlayCatalog;
use crate::compositing::compositor::{Compositor, OverlayMode};
use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::detection::domain::region_selector::select_regions;
use crate::shared::region::Region;

/// Largest canvas that fits `cap` pixels with the frame's aspect ratio.
///
/// Frames already within the cap keep their size. Each side is at least 1.
pub fn canvas_size(width: u32, height: u32, cap: u64) -> (u32, u32) {
    let pixels = width as u64 * height as u64;
    if pixels <= cap || pixels == 0 {
        return (width, height);
    }
    let factor = (cap as f64 / pixels as f64).sqrt();
    let scale = |side: u32| ((side as f64 * factor) as u32).max(1);
    (scale(width), scale(height))
}

/// Detect, dedupe and decorate a single raster frame.
#[derive(Clone)]
pub struct FrameProcessor {
    detector: Arc<dyn FaceDetector>,
    catalog: Arc<OverlayCatalog>,
    compositor: Arc<Compositor>,
    max_canvas_pixels: u64,
}

impl FrameProcessor {
    pub fn new(
        detector: Arc<dyn FaceDetector>,
        catalog: Arc<OverlayCatalog>,
        max_canvas_pixels: u64,
    ) -> Self {
        Self {
            detector,
            catalog,
            compositor: Arc::new(Compositor::default()),
            max_canvas_pixels,
        }
    }

    /// Copy of `frame` resampled down to the canvas cap, if it exceeds it.
    pub fn fit_to_canvas(&self, frame: &RgbaImage) -> RgbaImage {
        let (w, h) = frame.dimensions();
        let (cw, ch) = canvas_size(w, h, self.max_canvas_pixels);
        if (cw, ch) == (w, h) {
            frame.clone()
        } else {
            imageops::resize(frame, cw, ch, FilterType::Triangle)
        }
    }

    /// Detects faces on the canvas-sized frame. Regions are in canvas space.
    pub fn detect(&self, canvas: &RgbaImage) -> Result<Vec<Region>, DetectionError> {
        let gray = imageops::grayscale(canvas);
        self.detector.detect(&gray)
    }

    /// Returns the decorated canvas.
    ///
    /// With no detections the canvas either gets the "no face found" badge
    /// (`allow_fallback`) or comes back undecorated.
    pub fn process(
        &self,
        frame: &RgbaImage,
        mode: &OverlayMode<'_>,
        allow_fallback: bool,
    ) -> Result<RgbaImage, DetectionError> {
        let mut canvas = self.fit_to_canvas(frame);
        let regions = self.detect(&canvas)?;

        if regions.is_empty() {
            if allow_fallback {
                self.compositor
                    .draw_centered(&mut canvas, self.catalog.no_face_found());
            }
            return Ok(canvas);
        }

        for region in select_regions(&regions) {
            self.compositor.draw_overlay(&mut canvas, &region, mode);
        }
        Ok(canvas)
    }
}
