use std::path::Path;

use image::GrayImage;

use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::shared::config::DetectorSettings;
use crate::shared::region::Region;

/// Face detector backed by the `rustface` crate (SeetaFace engine).
///
/// The model is parsed once and shared read-only. `rustface` detectors are
/// stateful and not `Sync`, so each call builds a short-lived detector from a
/// clone of the model.
pub struct RustfaceDetector {
    model: rustface::Model,
    settings: DetectorSettings,
}

impl RustfaceDetector {
    pub fn from_file(path: &Path, settings: DetectorSettings) -> Result<Self, DetectionError> {
        let bytes = std::fs::read(path)
            .map_err(|e| DetectionError::Model(format!("{}: {e}", path.display())))?;
        Self::from_bytes(&bytes, settings)
    }

    pub fn from_bytes(bytes: &[u8], settings: DetectorSettings) -> Result<Self, DetectionError> {
        let model = rustface::read_model(std::io::Cursor::new(bytes))
            .map_err(|e| DetectionError::Model(e.to_string()))?;
        Ok(Self { model, settings })
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(&self, gray: &GrayImage) -> Result<Vec<Region>, DetectionError> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectionError::EmptyRaster { width, height });
        }

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.settings.min_face_size);
        detector.set_score_thresh(self.settings.score_threshold);
        detector.set_pyramid_scale_factor(self.settings.pyramid_scale_factor);
        detector.set_slide_window_step(self.settings.window_step, self.settings.window_step);

        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));
        log::debug!("SeetaFace found {} candidate(s) in {width}x{height}", faces.len());

        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                Region::new(bbox.x(), bbox.y(), bbox.width() as i32, bbox.height() as i32)
            })
            .filter(|r| r.width > 0 && r.height > 0)
            .collect())
    }
}
