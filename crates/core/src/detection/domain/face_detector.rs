use image::GrayImage;
use thiserror::Error;

use crate::shared::region::Region;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("failed to load detector model: {0}")]
    Model(String),
    #[error("cannot run detection on an empty {width}x{height} raster")]
    EmptyRaster { width: u32, height: u32 },
}

/// Domain interface for face detection.
///
/// Implementations are shared by every in-flight computation, so detection
/// takes `&self` and must be safe to call from several threads at once.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, gray: &GrayImage) -> Result<Vec<Region>, DetectionError>;
}
