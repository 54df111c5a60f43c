use std::num::NonZeroUsize;
use std::time::Duration;

use super::constants::{
    ANIMATION_CACHE_CAPACITY, FETCH_TIMEOUT, FRAME_CACHE_CAPACITY, MAX_CANVAS_PIXELS, RESULT_TTL,
};

/// Tunables for the result caches and the compositing pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceConfig {
    pub frame_cache_capacity: NonZeroUsize,
    pub animation_cache_capacity: NonZeroUsize,
    pub result_ttl: Duration,
    pub max_canvas_pixels: u64,
    pub fetch_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            frame_cache_capacity: NonZeroUsize::new(FRAME_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            animation_cache_capacity: NonZeroUsize::new(ANIMATION_CACHE_CAPACITY)
                .unwrap_or(NonZeroUsize::MIN),
            result_ttl: RESULT_TTL,
            max_canvas_pixels: MAX_CANVAS_PIXELS,
            fetch_timeout: FETCH_TIMEOUT,
        }
    }
}

/// Knobs forwarded to the SeetaFace detector.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorSettings {
    pub min_face_size: u32,
    pub score_threshold: f64,
    pub pyramid_scale_factor: f32,
    pub window_step: u32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            min_face_size: 20,
            score_threshold: 2.0,
            pyramid_scale_factor: 0.8,
            window_step: 4,
        }
    }
}
