use std::time::Duration;

pub const SEETA_MODEL_NAME: &str = "seeta_fd_frontal_v1.0.bin";
pub const SEETA_MODEL_URL: &str =
    "https://github.com/atomashpolskiy/rustface/raw/master/model/seeta_fd_frontal_v1.0.bin";

/// Canvas pixel cap (~1080p). Larger sources are downscaled before compositing.
pub const MAX_CANVAS_PIXELS: u64 = 2_073_600;

/// Overlay name used by plain moose requests.
pub const DEFAULT_OVERLAY_NAME: &str = "moose";

pub const FRAME_CACHE_CAPACITY: usize = 20;
pub const ANIMATION_CACHE_CAPACITY: usize = 5;
pub const RESULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Longer animations are rejected rather than rendered.
pub const MAX_ANIMATION_FRAMES: usize = 1_000;

pub const ANIMATED_CONTENT_TYPES: &[&str] = &["image/gif"];

pub const ASSET_MANIFEST_NAME: &str = "overlays.json";
