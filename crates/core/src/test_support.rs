//! Stub collaborators shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use image::{GrayImage, Rgba, RgbaImage};
use parking_lot::Mutex;
use reqwest::Url;
use serde_json::Value;

use crate::assets::fallback::{FallbackImages, FallbackKind};
use crate::assets::overlay_catalog::OverlayCatalog;
use crate::compositing::overlay_asset::{AntlerPair, OverlayAsset};
use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::media::domain::image_source::{FetchError, FetchedImage, ImageSource};
use crate::media::infrastructure::image_codec::encode_png;
use crate::shared::region::Region;
use crate::telemetry::event_sink::{EventKind, EventSink};

pub const MOOSE_GREEN: Rgba<u8> = Rgba([0, 200, 0, 255]);
pub const ANTLER_BLUE: Rgba<u8> = Rgba([0, 0, 220, 255]);
pub const NO_FACE_MAGENTA: Rgba<u8> = Rgba([230, 0, 230, 255]);

pub fn solid(w: u32, h: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(w, h, color)
}

/// Catalog with a solid green "moose" whose anchor covers the whole asset,
/// solid blue antlers and distinctly sized fallbacks (1x1 .. 4x1).
pub fn catalog() -> OverlayCatalog {
    let mut overlays = HashMap::new();
    overlays.insert(
        "Moose".to_string(),
        OverlayAsset::new(solid(10, 10, MOOSE_GREEN), 0.0, 0.0, 10.0),
    );
    overlays.insert(
        "bullwinkle".to_string(),
        OverlayAsset::new(solid(20, 20, MOOSE_GREEN), 0.0, 0.0, 20.0),
    );
    let antlers = AntlerPair::new(solid(4, 8, ANTLER_BLUE), solid(4, 8, ANTLER_BLUE));
    let fallbacks = FallbackImages::encode(
        FallbackKind::ALL
            .into_iter()
            .enumerate()
            .map(|(i, kind)| (kind, solid(i as u32 + 1, 1, Rgba([0, 0, 0, 255]))))
            .collect(),
    )
    .unwrap();
    OverlayCatalog::new(overlays, antlers, solid(10, 10, NO_FACE_MAGENTA), fallbacks).unwrap()
}

/// Detector driven by a closure over the grayscale canvas.
pub struct FnDetector<F> {
    detect: F,
    pub calls: AtomicUsize,
}

impl<F> FnDetector<F>
where
    F: Fn(&GrayImage) -> Vec<Region> + Send + Sync,
{
    pub fn new(detect: F) -> Self {
        Self {
            detect,
            calls: AtomicUsize::new(0),
        }
    }
}

impl<F> FaceDetector for FnDetector<F>
where
    F: Fn(&GrayImage) -> Vec<Region> + Send + Sync,
{
    fn detect(&self, gray: &GrayImage) -> Result<Vec<Region>, DetectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.detect)(gray))
    }
}

/// Detector that reports the same regions for every frame.
pub fn fixed_detector(
    regions: Vec<Region>,
) -> FnDetector<impl Fn(&GrayImage) -> Vec<Region> + Send + Sync> {
    FnDetector::new(move |_: &GrayImage| regions.clone())
}

/// In-memory image host keyed by URL.
#[derive(Default)]
pub struct StubImageSource {
    images: HashMap<Url, FetchedImage>,
    pub fetches: AtomicUsize,
    pub probes: AtomicUsize,
}

impl StubImageSource {
    pub fn with(mut self, url: &str, bytes: Vec<u8>, content_type: &str) -> Self {
        self.images.insert(
            Url::parse(url).unwrap(),
            FetchedImage {
                bytes: Bytes::from(bytes),
                content_type: Some(content_type.to_string()),
            },
        );
        self
    }

    pub fn with_png(self, url: &str, image: &RgbaImage) -> Self {
        self.with(url, encode_png(image).unwrap(), "image/png")
    }
}

impl ImageSource for StubImageSource {
    fn fetch(&self, url: &Url) -> Result<FetchedImage, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.clone()))
    }

    fn probe_content_type(&self, url: &Url) -> Result<Option<String>, FetchError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.images
            .get(url)
            .map(|img| img.content_type.clone())
            .ok_or_else(|| FetchError::NotFound(url.clone()))
    }
}

/// Keeps every emitted event for later assertions.
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<(EventKind, Value)>>,
}

impl RecordingEventSink {
    pub fn events(&self) -> Vec<(EventKind, Value)> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(|(k, _)| *k).collect()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, kind: EventKind, fields: Value) {
        self.events.lock().push((kind, fields));
    }
}
