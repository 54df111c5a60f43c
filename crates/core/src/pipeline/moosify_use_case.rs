use std::sync::Arc;

use bytes::Bytes;
use image::ImageFormat;
use reqwest::Url;
use serde_json::json;
use thiserror::Error;

use super::frame_processor::FrameProcessor;
use super::multi_frame_processor::{FrameEncodingError, MultiFrameProcessor};
use crate::assets::overlay_catalog::OverlayCatalog;
use crate::compositing::compositor::OverlayMode;
use crate::compositing::overlay_asset::OverlayAsset;
use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::detection::domain::region_selector::select_regions;
use crate::media::domain::image_source::{essence, FetchError, FetchedImage, ImageSource};
use crate::media::infrastructure::image_codec::{decode_still, encode_png};
use crate::request::moose_request::{MooseRequest, OverlaySelection};
use crate::shared::constants::ANIMATED_CONTENT_TYPES;
use crate::telemetry::event_sink::{EventKind, EventSink};

#[derive(Error, Debug)]
pub enum ComputationError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error(transparent)]
    Detection(#[from] DetectionError),
    #[error("failed to encode result: {0}")]
    Encoding(#[source] image::ImageError),
    #[error("no face found in overlay image {0}")]
    NoFaceInOverlay(Url),
    #[error("unknown overlay '{0}'")]
    UnknownOverlay(String),
    #[error("animation has more than {0} frames")]
    TooManyFrames(usize),
    #[error("worker failed: {0}")]
    Worker(String),
}

impl From<FrameEncodingError> for ComputationError {
    fn from(err: FrameEncodingError) -> Self {
        match err {
            FrameEncodingError::Decode(e) => Self::Decode(e),
            FrameEncodingError::Detection { source, .. } => Self::Detection(source),
            FrameEncodingError::Encode(e) => Self::Encoding(e),
            FrameEncodingError::TooManyFrames { limit } => Self::TooManyFrames(limit),
        }
    }
}

/// Which pipeline renders a source, decided from its announced content type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderPath {
    Still,
    Animated,
}

/// An encoded composite ready to be served.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedImage {
    pub bytes: Bytes,
    pub content_type: &'static str,
}

/// Cache-miss pipeline: fetch → resolve overlay → detect → composite → encode.
///
/// Every call blocks; run it on a blocking thread.
pub struct MoosifyUseCase {
    source: Arc<dyn ImageSource>,
    catalog: Arc<OverlayCatalog>,
    events: Arc<dyn EventSink>,
    frames: FrameProcessor,
    animations: MultiFrameProcessor,
}

impl MoosifyUseCase {
    pub fn new(
        source: Arc<dyn ImageSource>,
        catalog: Arc<OverlayCatalog>,
        detector: Arc<dyn FaceDetector>,
        events: Arc<dyn EventSink>,
        max_canvas_pixels: u64,
    ) -> Self {
        let frames = FrameProcessor::new(detector, Arc::clone(&catalog), max_canvas_pixels);
        Self {
            source,
            catalog,
            events,
            animations: MultiFrameProcessor::new(frames.clone()),
            frames,
        }
    }

    /// Probes the source. Only an announced animated type selects the
    /// animated path; a failed probe falls back to the still path.
    pub fn render_path(&self, request: &MooseRequest) -> RenderPath {
        match self.source.probe_content_type(request.source()) {
            Ok(Some(content_type))
                if ANIMATED_CONTENT_TYPES.contains(&essence(&content_type).as_str()) =>
            {
                RenderPath::Animated
            }
            Ok(_) => RenderPath::Still,
            Err(e) => {
                log::debug!("Content-type probe failed, assuming a still image: {e}");
                RenderPath::Still
            }
        }
    }

    pub fn execute(
        &self,
        request: &MooseRequest,
        path: RenderPath,
    ) -> Result<RenderedImage, ComputationError> {
        self.events.emit(
            EventKind::NewMoose,
            json!({ "sourceImage": request.source().as_str() }),
        );
        let fetched = self.source.fetch(request.source())?;

        let face_overlay;
        let overlay = match request.overlay() {
            OverlaySelection::None => None,
            OverlaySelection::Named(name) => Some(
                self.catalog
                    .overlay(name)
                    .ok_or_else(|| ComputationError::UnknownOverlay(name.clone()))?,
            ),
            OverlaySelection::Url(url) => {
                face_overlay = self.face_overlay(url)?;
                Some(&face_overlay)
            }
        };
        let mode = OverlayMode {
            debug: request.debug(),
            overlay,
            antlers: request
                .kind()
                .draws_antlers()
                .then(|| self.catalog.antlers()),
        };

        // A failed probe routes GIFs here; the fetched bytes still decide.
        let path = if path == RenderPath::Still && is_animated(&fetched) {
            RenderPath::Animated
        } else {
            path
        };
        match path {
            RenderPath::Still => {
                let frame = decode_still(&fetched.bytes).map_err(ComputationError::Decode)?;
                let canvas = self.frames.process(&frame, &mode, true)?;
                let png = encode_png(&canvas).map_err(ComputationError::Encoding)?;
                Ok(RenderedImage {
                    bytes: Bytes::from(png),
                    content_type: "image/png",
                })
            }
            RenderPath::Animated => {
                let gif = self.animations.process(&fetched.bytes, &mode)?;
                Ok(RenderedImage {
                    bytes: Bytes::from(gif),
                    content_type: "image/gif",
                })
            }
        }
    }

    /// Crops the most prominent face out of the image at `url`.
    fn face_overlay(&self, url: &Url) -> Result<OverlayAsset, ComputationError> {
        let fetched = self.source.fetch(url)?;
        let image = decode_still(&fetched.bytes).map_err(ComputationError::Decode)?;
        let canvas = self.frames.fit_to_canvas(&image);
        let regions = self.frames.detect(&canvas)?;
        select_regions(&regions)
            .first()
            .and_then(|face| OverlayAsset::from_face_crop(&canvas, face))
            .ok_or_else(|| ComputationError::NoFaceInOverlay(url.clone()))
    }
}

fn is_animated(fetched: &FetchedImage) -> bool {
    let announced = fetched
        .content_type
        .as_deref()
        .is_some_and(|ct| ANIMATED_CONTENT_TYPES.contains(&essence(ct).as_str()));
    announced || matches!(image::guess_format(&fetched.bytes), Ok(ImageFormat::Gif))
}
