use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;

use super::moosify_use_case::{ComputationError, MoosifyUseCase, RenderPath, RenderedImage};
use crate::assets::fallback::FallbackKind;
use crate::assets::overlay_catalog::OverlayCatalog;
use crate::caching::single_flight_cache::{CacheError, SingleFlightCache};
use crate::detection::domain::face_detector::FaceDetector;
use crate::media::domain::image_source::ImageSource;
use crate::request::moose_request::{MooseRequest, OverlaySelection, RawRequest};
use crate::shared::config::ServiceConfig;
use crate::telemetry::event_sink::{EventKind, EventSink};

/// What a cache slot holds. Failures are cached like successes.
#[derive(Clone, Debug)]
pub enum CachedResult {
    Rendered(Arc<RenderedImage>),
    Failed,
}

/// The image handed back to the client. Never an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MooseResponse {
    Image {
        bytes: Bytes,
        content_type: &'static str,
    },
    Fallback {
        kind: FallbackKind,
        bytes: Bytes,
    },
}

impl MooseResponse {
    pub fn bytes(&self) -> &Bytes {
        match self {
            Self::Image { bytes, .. } | Self::Fallback { bytes, .. } => bytes,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Image { content_type, .. } => content_type,
            Self::Fallback { .. } => "image/png",
        }
    }

    pub fn fallback_kind(&self) -> Option<FallbackKind> {
        match self {
            Self::Image { .. } => None,
            Self::Fallback { kind, .. } => Some(*kind),
        }
    }
}

/// Async entry point: validates, routes to the still or animation cache and
/// maps every outcome to an image.
///
/// Built once at startup and shared behind an `Arc`; everything it holds is
/// read-only apart from the two caches.
pub struct MooseService {
    use_case: Arc<MoosifyUseCase>,
    catalog: Arc<OverlayCatalog>,
    events: Arc<dyn EventSink>,
    stills: SingleFlightCache<MooseRequest, CachedResult>,
    animations: SingleFlightCache<MooseRequest, CachedResult>,
}

impl MooseService {
    pub fn new(
        config: &ServiceConfig,
        catalog: Arc<OverlayCatalog>,
        source: Arc<dyn ImageSource>,
        detector: Arc<dyn FaceDetector>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let use_case = MoosifyUseCase::new(
            source,
            Arc::clone(&catalog),
            detector,
            Arc::clone(&events),
            config.max_canvas_pixels,
        );
        Self {
            use_case: Arc::new(use_case),
            catalog,
            events,
            stills: SingleFlightCache::new(config.frame_cache_capacity, config.result_ttl),
            animations: SingleFlightCache::new(config.animation_cache_capacity, config.result_ttl),
        }
    }

    pub fn catalog(&self) -> &OverlayCatalog {
        &self.catalog
    }

    /// Entries currently held by the (still, animation) caches.
    pub fn cache_sizes(&self) -> (usize, usize) {
        (self.stills.len(), self.animations.len())
    }

    pub async fn moosify(&self, raw: &RawRequest) -> MooseResponse {
        let request = match MooseRequest::build(raw, self.catalog.as_ref()) {
            Ok(request) => request,
            Err(e) => {
                log::debug!("Rejected request {raw:?}: {e}");
                return self.fallback(e.fallback_kind());
            }
        };

        self.events.emit(
            EventKind::MooseRetrieval,
            json!({ "sourceImage": request.source().as_str() }),
        );
        if let OverlaySelection::Url(url) = request.overlay() {
            self.events.emit(
                EventKind::MooseRetrieval,
                json!({ "sourceImage": url.as_str() }),
            );
        }

        // Only a miss pays for the content-type probe.
        let cached = self
            .stills
            .get(&request)
            .or_else(|| self.animations.get(&request));
        if let Some(cached) = cached {
            return self.respond(Ok(cached));
        }

        let path = {
            let use_case = Arc::clone(&self.use_case);
            let request = request.clone();
            tokio::task::spawn_blocking(move || use_case.render_path(&request))
                .await
                .unwrap_or(RenderPath::Still)
        };
        let cache = match path {
            RenderPath::Still => &self.stills,
            RenderPath::Animated => &self.animations,
        };

        let use_case = Arc::clone(&self.use_case);
        let events = Arc::clone(&self.events);
        let key = request.clone();
        let result = cache
            .get_or_compute(key, move || compute(use_case, events, request, path))
            .await;

        self.respond(result)
    }

    fn respond(&self, result: Result<CachedResult, CacheError>) -> MooseResponse {
        match result {
            Ok(CachedResult::Rendered(image)) => MooseResponse::Image {
                bytes: image.bytes.clone(),
                content_type: image.content_type,
            },
            Ok(CachedResult::Failed) => self.fallback(FallbackKind::ServerError),
            Err(e) => {
                log::warn!("Moose computation abandoned: {e}");
                self.fallback(FallbackKind::ServerError)
            }
        }
    }

    fn fallback(&self, kind: FallbackKind) -> MooseResponse {
        MooseResponse::Fallback {
            kind,
            bytes: self.catalog.fallbacks().png(kind),
        }
    }
}

/// Runs the blocking pipeline off the async workers and folds failures into
/// a cacheable value.
async fn compute(
    use_case: Arc<MoosifyUseCase>,
    events: Arc<dyn EventSink>,
    request: MooseRequest,
    path: RenderPath,
) -> CachedResult {
    let source = request.source().to_string();
    let outcome = match tokio::task::spawn_blocking(move || use_case.execute(&request, path)).await
    {
        Ok(outcome) => outcome,
        Err(e) => Err(ComputationError::Worker(e.to_string())),
    };

    match outcome {
        Ok(image) => {
            log::info!(
                "Moosified {source} ({}, {} bytes)",
                image.content_type,
                image.bytes.len()
            );
            CachedResult::Rendered(Arc::new(image))
        }
        Err(e) => {
            log::warn!("Failed to moosify {source}: {e}");
            events.emit(
                EventKind::ErrorMoosificating,
                json!({ "sourceImage": source, "error": e.to_string() }),
            );
            CachedResult::Failed
        }
    }
}
