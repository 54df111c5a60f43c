use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};

use moosificator_core::pipeline::moose_service::{MooseResponse, MooseService};
use moosificator_core::request::moose_request::RawRequest;

/// Names the fallback served in place of a composite.
pub const FALLBACK_HEADER: &str = "x-moose-fallback";

pub fn router(service: Arc<MooseService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/:kind", get(moosify))
        .route("/moose", get(legacy_moose))
        .with_state(service)
}

async fn health(State(service): State<Arc<MooseService>>) -> Json<Value> {
    let (stills, animations) = service.cache_sizes();
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "overlays": service.catalog().names(),
        "cached": { "stills": stills, "animations": animations },
    }))
}

/// `GET /api/{kind}?image=&name=&overlay=&debug=`
async fn moosify(
    State(service): State<Arc<MooseService>>,
    Path(kind): Path<String>,
    query: Option<Query<RawRequest>>,
) -> Response {
    let mut raw = query.map(|Query(raw)| raw).unwrap_or_default();
    raw.kind = Some(kind);
    image_response(service.moosify(&raw).await)
}

/// `GET /moose?image=&debug=`, the single-kind endpoint kept for old clients.
async fn legacy_moose(
    State(service): State<Arc<MooseService>>,
    query: Option<Query<RawRequest>>,
) -> Response {
    let mut raw = query.map(|Query(raw)| raw).unwrap_or_default();
    raw.kind = Some("moose".to_string());
    image_response(service.moosify(&raw).await)
}

/// Every outcome is a 200 with an image body.
fn image_response(response: MooseResponse) -> Response {
    let mut http = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, response.content_type())],
        response.bytes().clone(),
    )
        .into_response();
    if let Some(kind) = response.fallback_kind() {
        http.headers_mut()
            .insert(FALLBACK_HEADER, HeaderValue::from_static(kind.as_str()));
    }
    http
}
