//! Request handlers and the error-to-status mapping.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::TileError;
use crate::iiif::{IiifUrl, InfoDocument};
use crate::service::{ImageService, Tile};

// =============================================================================
// Application state
// =============================================================================

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ImageService>,
    /// Path prefix of the IIIF surface, no trailing slash (e.g. `/iiif`).
    pub iiif_prefix: String,
    /// Full public base URL used in info documents and redirects.
    pub public_base: String,
}

// =============================================================================
// Error responses
// =============================================================================

/// JSON body returned for every error condition.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    pub status: u16,
}

fn status_and_slug(err: &TileError) -> (StatusCode, &'static str) {
    match err {
        TileError::Parse(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        TileError::Bounds(_) => (StatusCode::BAD_REQUEST, "out_of_bounds"),
        TileError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        TileError::Unsupported(_) => (StatusCode::NOT_IMPLEMENTED, "unsupported"),
        TileError::Encode {
            supported: false, ..
        } => (StatusCode::NOT_IMPLEMENTED, "unsupported_format"),
        TileError::Encode { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
        TileError::Decode { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "decode_error"),
        TileError::Fetch(_) => (StatusCode::BAD_GATEWAY, "fetch_error"),
    }
}

impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let (status, slug) = status_and_slug(&self);
        let message = self.to_string();

        if status.is_server_error() {
            error!(error_type = slug, status = status.as_u16(), "{}", message);
        } else if status == StatusCode::NOT_FOUND {
            debug!(error_type = slug, status = status.as_u16(), "{}", message);
        } else {
            warn!(error_type = slug, status = status.as_u16(), "{}", message);
        }

        let body = ErrorResponse {
            error: slug,
            message,
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// IIIF surface
// =============================================================================

/// Handle everything under the IIIF prefix: info documents, image requests,
/// and the base-URI redirect.
pub async fn iiif_handler(State(state): State<AppState>, req: Request) -> Response {
    // The raw path keeps percent-encoded slashes inside identifiers intact
    let raw_path = req.uri().path();
    let rest = raw_path
        .strip_prefix(state.iiif_prefix.as_str())
        .unwrap_or(raw_path)
        .trim_matches('/');

    // A bare identifier redirects to its info document
    if !rest.is_empty() && !rest.contains('/') && state.service.features().base_uri_redirect {
        return see_other(format!("{}/{}/info.json", state.public_base, rest));
    }

    let url = match IiifUrl::from_path(rest) {
        Ok(url) => url,
        Err(e) => return TileError::from(e).into_response(),
    };

    if url.info {
        info_response(&state, &url, req.headers()).await
    } else {
        image_response(&state, &url).await
    }
}

async fn info_response(state: &AppState, url: &IiifUrl, headers: &HeaderMap) -> Response {
    let info = match state.service.info(&url.id).await {
        Ok(info) => info,
        Err(e) => return e.into_response(),
    };

    let features = state.service.features();
    let doc = InfoDocument::new(&state.public_base, &url.id, &info, features);

    // JSON-LD only when the feature is on and the client asked for it
    let wants_jsonld = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("ld+json"))
        .unwrap_or(false);
    let content_type = if features.jsonld_media_type && wants_jsonld {
        "application/ld+json"
    } else {
        "application/json"
    };

    match serde_json::to_vec(&doc) {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(e) => TileError::decode("info document", e.to_string()).into_response(),
    }
}

async fn image_response(state: &AppState, url: &IiifUrl) -> Response {
    match state.service.image(url).await {
        Ok(tile) => tile_response(tile),
        Err(e) => e.into_response(),
    }
}

/// Build the successful image response with its media type.
pub fn tile_response(tile: Tile) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, tile.content_type)
        .header("X-Tile-Cache-Hit", if tile.cache_hit { "true" } else { "false" })
        .body(Body::from(tile.data))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn see_other(location: String) -> Response {
    Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header(header::LOCATION, location)
        .body(Body::empty())
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

// =============================================================================
// Version
// =============================================================================

/// Plain-text crate version.
pub async fn version_handler() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
