//! Router assembly.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::service::ImageService;

use super::dzi::dzi_handler;
use super::handlers::{iiif_handler, version_handler, AppState};

/// Cap on the time allowed to produce a complete response.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Public IIIF base URL, e.g. `http://example.com/iiif`.
    pub public_base: String,
    /// Path prefix extracted from `public_base`, no trailing slash.
    pub iiif_prefix: String,
}

impl RouterConfig {
    /// Derive the router configuration from the public IIIF URL.
    pub fn from_iiif_url(iiif_url: &str) -> Self {
        let public_base = iiif_url.trim_end_matches('/').to_string();
        let iiif_prefix = path_of(&public_base);
        Self {
            public_base,
            iiif_prefix,
        }
    }
}

/// The path component of an absolute URL (empty for a bare host).
fn path_of(url: &str) -> String {
    let after_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    match after_scheme.find('/') {
        Some(idx) => after_scheme[idx..].trim_end_matches('/').to_string(),
        None => String::new(),
    }
}

/// Build the application router.
///
/// The IIIF surface hangs off the configured prefix as a wildcard so
/// identifiers with encoded slashes reach the handler unrouted; `/version`
/// and the DZI surface are fixed routes.
pub fn create_router(service: Arc<ImageService>, config: RouterConfig) -> Router {
    let cors_enabled = service.features().cors;

    let state = AppState {
        service,
        iiif_prefix: config.iiif_prefix.clone(),
        public_base: config.public_base,
    };

    let iiif_route = if config.iiif_prefix.is_empty() {
        "/{*rest}".to_string()
    } else {
        format!("{}/{{*rest}}", config.iiif_prefix)
    };

    let mut router = Router::new()
        .route("/version", get(version_handler))
        .route("/images/dzi/{*rest}", get(dzi_handler))
        .route(&iiif_route, get(iiif_handler))
        .with_state(state)
        .layer(TimeoutLayer::new(RESPONSE_TIMEOUT))
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        router = router.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any));
    }

    router
}
