//! Shared helpers for the integration tests.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::{GenericImageView, Rgb, RgbImage};
use tempfile::TempDir;
use tower::ServiceExt;

use tessera::resolve::ResolverChain;
use tessera::server::{create_router, RouterConfig};
use tessera::service::{ImageService, Maximums};
use tessera::FeatureSet;

/// Public base URL every test router advertises.
pub const PUBLIC_BASE: &str = "http://example.com/iiif";

/// A tempdir-backed tile root plus a router serving it.
pub struct TestServer {
    pub dir: TempDir,
    pub router: Router,
}

/// Write a deterministic RGB gradient PNG into the tile root.
pub fn write_png(root: &Path, name: &str, w: u32, h: u32) {
    gradient(w, h).save(root.join(name)).unwrap();
}

/// The same gradient as raw image data, for pixel comparisons.
pub fn gradient(w: u32, h: u32) -> RgbImage {
    RgbImage::from_fn(w, h, |x, y| {
        Rgb([(x % 251) as u8, (y % 241) as u8, ((x * 7 + y * 3) % 253) as u8])
    })
}

/// Build a server over an empty tile root with native features.
pub fn server() -> TestServer {
    server_with(FeatureSet::native(), 0, Maximums::default())
}

/// Build a server with explicit features, tile-cache capacity, and limits.
pub fn server_with(features: FeatureSet, tile_cache_len: usize, maximums: Maximums) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let chain = ResolverChain::new(dir.path().to_path_buf());
    let service = Arc::new(ImageService::new(
        chain,
        features,
        100,
        tile_cache_len,
        maximums,
    ));
    let router = create_router(service, RouterConfig::from_iiif_url(PUBLIC_BASE));
    TestServer { dir, router }
}

/// Build a router around a caller-assembled service.
pub fn router_for(service: Arc<ImageService>) -> Router {
    create_router(service, RouterConfig::from_iiif_url(PUBLIC_BASE))
}

/// Issue a GET and collect the response.
pub async fn get(router: &Router, path: &str) -> (StatusCode, HeaderMap, Bytes) {
    let request = Request::builder()
        .uri(path)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

/// Issue a GET with an Accept header.
pub async fn get_accept(
    router: &Router,
    path: &str,
    accept: &str,
) -> (StatusCode, HeaderMap, Bytes) {
    let request = Request::builder()
        .uri(path)
        .header("accept", accept)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

/// Content-Type of a response.
pub fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Decode a response body as an image and return its dimensions.
pub fn decoded_dimensions(body: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(body).expect("body should decode as an image");
    (img.width(), img.height())
}
