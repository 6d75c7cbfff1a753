//! Remote-resolver behavior over the HTTP surface, with a mock fetcher in
//! place of S3.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use tempfile::TempDir;

use tessera::resolve::{AssetFetcher, ResolverChain, S3Resolver};
use tessera::service::{ImageService, Maximums};
use tessera::{FeatureSet, TileError};

use super::test_utils::{decoded_dimensions, get, gradient, router_for};

/// Fetcher that "downloads" a generated PNG after a short delay, counting
/// every invocation.
struct PngFetcher {
    calls: AtomicUsize,
    delay: Duration,
}

impl PngFetcher {
    fn new(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }
}

#[async_trait]
impl AssetFetcher for PngFetcher {
    async fn fetch(&self, key: &str, dest: &Path) -> Result<(), TileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        if key.contains("missing") {
            return Err(TileError::NotFound(format!("s3:{}", key)));
        }
        gradient(80, 60)
            .save_with_format(dest, image::ImageFormat::Png)
            .map_err(|e| TileError::Fetch(e.to_string()))?;
        Ok(())
    }
}

fn remote_server(fetcher: Arc<PngFetcher>) -> (TempDir, TempDir, axum::Router) {
    let tile_root = tempfile::tempdir().unwrap();
    let s3_cache = tempfile::tempdir().unwrap();

    let mut chain = ResolverChain::new(tile_root.path().to_path_buf());
    chain.push(Arc::new(S3Resolver::new(
        s3_cache.path().to_path_buf(),
        fetcher,
    )));

    let service = Arc::new(ImageService::new(
        chain,
        FeatureSet::native(),
        100,
        0,
        Maximums::default(),
    ));
    (tile_root, s3_cache, router_for(service))
}

#[tokio::test]
async fn test_remote_id_served() {
    let fetcher = Arc::new(PngFetcher::new(Duration::ZERO));
    let (_tiles, _cache, router) = remote_server(fetcher.clone());

    let (status, _, body) = get(
        &router,
        "/iiif/s3%3Abar.png/full/full/0/default.png",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decoded_dimensions(&body), (80, 60));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cached_remote_id_skips_refetch() {
    let fetcher = Arc::new(PngFetcher::new(Duration::ZERO));
    let (_tiles, _cache, router) = remote_server(fetcher.clone());

    let path = "/iiif/s3%3Abar.png/full/full/0/default.png";
    let (status, _, _) = get(&router, path).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = get(&router, path).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_remote_requests_single_flight() {
    let fetcher = Arc::new(PngFetcher::new(Duration::from_millis(50)));
    let (_tiles, _cache, router) = remote_server(fetcher.clone());

    let mut handles = Vec::new();
    for _ in 0..10 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            get(&router, "/iiif/s3%3Ahot.png/full/full/0/default.png").await
        }));
    }

    let mut bodies = Vec::new();
    for handle in handles {
        let (status, _, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        bodies.push(body);
    }

    assert_eq!(
        fetcher.calls.load(Ordering::SeqCst),
        1,
        "exactly one network fetch for ten concurrent requests"
    );
    assert!(
        bodies.windows(2).all(|w| w[0] == w[1]),
        "all ten responses must be byte-identical"
    );
}

#[tokio::test]
async fn test_missing_remote_object_404() {
    let fetcher = Arc::new(PngFetcher::new(Duration::ZERO));
    let (_tiles, _cache, router) = remote_server(fetcher);

    let (status, _, _) = get(
        &router,
        "/iiif/s3%3Amissing.png/full/full/0/default.png",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unprefixed_ids_bypass_remote_resolver() {
    let fetcher = Arc::new(PngFetcher::new(Duration::ZERO));
    let (tiles, _cache, router) = remote_server(fetcher.clone());

    gradient(30, 30).save(tiles.path().join("local.png")).unwrap();

    let (status, _, _) = get(&router, "/iiif/local.png/full/full/0/default.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}
