//! Cache behavior over the HTTP surface.

use axum::http::StatusCode;

use tessera::service::Maximums;
use tessera::FeatureSet;

use super::test_utils::{get, server, server_with, write_png};

#[tokio::test]
async fn test_tile_cache_replay_byte_identical() {
    let s = server_with(FeatureSet::native(), 32, Maximums::default());
    write_png(s.dir.path(), "foo.png", 120, 80);

    let path = "/iiif/foo.png/square/64,/90/gray.jpg";

    let (status, headers, first) = get(&s.router, path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("x-tile-cache-hit").unwrap(), "false");

    let (status, headers, second) = get(&s.router, path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("x-tile-cache-hit").unwrap(), "true");

    assert_eq!(first, second, "replay must be byte-identical");
}

#[tokio::test]
async fn test_tile_cache_differentiates_formats() {
    let s = server_with(FeatureSet::native(), 32, Maximums::default());
    write_png(s.dir.path(), "foo.png", 60, 60);

    let (_, headers, _) = get(&s.router, "/iiif/foo.png/full/full/0/default.jpg").await;
    assert_eq!(headers.get("x-tile-cache-hit").unwrap(), "false");

    // Same operations, different format: its own slot
    let (_, headers, body) = get(&s.router, "/iiif/foo.png/full/full/0/default.png").await;
    assert_eq!(headers.get("x-tile-cache-hit").unwrap(), "false");
    assert_eq!(&body[..4], &[0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn test_disabled_tile_cache_never_hits() {
    let s = server(); // tile cache length 0
    write_png(s.dir.path(), "foo.png", 60, 60);

    let path = "/iiif/foo.png/full/full/0/default.jpg";
    let (_, headers, first) = get(&s.router, path).await;
    assert_eq!(headers.get("x-tile-cache-hit").unwrap(), "false");

    let (_, headers, second) = get(&s.router, path).await;
    assert_eq!(headers.get("x-tile-cache-hit").unwrap(), "false");

    // Still deterministic output even without the cache
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_info_served_after_source_removal() {
    // The info cache keeps header facts alive without re-reading the file
    let s = server();
    write_png(s.dir.path(), "foo.png", 90, 60);

    let (status, _, body) = get(&s.router, "/iiif/foo.png/info.json").await;
    assert_eq!(status, StatusCode::OK);
    let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(doc["width"], 90);

    // Swap the file for garbage; the cached info must still answer
    std::fs::write(s.dir.path().join("foo.png"), b"not a png").unwrap();
    let (status, _, body) = get(&s.router, "/iiif/foo.png/info.json").await;
    assert_eq!(status, StatusCode::OK);
    let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(doc["width"], 90);
}
