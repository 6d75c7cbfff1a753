//! IIIF surface tests: info documents, the image pipeline, and status codes.

use axum::http::StatusCode;

use tessera::service::Maximums;
use tessera::FeatureSet;

use super::test_utils::{
    content_type, decoded_dimensions, get, get_accept, server, server_with, write_png,
};

// =============================================================================
// Info documents
// =============================================================================

#[tokio::test]
async fn test_info_document() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 600, 400);

    let (status, headers, body) = get(&s.router, "/iiif/foo.png/info.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type(&headers), "application/json");

    let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(doc["width"], 600);
    assert_eq!(doc["height"], 400);
    assert_eq!(doc["@id"], "http://example.com/iiif/foo.png");
    assert_eq!(doc["protocol"], "http://iiif.io/api/image");
    assert_eq!(
        doc["@context"],
        "http://iiif.io/api/image/2/context.json"
    );
    assert_eq!(doc["profile"][0], "http://iiif.io/api/image/2/level2.json");
}

#[tokio::test]
async fn test_info_document_jsonld_negotiation() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 100, 100);

    let (status, headers, _) = get_accept(
        &s.router,
        "/iiif/foo.png/info.json",
        "application/ld+json",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type(&headers), "application/ld+json");
}

#[tokio::test]
async fn test_info_unknown_id_404() {
    let s = server();
    let (status, _, _) = get(&s.router, "/iiif/ghost.png/info.json").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_base_uri_redirects_to_info() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 100, 100);

    let (status, headers, _) = get(&s.router, "/iiif/foo.png").await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(
        headers.get("location").unwrap(),
        "http://example.com/iiif/foo.png/info.json"
    );
}

// =============================================================================
// Image pipeline
// =============================================================================

#[tokio::test]
async fn test_full_image_request() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 600, 400);

    let (status, headers, body) = get(&s.router, "/iiif/foo.png/full/full/0/default.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type(&headers), "image/jpeg");
    assert_eq!(decoded_dimensions(&body), (600, 400));
}

#[tokio::test]
async fn test_region_size_rotation() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 600, 400);

    // 100x100 crop scaled to 50 wide, then rotated 90 degrees: still 50x50
    let (status, headers, body) =
        get(&s.router, "/iiif/foo.png/0,0,100,100/50,/!90/default.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type(&headers), "image/jpeg");
    assert_eq!(decoded_dimensions(&body), (50, 50));
}

#[tokio::test]
async fn test_percent_region_with_percent_size() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 600, 400);

    // pct:50,50,25,25 of 600x400 = 150x100 at (300,200); pct:10 -> 15x10
    let (status, _, body) =
        get(&s.router, "/iiif/foo.png/pct:50,50,25,25/pct:10/0/default.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decoded_dimensions(&body), (15, 10));
}

#[tokio::test]
async fn test_percent_full_region_equals_full() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 120, 80);

    let (_, _, from_full) = get(&s.router, "/iiif/foo.png/full/full/0/default.png").await;
    let (_, _, from_pct) = get(
        &s.router,
        "/iiif/foo.png/pct:0,0,100,100/full/0/default.png",
    )
    .await;

    let a = image::load_from_memory(&from_full).unwrap();
    let b = image::load_from_memory(&from_pct).unwrap();
    assert_eq!(a.to_rgb8(), b.to_rgb8());
}

#[tokio::test]
async fn test_square_on_portrait() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 300, 400);

    let (status, _, body) = get(&s.router, "/iiif/foo.png/square/100,/0/default.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decoded_dimensions(&body), (100, 100));
}

#[tokio::test]
async fn test_best_fit_fits_width_first_on_landscape() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 600, 400);

    let (status, _, body) = get(&s.router, "/iiif/foo.png/full/!300,300/0/default.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decoded_dimensions(&body), (300, 200));
}

#[tokio::test]
async fn test_exact_size_distorts() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 600, 400);

    let (status, _, body) = get(&s.router, "/iiif/foo.png/full/100,300/0/default.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decoded_dimensions(&body), (100, 300));
}

#[tokio::test]
async fn test_gray_and_bitonal_qualities() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 60, 40);

    let (status, _, body) = get(&s.router, "/iiif/foo.png/full/full/0/gray.png").await;
    assert_eq!(status, StatusCode::OK);
    let gray = image::load_from_memory(&body).unwrap();
    assert!(matches!(gray.color(), image::ColorType::L8));

    let (status, _, body) = get(&s.router, "/iiif/foo.png/full/full/0/bitonal.png").await;
    assert_eq!(status, StatusCode::OK);
    let bitonal = image::load_from_memory(&body).unwrap().to_luma8();
    assert!(bitonal.pixels().all(|p| p[0] == 0 || p[0] == 255));
}

#[tokio::test]
async fn test_arbitrary_rotation_grows_canvas() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 100, 50);

    let (status, _, body) = get(&s.router, "/iiif/foo.png/full/full/45/default.png").await;
    assert_eq!(status, StatusCode::OK);
    let (w, h) = decoded_dimensions(&body);
    assert!((106..=108).contains(&w), "width {}", w);
    assert!((106..=108).contains(&h), "height {}", h);
}

#[tokio::test]
async fn test_output_formats_and_media_types() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 40, 40);

    for (format, expected) in [
        ("jpg", "image/jpeg"),
        ("png", "image/png"),
        ("gif", "image/gif"),
        ("tif", "image/tiff"),
    ] {
        let path = format!("/iiif/foo.png/full/full/0/default.{}", format);
        let (status, headers, _) = get(&s.router, &path).await;
        assert_eq!(status, StatusCode::OK, "format {}", format);
        assert_eq!(content_type(&headers), expected, "format {}", format);
    }
}

#[tokio::test]
async fn test_id_with_encoded_slash() {
    let s = server();
    std::fs::create_dir(s.dir.path().join("book1")).unwrap();
    write_png(s.dir.path(), "book1/page1.png", 50, 50);

    let (status, _, _) = get(
        &s.router,
        "/iiif/book1%2Fpage1.png/full/full/0/default.jpg",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Error statuses
// =============================================================================

#[tokio::test]
async fn test_unknown_id_404() {
    let s = server();
    let (status, _, _) = get(&s.router, "/iiif/ghost.png/full/full/0/default.jpg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_region_400() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 50, 50);

    let (status, _, _) = get(&s.router, "/iiif/foo.png/circle/full/0/default.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = get(&s.router, "/iiif/foo.png/0,0,0,10/full/0/default.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rotation_360_rejected() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 50, 50);

    let (status, _, _) = get(&s.router, "/iiif/foo.png/full/full/360/default.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = get(&s.router, "/iiif/foo.png/full/full/0/default.jpg").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_region_outside_image_400() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 50, 50);

    let (status, _, _) = get(
        &s.router,
        "/iiif/foo.png/100,100,10,10/full/0/default.jpg",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webp_unsupported_at_level1_501() {
    let s = server_with(FeatureSet::level1(), 0, Maximums::default());
    write_png(s.dir.path(), "foo.png", 50, 50);

    let (status, _, _) = get(&s.router, "/iiif/foo.png/full/full/0/default.webp").await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_unknown_quality_501() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 50, 50);

    let (status, _, _) = get(&s.router, "/iiif/foo.png/full/full/0/sepia.jpg").await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_upscale_banned_without_size_above_full() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 50, 50);

    let (status, _, _) = get(&s.router, "/iiif/foo.png/full/pct:400/0/default.jpg").await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_maximums_enforced_400() {
    let s = server_with(
        FeatureSet::native(),
        0,
        Maximums {
            area: u64::MAX,
            width: 100,
            height: 100,
        },
    );
    write_png(s.dir.path(), "foo.png", 200, 200);

    let (status, _, _) = get(&s.router, "/iiif/foo.png/full/full/0/default.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = get(&s.router, "/iiif/foo.png/full/80,/0/default.jpg").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_error_body_is_json() {
    let s = server();
    let (status, headers, body) = get(&s.router, "/iiif/ghost.png/full/full/0/default.jpg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(content_type(&headers).starts_with("application/json"));

    let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(doc["error"], "not_found");
    assert_eq!(doc["status"], 404);
}

// =============================================================================
// Version
// =============================================================================

#[tokio::test]
async fn test_version_endpoint() {
    let s = server();
    let (status, _, body) = get(&s.router, "/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_ref(), env!("CARGO_PKG_VERSION").as_bytes());
}
