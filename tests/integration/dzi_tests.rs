//! Deep Zoom surface tests.

use axum::http::StatusCode;

use super::test_utils::{content_type, decoded_dimensions, get, server, write_png};

#[tokio::test]
async fn test_dzi_descriptor() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 600, 400);

    let (status, headers, body) = get(&s.router, "/images/dzi/foo.png.dzi").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type(&headers), "application/xml");

    let xml = String::from_utf8(body.to_vec()).unwrap();
    assert!(xml.contains("Width=\"600\""));
    assert!(xml.contains("Height=\"400\""));
    assert!(xml.contains("Overlap=\"0\""));
    assert!(xml.contains("Format=\"jpg\""));
}

#[tokio::test]
async fn test_dzi_descriptor_unknown_id_404() {
    let s = server();
    let (status, _, _) = get(&s.router, "/images/dzi/ghost.png.dzi").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dzi_top_level_tile_is_whole_image() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 600, 400);

    // max level for 600x400 is ceil(log2(600)) = 10; level 0 is a single
    // tile covering everything
    let (status, headers, body) = get(&s.router, "/images/dzi/foo.png_files/0/0_0.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type(&headers), "image/jpeg");
    let (w, h) = decoded_dimensions(&body);
    assert!(w >= 1 && h >= 1);
    assert!(w <= 2 && h <= 2, "deepest level should be near 1x1: {}x{}", w, h);
}

#[tokio::test]
async fn test_dzi_full_resolution_tile() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 600, 400);

    // Level 10 is full resolution; tile (0,0) covers 512x400
    let (status, _, body) = get(&s.router, "/images/dzi/foo.png_files/10/0_0.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decoded_dimensions(&body), (512, 400));

    // The rightmost tile column is the 88px remainder
    let (status, _, body) = get(&s.router, "/images/dzi/foo.png_files/10/1_0.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decoded_dimensions(&body), (88, 400));
}

#[tokio::test]
async fn test_dzi_half_resolution_tile() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 600, 400);

    // Level 9 halves the image: 300x200, one tile
    let (status, _, body) = get(&s.router, "/images/dzi/foo.png_files/9/0_0.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decoded_dimensions(&body), (300, 200));
}

#[tokio::test]
async fn test_dzi_out_of_range_tile_400() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 600, 400);

    let (status, _, _) = get(&s.router, "/images/dzi/foo.png_files/10/9_9.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = get(&s.router, "/images/dzi/foo.png_files/25/0_0.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dzi_malformed_paths_400() {
    let s = server();
    write_png(s.dir.path(), "foo.png", 600, 400);

    let (status, _, _) = get(&s.router, "/images/dzi/foo.png_files/xx/0_0.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = get(&s.router, "/images/dzi/foo.png_files/10/0-0.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = get(&s.router, "/images/dzi/justsomething").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
