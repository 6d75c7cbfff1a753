//! Deep Zoom Image surface.
//!
//! Deep Zoom numbers its pyramid the other way around from the decoder's
//! resolution levels: DZI level 0 is a single pixel and the maximum level
//! (`ceil(log2(max(w, h)))`) is full resolution. Descriptor and tile requests
//! are translated into the same pipeline the IIIF surface uses, so caching
//! and limits apply identically.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::codec::DEFAULT_TILE_SIZE;
use crate::error::TileError;
use crate::iiif::{Format, IiifUrl, Quality, Region, Rotation, Size};

use super::handlers::{tile_response, AppState};

/// Path prefix of the DZI surface.
pub const DZI_PREFIX: &str = "/images/dzi/";

/// Generate the DZI XML descriptor.
pub fn descriptor_xml(width: u32, height: u32, tile_size: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Image xmlns="http://schemas.microsoft.com/deepzoom/2008"
       TileSize="{tile_size}"
       Overlap="0"
       Format="jpg">
  <Size Width="{width}" Height="{height}" />
</Image>"#
    )
}

/// The maximum DZI level for an image: `ceil(log2(max(w, h)))`.
pub fn max_dzi_level(width: u32, height: u32) -> u32 {
    let long_edge = width.max(height);
    if long_edge <= 1 {
        return 0;
    }
    (long_edge as f64).log2().ceil() as u32
}

/// Parse `x_y.jpg` (or bare `x_y`) tile coordinates.
pub fn parse_tile_coords(name: &str) -> Option<(u32, u32)> {
    let name = name
        .strip_suffix(".jpg")
        .or_else(|| name.strip_suffix(".jpeg"))
        .unwrap_or(name);
    let (x, y) = name.split_once('_')?;
    Some((x.parse().ok()?, y.parse().ok()?))
}

/// Handle everything under `/images/dzi/`.
pub async fn dzi_handler(State(state): State<AppState>, req: Request) -> Response {
    let raw_path = req.uri().path();
    let rest = raw_path.strip_prefix(DZI_PREFIX).unwrap_or("");

    if let Some(id_enc) = rest.strip_suffix(".dzi") {
        return descriptor_response(&state, id_enc).await;
    }

    // Tile: {id}_files/{level}/{x}_{y}.jpg
    let Some((id_enc, tail)) = rest.rsplit_once("_files/") else {
        return TileError::Bounds(format!("not a DZI path: {:?}", rest)).into_response();
    };
    let Some((level_str, tile_name)) = tail.split_once('/') else {
        return TileError::Bounds(format!("not a DZI tile path: {:?}", tail)).into_response();
    };
    let (Ok(level), Some((x, y))) = (level_str.parse::<u32>(), parse_tile_coords(tile_name))
    else {
        return TileError::Bounds(format!("bad DZI tile coordinates: {:?}", tail)).into_response();
    };

    tile(&state, id_enc, level, x, y).await
}

async fn descriptor_response(state: &AppState, id_enc: &str) -> Response {
    let id = match decode_id(id_enc) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    let info = match state.service.info(&id).await {
        Ok(info) => info,
        Err(e) => return e.into_response(),
    };

    let tile_size = info.tile_width.unwrap_or(DEFAULT_TILE_SIZE);
    let xml = descriptor_xml(info.width, info.height, tile_size);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/xml")
        .body(Body::from(xml))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn tile(state: &AppState, id_enc: &str, level: u32, x: u32, y: u32) -> Response {
    let id = match decode_id(id_enc) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    let info = match state.service.info(&id).await {
        Ok(info) => info,
        Err(e) => return e.into_response(),
    };

    let tile_size = info.tile_width.unwrap_or(DEFAULT_TILE_SIZE);
    let max_level = max_dzi_level(info.width, info.height);
    if level > max_level {
        return TileError::Bounds(format!(
            "DZI level {} exceeds maximum {}",
            level, max_level
        ))
        .into_response();
    }

    // Each output pixel at this level covers `scale` source pixels
    let scale = 1u64 << (max_level - level);
    let span = scale * tile_size as u64;
    let x0 = x as u64 * span;
    let y0 = y as u64 * span;
    if x0 >= info.width as u64 || y0 >= info.height as u64 {
        return TileError::Bounds(format!("DZI tile ({}, {}) is outside level {}", x, y, level))
            .into_response();
    }

    let rw = span.min(info.width as u64 - x0);
    let rh = span.min(info.height as u64 - y0);
    let out_w = rw.div_ceil(scale).max(1) as u32;
    let out_h = rh.div_ceil(scale).max(1) as u32;

    let url = IiifUrl {
        id,
        region: Region::Pixel {
            x: x0 as f64,
            y: y0 as f64,
            w: rw as f64,
            h: rh as f64,
        },
        size: Size::Exact {
            w: out_w,
            h: out_h,
        },
        rotation: Rotation {
            mirror: false,
            degrees: 0.0,
        },
        quality: Quality::Default,
        format: Format::Jpg,
        info: false,
    };

    match state.service.image(&url).await {
        Ok(tile) => tile_response(tile),
        Err(e) => e.into_response(),
    }
}

fn decode_id(id_enc: &str) -> Result<String, TileError> {
    let id = urlencoding::decode(id_enc)
        .map_err(|_| TileError::Bounds(format!("undecodable id {:?}", id_enc)))?
        .into_owned();
    if id.is_empty() {
        return Err(TileError::NotFound(String::new()));
    }
    Ok(id)
}
