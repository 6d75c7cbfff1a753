//! Generic decode path for PNG, JPEG, TIFF, and GIF sources.
//!
//! These formats have no cheap region decode, so the whole image is decoded
//! and then cropped. Header reads stay cheap via `image::image_dimensions`.

use std::path::Path;

use image::{DynamicImage, GenericImageView, ImageReader};

use crate::error::TileError;

use super::transform::Rect;
use super::ImageInfo;

/// Read dimensions from the image header without decoding pixel data.
pub fn read_info(path: &Path) -> Result<ImageInfo, TileError> {
    let (width, height) = image::image_dimensions(path)
        .map_err(|e| TileError::decode("read header", e.to_string()))?;
    Ok(ImageInfo {
        width,
        height,
        tile_width: None,
        tile_height: None,
        levels: 1,
    })
}

/// Decode, crop to `region`, and scale to `out_w` x `out_h`.
pub fn decode_region(
    path: &Path,
    region: Rect,
    out_w: u32,
    out_h: u32,
) -> Result<DynamicImage, TileError> {
    let img = ImageReader::open(path)
        .map_err(|e| TileError::decode("open stream", e.to_string()))?
        .decode()
        .map_err(|e| TileError::decode("decompress", e.to_string()))?;

    let cropped = img.crop_imm(region.x, region.y, region.w, region.h);
    if cropped.width() == out_w && cropped.height() == out_h {
        return Ok(cropped);
    }
    Ok(cropped.resize_exact(out_w, out_h, image::imageops::FilterType::Triangle))
}
