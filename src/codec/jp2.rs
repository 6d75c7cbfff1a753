//! JPEG-2000 decoding with dynamic resolution-level selection.
//!
//! A JP2 codestream carries N discrete wavelet resolution levels; decoding at
//! level k yields `ceil(w / 2^k) x ceil(h / 2^k)` and is dramatically cheaper
//! than decoding at full resolution. For each request we pick the deepest
//! level that still covers the requested output size, then fall back one
//! level at a time when the codestream advertises fewer levels than we asked
//! for. The decode area is always expressed in source (reference grid)
//! coordinates, as the codec expects.

use std::path::Path;

use image::{DynamicImage, GenericImageView, GrayImage, RgbImage};
use jpeg2k::{DecodeArea, DecodeParameters, Image};
use tracing::debug;

use crate::error::TileError;

use super::transform::Rect;
use super::{levels_for, ImageInfo, DEFAULT_TILE_SIZE};

/// Reduction used for header-only reads: deep enough that the pixel payload
/// is negligible, shallow enough that most files can satisfy it after
/// fallback.
const INFO_REDUCE: u32 = 5;

/// Read dimensions and tile hints. Decodes at a deep reduction (with
/// fallback) so the pixel work is negligible; the reported dimensions are the
/// full-resolution reference grid regardless of the level used.
pub fn read_info(path: &Path) -> Result<ImageInfo, TileError> {
    let data = read_file(path)?;
    let image = decode_with_fallback(&data, INFO_REDUCE, None)?;

    let (width, height) = (image.width(), image.height());
    Ok(ImageInfo {
        width,
        height,
        tile_width: Some(DEFAULT_TILE_SIZE),
        tile_height: Some(DEFAULT_TILE_SIZE),
        levels: levels_for(width, height, DEFAULT_TILE_SIZE),
    })
}

/// Decode `region` and scale the result to `out_w` x `out_h`.
pub fn decode_region(
    path: &Path,
    region: Rect,
    out_w: u32,
    out_h: u32,
) -> Result<DynamicImage, TileError> {
    let data = read_file(path)?;

    let level = reduction_level(region.w, region.h, out_w, out_h);
    let image = decode_with_fallback(&data, level, Some(region))?;
    let raster = raster_from_components(&image)?;

    if raster.dimensions() == (out_w, out_h) {
        return Ok(raster);
    }
    Ok(raster.resize_exact(out_w, out_h, image::imageops::FilterType::Triangle))
}

/// The deepest resolution level whose output still covers the requested
/// size: `floor(log2(min(srcW/outW, srcH/outH)))`, clamped at zero.
pub(crate) fn reduction_level(src_w: u32, src_h: u32, out_w: u32, out_h: u32) -> u32 {
    let ratio_w = src_w as f64 / out_w.max(1) as f64;
    let ratio_h = src_h as f64 / out_h.max(1) as f64;
    let ratio = ratio_w.min(ratio_h);
    if ratio <= 1.0 {
        return 0;
    }
    ratio.log2().floor() as u32
}

/// Attempt the decode at `level`, stepping down on failure. Codestreams may
/// advertise fewer resolution levels than requested; only a failure at level
/// zero is terminal. The decode area stays in source coordinates at every
/// level; the codec maps it onto the reduced grid itself.
fn decode_with_fallback(
    data: &[u8],
    level: u32,
    area: Option<Rect>,
) -> Result<Image, TileError> {
    let mut level = level;
    loop {
        let mut params = DecodeParameters::new().reduce(level);
        if let Some(r) = area {
            params = params.decode_area(Some(DecodeArea::new(r.x, r.y, r.x + r.w, r.y + r.h)));
        }
        match Image::from_bytes_with(data, params) {
            Ok(image) => return Ok(image),
            Err(e) if level > 0 => {
                debug!(level, error = %e, "decode failed, retrying one level shallower");
                level -= 1;
            }
            Err(e) => {
                return Err(TileError::decode("decompress", e.to_string()));
            }
        }
    }
}

/// Assemble the decoded components into a raster.
///
/// Fewer than three components is treated as single-channel grayscale; with
/// three or more we take the first three as RGB and ignore alpha and any
/// additional channels. Samples arrive as 32-bit integers and are narrowed to
/// 8 bits by low-byte truncation.
fn raster_from_components(image: &Image) -> Result<DynamicImage, TileError> {
    let comps = image.components();
    let first = comps
        .first()
        .ok_or_else(|| TileError::decode("components", "codestream has no components"))?;

    let width = first.width();
    let height = first.height();
    let area = (width as usize) * (height as usize);

    if comps.len() < 3 {
        let data = first.data();
        if data.len() < area {
            return Err(TileError::decode("components", "short component buffer"));
        }
        let pixels: Vec<u8> = data[..area].iter().map(|v| *v as u8).collect();
        let gray = GrayImage::from_raw(width, height, pixels)
            .ok_or_else(|| TileError::decode("components", "gray raster size mismatch"))?;
        return Ok(DynamicImage::ImageLuma8(gray));
    }

    let red = comps[0].data();
    let green = comps[1].data();
    let blue = comps[2].data();
    if red.len() < area || green.len() < area || blue.len() < area {
        return Err(TileError::decode("components", "short component buffer"));
    }

    let mut pixels = Vec::with_capacity(area * 3);
    for i in 0..area {
        pixels.push(red[i] as u8);
        pixels.push(green[i] as u8);
        pixels.push(blue[i] as u8);
    }
    let rgb = RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| TileError::decode("components", "rgb raster size mismatch"))?;
    Ok(DynamicImage::ImageRgb8(rgb))
}

fn read_file(path: &Path) -> Result<Vec<u8>, TileError> {
    std::fs::read(path).map_err(|e| TileError::decode("open stream", e.to_string()))
}
