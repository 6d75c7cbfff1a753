//! Image decoding and encoding.
//!
//! Two decoders sit behind one capability: a native JPEG-2000 path that
//! exploits the codestream's discrete resolution levels, and a generic path
//! for PNG/TIFF/JPEG/GIF sources backed by the `image` crate. Dispatch is by
//! file extension.

pub mod encode;
pub mod generic;
pub mod jp2;
pub mod transform;

use std::path::Path;

use image::DynamicImage;

use crate::error::TileError;

pub use encode::encode;
pub use transform::{apply_quality, apply_rotation, output_size, region_rect, Rect};

/// Tile edge advertised in info documents and used for level hints.
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// Header-level facts about a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Tile hints for viewers; absent for flat (non-pyramidal) sources.
    pub tile_width: Option<u32>,
    pub tile_height: Option<u32>,
    /// Number of usable resolution levels, full resolution included.
    pub levels: u32,
}

impl ImageInfo {
    /// Powers-of-two scale factors, one per resolution level.
    pub fn scale_factors(&self) -> Vec<u32> {
        (0..self.levels).map(|i| 1u32 << i).collect()
    }
}

/// How many halvings it takes for the long edge to fit one tile. This is the
/// level count advertised for pyramidal sources; the decoder's fallback loop
/// absorbs codestreams that actually carry fewer.
pub(crate) fn levels_for(width: u32, height: u32, tile: u32) -> u32 {
    let mut long_edge = width.max(height).max(1);
    let mut levels = 1;
    while long_edge > tile {
        long_edge = long_edge.div_ceil(2);
        levels += 1;
    }
    levels
}

/// Whether the file at `path` should take the JPEG-2000 decode path.
pub fn is_jp2(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("jp2")
            || ext.eq_ignore_ascii_case("jpx")
            || ext.eq_ignore_ascii_case("j2k")
    )
}

/// Read header-level info for a source image.
pub fn read_info(path: &Path) -> Result<ImageInfo, TileError> {
    if is_jp2(path) {
        jp2::read_info(path)
    } else {
        generic::read_info(path)
    }
}

/// Decode `region` from the source and scale it to `out_w` x `out_h`.
pub fn decode_region(
    path: &Path,
    region: Rect,
    out_w: u32,
    out_h: u32,
) -> Result<DynamicImage, TileError> {
    if is_jp2(path) {
        jp2::decode_region(path, region, out_w, out_h)
    } else {
        generic::decode_region(path, region, out_w, out_h)
    }
}
