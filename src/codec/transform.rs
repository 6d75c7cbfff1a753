//! Raster transforms: region resolution, output sizing, rotation, quality.
//!
//! Region and size math operate on the *request*, before any pixels are
//! decoded; rotation and quality operate on the decoded raster afterward.

use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

use crate::error::TileError;
use crate::iiif::{Quality, Region, Rotation, Size};

/// A crop rectangle in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

// =============================================================================
// Region resolution
// =============================================================================

/// Resolve a region against the source dimensions into a pixel rectangle.
///
/// The rectangle is clamped to the image bounds. A region that starts outside
/// the image, or whose width/height rounds to zero pixels, is a 400.
pub fn region_rect(region: &Region, width: u32, height: u32) -> Result<Rect, TileError> {
    let rect = match *region {
        Region::Full => Rect {
            x: 0,
            y: 0,
            w: width,
            h: height,
        },
        Region::Square => {
            let side = width.min(height);
            Rect {
                x: (width - side) / 2,
                y: (height - side) / 2,
                w: side,
                h: side,
            }
        }
        Region::Pixel { x, y, w, h } => clamp_rect(x, y, w, h, width, height)?,
        Region::Percent { x, y, w, h } => {
            let fx = width as f64 / 100.0;
            let fy = height as f64 / 100.0;
            clamp_rect(x * fx, y * fy, w * fx, h * fy, width, height)?
        }
    };
    Ok(rect)
}

fn clamp_rect(x: f64, y: f64, w: f64, h: f64, width: u32, height: u32) -> Result<Rect, TileError> {
    let x = x.round() as u32;
    let y = y.round() as u32;
    let w = w.round() as u32;
    let h = h.round() as u32;

    if x >= width || y >= height {
        return Err(TileError::Bounds(format!(
            "region origin ({},{}) is outside the {}x{} image",
            x, y, width, height
        )));
    }

    let w = w.min(width - x);
    let h = h.min(height - y);
    if w == 0 || h == 0 {
        return Err(TileError::Bounds("region contains no pixels".to_string()));
    }

    Ok(Rect { x, y, w, h })
}

// =============================================================================
// Output sizing
// =============================================================================

/// Compute the output dimensions for a size request against region
/// dimensions. Dimensions are never allowed to collapse below one pixel.
pub fn output_size(size: &Size, rw: u32, rh: u32) -> (u32, u32) {
    let scale_to = |n: f64| (n.round() as u32).max(1);

    match *size {
        Size::Full | Size::Max => (rw, rh),
        Size::Width(w) => (w, scale_to(rh as f64 * w as f64 / rw as f64)),
        Size::Height(h) => (scale_to(rw as f64 * h as f64 / rh as f64), h),
        Size::Percent(p) => (
            scale_to(rw as f64 * p / 100.0),
            scale_to(rh as f64 * p / 100.0),
        ),
        Size::Exact { w, h } => (w, h),
        Size::BestFit { w, h } => {
            let scale = (w as f64 / rw as f64).min(h as f64 / rh as f64);
            (scale_to(rw as f64 * scale), scale_to(rh as f64 * scale))
        }
    }
}

// =============================================================================
// Rotation
// =============================================================================

/// Mirror first if requested, then rotate. Multiples of 90 degrees are
/// pixel-grid reorientations; anything else is a bilinear resample into a
/// bounding-box canvas.
pub fn apply_rotation(img: DynamicImage, rotation: &Rotation) -> DynamicImage {
    let img = if rotation.mirror { img.fliph() } else { img };

    match rotation.degrees {
        d if d == 0.0 => img,
        d if d == 90.0 => img.rotate90(),
        d if d == 180.0 => img.rotate180(),
        d if d == 270.0 => img.rotate270(),
        d => DynamicImage::ImageRgba8(rotate_arbitrary(&img, d)),
    }
}

/// Rotate by an arbitrary angle. The output canvas is the rotated bounding
/// box; pixels outside the source map to transparent black.
fn rotate_arbitrary(img: &DynamicImage, degrees: f64) -> RgbaImage {
    let radians = degrees.to_radians();
    let (sin, cos) = radians.sin_cos();
    let (w, h) = img.dimensions();
    let (wf, hf) = (w as f64, h as f64);

    let out_w = (wf * cos.abs() + hf * sin.abs()).ceil() as u32;
    let out_h = (wf * sin.abs() + hf * cos.abs()).ceil() as u32;

    let src = img.to_rgba8();
    let mut out = RgbaImage::new(out_w, out_h);

    let cx_src = wf / 2.0;
    let cy_src = hf / 2.0;
    let cx_out = out_w as f64 / 2.0;
    let cy_out = out_h as f64 / 2.0;

    for oy in 0..out_h {
        for ox in 0..out_w {
            // Inverse-map the output pixel into source coordinates
            let dx = ox as f64 + 0.5 - cx_out;
            let dy = oy as f64 + 0.5 - cy_out;
            let sx = dx * cos + dy * sin + cx_src - 0.5;
            let sy = -dx * sin + dy * cos + cy_src - 0.5;

            if sx < -1.0 || sy < -1.0 || sx > wf || sy > hf {
                continue;
            }
            out.put_pixel(ox, oy, bilinear_sample(&src, sx, sy));
        }
    }

    out
}

fn bilinear_sample(src: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let (w, h) = src.dimensions();
    let x0 = x.floor();
    let y0 = y.floor();
    let tx = x - x0;
    let ty = y - y0;

    let pixel_at = |px: f64, py: f64| -> [f64; 4] {
        if px < 0.0 || py < 0.0 || px >= w as f64 || py >= h as f64 {
            return [0.0; 4];
        }
        let p = src.get_pixel(px as u32, py as u32);
        [p[0] as f64, p[1] as f64, p[2] as f64, p[3] as f64]
    };

    let p00 = pixel_at(x0, y0);
    let p10 = pixel_at(x0 + 1.0, y0);
    let p01 = pixel_at(x0, y0 + 1.0);
    let p11 = pixel_at(x0 + 1.0, y0 + 1.0);

    let mut blended = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] * (1.0 - tx) + p10[c] * tx;
        let bottom = p01[c] * (1.0 - tx) + p11[c] * tx;
        blended[c] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(blended)
}

// =============================================================================
// Quality
// =============================================================================

/// Bitonal threshold on the Rec. 601 luminance.
const BITONAL_THRESHOLD: u8 = 128;

/// Apply the requested color treatment.
pub fn apply_quality(img: DynamicImage, quality: &Quality) -> DynamicImage {
    match quality {
        Quality::Default | Quality::Native | Quality::Color => img,
        Quality::Gray => DynamicImage::ImageLuma8(luma601(&img)),
        Quality::Bitonal => {
            let mut gray = luma601(&img);
            for px in gray.pixels_mut() {
                px[0] = if px[0] >= BITONAL_THRESHOLD { 255 } else { 0 };
            }
            DynamicImage::ImageLuma8(gray)
        }
        // The feature gate refuses unknown qualities before decode
        Quality::Unknown(_) => img,
    }
}

/// Grayscale via the Rec. 601 luma coefficients.
fn luma601(img: &DynamicImage) -> image::GrayImage {
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();
    image::GrayImage::from_fn(w, h, |x, y| {
        let p = rgb.get_pixel(x, y);
        let luma = 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64;
        image::Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}
