//! Output encoding.
//!
//! Emits the transformed raster in the requested format with the matching
//! media type. Formats the runtime has no encoder for (JP2, PDF, WebP) fail
//! as never-supported, which the server maps to 501 rather than 500.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};

use crate::error::TileError;
use crate::iiif::Format;

/// JPEG quality used for all JPEG output.
pub const JPEG_QUALITY: u8 = 80;

/// Encode `img` as `format`, returning the bytes and the Content-Type.
pub fn encode(img: &DynamicImage, format: &Format) -> Result<(Bytes, &'static str), TileError> {
    let mut buf = Vec::new();

    match format {
        Format::Jpg => {
            // JPEG carries no alpha; keep grayscale as-is and flatten the rest
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
            let result = match img {
                DynamicImage::ImageLuma8(gray) => encoder.encode_image(gray),
                other => encoder.encode_image(&other.to_rgb8()),
            };
            result.map_err(|e| encode_failed(format, e))?;
        }
        Format::Png => {
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map_err(|e| encode_failed(format, e))?;
        }
        Format::Gif => {
            // The GIF encoder only accepts RGBA frames
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Gif)
                .map_err(|e| encode_failed(format, e))?;
        }
        Format::Tif => {
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Tiff)
                .map_err(|e| encode_failed(format, e))?;
        }
        Format::Jp2 | Format::Pdf | Format::Webp | Format::Unknown(_) => {
            return Err(TileError::Encode {
                format: format.as_str().to_string(),
                message: "no encoder for this format".to_string(),
                supported: false,
            });
        }
    }

    Ok((Bytes::from(buf), format.media_type()))
}

fn encode_failed(format: &Format, e: image::ImageError) -> TileError {
    TileError::Encode {
        format: format.as_str().to_string(),
        message: e.to_string(),
        supported: true,
    }
}
