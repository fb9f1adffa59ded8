// src/engine/encoder.rs
//
// Encode a resampled RGBA buffer into its output container.

use crate::error::{ResizerError, Result};
use crate::ops::{BackgroundStyle, OutputFormat};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;

/// Encode pixels into the target container.
///
/// JPEG cannot carry an alpha channel; the buffer is flattened onto the
/// background color first so semi-transparent edges do not darken.
pub fn encode(pixels: &RgbaImage, format: OutputFormat, background: BackgroundStyle) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Png => {
            let mut buf = Vec::new();
            DynamicImage::ImageRgba8(pixels.clone())
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map_err(|e| ResizerError::encode_failed("png", e.to_string()))?;
            Ok(buf)
        }
        OutputFormat::Jpeg { quality } => {
            let flattened = flatten_onto(pixels, background.solid_or_white());
            let mut buf = Vec::new();
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.min(100));
            flattened
                .write_with_encoder(encoder)
                .map_err(|e| ResizerError::encode_failed("jpeg", e.to_string()))?;
            Ok(buf)
        }
    }
}

/// Alpha-composite onto an opaque background, dropping the alpha channel.
fn flatten_onto(pixels: &RgbaImage, background: [u8; 3]) -> RgbImage {
    RgbImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        let p = pixels.get_pixel(x, y).0;
        let alpha = p[3] as u32;
        let blend = |fg: u8, bg: u8| -> u8 {
            ((fg as u32 * alpha + bg as u32 * (255 - alpha) + 127) / 255) as u8
        };
        image::Rgb([
            blend(p[0], background[0]),
            blend(p[1], background[1]),
            blend(p[2], background[2]),
        ])
    })
}
