// src/engine/resample.rs
//
// Fit-mode geometry and the pixel resampling path.
//
// The SIMD path goes through fast_image_resize with Lanczos3; buffers the
// fir API rejects (alignment) are copied into an aligned image, and any
// remaining failure falls back to the image crate's Lanczos3 resize.

use crate::error::{ResizerError, Result};
use crate::ops::{BackgroundStyle, FitMode};
use fast_image_resize::{self as fir, ImageBufferError, MulDiv, PixelType, ResizeOptions};
use image::{imageops, DynamicImage, Rgba, RgbaImage};

/// Placement of the scaled source inside the target rectangle.
///
/// `Contain`/`Pad` yield non-negative offsets (margins); `Cover` yields
/// non-positive offsets (overflow cropped away); `Stretch` is the identity
/// placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FitGeometry {
    pub scaled_w: u32,
    pub scaled_h: u32,
    pub offset_x: i64,
    pub offset_y: i64,
}

impl FitGeometry {
    /// Scale factor: min for Contain/Pad, max for Cover; the draw offset
    /// centers the scaled image: offset = (target - scaled) / 2.
    pub fn compute(src_w: u32, src_h: u32, target_w: u32, target_h: u32, mode: FitMode) -> Self {
        if mode == FitMode::Stretch || src_w == 0 || src_h == 0 {
            return Self {
                scaled_w: target_w,
                scaled_h: target_h,
                offset_x: 0,
                offset_y: 0,
            };
        }

        let scale_w = target_w as f64 / src_w as f64;
        let scale_h = target_h as f64 / src_h as f64;
        let (scaled_w, scaled_h) = match mode {
            FitMode::Cover => {
                let scale = scale_w.max(scale_h);
                // Ceil so the scaled image never undershoots the target.
                (
                    ((src_w as f64 * scale).ceil() as u32).max(target_w),
                    ((src_h as f64 * scale).ceil() as u32).max(target_h),
                )
            }
            FitMode::Contain | FitMode::Pad => {
                let scale = scale_w.min(scale_h);
                (
                    ((src_w as f64 * scale).round() as u32).clamp(1, target_w),
                    ((src_h as f64 * scale).round() as u32).clamp(1, target_h),
                )
            }
            FitMode::Stretch => unreachable!("handled above"),
        };

        Self {
            scaled_w,
            scaled_h,
            offset_x: (target_w as i64 - scaled_w as i64) / 2,
            offset_y: (target_h as i64 - scaled_h as i64) / 2,
        }
    }
}

/// Render one source into a buffer of exactly `target_w x target_h` under
/// the given fit policy. Pure: identical inputs produce identical pixels.
pub fn resample(
    pixels: &DynamicImage,
    target_w: u32,
    target_h: u32,
    mode: FitMode,
    background: BackgroundStyle,
) -> Result<RgbaImage> {
    let (src_w, src_h) = (pixels.width(), pixels.height());
    if target_w == 0 || target_h == 0 || src_w == 0 || src_h == 0 {
        return Err(ResizerError::resample_failed(
            (src_w, src_h),
            (target_w, target_h),
            "invalid dimensions for resample",
        ));
    }

    let geometry = FitGeometry::compute(src_w, src_h, target_w, target_h, mode);

    match mode {
        FitMode::Stretch => fast_resize_rgba(pixels, target_w, target_h),
        FitMode::Cover => {
            let scaled = fast_resize_rgba(pixels, geometry.scaled_w, geometry.scaled_h)?;
            Ok(center_crop(&scaled, target_w, target_h))
        }
        FitMode::Contain | FitMode::Pad => {
            let margin = match (mode, background) {
                (FitMode::Pad, bg) => Rgba([
                    bg.solid_or_white()[0],
                    bg.solid_or_white()[1],
                    bg.solid_or_white()[2],
                    255,
                ]),
                (_, BackgroundStyle::Solid(rgb)) => Rgba([rgb[0], rgb[1], rgb[2], 255]),
                (_, BackgroundStyle::Transparent) => Rgba([0, 0, 0, 0]),
            };
            let scaled = fast_resize_rgba(pixels, geometry.scaled_w, geometry.scaled_h)?;
            let mut canvas = RgbaImage::from_pixel(target_w, target_h, margin);
            imageops::overlay(&mut canvas, &scaled, geometry.offset_x, geometry.offset_y);
            Ok(canvas)
        }
    }
}

/// Center-crop a buffer down to the target dimensions.
fn center_crop(img: &RgbaImage, target_w: u32, target_h: u32) -> RgbaImage {
    let crop_w = target_w.min(img.width()).max(1);
    let crop_h = target_h.min(img.height()).max(1);
    let crop_x = (img.width() - crop_w) / 2;
    let crop_y = (img.height() - crop_h) / 2;
    imageops::crop_imm(img, crop_x, crop_y, crop_w, crop_h).to_image()
}

fn resize_options() -> ResizeOptions {
    ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3))
}

/// Check if an RGBA buffer is fully opaque (all alpha values are 255).
///
/// Only scans images >=1MP - for smaller images the check overhead exceeds
/// the premultiply cost (SIMD premultiply is very fast for small images).
fn is_fully_opaque(buffer: &[u8], width: u32, height: u32) -> bool {
    const THRESHOLD_PIXELS: u64 = 1_000_000;
    if (width as u64).saturating_mul(height as u64) < THRESHOLD_PIXELS {
        return false; // Assume not opaque, do premultiply (it's fast anyway)
    }
    buffer.iter().skip(3).step_by(4).all(|&alpha| alpha == 255)
}

/// SIMD resize of any DynamicImage into an exact-size RGBA buffer.
fn fast_resize_rgba(img: &DynamicImage, dst_width: u32, dst_height: u32) -> Result<RgbaImage> {
    let src_width = img.width();
    let src_height = img.height();
    let source_dims = (src_width, src_height);
    let target_dims = (dst_width, dst_height);

    if src_width == dst_width && src_height == dst_height {
        return Ok(img.to_rgba8());
    }

    let mut src_pixels = img.to_rgba8().into_raw();
    let required_bytes = (src_width as usize)
        .checked_mul(src_height as usize)
        .and_then(|px| px.checked_mul(4))
        .ok_or_else(|| {
            ResizerError::resample_failed(source_dims, target_dims, "image dimensions overflow")
        })?;

    let primary_result = match fir::images::Image::from_slice_u8(
        src_width,
        src_height,
        src_pixels.as_mut_slice(),
        PixelType::U8x4,
    ) {
        Ok(src_image) => resize_with_source_image(src_image, dst_width, dst_height),
        Err(ImageBufferError::InvalidBufferAlignment) => {
            let mut aligned = fir::images::Image::new(src_width, src_height, PixelType::U8x4);
            let aligned_buffer = aligned.buffer_mut();
            if aligned_buffer.len() != required_bytes {
                Err(format!(
                    "fir alignment fallback buffer mismatch. expected {required_bytes} bytes, got {} bytes",
                    aligned_buffer.len()
                ))
            } else {
                aligned_buffer.copy_from_slice(&src_pixels[..required_bytes]);
                resize_with_source_image(aligned, dst_width, dst_height)
            }
        }
        Err(other) => Err(format!("fir source image error: {other:?}")),
    };

    match primary_result {
        Ok(buffer) => RgbaImage::from_raw(dst_width, dst_height, buffer).ok_or_else(|| {
            ResizerError::resample_failed(
                source_dims,
                target_dims,
                "failed to rebuild rgba image from resized data",
            )
        }),
        Err(err) => {
            // Fall back to the image crate's Lanczos3 path.
            let rgba = RgbaImage::from_raw(src_width, src_height, src_pixels).ok_or_else(|| {
                ResizerError::resample_failed(source_dims, target_dims, err.clone())
            })?;
            Ok(imageops::resize(
                &rgba,
                dst_width,
                dst_height,
                imageops::FilterType::Lanczos3,
            ))
        }
    }
}

fn resize_with_source_image(
    mut src_image: fir::images::Image<'_>,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<Vec<u8>, String> {
    let mut dst_image = fir::images::Image::new(dst_width, dst_height, PixelType::U8x4);

    // Skip premultiply/unpremultiply for fully opaque images
    let needs_premultiply = !is_fully_opaque(
        src_image.buffer(),
        src_image.width(),
        src_image.height(),
    );

    let mul_div = MulDiv::default();
    if needs_premultiply {
        mul_div
            .multiply_alpha_inplace(&mut src_image)
            .map_err(|e| format!("failed to premultiply alpha: {e}"))?;
    }

    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, &resize_options())
        .map_err(|e| format!("fir resize error: {e:?}"))?;

    if needs_premultiply {
        mul_div
            .divide_alpha_inplace(&mut dst_image)
            .map_err(|e| format!("failed to unpremultiply alpha: {e}"))?;
    }

    Ok(dst_image.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn gradient_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    #[test]
    fn stretch_ignores_aspect_ratio() {
        let img = gradient_image(100, 50);
        let out = resample(&img, 80, 80, FitMode::Stretch, BackgroundStyle::Transparent).unwrap();
        assert_eq!(out.dimensions(), (80, 80));
    }

    #[test]
    fn contain_centers_and_leaves_transparent_margin() {
        // 100x50 into 80x80: drawn region is 80x40, margins at top/bottom.
        let img = gradient_image(100, 50);
        let out = resample(&img, 80, 80, FitMode::Contain, BackgroundStyle::Transparent).unwrap();
        assert_eq!(out.dimensions(), (80, 80));
        assert_eq!(out.get_pixel(40, 0)[3], 0); // top margin transparent
        assert_eq!(out.get_pixel(40, 79)[3], 0); // bottom margin transparent
        assert_eq!(out.get_pixel(40, 40)[3], 255); // center drawn
    }

    #[test]
    fn pad_always_fills_margin_with_background() {
        let img = gradient_image(100, 50);
        let out = resample(
            &img,
            80,
            80,
            FitMode::Pad,
            BackgroundStyle::Solid([0, 0, 255]),
        )
        .unwrap();
        let margin = out.get_pixel(40, 1);
        assert_eq!(margin.0, [0, 0, 255, 255]);
    }

    #[test]
    fn pad_with_transparent_background_falls_back_to_white() {
        let img = gradient_image(100, 50);
        let out = resample(&img, 80, 80, FitMode::Pad, BackgroundStyle::Transparent).unwrap();
        assert_eq!(out.get_pixel(40, 1).0, [255, 255, 255, 255]);
    }

    #[test]
    fn cover_crops_to_exact_target() {
        let img = gradient_image(100, 50);
        let out = resample(&img, 80, 80, FitMode::Cover, BackgroundStyle::Transparent).unwrap();
        assert_eq!(out.dimensions(), (80, 80));
        // No margins: every pixel drawn.
        assert_eq!(out.get_pixel(0, 0)[3], 255);
        assert_eq!(out.get_pixel(79, 79)[3], 255);
    }

    #[test]
    fn geometry_contain_preserves_aspect() {
        let g = FitGeometry::compute(1000, 500, 300, 300, FitMode::Contain);
        assert_eq!((g.scaled_w, g.scaled_h), (300, 150));
        assert_eq!((g.offset_x, g.offset_y), (0, 75));
    }

    #[test]
    fn geometry_cover_covers_target() {
        let g = FitGeometry::compute(1000, 500, 300, 300, FitMode::Cover);
        assert!(g.scaled_w >= 300 && g.scaled_h >= 300);
        assert!(g.offset_x <= 0 && g.offset_y <= 0);
    }

    #[test]
    fn zero_target_dimension_is_rejected() {
        let img = gradient_image(10, 10);
        let err = resample(&img, 0, 10, FitMode::Stretch, BackgroundStyle::Transparent)
            .unwrap_err();
        assert!(matches!(err, ResizerError::ResampleFailed { .. }));
    }

    #[test]
    fn upscale_and_downscale_hit_exact_dimensions() {
        let img = gradient_image(33, 77);
        for (w, h) in [(1, 1), (16, 16), (200, 40), (77, 33)] {
            for mode in [FitMode::Stretch, FitMode::Contain, FitMode::Cover, FitMode::Pad] {
                let out = resample(&img, w, h, mode, BackgroundStyle::WHITE).unwrap();
                assert_eq!(out.dimensions(), (w, h), "mode {mode:?} target {w}x{h}");
            }
        }
    }
}
