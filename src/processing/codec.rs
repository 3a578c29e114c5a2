//! The image transform: resize, grayscale conversion, encode.
//!
//! A pure function over `(image, params)` run by worker threads with no
//! lock held. Failures never leave partial output behind; the task's
//! outcome is either a complete [`CompressedOutput`] or a [`CodecError`].

use std::io::Cursor;

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;

use crate::core::{CompressedOutput, CompressionParams, SinkKind};
use crate::utils::{CodecError, ImageFormat};

/// PNG compression level for a 0-100 quality value.
///
/// Integer division, so quality 100 maps to level 0 (fastest, largest) and
/// quality 0 to level 10 (slowest, smallest). Deliberately spans only the
/// 0-10 level range, not a linear quality scale.
pub fn png_compression_level(quality: u8) -> u8 {
    10 - quality.min(100) / 10
}

/// Maps a 0-10 level onto the encoder's compression tiers.
fn png_compression_type(level: u8) -> CompressionType {
    match level {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Applies the scale / grayscale / encode pipeline for one task.
///
/// Steps, in order: resize by `scale` (linear filter) when it is in (0, 1),
/// convert to 8-bit luma when `grayscale` is set, then encode with the
/// format-specific quality mapping. An image sink additionally re-decodes
/// the encoded bytes.
pub fn compress(
    mut image: DynamicImage,
    params: &CompressionParams,
    sink: SinkKind,
) -> Result<CompressedOutput, CodecError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(CodecError::EmptyImage);
    }

    if params.scale > 0.0 && params.scale < 1.0 {
        let width = ((f64::from(image.width()) * params.scale).round() as u32).max(1);
        let height = ((f64::from(image.height()) * params.scale).round() as u32).max(1);
        image = image.resize_exact(width, height, FilterType::Triangle);
    }

    if params.grayscale {
        image = DynamicImage::ImageLuma8(image.to_luma8());
    }

    let bytes = encode(&image, params)?;
    match sink {
        SinkKind::Bytes => Ok(CompressedOutput::Bytes(bytes)),
        SinkKind::Image => image::load_from_memory(&bytes)
            .map(CompressedOutput::Image)
            .map_err(|e| CodecError::decode(params.format, e.to_string())),
    }
}

fn encode(image: &DynamicImage, params: &CompressionParams) -> Result<Vec<u8>, CodecError> {
    let format = params.format;
    match format {
        ImageFormat::Jpeg => {
            let mut buffer = Cursor::new(Vec::new());
            let encoder = JpegEncoder::new_with_quality(&mut buffer, params.quality.clamp(1, 100));
            image
                .write_with_encoder(encoder)
                .map_err(|e| CodecError::encode(format, e.to_string()))?;
            Ok(buffer.into_inner())
        }
        ImageFormat::Png => {
            let level = png_compression_level(params.quality);
            let mut buffer = Cursor::new(Vec::new());
            let encoder = PngEncoder::new_with_quality(
                &mut buffer,
                png_compression_type(level),
                PngFilterType::Adaptive,
            );
            image
                .write_with_encoder(encoder)
                .map_err(|e| CodecError::encode(format, e.to_string()))?;
            Ok(buffer.into_inner())
        }
        ImageFormat::WebP => {
            // libwebp only takes RGB/RGBA layouts; expand luma back out.
            let rgb;
            let encoder = match image {
                DynamicImage::ImageRgba8(rgba) => {
                    webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
                }
                _ => {
                    rgb = image.to_rgb8();
                    webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height())
                }
            };
            Ok(encoder.encode(f32::from(params.quality.min(100))).to_vec())
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use image::RgbImage;
    use proptest::prelude::*;

    fn format_strategy() -> impl Strategy<Value = ImageFormat> {
        prop_oneof![
            Just(ImageFormat::Jpeg),
            Just(ImageFormat::Png),
            Just(ImageFormat::WebP),
        ]
    }

    proptest! {
        /// Every in-range quality encodes a small image for every format.
        #[test]
        fn all_quality_values_encode(
            quality in 0u8..=100,
            format in format_strategy(),
            (width, height) in (1u32..=16, 1u32..=16),
        ) {
            let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(
                width,
                height,
                image::Rgb([90, 120, 60]),
            ));
            let params = CompressionParams { quality, format, ..CompressionParams::default() };

            let out = compress(image, &params, SinkKind::Bytes);
            prop_assert!(out.is_ok(), "quality {} failed for {}", quality, format);
            prop_assert!(!out.unwrap().into_bytes().unwrap().is_empty());
        }

        /// The transform is deterministic for identical inputs.
        #[test]
        fn deterministic_output(quality in 1u8..=100, format in format_strategy()) {
            let make = || DynamicImage::ImageRgb8(RgbImage::from_fn(12, 9, |x, y| {
                image::Rgb([(x * 20) as u8, (y * 25) as u8, 40])
            }));
            let params = CompressionParams { quality, format, ..CompressionParams::default() };

            let a = compress(make(), &params, SinkKind::Bytes).unwrap().into_bytes().unwrap();
            let b = compress(make(), &params, SinkKind::Bytes).unwrap().into_bytes().unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
