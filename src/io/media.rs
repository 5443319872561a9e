// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Reference image decoding and baking.
//!
//! This module turns raw picture bytes into a bounded RGBA buffer and
//! converts that buffer to and from the embedded data URLs stored inside
//! saved projects.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_MAX_DIMENSION: u32 = 2200;
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("unsupported image data url")]
    UnsupportedDataUrl,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Target size for a source so its longer edge is at most `max_dimension`.
pub fn bounded_size(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longer = width.max(height).max(1) as f64;
    let scale = (max_dimension as f64 / longer).min(1.0);
    let scaled = |v: u32| ((v as f64 * scale).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Downscale (never upscale) so the longer edge fits `max_dimension`.
pub fn fit_to_max(image: DynamicImage, max_dimension: u32) -> RgbaImage {
    let (width, height) = bounded_size(image.width(), image.height(), max_dimension);
    if (width, height) == (image.width(), image.height()) {
        return image.into_rgba8();
    }
    image::imageops::resize(&image.into_rgba8(), width, height, FilterType::Triangle)
}

/// Decode raw image bytes of any supported format.
pub fn decode_image(bytes: &[u8], max_dimension: u32) -> Result<RgbaImage, MediaError> {
    let image = image::load_from_memory(bytes)?;
    let (width, height) = (image.width(), image.height());
    let fitted = fit_to_max(image, max_dimension);
    log::debug!(
        "Decoded {}x{} image, using {}x{}",
        width,
        height,
        fitted.width(),
        fitted.height()
    );
    Ok(fitted)
}

/// Read and decode an image file.
pub fn load_image(path: &Path, max_dimension: u32) -> Result<RgbaImage, MediaError> {
    let bytes = std::fs::read(path)?;
    decode_image(&bytes, max_dimension)
}

/// Bake an RGBA buffer into a `data:image/jpeg;base64,...` URL.
pub fn encode_data_url(image: &RgbaImage, quality: u8) -> Result<String, MediaError> {
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(format!("data:image/jpeg;base64,{}", B64.encode(buffer)))
}

/// Decode an embedded `data:<mime>;base64,<payload>` image.
pub fn decode_data_url(data_url: &str, max_dimension: u32) -> Result<RgbaImage, MediaError> {
    let (header, payload) = data_url
        .split_once(',')
        .ok_or(MediaError::UnsupportedDataUrl)?;
    if !header.starts_with("data:") || !header.contains(";base64") {
        return Err(MediaError::UnsupportedDataUrl);
    }
    let bytes = B64.decode(payload.trim())?;
    decode_image(&bytes, max_dimension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([200, 40, 90, 255]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_bounded_size() {
        assert_eq!(bounded_size(4400, 2200, 2200), (2200, 1100));
        assert_eq!(bounded_size(800, 600, 2200), (800, 600));
        assert_eq!(bounded_size(10_000, 3, 2200), (2200, 1));
        assert_eq!(bounded_size(1000, 3333, 2200), (660, 2200));
    }

    #[test]
    fn test_decode_downscales_long_edge() {
        let image = decode_image(&png_bytes(300, 150), 100).unwrap();
        assert_eq!(image.dimensions(), (100, 50));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_image(b"definitely not a picture", 2200),
            Err(MediaError::Image(_))
        ));
    }

    #[test]
    fn test_data_url_round_trip_keeps_dimensions() {
        let image = decode_image(&png_bytes(64, 32), 2200).unwrap();
        let url = encode_data_url(&image, DEFAULT_JPEG_QUALITY).unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let restored = decode_data_url(&url, 2200).unwrap();
        assert_eq!(restored.dimensions(), (64, 32));
        let pixel = restored.get_pixel(10, 10);
        assert!((pixel[0] as i32 - 200).abs() < 12);
        assert_eq!(pixel[3], 255);
    }

    #[test]
    fn test_decode_data_url_errors() {
        assert!(matches!(
            decode_data_url("no comma here", 2200),
            Err(MediaError::UnsupportedDataUrl)
        ));
        assert!(matches!(
            decode_data_url("data:image/png,rawtext", 2200),
            Err(MediaError::UnsupportedDataUrl)
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,@@@", 2200),
            Err(MediaError::Base64(_))
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,AAAA", 2200),
            Err(MediaError::Image(_))
        ));
    }
}
