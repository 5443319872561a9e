// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Tonal filter pipeline for the reference image.
//!
//! Parameter changes are debounced: while a change is pending the renderer
//! keeps drawing the unfiltered source so slider drags stay smooth. Once the
//! debounce expires the next render regenerates the filtered buffer, which is
//! cached under the canonical key of the parameters that produced it.

use crate::models::filters::FilterParameters;
use image::RgbaImage;
use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(24);

fn clamp_byte(value: f64) -> u8 {
    if value <= 0.0 {
        0
    } else if value >= 255.0 {
        255
    } else {
        value.round() as u8
    }
}

/// Precomputed per-channel coefficients for one parameter set.
#[derive(Debug, Clone, Copy)]
struct ToneCurve {
    brightness: f64,
    contrast: f64,
    exposure: f64,
    grayscale: bool,
}

impl ToneCurve {
    fn new(params: &FilterParameters) -> Self {
        let brightness = params.brightness as f64 * 2.55;
        let contrast_input = params.contrast as f64 * 2.55;
        let mut denominator = 259.0 - contrast_input;
        if denominator == 0.0 {
            denominator = 1.0;
        }
        let contrast = (259.0 * (contrast_input + 255.0)) / (255.0 * denominator);
        Self {
            brightness,
            contrast,
            exposure: 2f64.powf(params.exposure),
            grayscale: params.grayscale,
        }
    }

    // Exposure multiplies, brightness offsets, contrast scales about 128.
    fn channel(&self, c: u8) -> f64 {
        self.contrast * (c as f64 * self.exposure + self.brightness - 128.0) + 128.0
    }

    fn apply(&self, pixel: [u8; 4]) -> [u8; 4] {
        let r = self.channel(pixel[0]);
        let g = self.channel(pixel[1]);
        let b = self.channel(pixel[2]);
        if self.grayscale {
            let gray = clamp_byte(0.299 * r + 0.587 * g + 0.114 * b);
            return [gray, gray, gray, 255];
        }
        [clamp_byte(r), clamp_byte(g), clamp_byte(b), 255]
    }
}

/// Apply the tonal adjustments to a single RGBA pixel. Alpha comes out opaque.
pub fn adjust_pixel(pixel: [u8; 4], params: &FilterParameters) -> [u8; 4] {
    ToneCurve::new(params).apply(pixel)
}

/// Apply the tonal adjustments to every pixel of `image` in place.
pub fn apply_filters(image: &mut RgbaImage, params: &FilterParameters) {
    let curve = ToneCurve::new(params);
    for pixel in image.pixels_mut() {
        pixel.0 = curve.apply(pixel.0);
    }
}

/// Cancel-and-reschedule timer.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// (Re)start the timer; an earlier deadline is discarded.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left before the timer fires, if armed.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// Returns true exactly once when the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Which buffer the compositor should draw for the image layer.
#[derive(Debug, Clone, Copy)]
pub enum ImageSource<'a> {
    Original(&'a RgbaImage),
    Filtered { image: &'a RgbaImage, key: &'a str },
}

impl<'a> ImageSource<'a> {
    pub fn image(&self) -> &'a RgbaImage {
        match *self {
            ImageSource::Original(image) => image,
            ImageSource::Filtered { image, .. } => image,
        }
    }

    /// Key identifying the pixels; empty for the unfiltered source.
    pub fn key(&self) -> &'a str {
        match *self {
            ImageSource::Original(_) => "",
            ImageSource::Filtered { key, .. } => key,
        }
    }
}

/// Debounced, cached filter stage for the reference image.
#[derive(Debug)]
pub struct FilterPipeline {
    debounce: Debouncer,
    filtered: Option<RgbaImage>,
    filter_key: String,
    regenerations: u64,
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl FilterPipeline {
    pub fn new(delay: Duration) -> Self {
        Self {
            debounce: Debouncer::new(delay),
            filtered: None,
            filter_key: String::new(),
            regenerations: 0,
        }
    }

    /// Record a parameter change; the filtered buffer is withheld until the
    /// debounce expires.
    pub fn queue_update(&mut self, now: Instant) {
        self.debounce.trigger(now);
    }

    /// Advance the debounce timer. Returns true when a render is now due.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.debounce.fire(now) {
            return false;
        }
        self.invalidate();
        true
    }

    /// Time until the pending update fires, for scheduling a wake-up.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.debounce.remaining(now)
    }

    pub fn is_pending(&self) -> bool {
        self.debounce.is_armed()
    }

    pub fn invalidate(&mut self) {
        self.filter_key.clear();
    }

    /// Drop all cached state, e.g. when the source image is replaced.
    pub fn reset(&mut self) {
        self.debounce.cancel();
        self.filtered = None;
        self.filter_key.clear();
    }

    pub fn cached_key(&self) -> &str {
        &self.filter_key
    }

    pub fn filtered(&self) -> Option<&RgbaImage> {
        self.filtered.as_ref()
    }

    /// Number of times the filtered buffer has been rebuilt.
    pub fn regenerations(&self) -> u64 {
        self.regenerations
    }

    /// Pick the buffer to draw, regenerating the cache when its key is stale.
    pub fn source_for_render<'a>(
        &'a mut self,
        source: &'a RgbaImage,
        params: &FilterParameters,
    ) -> ImageSource<'a> {
        if self.is_pending() || params.is_identity() {
            return ImageSource::Original(source);
        }

        let key = params.key();
        if key != self.filter_key {
            self.rebuild(source, params, key.clone());
        }

        match &self.filtered {
            Some(image) if self.filter_key == key => ImageSource::Filtered {
                image,
                key: &self.filter_key,
            },
            _ => ImageSource::Original(source),
        }
    }

    fn rebuild(&mut self, source: &RgbaImage, params: &FilterParameters, key: String) {
        let mut frame = match self.filtered.take() {
            Some(mut buffer) if buffer.dimensions() == source.dimensions() => {
                buffer.copy_from_slice(source.as_raw());
                buffer
            }
            _ => source.clone(),
        };
        apply_filters(&mut frame, params);
        log::debug!(
            "Rebuilt filtered image {}x{} for key {}",
            frame.width(),
            frame.height(),
            key
        );
        self.filtered = Some(frame);
        self.filter_key = key;
        self.regenerations += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn params(grayscale: bool, brightness: i32, contrast: i32, exposure: f64) -> FilterParameters {
        FilterParameters::new(grayscale, brightness, contrast, exposure)
    }

    fn gradient() -> RgbaImage {
        RgbaImage::from_fn(8, 4, |x, y| Rgba([(x * 30) as u8, (y * 60) as u8, 90, 128]))
    }

    #[test]
    fn test_brightness_only_pixel() {
        // contrast factor is exactly 1: 100 + 127.5 - 128 + 128 = 227.5 -> 228
        let out = adjust_pixel([100, 100, 100, 255], &params(false, 50, 0, 0.0));
        assert_eq!(out, [228, 228, 228, 255]);
    }

    #[test]
    fn test_identity_pixel_is_unchanged_but_opaque() {
        let out = adjust_pixel([12, 200, 37, 10], &params(false, 0, 0, 0.0));
        assert_eq!(out, [12, 200, 37, 255]);
    }

    #[test]
    fn test_exposure_applies_before_brightness_and_contrast() {
        // exposure +1 doubles: 60*2 = 120; contrast 50 -> input 127.5,
        // factor = 259*382.5 / (255*131.5)
        let factor = (259.0 * 382.5) / (255.0 * 131.5);
        let expected = (factor * (120.0 - 128.0) + 128.0_f64).round() as u8;
        let out = adjust_pixel([60, 60, 60, 255], &params(false, 0, 50, 1.0));
        assert_eq!(out[0], expected);
        assert_eq!(out[0], 104);
    }

    #[test]
    fn test_full_contrast_uses_guarded_denominator() {
        // contrast 100 -> input 255, denominator 259-255 = 4, not zero
        let out = adjust_pixel([129, 127, 128, 255], &params(false, 0, 100, 0.0));
        assert_eq!(out, [255, 0, 128, 255]);
    }

    #[test]
    fn test_grayscale_uses_luma() {
        let out = adjust_pixel([255, 0, 0, 255], &params(true, 0, 0, 0.0));
        assert_eq!(out, [76, 76, 76, 255]);
    }

    #[test]
    fn test_outputs_are_clamped() {
        let out = adjust_pixel([250, 5, 128, 255], &params(false, 100, 0, 2.0));
        assert_eq!(out[0], 255);
        let out = adjust_pixel([250, 5, 128, 255], &params(false, -100, 0, -2.0));
        assert_eq!(out[1], 0);
    }

    #[test]
    fn test_debouncer_reschedules() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_millis(24));
        debounce.trigger(start);
        debounce.trigger(start + Duration::from_millis(20));

        assert!(!debounce.fire(start + Duration::from_millis(30)));
        assert!(debounce.fire(start + Duration::from_millis(44)));
        assert!(!debounce.fire(start + Duration::from_millis(90)));
    }

    #[test]
    fn test_identity_never_touches_cache() {
        let source = gradient();
        let mut pipeline = FilterPipeline::default();
        let identity = FilterParameters::default();

        let chosen = pipeline.source_for_render(&source, &identity);
        assert!(matches!(chosen, ImageSource::Original(_)));
        assert!(std::ptr::eq(chosen.image(), &source));
        assert!(pipeline.filtered().is_none());
        assert_eq!(pipeline.regenerations(), 0);
    }

    #[test]
    fn test_pending_update_draws_unfiltered_until_due() {
        let start = Instant::now();
        let source = gradient();
        let mut pipeline = FilterPipeline::new(Duration::from_millis(24));
        let bright = params(false, 40, 0, 0.0);

        pipeline.queue_update(start);
        assert!(matches!(
            pipeline.source_for_render(&source, &bright),
            ImageSource::Original(_)
        ));
        assert!(!pipeline.poll(start + Duration::from_millis(10)));
        assert!(pipeline.is_pending());

        assert!(pipeline.poll(start + Duration::from_millis(24)));
        assert!(!pipeline.is_pending());
        match pipeline.source_for_render(&source, &bright) {
            ImageSource::Filtered { key, .. } => assert_eq!(key, bright.key()),
            ImageSource::Original(_) => panic!("expected filtered buffer"),
        }
    }

    #[test]
    fn test_cache_follows_key_equality() {
        let source = gradient();
        let mut pipeline = FilterPipeline::default();
        let a = params(false, 30, 0, 0.0);
        let b = params(true, 0, -20, 0.5);

        let first = pipeline.source_for_render(&source, &a).image().clone();
        assert_eq!(pipeline.regenerations(), 1);

        // Same key again is served from cache.
        pipeline.source_for_render(&source, &a);
        assert_eq!(pipeline.regenerations(), 1);

        let second = pipeline.source_for_render(&source, &b).image().clone();
        assert_eq!(pipeline.cached_key(), b.key());
        assert_ne!(first, second);

        let third = pipeline.source_for_render(&source, &a).image().clone();
        assert_eq!(pipeline.regenerations(), 3);
        assert_eq!(first, third);

        let mut expected = source.clone();
        apply_filters(&mut expected, &a);
        assert_eq!(third, expected);
    }

    #[test]
    fn test_reset_discards_buffer() {
        let source = gradient();
        let mut pipeline = FilterPipeline::default();
        pipeline.source_for_render(&source, &params(false, 10, 0, 0.0));
        pipeline.queue_update(Instant::now());
        pipeline.reset();

        assert!(pipeline.filtered().is_none());
        assert!(!pipeline.is_pending());
        assert_eq!(pipeline.cached_key(), "");
    }
}
