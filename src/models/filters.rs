// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Tonal adjustment and grid overlay parameters.

use crate::util::geometry::clamp;
use serde::{Deserialize, Serialize};

/// Tonal adjustments applied to the reference image.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterParameters {
    pub grayscale: bool,
    /// -100..=100
    pub brightness: i32,
    /// -100..=100
    pub contrast: i32,
    /// Stops, -2.0..=2.0
    pub exposure: f64,
}

impl FilterParameters {
    pub fn new(grayscale: bool, brightness: i32, contrast: i32, exposure: f64) -> Self {
        Self {
            grayscale,
            brightness,
            contrast,
            exposure,
        }
        .clamped()
    }

    pub fn clamped(self) -> Self {
        Self {
            grayscale: self.grayscale,
            brightness: self.brightness.clamp(-100, 100),
            contrast: self.contrast.clamp(-100, 100),
            exposure: if self.exposure.is_nan() {
                0.0
            } else {
                clamp(self.exposure, -2.0, 2.0)
            },
        }
    }

    /// True when the parameters leave every pixel untouched.
    pub fn is_identity(&self) -> bool {
        !self.grayscale && self.brightness == 0 && self.contrast == 0 && self.exposure == 0.0
    }

    /// Canonical cache tag for this exact parameter tuple.
    pub fn key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            u8::from(self.grayscale),
            self.brightness,
            self.contrast,
            self.exposure
        )
    }
}

pub const DEFAULT_GRID_COLOR: &str = "#ffffff";

/// Alignment grid drawn over the composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridParameters {
    pub enabled: bool,
    /// Cell size in logical pixels, 20..=200
    pub size: i32,
    /// Percent, 0..=100
    pub opacity: i32,
    /// `#rrggbb`
    pub color: String,
}

impl Default for GridParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            size: 40,
            opacity: 30,
            color: DEFAULT_GRID_COLOR.to_string(),
        }
    }
}

impl GridParameters {
    pub fn clamped(self) -> Self {
        let color = if is_hex_color(&self.color) {
            self.color
        } else {
            DEFAULT_GRID_COLOR.to_string()
        };
        Self {
            enabled: self.enabled,
            size: self.size.clamp(20, 200),
            opacity: self.opacity.clamp(0, 100),
            color,
        }
    }

    /// Line colour as RGB; anything that is not six hex digits draws white.
    pub fn rgb(&self) -> [u8; 3] {
        parse_hex_color(&self.color).unwrap_or([255, 255, 255])
    }
}

/// Matches `#` followed by exactly six hex digits.
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let digits = value.strip_prefix('#').unwrap_or(value);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    Some([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_detection() {
        assert!(FilterParameters::default().is_identity());
        assert!(!FilterParameters::new(true, 0, 0, 0.0).is_identity());
        assert!(!FilterParameters::new(false, 0, 0, 0.1).is_identity());
        assert!(FilterParameters::new(false, 0, 0, -0.0).is_identity());
    }

    #[test]
    fn test_key_distinguishes_parameters() {
        let a = FilterParameters::new(false, 10, 0, 0.0);
        let b = FilterParameters::new(false, 0, 10, 0.0);
        let c = FilterParameters::new(false, 10, 0, 0.5);
        assert_ne!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
        assert_eq!(a.key(), FilterParameters::new(false, 10, 0, 0.0).key());
        assert_eq!(a.key(), "0|10|0|0");
    }

    #[test]
    fn test_filter_clamping() {
        let params = FilterParameters::new(true, 400, -400, 9.0);
        assert_eq!(params.brightness, 100);
        assert_eq!(params.contrast, -100);
        assert_eq!(params.exposure, 2.0);
    }

    #[test]
    fn test_grid_color_parsing() {
        assert_eq!(parse_hex_color("#ff8000"), Some([255, 128, 0]));
        assert_eq!(parse_hex_color("#fff"), None);
        assert!(is_hex_color("#A0b1C2"));
        assert!(!is_hex_color("A0b1C2"));
        assert!(!is_hex_color("#zzzzzz"));

        let grid = GridParameters {
            color: "red".into(),
            ..GridParameters::default()
        };
        assert_eq!(grid.rgb(), [255, 255, 255]);
        assert_eq!(grid.clamped().color, DEFAULT_GRID_COLOR);
    }

    #[test]
    fn test_grid_clamping() {
        let grid = GridParameters {
            enabled: true,
            size: 5,
            opacity: 150,
            color: "#00ff00".into(),
        }
        .clamped();
        assert_eq!(grid.size, 20);
        assert_eq!(grid.opacity, 100);
        assert_eq!(grid.color, "#00ff00");
    }
}
