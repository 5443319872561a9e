// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module provides the angle and two-point helpers used by the gesture
//! tracker and the compositor.

use std::f64::consts::{PI, TAU};

/// A point in viewport coordinates (logical pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Clamp `value` into `[min, max]`, mapping NaN to `min`.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

/// Wrap an angle in radians into `(-PI, PI]`.
///
/// Non-finite input has no meaningful direction and maps to zero.
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut value = angle % TAU;
    if value > PI {
        value -= TAU;
    }
    if value <= -PI {
        value += TAU;
    }
    value
}

/// Shortest signed rotation taking `start` to `current`.
pub fn angle_delta(current: f64, start: f64) -> f64 {
    normalize_angle(current - start)
}

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Angle of the vector from `a` to `b`.
pub fn angle_between(a: Point, b: Point) -> f64 {
    (b.y - a.y).atan2(b.x - a.x)
}

pub fn midpoint(a: Point, b: Point) -> Point {
    Point {
        x: (a.x + b.x) * 0.5,
        y: (a.y + b.y) * 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_angle_range() {
        assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-12);
        assert!((normalize_angle(-PI) - PI).abs() < 1e-12);
        assert!((normalize_angle(PI) - PI).abs() < 1e-12);
        assert!((normalize_angle(-3.5 * PI) - 0.5 * PI).abs() < 1e-9);
        assert_eq!(normalize_angle(0.25), 0.25);

        for i in -50..50 {
            let value = normalize_angle(i as f64 * 0.7);
            assert!(value > -PI && value <= PI, "{} out of range", value);
        }
    }

    #[test]
    fn test_normalize_angle_non_finite() {
        assert_eq!(normalize_angle(f64::NAN), 0.0);
        assert_eq!(normalize_angle(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_angle_delta_takes_short_way_round() {
        // From just below +PI to just above -PI is a small positive turn.
        let delta = angle_delta(-PI + 0.1, PI - 0.1);
        assert!((delta - 0.2).abs() < 1e-9);

        let delta = angle_delta(PI - 0.1, -PI + 0.1);
        assert!((delta + 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_two_point_helpers() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);

        assert_eq!(distance(a, b), 5.0);
        assert_eq!(midpoint(a, b), Point::new(1.5, 2.0));
        assert!((angle_between(a, Point::new(0.0, 10.0)) - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_handles_nan() {
        assert_eq!(clamp(f64::NAN, -1.0, 1.0), -1.0);
        assert_eq!(clamp(5.0, -1.0, 1.0), 1.0);
        assert_eq!(clamp(-5.0, -1.0, 1.0), -1.0);
    }
}
