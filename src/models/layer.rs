// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Layer transform model.
//!
//! Each of the two compositable layers (reference image and camera feed)
//! carries its own offset, zoom, rotation, opacity and lock flag. Every
//! setter clamps into the layer's valid range so the model can never hold an
//! out-of-range transform.

use crate::util::geometry::{clamp, normalize_angle};
use serde::{Deserialize, Serialize};

/// Offsets are percentages of the viewport, bounded on both axes.
pub const OFFSET_LIMIT: f64 = 300.0;
pub const MAX_SCALE: f64 = 8.0;

/// Which of the two fixed layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Image,
    Camera,
}

impl LayerKind {
    /// The camera may not be zoomed out below its native fit.
    pub fn min_scale(self) -> f64 {
        match self {
            LayerKind::Image => 0.1,
            LayerKind::Camera => 1.0,
        }
    }

    pub fn default_opacity(self) -> f64 {
        match self {
            LayerKind::Image => 0.7,
            LayerKind::Camera => 1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LayerKind::Image => "Image",
            LayerKind::Camera => "Camera",
        }
    }
}

/// Mutable transform state of one layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerState {
    kind: LayerKind,
    x: f64,
    y: f64,
    scale: f64,
    rotation: f64,
    opacity: f64,
    locked: bool,
}

impl LayerState {
    pub fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            rotation: 0.0,
            opacity: kind.default_opacity(),
            locked: false,
        }
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_offset(&mut self, x: f64, y: f64) {
        self.x = clamp(x, -OFFSET_LIMIT, OFFSET_LIMIT);
        self.y = clamp(y, -OFFSET_LIMIT, OFFSET_LIMIT);
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = if scale.is_nan() {
            1.0
        } else {
            clamp(scale, self.kind.min_scale(), MAX_SCALE)
        };
    }

    pub fn set_rotation(&mut self, rotation: f64) {
        self.rotation = normalize_angle(rotation);
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = clamp(opacity, 0.0, 1.0);
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Flip the lock flag and return the new value.
    pub fn toggle_lock(&mut self) -> bool {
        self.locked = !self.locked;
        self.locked
    }

    /// Reinitialise to the kind's defaults, clearing the lock.
    pub fn reset(&mut self) {
        *self = Self::new(self.kind);
    }

    /// Reset position, zoom, rotation and opacity but keep the lock flag.
    pub fn reset_transform(&mut self) {
        let locked = self.locked;
        self.reset();
        self.locked = locked;
    }

    pub fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot {
            x: self.x,
            y: self.y,
            scale: self.scale,
            rotation: self.rotation,
            opacity: self.opacity,
            locked: self.locked,
        }
    }

    /// Apply a stored snapshot through the clamping setters.
    pub fn restore(&mut self, snapshot: &LayerSnapshot) {
        self.set_offset(snapshot.x, snapshot.y);
        self.set_scale(snapshot.scale);
        self.set_rotation(snapshot.rotation);
        self.set_opacity(snapshot.opacity);
        self.locked = snapshot.locked;
    }
}

/// Serialized form of a layer inside a project document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerSnapshot {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub rotation: f64,
    pub opacity: f64,
    pub locked: bool,
}

/// The pair of layers, addressable by kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Layers {
    pub image: LayerState,
    pub camera: LayerState,
}

impl Default for Layers {
    fn default() -> Self {
        Self {
            image: LayerState::new(LayerKind::Image),
            camera: LayerState::new(LayerKind::Camera),
        }
    }
}

impl Layers {
    pub fn get(&self, kind: LayerKind) -> &LayerState {
        match kind {
            LayerKind::Image => &self.image,
            LayerKind::Camera => &self.camera,
        }
    }

    pub fn get_mut(&mut self, kind: LayerKind) -> &mut LayerState {
        match kind {
            LayerKind::Image => &mut self.image,
            LayerKind::Camera => &mut self.camera,
        }
    }
}
