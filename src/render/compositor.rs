// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Composite layout.
//!
//! Computes where each layer lands on the viewport and where grid lines go.
//! The painter in `ui::canvas` turns these into egui shapes; keeping the
//! arithmetic here lets it be tested without a GPU context.

use crate::models::filters::GridParameters;
use crate::models::layer::LayerState;
use crate::models::scene::Viewport;
use crate::util::geometry::{clamp, Point};

/// Draw order, bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawStep {
    Background,
    Camera,
    Image,
    Grid,
}

/// Plan a frame: which steps run, in fixed z-order.
pub fn draw_plan(camera_ready: bool, image_loaded: bool, grid_enabled: bool) -> Vec<DrawStep> {
    let mut steps = vec![DrawStep::Background];
    if camera_ready {
        steps.push(DrawStep::Camera);
    }
    if image_loaded {
        steps.push(DrawStep::Image);
    }
    if grid_enabled {
        steps.push(DrawStep::Grid);
    }
    steps
}

/// Where a layer's source lands, relative to the viewport's top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerPlacement {
    pub center: Point,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub opacity: f64,
}

impl LayerPlacement {
    /// Corners of the rotated quad, clockwise from top-left.
    pub fn corners(&self) -> [Point; 4] {
        let (sin, cos) = self.rotation.sin_cos();
        let hw = self.width * 0.5;
        let hh = self.height * 0.5;
        [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)].map(|(dx, dy)| Point {
            x: self.center.x + dx * cos - dy * sin,
            y: self.center.y + dx * sin + dy * cos,
        })
    }
}

/// Fit the source inside the viewport, then apply the layer transform.
///
/// Returns `None` for a source without pixels (e.g. a camera that has not
/// delivered its first frame).
pub fn place_layer(
    viewport: Viewport,
    source_width: u32,
    source_height: u32,
    layer: &LayerState,
) -> Option<LayerPlacement> {
    if source_width == 0 || source_height == 0 {
        return None;
    }
    let (sw, sh) = (source_width as f64, source_height as f64);
    let fit = (viewport.width / sw).min(viewport.height / sh);
    Some(LayerPlacement {
        center: Point {
            x: viewport.width * 0.5 + layer.x() / 100.0 * viewport.width,
            y: viewport.height * 0.5 + layer.y() / 100.0 * viewport.height,
        },
        width: sw * fit * layer.scale(),
        height: sh * fit * layer.scale(),
        rotation: layer.rotation(),
        opacity: clamp(layer.opacity(), 0.0, 1.0),
    })
}

/// Grid line positions and stroke colour for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLines {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub rgb: [u8; 3],
    pub alpha: f64,
}

pub fn grid_lines(viewport: Viewport, grid: &GridParameters) -> GridLines {
    let spacing = grid.size.clamp(20, 260) as f64;
    let offsets = |extent: f64| {
        let mut lines = Vec::new();
        let mut at = 0.5;
        while at <= extent {
            lines.push(at);
            at += spacing;
        }
        lines
    };
    GridLines {
        xs: offsets(viewport.width),
        ys: offsets(viewport.height),
        rgb: grid.rgb(),
        alpha: grid.opacity.clamp(0, 100) as f64 / 100.0,
    }
}
