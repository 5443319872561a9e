// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! The scene aggregate: everything that is drawn and everything a project
//! snapshot captures, apart from the pixel sources themselves.

use super::filters::{FilterParameters, GridParameters};
use super::layer::{LayerKind, Layers};
use super::project::{ProjectData, RestoredProject, PROJECT_DATA_VERSION};

/// Drawable area in logical pixels. Never smaller than 1x1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }
}

/// Control panel tabs. The active tab decides which layer gestures move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Image,
    Camera,
    Edit,
    Grid,
    Projects,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Image, Tab::Camera, Tab::Edit, Tab::Grid, Tab::Projects];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Image => "Image",
            Tab::Camera => "Camera",
            Tab::Edit => "Edit",
            Tab::Grid => "Grid",
            Tab::Projects => "Projects",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub layers: Layers,
    pub filters: FilterParameters,
    pub grid: GridParameters,
    pub viewport: Viewport,
    pub active_tab: Tab,
}

impl Scene {
    /// Layer that pointer gestures act on.
    pub fn gesture_target(&self) -> LayerKind {
        match self.active_tab {
            Tab::Camera => LayerKind::Camera,
            _ => LayerKind::Image,
        }
    }

    /// Snapshot the scene around an already baked image.
    pub fn export_project(&self, image_data_url: String) -> ProjectData {
        ProjectData {
            version: PROJECT_DATA_VERSION,
            image_data_url,
            image: self.layers.image.snapshot(),
            camera: self.layers.camera.snapshot(),
            filters: self.filters,
            grid: self.grid.clone(),
        }
    }

    /// Apply the sections present in a restored project.
    pub fn apply_project(&mut self, project: &RestoredProject) {
        if let Some(image) = &project.image {
            self.layers.image.restore(image);
        }
        if let Some(camera) = &project.camera {
            self.layers.camera.restore(camera);
        }
        if let Some(filters) = project.filters {
            self.filters = filters.clamped();
        }
        if let Some(grid) = &project.grid {
            self.grid = grid.clone().clamped();
        }
    }
}
