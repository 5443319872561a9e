// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Session state and the control surface driven by the UI.
//!
//! A [`Session`] is built once at startup and owns everything that changes
//! while tracing: the scene, both pixel sources, the gesture tracker, the
//! render scheduler, the filter pipeline, the camera feed and the saved
//! project repository. Every user action goes through one of its methods
//! and comes back as an [`Outcome`] carrying the status line text.

use crate::config::Settings;
use crate::input::gesture::{GestureTracker, PointerId};
use crate::io::camera::CameraFeed;
use crate::io::media::{self, MediaError};
use crate::io::projects::{
    Confirmation, DeleteResult, ProjectError, ProjectRepository, SaveResult,
};
use crate::io::serialization;
use crate::models::filters::{FilterParameters, GridParameters};
use crate::models::layer::LayerKind;
use crate::models::project::{ProjectData, RestoredProject};
use crate::models::scene::{Scene, Tab, Viewport};
use crate::render::filter::{FilterPipeline, ImageSource};
use crate::render::scheduler::RenderScheduler;
use crate::util::geometry::{clamp, Point};
use image::RgbaImage;
use std::path::Path;
use std::time::{Duration, Instant};

/// Result of a control-surface operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done(String),
    /// The user declined a confirmation; nothing changed.
    Canceled(String),
    /// Nothing changed yet; repeat the call with an explicit answer.
    NeedsConfirmation(String),
    Failed(String),
}

impl Outcome {
    fn done(message: impl Into<String>) -> Self {
        Outcome::Done(message.into())
    }

    fn failed(message: impl Into<String>) -> Self {
        Outcome::Failed(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Done(m)
            | Outcome::Canceled(m)
            | Outcome::NeedsConfirmation(m)
            | Outcome::Failed(m) => m,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }
}

/// What the host should do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repaint {
    Idle,
    Now,
    After(Duration),
}

/// Tunables taken from [`Settings`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOptions {
    pub max_image_dimension: u32,
    pub jpeg_quality: u8,
    pub filter_debounce: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for SessionOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            max_image_dimension: settings.max_image_dimension.max(1),
            jpeg_quality: settings.jpeg_quality,
            filter_debounce: settings.filter_debounce(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectList {
    pub current_project_id: String,
    pub projects: Vec<ProjectSummary>,
}

pub struct Session {
    scene: Scene,
    image: Option<RgbaImage>,
    image_generation: u64,
    gestures: GestureTracker,
    scheduler: RenderScheduler,
    filters: FilterPipeline,
    camera: CameraFeed,
    projects: ProjectRepository,
    options: SessionOptions,
    status: Outcome,
}

fn storage_message(error: &ProjectError, write_failure: &str) -> String {
    match error {
        ProjectError::WriteFailed(_) => write_failure.to_string(),
        ProjectError::NotFound => "No saved project selected.".to_string(),
        ProjectError::EmptyName => "Project name cannot be empty.".to_string(),
        ProjectError::NameTaken(name) => format!("\"{}\" already exists.", name),
        ProjectError::Unavailable(_) | ProjectError::Malformed(_) | ProjectError::Migration(_) => {
            "Saved projects unavailable on this device.".to_string()
        }
    }
}

impl Session {
    pub fn new(projects: ProjectRepository, camera: CameraFeed, options: SessionOptions) -> Self {
        Self {
            scene: Scene::default(),
            image: None,
            image_generation: 0,
            gestures: GestureTracker::default(),
            scheduler: RenderScheduler::default(),
            filters: FilterPipeline::new(options.filter_debounce),
            camera,
            projects,
            options,
            status: Outcome::done(""),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn status(&self) -> &Outcome {
        &self.status
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    /// Increments whenever the source image is replaced or removed.
    pub fn image_generation(&self) -> u64 {
        self.image_generation
    }

    pub fn camera(&self) -> &CameraFeed {
        &self.camera
    }

    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    pub fn filter_pipeline(&self) -> &FilterPipeline {
        &self.filters
    }

    pub fn gestures(&self) -> &GestureTracker {
        &self.gestures
    }

    /// Nothing to trace onto until an image is loaded.
    pub fn awaiting_image(&self) -> bool {
        self.image.is_none()
    }

    fn record(&mut self, outcome: Outcome) -> Outcome {
        match &outcome {
            Outcome::Failed(m) => log::warn!("{}", m),
            _ if outcome.message().is_empty() => {}
            other => log::info!("{}", other.message()),
        }
        if !outcome.message().is_empty() {
            self.status = outcome.clone();
        }
        outcome
    }

    fn request_render(&mut self) {
        self.scheduler.request_render();
    }

    // ---- Frame loop ----

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        let viewport = Viewport::new(width, height);
        if viewport != self.scene.viewport {
            self.scene.viewport = viewport;
            self.request_render();
        }
    }

    pub fn set_active_tab(&mut self, tab: Tab) {
        self.scene.active_tab = tab;
    }

    /// A live video layer needs a new frame every refresh.
    pub fn is_continuous(&self) -> bool {
        self.camera.is_active()
    }

    /// Pull camera frames and fire an expired filter debounce.
    pub fn update(&mut self, now: Instant) {
        if self.camera.poll() {
            self.request_render();
        }
        if self.filters.poll(now) {
            log::debug!("Filter debounce expired");
            self.request_render();
        }
    }

    /// Start a frame. Returns whether the scene needs painting.
    pub fn begin_frame(&mut self) -> bool {
        let continuous = self.is_continuous();
        self.scheduler.begin_frame(continuous)
    }

    /// Finish a frame and decide when the next one is needed.
    pub fn end_frame(&mut self, now: Instant) -> Repaint {
        let continuous = self.is_continuous();
        if self.scheduler.end_frame(continuous) {
            return Repaint::Now;
        }
        match self.filters.time_until_due(now) {
            Some(delay) => Repaint::After(delay),
            None => Repaint::Idle,
        }
    }

    /// Buffer to draw for the image layer, regenerating the filter cache
    /// when needed.
    pub fn image_source(&mut self) -> Option<ImageSource<'_>> {
        let image = self.image.as_ref()?;
        Some(self.filters.source_for_render(image, &self.scene.filters))
    }

    // ---- Adjustments ----

    pub fn set_filter(&mut self, params: FilterParameters, now: Instant) -> Outcome {
        let params = params.clamped();
        if params != self.scene.filters {
            self.scene.filters = params;
            self.filters.queue_update(now);
        }
        Outcome::done("")
    }

    pub fn reset_filters(&mut self, now: Instant) -> Outcome {
        self.scene.filters = FilterParameters::default();
        self.filters.queue_update(now);
        self.record(Outcome::done("Adjustments reset."))
    }

    pub fn set_grid(&mut self, params: GridParameters) -> Outcome {
        let params = params.clamped();
        if params != self.scene.grid {
            self.scene.grid = params;
            self.request_render();
        }
        Outcome::done("")
    }

    /// Restore a layer's default transform and opacity. The lock is kept.
    pub fn reset_layer(&mut self, kind: LayerKind) -> Outcome {
        self.scene.layers.get_mut(kind).reset_transform();
        self.request_render();
        self.record(Outcome::done(format!("{} layer reset.", kind.label())))
    }

    pub fn toggle_lock(&mut self, kind: LayerKind) -> Outcome {
        let locked = self.scene.layers.get_mut(kind).toggle_lock();
        let state = if locked { "locked" } else { "unlocked" };
        self.record(Outcome::done(format!("{} layer {}.", kind.label(), state)))
    }

    /// Set a layer's opacity. Refused for a locked camera layer.
    pub fn set_layer_opacity(&mut self, kind: LayerKind, opacity: f64) -> Outcome {
        if kind == LayerKind::Camera && self.scene.layers.camera.is_locked() {
            return Outcome::Canceled("Camera layer is locked.".into());
        }
        self.scene.layers.get_mut(kind).set_opacity(opacity);
        self.request_render();
        Outcome::done("")
    }

    pub fn set_camera_zoom(&mut self, zoom: f64) -> Outcome {
        if self.scene.layers.camera.is_locked() {
            return Outcome::Canceled("Camera layer is locked.".into());
        }
        let zoom = if zoom.is_finite() { zoom } else { 1.0 };
        self.scene.layers.camera.set_scale(clamp(zoom, 1.0, 8.0));
        self.request_render();
        Outcome::done("")
    }

    // ---- Reference image ----

    /// Decode picture bytes and make them the reference image.
    pub fn load_image_bytes(&mut self, bytes: &[u8]) -> Outcome {
        let decoded = media::decode_image(bytes, self.options.max_image_dimension);
        self.finish_image_load(decoded)
    }

    /// Install the result of an image decode. A failed decode leaves the
    /// current image untouched.
    pub fn finish_image_load(&mut self, decoded: Result<RgbaImage, MediaError>) -> Outcome {
        match decoded {
            Ok(image) => {
                let (width, height) = image.dimensions();
                self.install_image(image);
                self.scene.layers.image.reset();
                self.record(Outcome::done(format!("Image loaded ({}x{}).", width, height)))
            }
            Err(e) => {
                log::debug!("Image decode failed: {}", e);
                self.record(Outcome::failed("Image failed to load."))
            }
        }
    }

    fn install_image(&mut self, image: RgbaImage) {
        self.gestures.cancel();
        self.filters.reset();
        self.image = Some(image);
        self.image_generation += 1;
        self.scene.active_tab = Tab::Image;
        self.request_render();
    }

    pub fn remove_image(&mut self) -> Outcome {
        if self.image.is_none() {
            return Outcome::done("");
        }
        self.gestures.cancel();
        self.filters.reset();
        self.image = None;
        self.image_generation += 1;
        self.scene.layers.image.reset();
        self.scene.active_tab = Tab::Image;
        self.request_render();
        self.record(Outcome::done("Image removed."))
    }

    // ---- Camera ----

    pub fn start_camera(&mut self) -> Outcome {
        match self.camera.start() {
            Ok(true) => {
                self.request_render();
                let message = if self.awaiting_image() {
                    "Camera ready. Add picture to begin."
                } else {
                    "Camera ready."
                };
                self.record(Outcome::done(message))
            }
            Ok(false) => Outcome::done(""),
            Err(e) => self.record(Outcome::failed(e.user_message())),
        }
    }

    pub fn stop_camera(&mut self) -> Outcome {
        if !self.camera.stop() {
            return Outcome::done("");
        }
        if self.gestures.target() == Some(LayerKind::Camera) {
            self.gestures.cancel();
        }
        self.request_render();
        self.record(Outcome::done("Camera stopped."))
    }

    // ---- Pointers ----

    fn is_drawable(&self, kind: LayerKind) -> bool {
        match kind {
            LayerKind::Image => self.image.is_some(),
            LayerKind::Camera => self.camera.is_ready(),
        }
    }

    /// Returns whether the press started or extended a gesture.
    pub fn pointer_down(&mut self, id: PointerId, position: Point) -> bool {
        if self.awaiting_image() {
            return false;
        }
        let target = self.scene.gesture_target();
        let drawable = self.is_drawable(target);
        self.gestures
            .pointer_down(id, position, target, &self.scene.layers, drawable)
    }

    /// Returns whether a layer moved.
    pub fn pointer_move(&mut self, id: PointerId, position: Point) -> bool {
        let viewport = self.scene.viewport;
        match self
            .gestures
            .pointer_move(id, position, &mut self.scene.layers, viewport)
        {
            Some(kind) => {
                let layer = self.scene.layers.get(kind);
                log::debug!(
                    "{} layer at ({:.1}, {:.1}) scale {:.2} rotation {:.3}",
                    kind.label(),
                    layer.x(),
                    layer.y(),
                    layer.scale(),
                    layer.rotation()
                );
                self.request_render();
                true
            }
            None => false,
        }
    }

    pub fn pointer_up(&mut self, id: PointerId) -> bool {
        self.gestures.pointer_up(id, &self.scene.layers)
    }

    pub fn cancel_gestures(&mut self) {
        self.gestures.cancel();
    }

    /// Zoom and rotate the gesture target about its centre, as a two-finger
    /// gesture would. Used for wheel input on desktops.
    pub fn nudge_layer(&mut self, zoom_factor: f64, rotation: f64) -> bool {
        let kind = self.scene.gesture_target();
        if self.awaiting_image() || !self.is_drawable(kind) || self.gestures.pointer_count() > 0 {
            return false;
        }
        let layer = self.scene.layers.get_mut(kind);
        if layer.is_locked() {
            return false;
        }
        if zoom_factor.is_finite() && zoom_factor > 0.0 {
            layer.set_scale(layer.scale() * zoom_factor);
        }
        if rotation.is_finite() {
            layer.set_rotation(layer.rotation() + rotation);
        }
        self.request_render();
        true
    }

    // ---- Projects ----

    /// Saved projects, newest first, or `None` when storage is unusable.
    pub fn project_list(&mut self) -> Option<ProjectList> {
        match self.projects.read() {
            Ok(store) => Some(ProjectList {
                current_project_id: store.current_project_id,
                projects: store
                    .projects
                    .into_iter()
                    .map(|p| ProjectSummary {
                        id: p.id,
                        name: p.name,
                        updated_at: p.updated_at,
                    })
                    .collect(),
            }),
            Err(e) => {
                log::warn!("Project list unavailable: {}", e);
                None
            }
        }
    }

    fn bake_project(&self) -> Result<ProjectData, Outcome> {
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| Outcome::failed("Add an image before saving project."))?;
        let url = media::encode_data_url(image, self.options.jpeg_quality).map_err(|e| {
            log::error!("Could not encode project image: {}", e);
            Outcome::failed("Could not encode image.")
        })?;
        Ok(self.scene.export_project(url))
    }

    pub fn save_project(&mut self, typed_name: &str, confirmation: Confirmation) -> Outcome {
        let data = match self.bake_project() {
            Ok(data) => data,
            Err(outcome) => return self.record(outcome),
        };
        let outcome = match self.projects.save(typed_name, &data, confirmation) {
            Ok(SaveResult::Created { name, .. }) => Outcome::done(format!("Saved \"{}\".", name)),
            Ok(SaveResult::Updated { name, .. }) => Outcome::done(format!("Updated \"{}\".", name)),
            Ok(SaveResult::NeedsConfirmation { prompt }) => Outcome::NeedsConfirmation(prompt),
            Ok(SaveResult::Canceled) => Outcome::Canceled("Save canceled.".into()),
            Err(e) => {
                log::error!("Save failed: {}", e);
                Outcome::failed(storage_message(&e, "Could not save project on this device."))
            }
        };
        self.record(outcome)
    }

    /// Open a saved project: the given id, else the current one, else the
    /// newest.
    pub fn load_project(&mut self, id: Option<&str>, now: Instant) -> Outcome {
        let entry = match self.projects.resolve(id) {
            Ok(entry) => entry,
            Err(ProjectError::NotFound) => {
                return self.record(Outcome::failed("No saved project found."))
            }
            Err(e) => {
                log::error!("Load failed: {}", e);
                return self.record(Outcome::failed(storage_message(&e, "")));
            }
        };

        let Some(restored) = RestoredProject::from_value(&entry.data) else {
            return self.record(Outcome::failed("Saved project is invalid."));
        };
        if let Err(outcome) = self.restore_project(&restored, now) {
            return self.record(outcome);
        }

        let outcome = match self.projects.set_current(&entry.id) {
            Ok(()) => Outcome::done(format!("Loaded \"{}\".", entry.name)),
            Err(e) => {
                log::warn!("Could not record current project: {}", e);
                Outcome::done("Project loaded, but could not update saved selection.")
            }
        };
        self.record(outcome)
    }

    /// Decode the embedded image first so a bad project leaves the scene as
    /// it was.
    fn restore_project(&mut self, project: &RestoredProject, now: Instant) -> Result<(), Outcome> {
        let image = media::decode_data_url(&project.image_data_url, self.options.max_image_dimension)
            .map_err(|e| {
                log::warn!("Project image could not be decoded: {}", e);
                Outcome::failed("Saved project is invalid.")
            })?;
        self.install_image(image);
        self.scene.apply_project(project);
        self.filters.queue_update(now);
        Ok(())
    }

    pub fn delete_project(&mut self, id: Option<&str>, confirmation: Confirmation) -> Outcome {
        let outcome = match self.projects.delete(id, confirmation) {
            Ok(DeleteResult::Deleted { name, .. }) => Outcome::done(format!("Deleted \"{}\".", name)),
            Ok(DeleteResult::NeedsConfirmation { prompt }) => Outcome::NeedsConfirmation(prompt),
            Ok(DeleteResult::Canceled) => Outcome::Canceled("Delete canceled.".into()),
            Err(e) => Outcome::failed(storage_message(&e, "Could not delete project on this device.")),
        };
        self.record(outcome)
    }

    pub fn rename_project(&mut self, id: &str, new_name: &str) -> Outcome {
        let outcome = match self.projects.rename(id, new_name) {
            Ok(name) => Outcome::done(format!("Renamed to \"{}\".", name)),
            Err(e) => Outcome::failed(storage_message(&e, "Could not rename project on this device.")),
        };
        self.record(outcome)
    }

    // ---- Project files ----

    pub fn export_project_file(&mut self, path: &Path) -> Outcome {
        let data = match self.bake_project() {
            Ok(data) => data,
            Err(outcome) => return self.record(outcome),
        };
        let outcome = match serialization::export_project(&data, path) {
            Ok(()) => Outcome::done(format!("Exported to {}.", path.display())),
            Err(e) => {
                log::error!("Export failed: {:#}", e);
                Outcome::failed("Could not export project.")
            }
        };
        self.record(outcome)
    }

    pub fn import_project_file(&mut self, path: &Path, now: Instant) -> Outcome {
        let restored = match serialization::import_project(path) {
            Ok(restored) => restored,
            Err(e) => {
                log::warn!("Import failed: {:#}", e);
                return self.record(Outcome::failed("Project file is invalid."));
            }
        };
        let outcome = match self.restore_project(&restored, now) {
            Ok(()) => Outcome::done(format!("Imported {}.", path.display())),
            Err(outcome) => outcome,
        };
        self.record(outcome)
    }
}
