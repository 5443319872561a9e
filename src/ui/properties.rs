// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Control panel.
//!
//! One control group per tab. Controls are re-read from the scene every
//! frame, so a refused edit (e.g. on a locked camera) snaps back.

use crate::io::projects::Confirmation;
use crate::models::filters::{FilterParameters, GridParameters};
use crate::models::layer::LayerKind;
use crate::models::scene::Tab;
use crate::session::{Outcome, ProjectList, Session};
use chrono::TimeZone;
use std::time::Instant;

/// Something the panel cannot do itself.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertiesAction {
    None,
    OpenImage,
    ExportProject,
    ImportProject,
    Confirm(PendingConfirmation),
}

/// An operation waiting on a yes/no answer.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConfirmation {
    pub prompt: String,
    pub operation: ConfirmOperation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOperation {
    Save { name: String },
    Delete { id: String },
}

/// Widget state that outlives a frame.
#[derive(Debug, Default)]
pub struct PanelState {
    pub project_name: String,
    pub selected_project: String,
    projects: Option<ProjectList>,
    stale: bool,
}

impl PanelState {
    pub fn new() -> Self {
        Self {
            stale: true,
            ..Self::default()
        }
    }

    /// Re-read the project list on the next frame and point the selection
    /// (and optionally the name field) at the current project.
    pub fn refresh(&mut self) {
        self.stale = true;
    }

    fn sync_projects(&mut self, session: &mut Session, update_name: bool) {
        self.projects = session.project_list();
        self.stale = false;
        let Some(list) = &self.projects else {
            self.selected_project.clear();
            return;
        };

        let preferred = if list.projects.iter().any(|p| p.id == self.selected_project) {
            self.selected_project.clone()
        } else {
            list.current_project_id.clone()
        };
        let selected = list
            .projects
            .iter()
            .find(|p| p.id == preferred)
            .or_else(|| list.projects.first());
        self.selected_project = selected.map(|p| p.id.clone()).unwrap_or_default();
        if update_name {
            self.project_name = selected.map(|p| p.name.clone()).unwrap_or_default();
        }
    }

    /// Follow the current project after a save, load or delete.
    pub fn follow_current(&mut self, session: &mut Session) {
        self.selected_project.clear();
        self.sync_projects(session, true);
    }
}

/// `Mar 5, 4:07 PM` style local time, or empty for a missing timestamp.
pub fn format_timestamp(updated_at: i64) -> String {
    if updated_at <= 0 {
        return String::new();
    }
    chrono::Local
        .timestamp_millis_opt(updated_at)
        .single()
        .map(|t| t.format("%b %-d, %-I:%M %p").to_string())
        .unwrap_or_default()
}

fn project_label(name: &str, updated_at: i64) -> String {
    let timestamp = format_timestamp(updated_at);
    if timestamp.is_empty() {
        name.to_string()
    } else {
        format!("{} · {}", name, timestamp)
    }
}

/// Display the control panel for the active tab.
pub fn show(
    ui: &mut egui::Ui,
    session: &mut Session,
    panel: &mut PanelState,
    now: Instant,
) -> PropertiesAction {
    if panel.stale {
        panel.sync_projects(session, false);
    }

    let tab = session.scene().active_tab;
    ui.heading(tab.label());
    ui.separator();

    egui::ScrollArea::vertical()
        .show(ui, |ui| match tab {
            Tab::Image => image_controls(ui, session),
            Tab::Camera => {
                camera_controls(ui, session);
                PropertiesAction::None
            }
            Tab::Edit => {
                edit_controls(ui, session, now);
                PropertiesAction::None
            }
            Tab::Grid => {
                grid_controls(ui, session);
                PropertiesAction::None
            }
            Tab::Projects => project_controls(ui, session, panel, now),
        })
        .inner
}

fn lock_button(ui: &mut egui::Ui, session: &mut Session, kind: LayerKind) {
    let locked = session.scene().layers.get(kind).is_locked();
    let label = if locked { "🔒 Unlock" } else { "🔓 Lock" };
    if ui.button(label).clicked() {
        session.toggle_lock(kind);
    }
}

fn image_controls(ui: &mut egui::Ui, session: &mut Session) -> PropertiesAction {
    let mut action = PropertiesAction::None;
    ui.horizontal(|ui| {
        let label = if session.awaiting_image() {
            "Open Image..."
        } else {
            "Replace Image..."
        };
        if ui.button(label).clicked() {
            action = PropertiesAction::OpenImage;
        }
        if ui
            .add_enabled(!session.awaiting_image(), egui::Button::new("Remove"))
            .clicked()
        {
            session.remove_image();
        }
    });

    ui.add_space(8.0);
    ui.add_enabled_ui(!session.awaiting_image(), |ui| {
        ui.horizontal(|ui| {
            lock_button(ui, session, LayerKind::Image);
            if ui.button("Reset").clicked() {
                session.reset_layer(LayerKind::Image);
            }
        });

        let mut opacity = session.scene().layers.image.opacity();
        if ui
            .add(egui::Slider::new(&mut opacity, 0.0..=1.0).text("Opacity"))
            .changed()
        {
            session.set_layer_opacity(LayerKind::Image, opacity);
        }
    });
    action
}

fn camera_controls(ui: &mut egui::Ui, session: &mut Session) {
    ui.horizontal(|ui| {
        if session.camera().is_active() {
            if ui.button("Stop Camera").clicked() {
                session.stop_camera();
            }
        } else if ui.button("Start Camera").clicked() {
            session.start_camera();
        }
    });

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        lock_button(ui, session, LayerKind::Camera);
        if ui.button("Reset").clicked() {
            session.reset_layer(LayerKind::Camera);
        }
    });

    let camera = &session.scene().layers.camera;
    let (mut opacity, mut zoom) = (camera.opacity(), camera.scale());
    if ui
        .add(egui::Slider::new(&mut opacity, 0.0..=1.0).text("Opacity"))
        .changed()
    {
        session.set_layer_opacity(LayerKind::Camera, opacity);
    }
    if ui
        .add(egui::Slider::new(&mut zoom, 1.0..=8.0).text("Zoom"))
        .changed()
    {
        session.set_camera_zoom(zoom);
    }
}

fn edit_controls(ui: &mut egui::Ui, session: &mut Session, now: Instant) {
    let mut filters: FilterParameters = session.scene().filters;
    let mut changed = ui.checkbox(&mut filters.grayscale, "Grayscale").changed();
    changed |= ui
        .add(egui::Slider::new(&mut filters.brightness, -100..=100).text("Brightness"))
        .changed();
    changed |= ui
        .add(egui::Slider::new(&mut filters.contrast, -100..=100).text("Contrast"))
        .changed();
    changed |= ui
        .add(
            egui::Slider::new(&mut filters.exposure, -2.0..=2.0)
                .step_by(0.1)
                .text("Exposure"),
        )
        .changed();
    if changed {
        session.set_filter(filters, now);
    }

    ui.add_space(8.0);
    if ui.button("Reset Adjustments").clicked() {
        session.reset_filters(now);
    }
}

fn grid_controls(ui: &mut egui::Ui, session: &mut Session) {
    let mut grid: GridParameters = session.scene().grid.clone();
    let mut changed = ui.checkbox(&mut grid.enabled, "Show grid").changed();
    changed |= ui
        .add(egui::Slider::new(&mut grid.size, 20..=200).text("Spacing"))
        .changed();
    changed |= ui
        .add(egui::Slider::new(&mut grid.opacity, 0..=100).text("Opacity"))
        .changed();

    ui.horizontal(|ui| {
        ui.label("Colour");
        let mut rgb = grid.rgb();
        if ui.color_edit_button_srgb(&mut rgb).changed() {
            grid.color = format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2]);
            changed = true;
        }
    });

    if changed {
        session.set_grid(grid);
    }
}

fn confirm_or(outcome: Outcome, operation: ConfirmOperation) -> Option<PendingConfirmation> {
    match outcome {
        Outcome::NeedsConfirmation(prompt) => Some(PendingConfirmation { prompt, operation }),
        _ => None,
    }
}

fn project_controls(
    ui: &mut egui::Ui,
    session: &mut Session,
    panel: &mut PanelState,
    now: Instant,
) -> PropertiesAction {
    let mut action = PropertiesAction::None;

    let Some(list) = panel.projects.clone() else {
        ui.label(egui::RichText::new("Saved projects unavailable on this device.").weak());
        if ui.button("Retry").clicked() {
            panel.refresh();
        }
        return action;
    };

    ui.horizontal(|ui| {
        ui.label("Name");
        let response = ui.add(
            egui::TextEdit::singleline(&mut panel.project_name)
                .hint_text("Project name")
                .char_limit(crate::models::project::MAX_PROJECT_NAME_LENGTH),
        );
        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if ui.button("Save").clicked() || submitted {
            let name = panel.project_name.clone();
            let outcome = session.save_project(&name, Confirmation::Ask);
            if outcome.is_done() {
                panel.follow_current(session);
            } else if let Some(pending) = confirm_or(outcome, ConfirmOperation::Save { name }) {
                action = PropertiesAction::Confirm(pending);
            }
        }
    });

    ui.add_space(8.0);
    if list.projects.is_empty() {
        ui.label(egui::RichText::new("No saved projects").weak());
    } else {
        let selected_label = list
            .projects
            .iter()
            .find(|p| p.id == panel.selected_project)
            .map(|p| project_label(&p.name, p.updated_at))
            .unwrap_or_default();
        let mut changed_selection = false;
        egui::ComboBox::from_id_source("project_select")
            .selected_text(selected_label)
            .width(ui.available_width())
            .show_ui(ui, |ui| {
                for project in &list.projects {
                    let label = project_label(&project.name, project.updated_at);
                    if ui
                        .selectable_value(&mut panel.selected_project, project.id.clone(), label)
                        .changed()
                    {
                        changed_selection = true;
                    }
                }
            });
        if changed_selection {
            panel.sync_projects(session, true);
        }

        ui.horizontal(|ui| {
            let selected = panel.selected_project.clone();
            if ui.button("Load").clicked() {
                if session.load_project(Some(&selected), now).is_done() {
                    panel.follow_current(session);
                }
            }
            if ui.button("Rename").clicked() {
                let name = panel.project_name.clone();
                if session.rename_project(&selected, &name).is_done() {
                    panel.sync_projects(session, true);
                }
            }
            if ui.button("Delete").clicked() {
                let outcome = session.delete_project(Some(&selected), Confirmation::Ask);
                if let Some(pending) = confirm_or(outcome, ConfirmOperation::Delete { id: selected })
                {
                    action = PropertiesAction::Confirm(pending);
                }
            }
        });
    }

    ui.add_space(8.0);
    ui.separator();
    ui.horizontal(|ui| {
        if ui
            .add_enabled(!session.awaiting_image(), egui::Button::new("Export..."))
            .clicked()
        {
            action = PropertiesAction::ExportProject;
        }
        if ui.button("Import...").clicked() {
            action = PropertiesAction::ImportProject;
        }
    });
    action
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::camera::{CameraFeed, NoCameraBackend};
    use crate::io::projects::ProjectRepository;
    use crate::io::storage::MemoryStore;
    use crate::session::SessionOptions;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn session() -> Session {
        let mut session = Session::new(
            ProjectRepository::new(Box::new(MemoryStore::new())),
            CameraFeed::new(Box::new(NoCameraBackend)),
            SessionOptions::default(),
        );
        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255])))
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();
        session.load_image_bytes(&png.into_inner());
        session
    }

    #[test]
    fn test_timestamp_formatting() {
        assert_eq!(format_timestamp(0), "");
        assert_eq!(format_timestamp(-5), "");
        assert!(!format_timestamp(1_700_000_000_000).is_empty());
        assert_eq!(project_label("Sketch", 0), "Sketch");
        assert!(project_label("Sketch", 1_700_000_000_000).starts_with("Sketch · "));
    }

    #[test]
    fn test_panel_follows_current_project() {
        let mut session = session();
        let mut panel = PanelState::new();
        panel.sync_projects(&mut session, true);
        assert!(panel.selected_project.is_empty());
        assert!(panel.project_name.is_empty());

        session.save_project("First", Confirmation::Ask);
        session.save_project("Second", Confirmation::Ask);
        panel.follow_current(&mut session);
        assert_eq!(panel.project_name, "Second");

        let first = panel
            .projects
            .as_ref()
            .and_then(|l| l.projects.iter().find(|p| p.name == "First"))
            .map(|p| p.id.clone())
            .unwrap();
        panel.selected_project = first.clone();
        panel.sync_projects(&mut session, true);
        assert_eq!(panel.selected_project, first);
        assert_eq!(panel.project_name, "First");

        session.delete_project(Some(&first), Confirmation::Accepted);
        panel.follow_current(&mut session);
        assert_eq!(panel.project_name, "Second");
    }

    #[test]
    fn test_confirmation_only_for_prompts() {
        let pending = confirm_or(
            Outcome::NeedsConfirmation("Delete \"A\"?".into()),
            ConfirmOperation::Delete { id: "a".into() },
        );
        assert_eq!(pending.map(|p| p.prompt), Some("Delete \"A\"?".to_string()));
        assert!(confirm_or(
            Outcome::Canceled("Save canceled.".into()),
            ConfirmOperation::Save { name: "A".into() }
        )
        .is_none());
    }
}
