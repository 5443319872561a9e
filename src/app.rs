// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! [`TraceApp`] owns the [`Session`] and the per-widget UI state, lays out
//! the panels, runs file dialogs and the confirmation modal, and turns the
//! session's render decision into egui repaint requests.

use crate::io::media::{self, MediaError};
use crate::io::projects::Confirmation;
use crate::session::{Outcome, Repaint, Session};
use crate::ui::canvas::{self, CanvasState};
use crate::ui::properties::{self, ConfirmOperation, PanelState, PendingConfirmation, PropertiesAction};
use crate::ui::toolbar;
use image::RgbaImage;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::time::Instant;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp", "tiff", "tif"];

/// Main application state.
pub struct TraceApp {
    session: Session,

    /// Longest edge of a decoded reference image
    max_image_dimension: u32,

    canvas: CanvasState,
    panel: PanelState,

    /// Save or delete waiting on the user's answer
    pending: Option<PendingConfirmation>,

    /// Receiver for background image decoding
    image_loader: Option<Receiver<Result<RgbaImage, MediaError>>>,

    /// Loading state message
    loading_message: Option<String>,
}

impl TraceApp {
    pub fn new(mut session: Session, max_image_dimension: u32, start_camera: bool) -> Self {
        if start_camera {
            session.start_camera();
        }
        Self {
            session,
            max_image_dimension,
            canvas: CanvasState::default(),
            panel: PanelState::new(),
            pending: None,
            image_loader: None,
            loading_message: None,
        }
    }

    /// Decode a picture file off the UI thread.
    fn load_image_file(&mut self, path: PathBuf, ctx: &egui::Context) {
        let (sender, receiver) = channel();
        self.image_loader = Some(receiver);
        self.loading_message = Some("Loading image...".to_string());

        let max_dimension = self.max_image_dimension;
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let result = media::load_image(&path, max_dimension);
            if let Ok(image) = &result {
                log::info!("Decoded {} ({}x{})", path.display(), image.width(), image.height());
            }
            let _ = sender.send(result);
            ctx.request_repaint();
        });
    }

    fn poll_image_loader(&mut self) {
        let Some(receiver) = &self.image_loader else {
            return;
        };
        match receiver.try_recv() {
            Ok(result) => {
                self.image_loader = None;
                self.loading_message = None;
                self.session.finish_image_load(result);
            }
            Err(TryRecvError::Disconnected) => {
                log::error!("Image loader exited without a result");
                self.image_loader = None;
                self.loading_message = None;
            }
            Err(TryRecvError::Empty) => {}
        }
    }

    fn open_image_dialog(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
        {
            self.load_image_file(path, ctx);
        }
    }

    fn export_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Project", &["json", "yaml", "yml"])
            .set_file_name("tracing.json")
            .save_file()
        {
            self.session.export_project_file(&path);
        }
    }

    fn import_dialog(&mut self, now: Instant) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Project", &["json", "yaml", "yml"])
            .pick_file()
        {
            self.session.import_project_file(&path, now);
        }
    }

    fn handle_properties_action(&mut self, action: PropertiesAction, ctx: &egui::Context, now: Instant) {
        match action {
            PropertiesAction::OpenImage => self.open_image_dialog(ctx),
            PropertiesAction::ExportProject => self.export_dialog(),
            PropertiesAction::ImportProject => self.import_dialog(now),
            PropertiesAction::Confirm(pending) => self.pending = Some(pending),
            PropertiesAction::None => {}
        }
    }

    /// Save under the typed name, asking before overwriting.
    fn save_shortcut(&mut self) {
        let name = self.panel.project_name.clone();
        match self.session.save_project(&name, Confirmation::Ask) {
            Outcome::NeedsConfirmation(prompt) => {
                self.pending = Some(PendingConfirmation {
                    prompt,
                    operation: ConfirmOperation::Save { name },
                });
            }
            outcome if outcome.is_done() => self.panel.follow_current(&mut self.session),
            _ => {}
        }
    }

    fn answer(&mut self, pending: PendingConfirmation, confirmation: Confirmation) {
        let outcome = match &pending.operation {
            ConfirmOperation::Save { name } => self.session.save_project(name, confirmation),
            ConfirmOperation::Delete { id } => self.session.delete_project(Some(id), confirmation),
        };
        if outcome.is_done() {
            self.panel.follow_current(&mut self.session);
        }
    }

    fn show_confirmation(&mut self, ctx: &egui::Context) {
        let Some(pending) = self.pending.clone() else {
            return;
        };
        let mut answer = None;
        egui::Window::new("Confirm")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(pending.prompt.as_str());
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("OK").clicked() {
                        answer = Some(Confirmation::Accepted);
                    }
                    if ui.button("Cancel").clicked() {
                        answer = Some(Confirmation::Declined);
                    }
                });
            });
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            answer = Some(Confirmation::Declined);
        }
        if let Some(confirmation) = answer {
            self.pending = None;
            self.answer(pending, confirmation);
        }
    }
}

impl eframe::App for TraceApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.poll_image_loader();
        self.session.update(now);
        self.session.begin_frame();

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Image...").clicked() {
                        ui.close_menu();
                        self.open_image_dialog(ctx);
                    }
                    ui.separator();
                    if ui.button("Import Project...").clicked() {
                        ui.close_menu();
                        self.import_dialog(now);
                    }
                    if ui
                        .add_enabled(!self.session.awaiting_image(), egui::Button::new("Export Project..."))
                        .clicked()
                    {
                        ui.close_menu();
                        self.export_dialog();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
            });
        });

        // Tabs
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            if let Some(tab) = toolbar::show(ui, self.session.scene().active_tab) {
                self.session.set_active_tab(tab);
            }
        });

        // Status line
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            let status = self.session.status();
            let text = egui::RichText::new(status.message()).small();
            let text = if status.is_error() {
                text.color(egui::Color32::from_rgb(230, 80, 80))
            } else {
                text
            };
            ui.label(text);
        });

        // Controls (right side)
        let action = egui::SidePanel::right("properties")
            .default_width(260.0)
            .show(ctx, |ui| properties::show(ui, &mut self.session, &mut self.panel, now))
            .inner;
        self.handle_properties_action(action, ctx, now);

        // Save shortcut, unless a text field has focus
        if !ctx.wants_keyboard_input()
            && self.pending.is_none()
            && !self.session.awaiting_image()
            && ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::S))
        {
            self.save_shortcut();
        }

        // Main canvas (center)
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                if let Some(ref message) = self.loading_message {
                    ui.centered_and_justified(|ui| {
                        ui.vertical_centered(|ui| {
                            ui.add_space(20.0);
                            ui.spinner();
                            ui.add_space(10.0);
                            ui.label(
                                egui::RichText::new(message)
                                    .size(16.0)
                                    .color(egui::Color32::from_gray(200)),
                            );
                        });
                    });
                } else {
                    canvas::show(ui, &mut self.session, &mut self.canvas);
                }
            });

        self.show_confirmation(ctx);

        // Repaint for the spinner, live camera or a pending filter update
        if self.loading_message.is_some() {
            ctx.request_repaint();
        }
        match self.session.end_frame(Instant::now()) {
            Repaint::Now => ctx.request_repaint(),
            Repaint::After(delay) => ctx.request_repaint_after(delay),
            Repaint::Idle => {}
        }
    }
}
