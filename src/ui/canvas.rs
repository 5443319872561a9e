// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Tracing canvas.
//!
//! Paints the composite (background, camera, reference image, grid) and
//! feeds mouse, touch and wheel input to the session's gesture tracker.

use crate::input::gesture::PointerId;
use crate::render::compositor::{draw_plan, grid_lines, place_layer, DrawStep, LayerPlacement};
use crate::session::Session;
use crate::util::geometry::Point;
use egui::epaint::Vertex;
use image::RgbaImage;
use std::collections::HashSet;

/// The primary mouse button acts as pointer 0; touches are numbered above it.
const MOUSE_POINTER: PointerId = 0;
/// Radians of rotation per point of Shift+scroll.
const ROTATE_PER_POINT: f64 = 0.004;

/// GPU-side copies of the pixel sources and touch bookkeeping.
#[derive(Default)]
pub struct CanvasState {
    image_texture: Option<egui::TextureHandle>,
    /// Image generation and filter key the texture was built from.
    image_tag: Option<(u64, String)>,
    camera_texture: Option<egui::TextureHandle>,
    camera_generation: u64,
    touches: HashSet<PointerId>,
}

fn touch_pointer(id: egui::TouchId) -> PointerId {
    id.0.wrapping_add(1)
}

fn upload(ctx: &egui::Context, slot: &mut Option<egui::TextureHandle>, name: &str, image: &RgbaImage) {
    let size = [image.width() as usize, image.height() as usize];
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw());
    match slot {
        Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
        None => *slot = Some(ctx.load_texture(name, color_image, egui::TextureOptions::LINEAR)),
    }
}

/// Display the canvas, taking the whole remaining area.
pub fn show(ui: &mut egui::Ui, session: &mut Session, state: &mut CanvasState) {
    let (rect, response) =
        ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
    session.set_viewport(rect.width() as f64, rect.height() as f64);

    handle_input(ui, &response, rect, session, state);

    let painter = ui.painter_at(rect);
    let ctx = ui.ctx().clone();

    // Camera frame upload.
    let camera_size = match session.camera().frame() {
        Some(frame) if session.camera().is_ready() => {
            let generation = session.camera().frame_generation();
            if state.camera_texture.is_none() || state.camera_generation != generation {
                upload(&ctx, &mut state.camera_texture, "camera_frame", frame);
                state.camera_generation = generation;
            }
            Some(frame.dimensions())
        }
        _ => None,
    };

    // Reference image upload, filtered or not.
    let generation = session.image_generation();
    let image_size = match session.image_source() {
        Some(source) => {
            let tag = (generation, source.key().to_string());
            if state.image_texture.is_none() || state.image_tag.as_ref() != Some(&tag) {
                upload(&ctx, &mut state.image_texture, "reference_image", source.image());
                state.image_tag = Some(tag);
            }
            Some(source.image().dimensions())
        }
        None => {
            state.image_texture = None;
            state.image_tag = None;
            None
        }
    };

    let scene = session.scene();
    let plan = draw_plan(camera_size.is_some(), image_size.is_some(), scene.grid.enabled);
    for step in plan {
        match step {
            DrawStep::Background => {
                painter.rect_filled(rect, 0.0, egui::Color32::BLACK);
            }
            DrawStep::Camera => {
                if let (Some(texture), Some((w, h))) = (&state.camera_texture, camera_size) {
                    if let Some(placement) = place_layer(scene.viewport, w, h, &scene.layers.camera) {
                        paint_layer(&painter, rect.min, texture.id(), &placement);
                    }
                }
            }
            DrawStep::Image => {
                if let (Some(texture), Some((w, h))) = (&state.image_texture, image_size) {
                    if let Some(placement) = place_layer(scene.viewport, w, h, &scene.layers.image) {
                        paint_layer(&painter, rect.min, texture.id(), &placement);
                    }
                }
            }
            DrawStep::Grid => {
                let lines = grid_lines(scene.viewport, &scene.grid);
                let [r, g, b] = lines.rgb;
                let alpha = (lines.alpha * 255.0).round() as u8;
                let stroke = egui::Stroke::new(1.0, egui::Color32::from_rgba_unmultiplied(r, g, b, alpha));
                for x in &lines.xs {
                    let x = rect.min.x + *x as f32;
                    painter.line_segment([egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y)], stroke);
                }
                for y in &lines.ys {
                    let y = rect.min.y + *y as f32;
                    painter.line_segment([egui::pos2(rect.min.x, y), egui::pos2(rect.max.x, y)], stroke);
                }
            }
        }
    }

    if session.awaiting_image() {
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "Open a picture to start tracing",
            egui::FontId::proportional(18.0),
            egui::Color32::from_gray(200),
        );
    }
}

/// Draw a textured quad rotated about the layer centre.
fn paint_layer(
    painter: &egui::Painter,
    origin: egui::Pos2,
    texture: egui::TextureId,
    placement: &LayerPlacement,
) {
    let tint = egui::Color32::from_white_alpha((placement.opacity * 255.0).round() as u8);
    let uvs = [
        egui::pos2(0.0, 0.0),
        egui::pos2(1.0, 0.0),
        egui::pos2(1.0, 1.0),
        egui::pos2(0.0, 1.0),
    ];

    let mut mesh = egui::Mesh::with_texture(texture);
    for (corner, uv) in placement.corners().iter().zip(uvs) {
        mesh.vertices.push(Vertex {
            pos: origin + egui::vec2(corner.x as f32, corner.y as f32),
            uv,
            color: tint,
        });
    }
    mesh.add_triangle(0, 1, 2);
    mesh.add_triangle(0, 2, 3);
    painter.add(egui::Shape::mesh(mesh));
}

fn handle_input(
    ui: &egui::Ui,
    response: &egui::Response,
    rect: egui::Rect,
    session: &mut Session,
    state: &mut CanvasState,
) {
    let local = |pos: egui::Pos2| Point::new((pos.x - rect.min.x) as f64, (pos.y - rect.min.y) as f64);
    let events = ui.input(|i| i.events.clone());

    let saw_touch = events.iter().any(|e| matches!(e, egui::Event::Touch { .. }));
    for event in &events {
        match event {
            egui::Event::Touch { id, phase, pos, .. } => {
                let pointer = touch_pointer(*id);
                match phase {
                    egui::TouchPhase::Start => {
                        if rect.contains(*pos) && session.pointer_down(pointer, local(*pos)) {
                            state.touches.insert(pointer);
                        }
                    }
                    egui::TouchPhase::Move => {
                        session.pointer_move(pointer, local(*pos));
                    }
                    egui::TouchPhase::End | egui::TouchPhase::Cancel => {
                        state.touches.remove(&pointer);
                        session.pointer_up(pointer);
                    }
                }
            }
            egui::Event::WindowFocused(false) => {
                state.touches.clear();
                session.cancel_gestures();
            }
            // Touch input is also reported as emulated mouse events; skip those.
            _ if saw_touch || !state.touches.is_empty() => {}
            egui::Event::PointerButton {
                pos,
                button: egui::PointerButton::Primary,
                pressed,
                ..
            } => {
                if *pressed {
                    if rect.contains(*pos) {
                        session.pointer_down(MOUSE_POINTER, local(*pos));
                    }
                } else {
                    session.pointer_up(MOUSE_POINTER);
                }
            }
            egui::Event::PointerMoved(pos) => {
                session.pointer_move(MOUSE_POINTER, local(*pos));
            }
            egui::Event::PointerGone => {
                session.pointer_up(MOUSE_POINTER);
            }
            _ => {}
        }
    }

    if response.hovered() && !saw_touch && state.touches.is_empty() {
        let (zoom, scroll, shift) =
            ui.input(|i| (i.zoom_delta(), i.raw_scroll_delta, i.modifiers.shift));
        // Shift turns vertical wheel motion horizontal on some platforms.
        let rotation = if shift {
            (scroll.x + scroll.y) as f64 * ROTATE_PER_POINT
        } else {
            0.0
        };
        if zoom != 1.0 || rotation != 0.0 {
            session.nudge_layer(zoom as f64, rotation);
        }
    }
}
