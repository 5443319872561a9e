// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Tab bar.
//!
//! The active tab picks which control group the side panel shows and which
//! layer canvas gestures move.

use crate::models::scene::Tab;

/// Display the tab bar. Returns the newly selected tab, if it changed.
pub fn show(ui: &mut egui::Ui, active_tab: Tab) -> Option<Tab> {
    let mut selected = None;
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        for tab in Tab::ALL {
            if ui.selectable_label(active_tab == tab, tab.label()).clicked() && tab != active_tab {
                selected = Some(tab);
            }
        }

        ui.separator();

        let hint = match selected.unwrap_or(active_tab) {
            Tab::Camera => "Drag to move the camera, pinch or Ctrl+scroll to zoom",
            Tab::Edit => "Adjust tones of the reference image",
            Tab::Grid => "Overlay an alignment grid",
            Tab::Projects => "Save and restore tracing setups",
            Tab::Image => "Drag to move the picture, pinch or Ctrl+scroll to zoom, Shift+scroll to rotate",
        };

        ui.label(egui::RichText::new(hint).italics().weak());
    });
    selected
}
