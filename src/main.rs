// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! TraceLite - camera tracing overlay
//!
//! Shows a reference picture semi-transparently over a live camera feed so
//! the picture can be traced onto paper. Layers are moved with the pointer,
//! tones are adjusted with debounced filters, and setups are saved as named
//! projects.

mod app;
mod config;
mod input;
mod io;
mod models;
mod render;
mod session;
mod ui;
mod util;

use anyhow::Result;
use app::TraceApp;
use config::Settings;
use io::camera::{default_backend, CameraFeed};
use io::projects::ProjectRepository;
use io::storage::{FileStore, KeyValueStore, MemoryStore};
use session::{Session, SessionOptions};

fn open_storage(settings: &Settings) -> Box<dyn KeyValueStore> {
    let data_dir = settings.resolved_data_dir();
    match FileStore::open(&data_dir) {
        Ok(store) => {
            log::info!("Saved projects in {}", store.root().display());
            Box::new(store)
        }
        Err(e) => {
            log::error!("Project storage unavailable at {}: {}", data_dir.display(), e);
            Box::new(MemoryStore::unavailable())
        }
    }
}

fn main() -> Result<()> {
    let settings = Settings::load_or_default(&Settings::default_path());

    // Initialize logging; RUST_LOG wins over the settings file
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(settings.log_level()))
        .init();

    let session = Session::new(
        ProjectRepository::new(open_storage(&settings)),
        CameraFeed::new(default_backend()),
        SessionOptions::from(&settings),
    );
    let app = TraceApp::new(session, settings.max_image_dimension, settings.start_camera);

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([settings.window_width, settings.window_height])
            .with_min_inner_size([640.0, 480.0])
            .with_title("TraceLite"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native("TraceLite", options, Box::new(|_cc| Ok(Box::new(app))))
        .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
