// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application settings.

use crate::io::media::{DEFAULT_JPEG_QUALITY, DEFAULT_MAX_DIMENSION};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_DIR_NAME: &str = "tracelite";
pub const DATA_DIR_ENV: &str = "TRACELITE_DATA_DIR";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Where saved projects are kept. Defaults to the platform data
    /// directory when missing.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Quiet period before tonal filters are recomputed after an edit.
    #[serde(default = "default_filter_debounce_ms")]
    pub filter_debounce_ms: u64,
    /// Longest edge, in pixels, of a loaded reference image.
    #[serde(default = "default_max_image_dimension")]
    pub max_image_dimension: u32,
    /// JPEG quality used when baking the image into a project.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Open the camera as soon as the window appears.
    #[serde(default = "default_start_camera")]
    pub start_camera: bool,
    /// When enabled the application initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default = "default_window_width")]
    pub window_width: f32,
    #[serde(default = "default_window_height")]
    pub window_height: f32,
}

fn default_filter_debounce_ms() -> u64 {
    24
}

fn default_max_image_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_start_camera() -> bool {
    true
}

fn default_window_width() -> f32 {
    1280.0
}

fn default_window_height() -> f32 {
    720.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            filter_debounce_ms: default_filter_debounce_ms(),
            max_image_dimension: default_max_image_dimension(),
            jpeg_quality: default_jpeg_quality(),
            start_camera: default_start_camera(),
            debug_logging: false,
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Load settings, falling back to defaults when the file is unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring invalid settings in {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// `settings.json` inside the platform config directory.
    pub fn default_path() -> PathBuf {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
            .join(SETTINGS_FILE)
    }

    /// Data directory: the environment override, then the configured
    /// directory, then the platform default.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir_with(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
    }

    fn data_dir_with(&self, env_override: Option<PathBuf>) -> PathBuf {
        env_override
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| self.data_dir.clone())
            .unwrap_or_else(|| {
                dirs_next::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(APP_DIR_NAME)
            })
    }

    pub fn filter_debounce(&self) -> Duration {
        Duration::from_millis(self.filter_debounce_ms)
    }

    pub fn log_level(&self) -> &'static str {
        if self.debug_logging {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.filter_debounce(), Duration::from_millis(24));
        assert_eq!(settings.log_level(), "info");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "debug_logging": true, "jpeg_quality": 70 }"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert!(settings.debug_logging);
        assert_eq!(settings.jpeg_quality, 70);
        assert_eq!(settings.max_image_dimension, 2200);
        assert!(settings.start_camera);
        assert_eq!(settings.log_level(), "debug");
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(Settings::load(&path).is_err());
        assert_eq!(Settings::load_or_default(&path), Settings::default());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            data_dir: Some(dir.path().join("data")),
            start_camera: false,
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_data_dir_precedence() {
        let settings = Settings {
            data_dir: Some(PathBuf::from("/configured")),
            ..Settings::default()
        };
        assert_eq!(
            settings.data_dir_with(Some(PathBuf::from("/env"))),
            PathBuf::from("/env")
        );
        assert_eq!(settings.data_dir_with(Some(PathBuf::new())), PathBuf::from("/configured"));
        assert_eq!(settings.data_dir_with(None), PathBuf::from("/configured"));
        assert!(Settings::default().data_dir_with(None).ends_with(APP_DIR_NAME));
    }
}
