// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project file export and import.
//!
//! Project documents can be exchanged as YAML or JSON files, picked by
//! extension. Imports go through the same lenient restore as stored
//! projects, so a hand-edited file with odd values still loads.

use crate::models::project::{ProjectData, RestoredProject};
use anyhow::{anyhow, bail, Result};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeFormat {
    Json,
    Yaml,
}

impl ExchangeFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Export project data to YAML format.
pub fn export_yaml(data: &ProjectData, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(data)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Export project data to JSON format.
pub fn export_json(data: &ProjectData, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Export in the format named by the file extension.
pub fn export_project(data: &ProjectData, path: &Path) -> Result<()> {
    match ExchangeFormat::from_path(path) {
        Some(ExchangeFormat::Json) => export_json(data, path),
        Some(ExchangeFormat::Yaml) => export_yaml(data, path),
        None => bail!("unsupported project file type: {}", path.display()),
    }
}

/// Import project data from YAML format.
pub fn import_yaml(path: &Path) -> Result<Value> {
    let yaml = std::fs::read_to_string(path)?;
    let value = serde_yaml::from_str(&yaml)?;
    Ok(value)
}

/// Import project data from JSON format.
pub fn import_json(path: &Path) -> Result<Value> {
    let json = std::fs::read_to_string(path)?;
    let value = serde_json::from_str(&json)?;
    Ok(value)
}

/// Read a project file and coerce it into a restorable project.
pub fn import_project(path: &Path) -> Result<RestoredProject> {
    let value = match ExchangeFormat::from_path(path) {
        Some(ExchangeFormat::Json) => import_json(path)?,
        Some(ExchangeFormat::Yaml) => import_yaml(path)?,
        None => bail!("unsupported project file type: {}", path.display()),
    };
    RestoredProject::from_value(&value)
        .ok_or_else(|| anyhow!("{} has no embedded image", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scene::Scene;
    use tempfile::tempdir;

    fn sample() -> ProjectData {
        let mut scene = Scene::default();
        scene.filters.brightness = 15;
        scene.grid.enabled = true;
        scene.layers.image.set_offset(12.5, -3.0);
        scene.export_project("data:image/jpeg;base64,AAAA".into())
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ExchangeFormat::from_path(Path::new("a.JSON")), Some(ExchangeFormat::Json));
        assert_eq!(ExchangeFormat::from_path(Path::new("a.yml")), Some(ExchangeFormat::Yaml));
        assert_eq!(ExchangeFormat::from_path(Path::new("a.txt")), None);
        assert_eq!(ExchangeFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_yaml_and_json_restore_same_project() {
        let dir = tempdir().unwrap();
        let data = sample();
        let json_path = dir.path().join("trace.json");
        let yaml_path = dir.path().join("trace.yaml");
        export_project(&data, &json_path).unwrap();
        export_project(&data, &yaml_path).unwrap();

        let from_json = import_project(&json_path).unwrap();
        let from_yaml = import_project(&yaml_path).unwrap();
        assert_eq!(from_json, from_yaml);
        assert_eq!(from_json.filters.unwrap().brightness, 15);
        assert_eq!(from_json.image.unwrap().x, 12.5);
    }

    #[test]
    fn test_import_is_lenient() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("edited.json");
        std::fs::write(
            &path,
            r#"{"imageDataUrl":"data:image/png;base64,AAAA","filters":{"brightness":"900"}}"#,
        )
        .unwrap();

        let restored = import_project(&path).unwrap();
        assert_eq!(restored.filters.unwrap().brightness, 100);
        assert!(restored.grid.is_none());
    }

    #[test]
    fn test_import_rejects_documents_without_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.yaml");
        std::fs::write(&path, "version: 1\n").unwrap();
        assert!(import_project(&path).is_err());
        assert!(export_project(&sample(), &dir.path().join("x.txt")).is_err());
    }
}
