// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project documents and the saved-project collection.
//!
//! A project document is a full snapshot of the visual state: the baked
//! reference image plus both layer transforms, the tonal filters and the
//! grid. Documents are written strictly but read leniently: anything stored
//! on disk may be stale, hand-edited or truncated, so every field is coerced
//! and clamped rather than rejected.

use super::filters::{is_hex_color, FilterParameters, GridParameters, DEFAULT_GRID_COLOR};
use super::layer::{LayerKind, LayerSnapshot};
use crate::util::geometry::normalize_angle;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

pub const PROJECT_DATA_VERSION: u32 = 1;
pub const STORE_VERSION: u32 = 2;
pub const MAX_PROJECT_NAME_LENGTH: usize = 40;

/// Wire format of a single project snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    pub version: u32,
    pub image_data_url: String,
    pub image: LayerSnapshot,
    pub camera: LayerSnapshot,
    pub filters: FilterParameters,
    pub grid: GridParameters,
}

impl ProjectData {
    pub fn to_value(&self) -> Value {
        // Plain data with string keys; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A project document as recovered from storage.
///
/// Sections that are missing from the stored document are `None` and leave
/// the corresponding live state untouched when applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredProject {
    pub image_data_url: String,
    pub image: Option<LayerSnapshot>,
    pub camera: Option<LayerSnapshot>,
    pub filters: Option<FilterParameters>,
    pub grid: Option<GridParameters>,
}

impl RestoredProject {
    /// Coerce an arbitrary stored value into a usable project.
    ///
    /// Returns `None` only when there is no embedded image to restore.
    pub fn from_value(value: &Value) -> Option<Self> {
        let image_data_url = embedded_image(value)?.to_string();
        Some(Self {
            image_data_url,
            image: section(value, "image").map(|v| restore_layer(v, LayerKind::Image)),
            camera: section(value, "camera").map(|v| restore_layer(v, LayerKind::Camera)),
            filters: section(value, "filters").map(restore_filters),
            grid: section(value, "grid").map(restore_grid),
        })
    }
}

/// The embedded image reference, when the value carries a usable one.
pub fn embedded_image(value: &Value) -> Option<&str> {
    value
        .get("imageDataUrl")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
}

fn section<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    value.get(name).filter(|v| truthy(v))
}

fn restore_layer(value: &Value, kind: LayerKind) -> LayerSnapshot {
    let min_scale = kind.min_scale();
    LayerSnapshot {
        x: number(value.get("x"), 0.0).clamp(-300.0, 300.0),
        y: number(value.get("y"), 0.0).clamp(-300.0, 300.0),
        scale: number(value.get("scale"), 1.0).clamp(min_scale, 8.0),
        rotation: normalize_angle(number(value.get("rotation"), 0.0)),
        opacity: number(value.get("opacity"), kind.default_opacity()).clamp(0.0, 1.0),
        locked: value.get("locked").map(truthy).unwrap_or(false),
    }
}

fn restore_filters(value: &Value) -> FilterParameters {
    FilterParameters {
        grayscale: value.get("grayscale").map(truthy).unwrap_or(false),
        brightness: number(value.get("brightness"), 0.0).clamp(-100.0, 100.0).round() as i32,
        contrast: number(value.get("contrast"), 0.0).clamp(-100.0, 100.0).round() as i32,
        exposure: number(value.get("exposure"), 0.0).clamp(-2.0, 2.0),
    }
}

fn restore_grid(value: &Value) -> GridParameters {
    let color = value
        .get("color")
        .and_then(Value::as_str)
        .filter(|c| is_hex_color(c))
        .unwrap_or(DEFAULT_GRID_COLOR);
    GridParameters {
        enabled: value.get("enabled").map(truthy).unwrap_or(false),
        size: number(value.get("size"), 40.0).clamp(20.0, 200.0).round() as i32,
        opacity: number(value.get("opacity"), 30.0).clamp(0.0, 100.0).round() as i32,
        color: color.to_string(),
    }
}

/// Numeric coercion: numbers, numeric strings and booleans are accepted;
/// anything else, or a non-finite result, yields `default`.
fn number(value: Option<&Value>, default: f64) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(default)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0 && !v.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// One saved project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEntry {
    pub id: String,
    pub name: String,
    pub updated_at: i64,
    pub data: Value,
}

/// The full collection of saved projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStore {
    pub version: u32,
    pub current_project_id: String,
    pub projects: Vec<ProjectEntry>,
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            current_project_id: String::new(),
            projects: Vec::new(),
        }
    }
}

/// Trim and truncate a user supplied name, falling back when nothing is left.
pub fn normalize_project_name(name: &str, fallback: &str) -> String {
    let clipped: String = name.trim().chars().take(MAX_PROJECT_NAME_LENGTH).collect();
    // Truncation can leave trailing whitespace from the middle of the name.
    let clipped = clipped.trim_end();
    if clipped.is_empty() {
        fallback.to_string()
    } else {
        clipped.to_string()
    }
}

impl ProjectStore {
    /// Rebuild a store from an arbitrary parsed document.
    ///
    /// Entries without an embedded image are dropped, missing or duplicate
    /// ids are replaced via `new_id`, names are normalized, entries are
    /// sorted newest first and the current selection is repaired. Returns
    /// `None` when the document is not an object at all.
    pub fn from_value(raw: &Value, mut new_id: impl FnMut() -> String) -> Option<Self> {
        let object = raw.as_object()?;
        let entries = object
            .get("projects")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut seen = HashSet::new();
        let mut projects = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let Some(data) = entry.get("data").filter(|d| embedded_image(d).is_some()) else {
                continue;
            };
            let fallback = format!("Project {}", index + 1);
            let name = normalize_project_name(
                entry.get("name").and_then(Value::as_str).unwrap_or(""),
                &fallback,
            );
            let mut id = entry
                .get("id")
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or("")
                .to_string();
            if id.is_empty() || seen.contains(&id) {
                id = new_id();
            }
            seen.insert(id.clone());

            projects.push(ProjectEntry {
                id,
                name,
                updated_at: number(entry.get("updatedAt"), 0.0) as i64,
                data: data.clone(),
            });
        }

        let mut store = Self {
            version: STORE_VERSION,
            current_project_id: object
                .get("currentProjectId")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            projects,
        };
        store.sort();
        store.repair_current();
        Some(store)
    }

    /// Newest first; ties keep their relative order.
    pub fn sort(&mut self) {
        self.projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }

    /// Point the selection at an existing project, or clear it.
    pub fn repair_current(&mut self) {
        if self.get(&self.current_project_id).is_none() {
            self.current_project_id = self
                .projects
                .first()
                .map(|p| p.id.clone())
                .unwrap_or_default();
        }
    }

    pub fn get(&self, id: &str) -> Option<&ProjectEntry> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ProjectEntry> {
        self.projects.iter_mut().find(|p| p.id == id)
    }

    /// Case-insensitive name lookup.
    pub fn find_by_name(&self, name: &str) -> Option<&ProjectEntry> {
        let lower = name.to_lowercase();
        self.projects.iter().find(|p| p.name.to_lowercase() == lower)
    }

    /// `Project N` with the smallest N past the count that is not taken.
    pub fn default_name(&self) -> String {
        let mut index = self.projects.len() + 1;
        loop {
            let candidate = format!("Project {}", index);
            if self.find_by_name(&candidate).is_none() {
                return candidate;
            }
            index += 1;
        }
    }

    /// Resolve an explicit id, else the current selection, else the newest.
    pub fn resolve(&self, requested: Option<&str>) -> Option<&ProjectEntry> {
        let preferred = requested
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.current_project_id);
        self.get(preferred).or_else(|| self.projects.first())
    }
}
