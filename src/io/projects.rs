// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Saved project persistence.
//!
//! All projects live in one versioned document under a fixed storage key.
//! Every read normalizes the document (dropping unusable entries, repairing
//! ids, names and the current selection) and writes the repaired copy back,
//! so corruption heals incrementally. A project saved by the older
//! single-project format is migrated once when no current document exists.

use super::storage::{KeyValueStore, StorageError};
use crate::models::project::{
    embedded_image, normalize_project_name, ProjectData, ProjectEntry, ProjectStore,
    STORE_VERSION,
};
use serde_json::Value;
use thiserror::Error;

pub const PROJECT_STORAGE_KEY: &str = "tracelite.projects.v2";
pub const LEGACY_PROJECT_STORAGE_KEY: &str = "tracelite.project.v1";
pub const IMPORTED_PROJECT_NAME: &str = "Imported Project";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("saved projects unavailable: {0}")]
    Unavailable(#[source] StorageError),
    #[error("saved projects are malformed: {0}")]
    Malformed(String),
    #[error("could not persist migrated project: {0}")]
    Migration(#[source] StorageError),
    #[error("no saved project found")]
    NotFound,
    #[error("project name cannot be empty")]
    EmptyName,
    #[error("another project is already named {0:?}")]
    NameTaken(String),
    #[error("could not write saved projects: {0}")]
    WriteFailed(#[source] StorageError),
}

/// How a destructive or overwriting operation has been confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Not asked yet: report what would need confirming and change nothing.
    Ask,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveResult {
    Created { id: String, name: String },
    Updated { id: String, name: String },
    NeedsConfirmation { prompt: String },
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteResult {
    Deleted { name: String, current_project_id: String },
    NeedsConfirmation { prompt: String },
    Canceled,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn new_project_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Project collection persisted in a [`KeyValueStore`].
pub struct ProjectRepository {
    storage: Box<dyn KeyValueStore>,
    clock: Box<dyn Fn() -> i64>,
}

impl ProjectRepository {
    pub fn new(storage: Box<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            clock: Box::new(now_millis),
        }
    }

    /// Use a custom millisecond clock for `updatedAt` stamps.
    pub fn with_clock(storage: Box<dyn KeyValueStore>, clock: impl Fn() -> i64 + 'static) -> Self {
        Self {
            storage,
            clock: Box::new(clock),
        }
    }

    pub fn storage(&self) -> &dyn KeyValueStore {
        self.storage.as_ref()
    }

    pub fn storage_mut(&mut self) -> &mut dyn KeyValueStore {
        self.storage.as_mut()
    }

    /// Read, normalize and write back the project collection.
    pub fn read(&mut self) -> Result<ProjectStore, ProjectError> {
        let raw = self
            .storage
            .get(PROJECT_STORAGE_KEY)
            .map_err(ProjectError::Unavailable)?
            .unwrap_or_default();
        if raw.trim().is_empty() {
            return Ok(self.migrate_legacy()?.unwrap_or_default());
        }

        let parsed: Value =
            serde_json::from_str(&raw).map_err(|e| ProjectError::Malformed(e.to_string()))?;
        let store = ProjectStore::from_value(&parsed, new_project_id)
            .ok_or_else(|| ProjectError::Malformed("not an object".into()))?;

        if let Err(e) = self.write(&store) {
            log::warn!("Could not write back normalized projects: {}", e);
        }
        Ok(store)
    }

    /// Wrap a project saved in the single-project format as the first entry
    /// of a fresh collection. The legacy key is left in place; it is never
    /// consulted again once the collection exists.
    fn migrate_legacy(&mut self) -> Result<Option<ProjectStore>, ProjectError> {
        let raw = self
            .storage
            .get(LEGACY_PROJECT_STORAGE_KEY)
            .map_err(ProjectError::Unavailable)?
            .unwrap_or_default();
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let legacy: Value =
            serde_json::from_str(&raw).map_err(|e| ProjectError::Malformed(e.to_string()))?;
        if embedded_image(&legacy).is_none() {
            return Ok(None);
        }

        let id = new_project_id();
        let store = ProjectStore {
            version: STORE_VERSION,
            current_project_id: id.clone(),
            projects: vec![ProjectEntry {
                id,
                name: IMPORTED_PROJECT_NAME.to_string(),
                updated_at: (self.clock)(),
                data: legacy,
            }],
        };
        self.write(&store).map_err(ProjectError::Migration)?;
        log::info!("Migrated legacy project into the project collection");
        Ok(Some(store))
    }

    fn write(&mut self, store: &ProjectStore) -> Result<(), StorageError> {
        let json = serde_json::to_string(store)
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?;
        self.storage.set(PROJECT_STORAGE_KEY, &json)
    }

    /// Save `data` under `typed_name`, creating or overwriting a project.
    ///
    /// A blank name overwrites the current project (or creates one with a
    /// generated `Project N` name). A name matching the current project
    /// overwrites it; a name matching any other project needs confirmation.
    pub fn save(
        &mut self,
        typed_name: &str,
        data: &ProjectData,
        confirmation: Confirmation,
    ) -> Result<SaveResult, ProjectError> {
        let mut store = self.read()?;
        let typed_name = normalize_project_name(typed_name, "");
        let selected_id = store.resolve(None).map(|p| p.id.clone());
        let selected_name = selected_id
            .as_deref()
            .and_then(|id| store.get(id))
            .map(|p| p.name.to_lowercase());

        let target_id = if typed_name.is_empty() {
            selected_id
        } else if selected_name.as_deref() == Some(typed_name.to_lowercase().as_str()) {
            selected_id
        } else if let Some(existing) = store.find_by_name(&typed_name) {
            match confirmation {
                Confirmation::Ask => {
                    return Ok(SaveResult::NeedsConfirmation {
                        prompt: format!("Overwrite \"{}\"?", existing.name),
                    })
                }
                Confirmation::Declined => return Ok(SaveResult::Canceled),
                Confirmation::Accepted => Some(existing.id.clone()),
            }
        } else {
            None
        };

        let now = (self.clock)();
        let created = target_id.is_none();
        let id = match target_id {
            Some(id) => id,
            None => {
                let name = if typed_name.is_empty() {
                    store.default_name()
                } else {
                    typed_name.clone()
                };
                let id = new_project_id();
                store.projects.push(ProjectEntry {
                    id: id.clone(),
                    name,
                    updated_at: now,
                    data: Value::Null,
                });
                id
            }
        };

        let entry = store.get_mut(&id).ok_or(ProjectError::NotFound)?;
        if !typed_name.is_empty() {
            entry.name = typed_name;
        }
        entry.updated_at = now;
        entry.data = data.to_value();
        let name = entry.name.clone();

        store.current_project_id = id.clone();
        store.sort();
        self.write(&store).map_err(ProjectError::WriteFailed)?;

        log::info!(
            "{} project {:?} ({})",
            if created { "Created" } else { "Updated" },
            name,
            id
        );
        Ok(if created {
            SaveResult::Created { id, name }
        } else {
            SaveResult::Updated { id, name }
        })
    }

    /// The project a load of `requested` would open: the explicit id, else
    /// the current project, else the most recent one.
    pub fn resolve(&mut self, requested: Option<&str>) -> Result<ProjectEntry, ProjectError> {
        let store = self.read()?;
        store.resolve(requested).cloned().ok_or(ProjectError::NotFound)
    }

    /// Record `id` as the current project.
    pub fn set_current(&mut self, id: &str) -> Result<(), ProjectError> {
        let mut store = self.read()?;
        if store.get(id).is_none() {
            return Err(ProjectError::NotFound);
        }
        store.current_project_id = id.to_string();
        self.write(&store).map_err(ProjectError::WriteFailed)
    }

    pub fn delete(
        &mut self,
        requested: Option<&str>,
        confirmation: Confirmation,
    ) -> Result<DeleteResult, ProjectError> {
        let mut store = self.read()?;
        let target = store.resolve(requested).cloned().ok_or(ProjectError::NotFound)?;

        match confirmation {
            Confirmation::Ask => {
                return Ok(DeleteResult::NeedsConfirmation {
                    prompt: format!("Delete \"{}\"?", target.name),
                })
            }
            Confirmation::Declined => return Ok(DeleteResult::Canceled),
            Confirmation::Accepted => {}
        }

        store.projects.retain(|p| p.id != target.id);
        store.repair_current();
        self.write(&store).map_err(ProjectError::WriteFailed)?;

        log::info!("Deleted project {:?} ({})", target.name, target.id);
        Ok(DeleteResult::Deleted {
            name: target.name,
            current_project_id: store.current_project_id,
        })
    }

    /// Rename a project, keeping names unique case-insensitively.
    pub fn rename(&mut self, id: &str, new_name: &str) -> Result<String, ProjectError> {
        let mut store = self.read()?;
        let name = normalize_project_name(new_name, "");
        if name.is_empty() {
            return Err(ProjectError::EmptyName);
        }
        if let Some(other) = store.find_by_name(&name) {
            if other.id != id {
                return Err(ProjectError::NameTaken(other.name.clone()));
            }
        }

        let now = (self.clock)();
        let entry = store.get_mut(id).ok_or(ProjectError::NotFound)?;
        let old = std::mem::replace(&mut entry.name, name.clone());
        entry.updated_at = now;
        store.sort();
        self.write(&store).map_err(ProjectError::WriteFailed)?;

        log::info!("Renamed project {:?} to {:?}", old, name);
        Ok(name)
    }
}
