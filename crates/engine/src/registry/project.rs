//! Projects: the top-level tenant namespace
//!
//! Each project is a directory holding `_project.json` and its collections.
//! The registry caches one `CollectionRegistry` per project so that every
//! caller shares the same open collection handles and shard stores.

use dashmap::DashMap;
use parking_lot::Mutex;
use shardvec_core::{CollectionInfo, Error, Project, ProjectId, Result};
use shardvec_storage::layout::PROJECT_FILE;
use shardvec_storage::{read_json, write_json_atomic, StorageLayout};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::collection::{CollectionHandle, CollectionRegistry, CollectionSpec};
use super::RegistrySettings;

/// Project lifecycle and lookup
#[derive(Debug)]
pub struct ProjectRegistry {
    layout: StorageLayout,
    settings: RegistrySettings,
    projects: DashMap<ProjectId, Arc<CollectionRegistry>>,
    lifecycle: Mutex<()>,
}

impl ProjectRegistry {
    /// Registry over the data root `root`
    pub fn new(root: impl Into<PathBuf>, settings: RegistrySettings) -> Self {
        ProjectRegistry {
            layout: StorageLayout::new(root),
            settings,
            projects: DashMap::new(),
            lifecycle: Mutex::new(()),
        }
    }

    /// Storage layout
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Registry settings
    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Provision a project.
    ///
    /// # Errors
    ///
    /// - `InvalidName` if the id is not alphanumeric / `_` / `-`
    /// - `DuplicateProject` if the project already exists
    pub fn create_project(
        &self,
        id: &str,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Result<Project> {
        let id = ProjectId::new(id)?;
        let _guard = self.lifecycle.lock();

        let descriptor = self.layout.project_file(&id);
        if descriptor.exists() {
            return Err(Error::DuplicateProject {
                project: id.to_string(),
            });
        }

        let project = Project::new(id.clone(), metadata);
        std::fs::create_dir_all(self.layout.collections_dir(&id))?;
        write_json_atomic(&descriptor, &project)?;

        info!(target: "shardvec::registry", project = %id, "Created project");
        Ok(project)
    }

    /// Project record
    pub fn get_project(&self, id: &str) -> Result<Project> {
        let id = ProjectId::new(id)?;
        let descriptor = self.layout.project_file(&id);
        if !descriptor.is_file() {
            return Err(Error::ProjectNotFound {
                project: id.to_string(),
            });
        }
        Ok(read_json(&descriptor)?)
    }

    /// Whether the project exists
    pub fn project_exists(&self, id: &str) -> bool {
        match ProjectId::new(id) {
            Ok(id) => self.layout.project_file(&id).is_file(),
            Err(_) => false,
        }
    }

    /// Project ids, sorted
    pub fn list_projects(&self) -> Result<Vec<ProjectId>> {
        Ok(
            StorageLayout::list_marked_dirs(self.layout.root(), PROJECT_FILE)?
                .into_iter()
                .filter_map(|name| ProjectId::new(name).ok())
                .collect(),
        )
    }

    /// Remove a project and all of its collections' storage.
    ///
    /// Handles already given out keep working on their open shard files but
    /// nothing written through them survives.
    pub fn delete_project(&self, id: &str) -> Result<()> {
        let id = ProjectId::new(id)?;
        let _guard = self.lifecycle.lock();

        if !self.layout.project_file(&id).is_file() {
            return Err(Error::ProjectNotFound {
                project: id.to_string(),
            });
        }
        self.projects.remove(&id);
        std::fs::remove_dir_all(self.layout.project_dir(&id))?;

        info!(target: "shardvec::registry", project = %id, "Deleted project");
        Ok(())
    }

    /// Collection registry of an existing project
    pub fn collections(&self, id: &str) -> Result<Arc<CollectionRegistry>> {
        let id = ProjectId::new(id)?;
        if let Some(registry) = self.projects.get(&id) {
            return Ok(Arc::clone(registry.value()));
        }
        if !self.layout.project_file(&id).is_file() {
            return Err(Error::ProjectNotFound {
                project: id.to_string(),
            });
        }
        Ok(self
            .projects
            .entry(id.clone())
            .or_insert_with(|| {
                Arc::new(CollectionRegistry::new(
                    id,
                    self.layout.clone(),
                    self.settings,
                ))
            })
            .value()
            .clone())
    }

    /// Create a collection in `project`
    pub fn create_collection(
        &self,
        project: &str,
        spec: CollectionSpec,
    ) -> Result<Arc<CollectionHandle>> {
        self.collections(project)?.create_collection(spec)
    }

    /// Open a collection in `project`
    pub fn open_collection(&self, project: &str, name: &str) -> Result<Arc<CollectionHandle>> {
        self.collections(project)?.open_collection(name)
    }

    /// Collection names in `project`, sorted
    pub fn list_collections(&self, project: &str) -> Result<Vec<String>> {
        Ok(self
            .collections(project)?
            .list_collections()?
            .into_iter()
            .map(String::from)
            .collect())
    }

    /// Whether `project` has a collection called `name`
    pub fn collection_exists(&self, project: &str, name: &str) -> bool {
        self.collections(project)
            .map(|registry| registry.collection_exists(name))
            .unwrap_or(false)
    }

    /// Configuration and per-shard counts of a collection
    pub fn collection_info(&self, project: &str, name: &str) -> Result<CollectionInfo> {
        self.collections(project)?.collection_info(name)
    }
}
