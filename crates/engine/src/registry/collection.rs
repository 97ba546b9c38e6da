//! Collections inside one project
//!
//! `CollectionRegistry` owns collection descriptors for a project and hands
//! out `CollectionHandle`s. A handle owns the collection's shard slots; each
//! shard is opened (log replayed) on first use and cached for the life of the
//! handle. A shard that fails to open leaves its slot empty, so the next use
//! retries.

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use shardvec_core::limits::MAX_DIMENSION;
use shardvec_core::{
    CollectionConfig, CollectionInfo, CollectionName, DistanceMetric, Error, ProjectId, Result,
    ShardAddress, ShardInfo,
};
use shardvec_storage::layout::COLLECTION_FILE;
use shardvec_storage::{read_json, write_json_atomic, ShardRouter, ShardStore, StorageLayout};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::RegistrySettings;

/// Parameters for a new collection
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    /// Collection name
    pub name: String,
    /// Vector dimension
    pub dimension: usize,
    /// Ranking metric
    pub metric: DistanceMetric,
    /// Shard count; the registry default when `None`
    pub shard_count: Option<u32>,
    /// Free-form description
    pub description: Option<String>,
}

impl CollectionSpec {
    /// Cosine collection with the default shard count
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        CollectionSpec {
            name: name.into(),
            dimension,
            metric: DistanceMetric::Cosine,
            shard_count: None,
            description: None,
        }
    }

    /// Set the metric
    pub fn metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the shard count
    pub fn shards(mut self, shard_count: u32) -> Self {
        self.shard_count = Some(shard_count);
        self
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Open collection: configuration plus its shard slots
#[derive(Debug)]
pub struct CollectionHandle {
    project: ProjectId,
    config: CollectionConfig,
    layout: StorageLayout,
    settings: RegistrySettings,
    shards: Vec<OnceCell<Arc<ShardStore>>>,
}

impl CollectionHandle {
    fn new(
        project: ProjectId,
        config: CollectionConfig,
        layout: StorageLayout,
        settings: RegistrySettings,
    ) -> Self {
        let shards = (0..config.shard_count).map(|_| OnceCell::new()).collect();
        CollectionHandle {
            project,
            config,
            layout,
            settings,
            shards,
        }
    }

    /// Owning project
    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    /// Collection name
    pub fn name(&self) -> &CollectionName {
        &self.config.name
    }

    /// Immutable configuration
    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    /// Vector dimension
    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Ranking metric
    pub fn metric(&self) -> DistanceMetric {
        self.config.metric
    }

    /// Number of shards
    pub fn shard_count(&self) -> u32 {
        self.config.shard_count
    }

    /// Physical address of shard `shard`
    pub fn address(&self, shard: u32) -> ShardAddress {
        ShardAddress::new(self.project.clone(), self.config.name.clone(), shard)
    }

    /// Shard that owns `id`
    pub fn route(&self, id: &str) -> u32 {
        ShardRouter::shard_for(id, self.config.shard_count)
    }

    /// Shard `shard`, opening it on first use
    pub fn shard(&self, shard: u32) -> Result<Arc<ShardStore>> {
        let slot = self.shards.get(shard as usize).ok_or_else(|| {
            Error::invalid_argument(format!(
                "shard {} out of range for {} shards",
                shard, self.config.shard_count
            ))
        })?;
        let store = slot.get_or_try_init(|| {
            let address = self.address(shard);
            let path = self.layout.shard_log(&address);
            ShardStore::open(address, path, self.config.dimension, self.settings.durability)
                .map(Arc::new)
                .map_err(|e| {
                    warn!(
                        target: "shardvec::registry",
                        project = %self.project,
                        collection = %self.config.name,
                        shard,
                        error = %e,
                        "Failed to open shard"
                    );
                    Error::from(e)
                })
        })?;
        Ok(Arc::clone(store))
    }

    /// Owning shard index and store for `id`
    pub fn shard_for_id(&self, id: &str) -> Result<(u32, Arc<ShardStore>)> {
        let shard = self.route(id);
        Ok((shard, self.shard(shard)?))
    }

    /// Configuration plus per-shard counts. Unreadable shards are reported,
    /// not fatal.
    pub fn info(&self) -> CollectionInfo {
        let mut total_vectors = 0;
        let mut total_rows = 0;
        let shards = (0..self.config.shard_count)
            .map(|shard| match self.shard(shard) {
                Ok(store) => {
                    let stats = store.stats();
                    total_vectors += stats.vector_count;
                    total_rows += stats.row_count;
                    ShardInfo {
                        shard,
                        stats: Some(stats),
                        error: None,
                    }
                }
                Err(e) => ShardInfo {
                    shard,
                    stats: None,
                    error: Some(e.to_string()),
                },
            })
            .collect();

        CollectionInfo {
            config: self.config.clone(),
            total_vectors,
            total_rows,
            shards,
        }
    }
}

/// Collection lifecycle and lookup for one project
#[derive(Debug)]
pub struct CollectionRegistry {
    project: ProjectId,
    layout: StorageLayout,
    settings: RegistrySettings,
    open: DashMap<CollectionName, Arc<CollectionHandle>>,
    create_lock: Mutex<()>,
}

impl CollectionRegistry {
    pub(crate) fn new(project: ProjectId, layout: StorageLayout, settings: RegistrySettings) -> Self {
        CollectionRegistry {
            project,
            layout,
            settings,
            open: DashMap::new(),
            create_lock: Mutex::new(()),
        }
    }

    /// Owning project
    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    /// Create a collection and its empty shard logs.
    ///
    /// # Errors
    ///
    /// - `InvalidName` if the name is not alphanumeric / `_` / `-`
    /// - `InvalidDimension` if dimension is 0 or above the configured maximum
    /// - `InvalidShardCount` if shard count is 0 or above the shard limit
    /// - `DuplicateCollection` if the name is taken in this project
    pub fn create_collection(&self, spec: CollectionSpec) -> Result<Arc<CollectionHandle>> {
        let name = CollectionName::new(spec.name)?;
        let shard_count = spec.shard_count.unwrap_or(self.settings.default_shard_count);
        let mut config = CollectionConfig::new(
            name.clone(),
            spec.dimension,
            spec.metric,
            shard_count,
            self.settings.max_dimension,
        )?;
        if let Some(description) = spec.description {
            config = config.with_description(description);
        }

        let _guard = self.create_lock.lock();
        let descriptor = self.layout.collection_file(&self.project, &name);
        if descriptor.exists() {
            return Err(Error::DuplicateCollection {
                project: self.project.to_string(),
                collection: name.to_string(),
            });
        }

        // Shards first: the descriptor marks a complete collection.
        for shard in 0..shard_count {
            let address = ShardAddress::new(self.project.clone(), name.clone(), shard);
            ShardStore::create_empty(&self.layout.shard_log(&address))?;
        }
        write_json_atomic(&descriptor, &config)?;

        info!(
            target: "shardvec::registry",
            project = %self.project,
            collection = %name,
            dimension = config.dimension,
            metric = config.metric.name(),
            shards = shard_count,
            "Created collection"
        );

        let handle = Arc::new(CollectionHandle::new(
            self.project.clone(),
            config,
            self.layout.clone(),
            self.settings,
        ));
        self.open.insert(name, Arc::clone(&handle));
        Ok(handle)
    }

    /// Open an existing collection without re-creating anything
    pub fn open_collection(&self, name: &str) -> Result<Arc<CollectionHandle>> {
        let name = CollectionName::new(name)?;
        if let Some(handle) = self.open.get(&name) {
            return Ok(Arc::clone(handle.value()));
        }

        let descriptor = self.layout.collection_file(&self.project, &name);
        if !descriptor.is_file() {
            return Err(Error::CollectionNotFound {
                project: self.project.to_string(),
                collection: name.to_string(),
            });
        }
        let config: CollectionConfig = read_json(&descriptor)?;
        config.validate(MAX_DIMENSION)?;
        if config.name != name {
            return Err(Error::config(format!(
                "descriptor {} names collection '{}'",
                descriptor.display(),
                config.name
            )));
        }

        debug!(
            target: "shardvec::registry",
            project = %self.project,
            collection = %name,
            shards = config.shard_count,
            "Loaded collection descriptor"
        );

        let handle = self
            .open
            .entry(name)
            .or_insert_with(|| {
                Arc::new(CollectionHandle::new(
                    self.project.clone(),
                    config,
                    self.layout.clone(),
                    self.settings,
                ))
            })
            .value()
            .clone();
        Ok(handle)
    }

    /// Whether a collection with this name exists
    pub fn collection_exists(&self, name: &str) -> bool {
        match CollectionName::new(name) {
            Ok(name) => self.layout.collection_file(&self.project, &name).is_file(),
            Err(_) => false,
        }
    }

    /// Collection names, sorted
    pub fn list_collections(&self) -> Result<Vec<CollectionName>> {
        let dir = self.layout.collections_dir(&self.project);
        Ok(StorageLayout::list_marked_dirs(&dir, COLLECTION_FILE)?
            .into_iter()
            .filter_map(|name| CollectionName::new(name).ok())
            .collect())
    }

    /// Configuration and per-shard counts
    pub fn collection_info(&self, name: &str) -> Result<CollectionInfo> {
        Ok(self.open_collection(name)?.info())
    }
}
