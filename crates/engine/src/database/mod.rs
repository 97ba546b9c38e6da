//! VectorDatabase: the public entry point
//!
//! Wires the registries, write coordinator and search engine together and
//! wraps each operation with the external collaborators:
//!
//! 1. the quota gate is asked before `add` / `upsert` / `search` (and their
//!    batch and text forms) touch a shard; a denial becomes
//!    `Error::QuotaExceeded` and nothing is performed
//! 2. the operation runs
//! 3. the usage sink is told the outcome; a sink failure is logged and
//!    otherwise ignored
//!
//! One instance exists per data directory within a process (see
//! [`OPEN_DATABASES`]).

pub mod builder;
pub mod config;
mod registry;

pub use builder::VectorDatabaseBuilder;
pub use config::{EngineConfig, CONFIG_FILE_NAME};
pub use registry::OPEN_DATABASES;

use crate::gate::{
    AllowAll, EmbeddingProvider, NoopUsageSink, OperationKind, QuotaDecision, QuotaGate,
    UsageRecord, UsageSink,
};
use crate::registry::{CollectionHandle, CollectionSpec, ProjectRegistry, RegistrySettings};
use crate::search::{ScatterGatherSearchEngine, SearchRequest};
use crate::write::WriteCoordinator;
use parking_lot::RwLock;
use shardvec_core::{
    BatchReport, CollectionConfig, CollectionInfo, Error, Metadata, MetadataFilter, Project,
    ProjectId, Result, SearchResponse, VectorRecord, WriteReceipt,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Sharded vector database rooted at one data directory
pub struct VectorDatabase {
    data_dir: PathBuf,
    config: EngineConfig,
    projects: ProjectRegistry,
    writer: WriteCoordinator,
    searcher: ScatterGatherSearchEngine,
    quota: RwLock<Arc<dyn QuotaGate>>,
    usage: RwLock<Arc<dyn UsageSink>>,
    embedder: RwLock<Option<Arc<dyn EmbeddingProvider>>>,
}

impl std::fmt::Debug for VectorDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorDatabase")
            .field("data_dir", &self.data_dir)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VectorDatabase {
    /// Open (or create) the database in `path`.
    ///
    /// A default `shardvec.toml` is written on first open. Opening a directory
    /// that is already open in this process returns the existing instance.
    ///
    /// # Errors
    ///
    /// - `Io` if the directory cannot be created
    /// - `Config` if `shardvec.toml` cannot be read, parsed or validated
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        let data_dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let config_path = data_dir.join(CONFIG_FILE_NAME);
        EngineConfig::write_default_if_missing(&config_path)?;
        let cfg = EngineConfig::from_file(&config_path)?;

        Self::open_inner(data_dir, cfg)
    }

    /// Open with an explicit configuration.
    ///
    /// The configuration is written to `shardvec.toml` so later plain
    /// [`open`](Self::open) calls pick it up. If the directory is already open
    /// in this process the running instance is returned unchanged.
    pub fn open_with_config<P: AsRef<Path>>(path: P, cfg: EngineConfig) -> Result<Arc<Self>> {
        cfg.validate()?;
        let data_dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        cfg.write_to_file(&data_dir.join(CONFIG_FILE_NAME))?;

        Self::open_inner(data_dir, cfg)
    }

    /// Builder for custom configuration and collaborators
    pub fn builder() -> VectorDatabaseBuilder {
        VectorDatabaseBuilder::new()
    }

    fn open_inner(data_dir: PathBuf, cfg: EngineConfig) -> Result<Arc<Self>> {
        let canonical = data_dir.canonicalize()?;

        // Held for the whole open so two threads never build twin instances.
        let mut open = OPEN_DATABASES.lock();
        if let Some(db) = open.get(&canonical).and_then(|weak| weak.upgrade()) {
            debug!(target: "shardvec::db", path = ?canonical, "Returning existing database instance");
            return Ok(db);
        }

        let settings = RegistrySettings::from_config(&cfg)?;
        let db = Arc::new(VectorDatabase {
            projects: ProjectRegistry::new(canonical.clone(), settings),
            writer: WriteCoordinator::new(),
            searcher: ScatterGatherSearchEngine::new(cfg.search_timeout(), cfg.max_top_k),
            quota: RwLock::new(Arc::new(AllowAll)),
            usage: RwLock::new(Arc::new(NoopUsageSink)),
            embedder: RwLock::new(None),
            data_dir: canonical.clone(),
            config: cfg,
        });
        open.insert(canonical.clone(), Arc::downgrade(&db));

        info!(
            target: "shardvec::db",
            path = ?canonical,
            durability = %db.config.durability,
            default_shard_count = db.config.default_shard_count,
            "Opened database"
        );
        Ok(db)
    }

    /// Canonical data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Configuration in effect
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // Collaborators
    // ========================================================================

    /// Replace the quota gate
    pub fn set_quota_gate(&self, gate: Arc<dyn QuotaGate>) {
        *self.quota.write() = gate;
    }

    /// Replace the usage sink
    pub fn set_usage_sink(&self, sink: Arc<dyn UsageSink>) {
        *self.usage.write() = sink;
    }

    /// Install the embedding provider used by the text entry points
    pub fn set_embedding_provider(&self, provider: Arc<dyn EmbeddingProvider>) {
        *self.embedder.write() = Some(provider);
    }

    fn admit(&self, project: &ProjectId, operation: OperationKind, requested: usize) -> Result<()> {
        let gate = Arc::clone(&*self.quota.read());
        match gate.check(project, operation, requested) {
            QuotaDecision::Allow => Ok(()),
            QuotaDecision::Deny { reason } => {
                debug!(
                    target: "shardvec::db",
                    project = %project,
                    operation = %operation,
                    requested,
                    reason = %reason,
                    "Quota denied"
                );
                Err(Error::QuotaExceeded { reason })
            }
        }
    }

    fn report_usage(&self, record: UsageRecord) {
        let sink = Arc::clone(&*self.usage.read());
        if let Err(e) = sink.record(&record) {
            warn!(
                target: "shardvec::db",
                project = %record.project,
                operation = %record.operation,
                error = %e,
                "Failed to record usage"
            );
        }
    }

    /// Run `op` between the quota check and the usage report.
    ///
    /// `gated` is false for operations the quota gate is not consulted on.
    fn metered<T>(
        &self,
        project: &str,
        operation: OperationKind,
        requested: usize,
        gated: bool,
        count: impl FnOnce(&T) -> usize,
        op: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let project = ProjectId::new(project)?;
        if gated {
            self.admit(&project, operation, requested)?;
        }

        let started = Instant::now();
        let result = op();
        let (vector_count, success) = match &result {
            Ok(value) => (count(value), true),
            Err(_) => (0, false),
        };
        self.report_usage(UsageRecord {
            project,
            operation,
            vector_count,
            duration: started.elapsed(),
            success,
        });
        result
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let provider = self
            .embedder
            .read()
            .clone()
            .ok_or_else(|| Error::Embedding("no embedding provider configured".to_string()))?;
        provider.embed(text).map_err(Error::Embedding)
    }

    // ========================================================================
    // Projects
    // ========================================================================

    /// Provision a project
    pub fn create_project(
        &self,
        id: &str,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Result<Project> {
        self.projects.create_project(id, metadata)
    }

    /// Project record
    pub fn get_project(&self, id: &str) -> Result<Project> {
        self.projects.get_project(id)
    }

    /// Whether the project exists
    pub fn project_exists(&self, id: &str) -> bool {
        self.projects.project_exists(id)
    }

    /// Project ids, sorted
    pub fn list_projects(&self) -> Result<Vec<String>> {
        Ok(self
            .projects
            .list_projects()?
            .into_iter()
            .map(String::from)
            .collect())
    }

    /// Delete a project and everything stored under it
    pub fn delete_project(&self, id: &str) -> Result<()> {
        self.projects.delete_project(id)
    }

    // ========================================================================
    // Collections
    // ========================================================================

    /// Create a collection; its shard count is fixed from here on
    pub fn create_collection(&self, project: &str, spec: CollectionSpec) -> Result<CollectionConfig> {
        Ok(self
            .projects
            .create_collection(project, spec)?
            .config()
            .clone())
    }

    /// Whether the collection exists
    pub fn collection_exists(&self, project: &str, name: &str) -> bool {
        self.projects.collection_exists(project, name)
    }

    /// Collection names in a project, sorted
    pub fn list_collections(&self, project: &str) -> Result<Vec<String>> {
        self.projects.list_collections(project)
    }

    /// Configuration plus per-shard live and physical row counts
    pub fn collection_info(&self, project: &str, name: &str) -> Result<CollectionInfo> {
        self.projects.collection_info(project, name)
    }

    fn collection(&self, project: &str, name: &str) -> Result<Arc<CollectionHandle>> {
        self.projects.open_collection(project, name)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert a vector
    ///
    /// # Errors
    ///
    /// - `QuotaExceeded` if the quota gate denies the write
    /// - `DimensionMismatch` if the vector length is wrong
    /// - `CollectionNotFound` / `ProjectNotFound`
    /// - `Store` if the owning shard cannot be written
    pub fn add(&self, project: &str, collection: &str, record: VectorRecord) -> Result<WriteReceipt> {
        self.metered(project, OperationKind::Add, 1, true, |_| 1, || {
            let handle = self.collection(project, collection)?;
            self.writer.add(&handle, record)
        })
    }

    /// Insert or replace a vector, reporting `Inserted` or `Updated`
    pub fn upsert(
        &self,
        project: &str,
        collection: &str,
        record: VectorRecord,
    ) -> Result<WriteReceipt> {
        self.metered(project, OperationKind::Upsert, 1, true, |_| 1, || {
            let handle = self.collection(project, collection)?;
            self.writer.upsert(&handle, record)
        })
    }

    /// Logically delete a vector. `false` if there was nothing to delete.
    pub fn delete(&self, project: &str, collection: &str, id: &str) -> Result<bool> {
        self.metered(
            project,
            OperationKind::Delete,
            1,
            false,
            |found| usize::from(*found),
            || {
                let handle = self.collection(project, collection)?;
                self.writer.delete(&handle, id)
            },
        )
    }

    /// Current live record for `id`
    pub fn get(&self, project: &str, collection: &str, id: &str) -> Result<Option<VectorRecord>> {
        let handle = self.collection(project, collection)?;
        self.writer.get(&handle, id)
    }

    /// Insert many vectors; the quota gate sees the batch size once
    pub fn add_batch(
        &self,
        project: &str,
        collection: &str,
        records: Vec<VectorRecord>,
    ) -> Result<BatchReport> {
        let requested = records.len();
        self.metered(
            project,
            OperationKind::Add,
            requested,
            true,
            |report: &BatchReport| report.successful,
            || {
                let handle = self.collection(project, collection)?;
                Ok(self.writer.add_batch(&handle, records))
            },
        )
    }

    /// Upsert many vectors; the quota gate sees the batch size once
    pub fn upsert_batch(
        &self,
        project: &str,
        collection: &str,
        records: Vec<VectorRecord>,
    ) -> Result<BatchReport> {
        let requested = records.len();
        self.metered(
            project,
            OperationKind::Upsert,
            requested,
            true,
            |report: &BatchReport| report.successful,
            || {
                let handle = self.collection(project, collection)?;
                Ok(self.writer.upsert_batch(&handle, records))
            },
        )
    }

    /// Delete many ids
    pub fn delete_batch<S: AsRef<str>>(
        &self,
        project: &str,
        collection: &str,
        ids: &[S],
    ) -> Result<BatchReport> {
        self.metered(
            project,
            OperationKind::Delete,
            ids.len(),
            false,
            |report: &BatchReport| report.successful,
            || {
                let handle = self.collection(project, collection)?;
                Ok(self.writer.delete_batch(&handle, ids))
            },
        )
    }

    /// Embed `text` and insert it under `id`, keeping the text as the document
    pub fn add_text(
        &self,
        project: &str,
        collection: &str,
        id: &str,
        text: &str,
        metadata: Metadata,
    ) -> Result<WriteReceipt> {
        let vector = self.embed(text)?;
        let record = VectorRecord::new(id, vector)
            .with_metadata_map(metadata)
            .with_document(text);
        self.add(project, collection, record)
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Top-k most similar live vectors.
    ///
    /// Shards that fail or miss the deadline are left out and listed in
    /// `response.debug`; the call only fails if none answered.
    pub fn search(
        &self,
        project: &str,
        collection: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse> {
        let response = self.metered(
            project,
            OperationKind::Search,
            request.k,
            true,
            |response: &SearchResponse| response.hits.len(),
            || {
                let handle = self.collection(project, collection)?;
                self.searcher.search(&handle, request)
            },
        )?;
        if let Some(warning) = response.warning() {
            debug!(target: "shardvec::db", project, collection, warning = %warning, "Partial search");
        }
        Ok(response)
    }

    /// Embed `text` and search with it
    pub fn search_text(
        &self,
        project: &str,
        collection: &str,
        text: &str,
        k: usize,
        filter: Option<MetadataFilter>,
    ) -> Result<SearchResponse> {
        let mut request = SearchRequest::new(self.embed(text)?, k);
        request.filter = filter;
        self.search(project, collection, &request)
    }
}

impl Drop for VectorDatabase {
    fn drop(&mut self) {
        let mut open = OPEN_DATABASES.lock();
        // A reopen may already have replaced the entry.
        if open
            .get(&self.data_dir)
            .map_or(false, |weak| weak.strong_count() == 0)
        {
            open.remove(&self.data_dir);
        }
        debug!(target: "shardvec::db", path = ?self.data_dir, "Closed database");
    }
}
