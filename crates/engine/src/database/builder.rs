//! Fluent configuration for opening a database
//!
//! ```ignore
//! use shardvec_engine::VectorDatabase;
//!
//! let db = VectorDatabase::builder()
//!     .path("/data/vectors")
//!     .always_sync()
//!     .search_timeout(Duration::from_secs(2))
//!     .quota_gate(Arc::new(MyQuota))
//!     .open()?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use shardvec_core::{Error, Result};

use super::{EngineConfig, VectorDatabase};
use crate::gate::{EmbeddingProvider, QuotaGate, UsageSink};

/// Builder for [`VectorDatabase`]
///
/// Settings given here are written to `shardvec.toml`. Collaborators are
/// installed on the opened instance; if the path was already open they
/// replace the ones it had.
#[derive(Clone, Default)]
pub struct VectorDatabaseBuilder {
    path: Option<PathBuf>,
    config: EngineConfig,
    quota: Option<Arc<dyn QuotaGate>>,
    usage: Option<Arc<dyn UsageSink>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl std::fmt::Debug for VectorDatabaseBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorDatabaseBuilder")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("quota", &self.quota.is_some())
            .field("usage", &self.usage.is_some())
            .field("embedder", &self.embedder.is_some())
            .finish()
    }
}

impl VectorDatabaseBuilder {
    /// Builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Data directory (required)
    pub fn path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// fsync every shard write
    pub fn always_sync(mut self) -> Self {
        self.config.durability = "always".to_string();
        self
    }

    /// Default search deadline
    pub fn search_timeout(mut self, timeout: Duration) -> Self {
        self.config.search_timeout_ms = timeout.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    /// Shard count for collections created without one
    pub fn default_shard_count(mut self, shards: u32) -> Self {
        self.config.default_shard_count = shards;
        self
    }

    /// Quota gate consulted before writes and searches
    pub fn quota_gate(mut self, gate: Arc<dyn QuotaGate>) -> Self {
        self.quota = Some(gate);
        self
    }

    /// Usage sink told about every operation
    pub fn usage_sink(mut self, sink: Arc<dyn UsageSink>) -> Self {
        self.usage = Some(sink);
        self
    }

    /// Embedding provider for the text entry points
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(provider);
        self
    }

    /// Open the database
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if no path was set
    /// - `Config` if the configuration is invalid
    /// - `Io` if the directory cannot be created
    pub fn open(self) -> Result<Arc<VectorDatabase>> {
        let path = self
            .path
            .ok_or_else(|| Error::invalid_argument("VectorDatabaseBuilder::open() requires a path"))?;

        let db = VectorDatabase::open_with_config(path, self.config)?;
        if let Some(gate) = self.quota {
            db.set_quota_gate(gate);
        }
        if let Some(sink) = self.usage {
            db.set_usage_sink(sink);
        }
        if let Some(provider) = self.embedder {
            db.set_embedding_provider(provider);
        }
        Ok(db)
    }
}
