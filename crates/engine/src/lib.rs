//! Engine for shardvec
//!
//! This crate orchestrates the lower layers:
//! - VectorDatabase: open/close, collaborators, the public operations
//! - ProjectRegistry / CollectionRegistry: tenants, collection descriptors, shard handles
//! - WriteCoordinator: validate, route and apply mutations on one shard
//! - ScatterGatherSearchEngine: parallel per-shard top-k with deadline and merge
//! - gate: quota, usage and embedding seams
//!
//! The engine is the only component that knows about:
//! - Shard counts and routing per collection
//! - Cross-shard coordination (fan-out, merge, partial failure)
//! - Configuration (`shardvec.toml`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;
pub mod distance;
pub mod gate;
pub mod registry;
pub mod search;
pub mod write;

pub use database::{EngineConfig, VectorDatabase, VectorDatabaseBuilder, CONFIG_FILE_NAME};
pub use distance::{compute_score, QueryScorer};
pub use gate::{
    AllowAll, EmbeddingProvider, NoopUsageSink, OperationKind, QuotaDecision, QuotaGate,
    UsageRecord, UsageSink,
};
pub use registry::{
    CollectionHandle, CollectionRegistry, CollectionSpec, ProjectRegistry, RegistrySettings,
};
pub use search::{ScatterGatherSearchEngine, SearchRequest};
pub use write::WriteCoordinator;
