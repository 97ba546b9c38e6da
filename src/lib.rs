//! shardvec - embedded sharded vector store
//!
//! Vectors live in fixed-size collections inside projects. Every collection
//! is split into a fixed number of shards; each id is routed to exactly one
//! shard by a stable hash, and searches fan out to all shards in parallel and
//! merge their local top-k lists.
//!
//! # Quick Start
//!
//! ```ignore
//! use shardvec::{CollectionSpec, DistanceMetric, SearchRequest, VectorDatabase, VectorRecord};
//!
//! let db = VectorDatabase::open("./data")?;
//! db.create_project("acme", Default::default())?;
//! db.create_collection("acme", CollectionSpec::new("docs", 4).metric(DistanceMetric::Cosine))?;
//!
//! db.add("acme", "docs", VectorRecord::new("a", vec![1.0, 0.0, 0.0, 0.0]))?;
//! let response = db.search("acme", "docs", &SearchRequest::new(vec![1.0, 0.0, 0.0, 0.0], 3))?;
//! for hit in &response.hits {
//!     println!("{} {}", hit.id, hit.score);
//! }
//! ```
//!
//! # Architecture
//!
//! - `shardvec-core`: data model and errors
//! - `shardvec-storage`: routing and per-shard logs
//! - `shardvec-engine`: registries, write coordination, scatter-gather search,
//!   and the [`VectorDatabase`] facade
//!
//! Only the facade and the types it speaks are re-exported here.

pub use shardvec_core::{
    BatchItem, BatchReport, CollectionConfig, CollectionInfo, DistanceMetric, Error, Metadata,
    MetadataFilter, MetadataValue, Project, ProjectId, Result, SearchDebug, SearchHit,
    SearchResponse, ShardInfo, ShardOutcome, ShardSearchReport, ShardStats, StoreError,
    UpsertOutcome, VectorRecord, WriteReceipt,
};
pub use shardvec_engine::{
    AllowAll, CollectionSpec, EmbeddingProvider, EngineConfig, NoopUsageSink, OperationKind,
    QuotaDecision, QuotaGate, SearchRequest, UsageRecord, UsageSink, VectorDatabase,
    VectorDatabaseBuilder, CONFIG_FILE_NAME,
};
pub use shardvec_storage::{DurabilityMode, ShardRouter};
