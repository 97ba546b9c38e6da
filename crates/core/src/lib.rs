//! Core types for shardvec
//!
//! This crate defines the foundational types used throughout the system:
//! - ProjectId / CollectionName / ShardAddress: validated identifiers
//! - VectorRecord / CollectionConfig / Project: the data model
//! - DistanceMetric: ranking direction per collection
//! - MetadataValue / MetadataFilter: flat scalar metadata and equality filters
//! - Search and diagnostics result types
//! - Error / StoreError: error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod search_types;
pub mod types;
pub mod vector;

pub use error::{
    CollectionError, Error, Result, SearchError, StoreError, StoreResult, WriteError,
};
pub use search_types::{
    BatchItem, BatchReport, CollectionInfo, SearchDebug, SearchHit, SearchResponse, ShardInfo,
    ShardOutcome, ShardSearchReport, ShardStats, WriteReceipt,
};
pub use types::{now_micros, CollectionName, ProjectId, ShardAddress};
pub use vector::{
    validate_vector_id, CollectionConfig, DistanceMetric, Metadata, MetadataFilter, MetadataValue,
    Project, UpsertOutcome, VectorRecord,
};
