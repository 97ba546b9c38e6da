//! Error types for shardvec
//!
//! Two layers, both built on `thiserror`:
//!
//! - [`StoreError`]: failures inside a single shard (I/O, corrupt log frames,
//!   codec errors, the shard-local dimension check).
//! - [`Error`]: the taxonomy surfaced to callers of the registries, the write
//!   coordinator and the search engine. Shard failures arrive here through
//!   `Error::Store`.

use std::io;
use thiserror::Error;

/// Result type alias for shardvec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for shard-level operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Error raised by collection creation and lookup.
pub type CollectionError = Error;

/// Error raised by the write coordinator.
pub type WriteError = Error;

/// Error raised by the scatter-gather search engine.
pub type SearchError = Error;

/// Shard-level storage failure
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error while reading or writing the shard log
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A frame in the shard log failed validation
    #[error("Shard {shard} corrupted at offset {offset}: {reason}")]
    Corruption {
        /// Shard index
        shard: u32,
        /// Byte offset of the bad frame
        offset: u64,
        /// What was wrong with it
        reason: String,
    },

    /// Record length does not match the shard's dimension
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Dimension the shard was opened with
        expected: usize,
        /// Length of the rejected vector
        got: usize,
    },

    /// Record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Errors surfaced by shardvec operations
#[derive(Debug, Error)]
pub enum Error {
    /// Vector length differs from the collection dimension
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Collection dimension
        expected: usize,
        /// Length of the rejected vector
        got: usize,
    },

    /// Project does not exist
    #[error("Project not found: {project}")]
    ProjectNotFound {
        /// Project identifier
        project: String,
    },

    /// Collection does not exist in the project
    #[error("Collection not found: {project}/{collection}")]
    CollectionNotFound {
        /// Project identifier
        project: String,
        /// Collection name
        collection: String,
    },

    /// Vector id does not exist (or is logically deleted)
    #[error("Vector not found: {id}")]
    VectorNotFound {
        /// Vector identifier
        id: String,
    },

    /// Project already exists
    #[error("Project already exists: {project}")]
    DuplicateProject {
        /// Project identifier
        project: String,
    },

    /// Collection name already used in the project
    #[error("Collection already exists: {project}/{collection}")]
    DuplicateCollection {
        /// Project identifier
        project: String,
        /// Collection name
        collection: String,
    },

    /// Quota gate denied the operation
    #[error("Quota exceeded: {reason}")]
    QuotaExceeded {
        /// Human-readable reason from the gate
        reason: String,
    },

    /// Shard-level storage failure
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Search got no answer from any shard
    #[error("All {shard_count} shards unavailable (failed: {failed:?})")]
    AllShardsUnavailable {
        /// Shard count of the collection
        shard_count: u32,
        /// Indices of shards that failed or timed out
        failed: Vec<u32>,
    },

    /// Shard count must be at least 1
    #[error("Invalid shard count: {shard_count} (must be > 0)")]
    InvalidShardCount {
        /// Rejected shard count
        shard_count: u64,
    },

    /// Dimension must be at least 1 and within the configured maximum
    #[error("Invalid dimension: {dimension} (must be between 1 and {max})")]
    InvalidDimension {
        /// Rejected dimension
        dimension: u64,
        /// Configured maximum
        max: usize,
    },

    /// Identifier failed validation
    #[error("Invalid {kind} '{value}': {reason}")]
    InvalidName {
        /// What was being named ("project id", "collection name", "vector id")
        kind: &'static str,
        /// The rejected value
        value: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Argument outside the accepted range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration file could not be read, parsed or validated
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding provider failed or is not configured
    #[error("Embedding error: {0}")]
    Embedding(String),
}

impl Error {
    /// Build an `InvalidArgument` error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Build a `Config` error
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Whether the error is a caller-side validation failure.
    ///
    /// Validation failures are reported before any shard is touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::DimensionMismatch { .. }
                | Error::InvalidShardCount { .. }
                | Error::InvalidDimension { .. }
                | Error::InvalidName { .. }
                | Error::InvalidArgument(_)
        )
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Store(StoreError::Io(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Store(StoreError::Serialization(e.to_string()))
    }
}
