//! Size limits for identifiers, vectors and shard counts
//!
//! These bounds are enforced at the validation layer, before any shard is
//! touched. Dimension and `k` bounds can be tightened further through the
//! engine configuration.

/// Maximum length of a project id or collection name in bytes
pub const MAX_NAME_BYTES: usize = 128;

/// Maximum length of a vector id in bytes
pub const MAX_VECTOR_ID_BYTES: usize = 1024;

/// Hard upper bound on collection dimension
pub const MAX_DIMENSION: usize = 65536;

/// Hard upper bound on shard count (one search worker per shard)
pub const MAX_SHARD_COUNT: u32 = 1024;

/// Shard count used when the caller does not choose one
pub const DEFAULT_SHARD_COUNT: u32 = 4;
