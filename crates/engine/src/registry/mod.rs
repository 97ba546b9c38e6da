//! Project and collection registries
//!
//! - [`ProjectRegistry`]: tenant namespaces under the data root
//! - [`CollectionRegistry`]: collection descriptors within a project
//! - [`CollectionHandle`]: an open collection and its lazily opened shards
//!
//! The registries are the only place shard counts are decided. Once a handle
//! exists its shard count cannot change.

mod collection;
mod project;

pub use collection::{CollectionHandle, CollectionRegistry, CollectionSpec};
pub use project::ProjectRegistry;

use crate::database::EngineConfig;
use shardvec_core::limits::{DEFAULT_SHARD_COUNT, MAX_DIMENSION};
use shardvec_core::Result;
use shardvec_storage::DurabilityMode;

/// Settings shared by every registry and handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySettings {
    /// Durability of shard writes
    pub durability: DurabilityMode,
    /// Shard count for collections created without one
    pub default_shard_count: u32,
    /// Largest dimension accepted at creation
    pub max_dimension: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        RegistrySettings {
            durability: DurabilityMode::default(),
            default_shard_count: DEFAULT_SHARD_COUNT,
            max_dimension: MAX_DIMENSION,
        }
    }
}

impl RegistrySettings {
    /// Settings from a validated engine configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(RegistrySettings {
            durability: config.durability_mode()?,
            default_shard_count: config.default_shard_count,
            max_dimension: config.max_dimension,
        })
    }
}
