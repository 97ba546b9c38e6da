//! Engine configuration via `shardvec.toml`
//!
//! On first open, a default `shardvec.toml` is created in the data directory.
//! To change settings, edit the file and reopen.

use serde::{Deserialize, Serialize};
use shardvec_core::limits::{DEFAULT_SHARD_COUNT, MAX_DIMENSION, MAX_SHARD_COUNT};
use shardvec_core::{Error, Result};
use shardvec_storage::DurabilityMode;
use std::path::Path;
use std::time::Duration;

/// Config file name placed in the data directory.
pub const CONFIG_FILE_NAME: &str = "shardvec.toml";

/// Engine configuration loaded from `shardvec.toml`.
///
/// # Example
///
/// ```toml
/// durability = "standard"
/// search_timeout_ms = 5000
/// default_shard_count = 4
/// max_top_k = 1000
/// max_dimension = 65536
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Durability mode: `"standard"` or `"always"`.
    #[serde(default = "default_durability_str")]
    pub durability: String,
    /// Default per-call search deadline in milliseconds.
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,
    /// Shard count used when a caller does not choose one.
    #[serde(default = "default_shard_count")]
    pub default_shard_count: u32,
    /// Upper bound on `k` for a search.
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
    /// Upper bound on collection dimension.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: usize,
}

fn default_durability_str() -> String {
    "standard".to_string()
}

fn default_search_timeout_ms() -> u64 {
    5000
}

fn default_shard_count() -> u32 {
    DEFAULT_SHARD_COUNT
}

fn default_max_top_k() -> usize {
    1000
}

fn default_max_dimension() -> usize {
    MAX_DIMENSION
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            durability: default_durability_str(),
            search_timeout_ms: default_search_timeout_ms(),
            default_shard_count: default_shard_count(),
            max_top_k: default_max_top_k(),
            max_dimension: default_max_dimension(),
        }
    }
}

impl EngineConfig {
    /// Parse the durability string into a `DurabilityMode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `"standard"` or `"always"`.
    pub fn durability_mode(&self) -> Result<DurabilityMode> {
        DurabilityMode::parse(&self.durability).ok_or_else(|| {
            Error::config(format!(
                "Invalid durability mode '{}' in {}. Expected \"standard\" or \"always\".",
                self.durability, CONFIG_FILE_NAME
            ))
        })
    }

    /// Default search deadline
    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    /// Check every field.
    pub fn validate(&self) -> Result<()> {
        self.durability_mode()?;
        if self.default_shard_count == 0 || self.default_shard_count > MAX_SHARD_COUNT {
            return Err(Error::config(format!(
                "default_shard_count must be between 1 and {}, got {}",
                MAX_SHARD_COUNT, self.default_shard_count
            )));
        }
        if self.max_top_k == 0 {
            return Err(Error::config("max_top_k must be at least 1"));
        }
        if self.max_dimension == 0 || self.max_dimension > MAX_DIMENSION {
            return Err(Error::config(format!(
                "max_dimension must be between 1 and {}, got {}",
                MAX_DIMENSION, self.max_dimension
            )));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# shardvec configuration
#
# Durability mode: "standard" (default) or "always"
#   "standard" = flush each shard write to the OS, may lose recent writes on power loss
#   "always"   = fsync each shard write
durability = "standard"

# Default search deadline in milliseconds. Shards that have not answered
# by then are excluded from the result and reported as unavailable.
search_timeout_ms = 5000

# Shard count for collections created without an explicit count.
# Fixed for the life of each collection.
default_shard_count = 4

# Largest k accepted by search.
max_top_k = 1000

# Largest vector dimension accepted at collection creation.
max_dimension = 65536
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: EngineConfig = toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
