//! Identifier types for shardvec
//!
//! - ProjectId: tenant boundary
//! - CollectionName: vector index name, unique within a project
//! - ShardAddress: (project, collection, shard index), the physical address of a shard

use crate::error::{Error, Result};
use crate::limits::MAX_NAME_BYTES;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Check a project id or collection name.
///
/// Names double as directory names, so they are restricted to ASCII
/// alphanumerics, `_` and `-`.
fn validate_name(kind: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidName {
            kind,
            value: value.to_string(),
            reason: "cannot be empty",
        });
    }
    if value.len() > MAX_NAME_BYTES {
        return Err(Error::InvalidName {
            kind,
            value: value.to_string(),
            reason: "too long",
        });
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::InvalidName {
            kind,
            value: value.to_string(),
            reason: "must be alphanumeric with underscores/hyphens",
        });
    }
    Ok(())
}

/// Project identifier (validated, immutable)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    /// Validate and wrap a project id
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        validate_name("project id", &value)?;
        Ok(ProjectId(value))
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        ProjectId::new(value)
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}

/// Collection name (validated, immutable, unique within a project)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionName(String);

impl CollectionName {
    /// Validate and wrap a collection name
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        validate_name("collection name", &value)?;
        Ok(CollectionName(value))
    }

    /// Borrow the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CollectionName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        CollectionName::new(value)
    }
}

impl From<CollectionName> for String {
    fn from(name: CollectionName) -> Self {
        name.0
    }
}

/// Physical address of one shard
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardAddress {
    /// Owning project
    pub project: ProjectId,
    /// Owning collection
    pub collection: CollectionName,
    /// Shard index in `0..shard_count`
    pub shard: u32,
}

impl ShardAddress {
    /// Create a shard address
    pub fn new(project: ProjectId, collection: CollectionName, shard: u32) -> Self {
        ShardAddress {
            project,
            collection,
            shard,
        }
    }
}

impl fmt::Display for ShardAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.project, self.collection, self.shard)
    }
}

/// Current wall-clock time in microseconds since the Unix epoch
pub fn now_micros() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
