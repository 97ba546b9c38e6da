//! Vector data model
//!
//! These types describe what is stored (VectorRecord), how a collection is
//! configured (CollectionConfig) and how candidates are ranked (DistanceMetric).
//! Distance calculations themselves live in the engine crate.

use crate::error::{Error, Result};
use crate::limits::{MAX_DIMENSION, MAX_SHARD_COUNT, MAX_VECTOR_ID_BYTES};
use crate::types::{now_micros, CollectionName, ProjectId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Distance metric used to rank vectors within a collection
///
/// Resolved once per collection when it is opened; never dispatched per vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine similarity: dot(a,b) / (||a|| * ||b||)
    /// Range: [-1, 1], higher = more similar
    #[default]
    Cosine,

    /// Dot product (raw value)
    /// Range: unbounded, higher = more similar
    #[serde(alias = "dot")]
    DotProduct,

    /// Euclidean (L2) distance
    /// Range: [0, inf), lower = more similar
    #[serde(alias = "l2", alias = "L2")]
    Euclidean,
}

impl DistanceMetric {
    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::DotProduct => "dot_product",
            DistanceMetric::Euclidean => "euclidean",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Some(DistanceMetric::Cosine),
            "dot_product" | "dot" | "inner_product" => Some(DistanceMetric::DotProduct),
            "euclidean" | "l2" => Some(DistanceMetric::Euclidean),
            _ => None,
        }
    }

    /// Whether a larger score means a closer match
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, DistanceMetric::Euclidean)
    }

    /// Order two scores best-first under this metric.
    ///
    /// `Ordering::Less` means `a` ranks ahead of `b`. NaN always ranks last.
    pub fn rank(&self, a: f32, b: f32) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }
        let natural = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        if self.higher_is_better() {
            natural.reverse()
        } else {
            natural
        }
    }
}

/// Scalar metadata value
///
/// Metadata is a flat map; nested objects and arrays are not stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
}

impl MetadataValue {
    /// Equality used by metadata filters.
    ///
    /// Integers and floats compare numerically, so `Int(5)` matches `Float(5.0)`.
    pub fn matches(&self, other: &MetadataValue) -> bool {
        match (self, other) {
            (MetadataValue::Null, MetadataValue::Null) => true,
            (MetadataValue::Bool(a), MetadataValue::Bool(b)) => a == b,
            (MetadataValue::Int(a), MetadataValue::Int(b)) => a == b,
            (MetadataValue::Float(a), MetadataValue::Float(b)) => (a - b).abs() < f64::EPSILON,
            (MetadataValue::Int(a), MetadataValue::Float(b))
            | (MetadataValue::Float(b), MetadataValue::Int(a)) => {
                (*a as f64 - b).abs() < f64::EPSILON
            }
            (MetadataValue::String(a), MetadataValue::String(b)) => a == b,
            _ => false,
        }
    }

    /// Convert a JSON scalar. Arrays and objects are rejected.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(MetadataValue::Null),
            serde_json::Value::Bool(b) => Some(MetadataValue::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(MetadataValue::Int)
                .or_else(|| n.as_f64().map(MetadataValue::Float)),
            serde_json::Value::String(s) => Some(MetadataValue::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    /// Convert to a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MetadataValue::Null => serde_json::Value::Null,
            MetadataValue::Bool(b) => serde_json::Value::Bool(*b),
            MetadataValue::Int(i) => serde_json::Value::from(*i),
            MetadataValue::Float(f) => serde_json::Value::from(*f),
            MetadataValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Bool(v)
    }
}

impl From<i32> for MetadataValue {
    fn from(v: i32) -> Self {
        MetadataValue::Int(v as i64)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Int(v)
    }
}

impl From<u32> for MetadataValue {
    fn from(v: u32) -> Self {
        MetadataValue::Int(v as i64)
    }
}

impl From<f32> for MetadataValue {
    fn from(v: f32) -> Self {
        MetadataValue::Float(v as f64)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::String(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::String(v.to_string())
    }
}

/// Flat string-keyed metadata map (sorted for deterministic encoding)
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Metadata filter for search (equality only, AND semantics)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    /// Top-level field equality conditions
    pub equals: BTreeMap<String, MetadataValue>,
}

impl MetadataFilter {
    /// Create an empty filter (matches all)
    pub fn new() -> Self {
        MetadataFilter {
            equals: BTreeMap::new(),
        }
    }

    /// Add an equality condition
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.equals.insert(field.into(), value.into());
        self
    }

    /// Check if metadata satisfies every condition
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.equals.iter().all(|(key, expected)| {
            metadata
                .get(key)
                .is_some_and(|actual| expected.matches(actual))
        })
    }

    /// Check if filter is empty (matches all)
    pub fn is_empty(&self) -> bool {
        self.equals.is_empty()
    }

    /// Number of conditions in the filter
    pub fn len(&self) -> usize {
        self.equals.len()
    }
}

/// The atomic unit of stored data
///
/// Rows are never rewritten in place except for the logical-deletion flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Caller-provided id, unique within the collection
    pub id: String,
    /// Embedding; length must equal the collection dimension
    pub vector: Vec<f32>,
    /// Flat scalar metadata
    pub metadata: Metadata,
    /// Optional raw document text
    pub document: Option<String>,
    /// Logical-deletion flag
    pub deleted: bool,
    /// Creation time (microseconds since epoch)
    pub created_at: u64,
    /// Last update time (microseconds since epoch)
    pub updated_at: u64,
}

impl VectorRecord {
    /// Create a live record stamped with the current time
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        let now = now_micros();
        VectorRecord {
            id: id.into(),
            vector,
            metadata: Metadata::new(),
            document: None,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add one metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace the metadata map
    pub fn with_metadata_map(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Attach document text
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    /// Vector length
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    /// Whether the record is visible to lookups and search
    pub fn is_live(&self) -> bool {
        !self.deleted
    }

    /// Validate id and vector contents (not the collection dimension).
    pub fn validate(&self) -> Result<()> {
        validate_vector_id(&self.id)?;
        if self.vector.is_empty() {
            return Err(Error::invalid_argument(format!(
                "vector '{}' is empty",
                self.id
            )));
        }
        if self.vector.iter().any(|x| !x.is_finite()) {
            return Err(Error::invalid_argument(format!(
                "vector '{}' contains non-finite values",
                self.id
            )));
        }
        Ok(())
    }
}

/// Validate a vector id: non-empty and bounded in length
pub fn validate_vector_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::InvalidName {
            kind: "vector id",
            value: id.to_string(),
            reason: "cannot be empty",
        });
    }
    if id.len() > MAX_VECTOR_ID_BYTES {
        return Err(Error::InvalidName {
            kind: "vector id",
            value: id.chars().take(32).collect(),
            reason: "too long",
        });
    }
    Ok(())
}

/// Outcome of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertOutcome {
    /// No live record existed; the record was appended
    Inserted,
    /// A live record was logically deleted and the new one appended
    Updated,
}

/// Collection configuration - immutable after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Collection name
    pub name: CollectionName,
    /// Vector dimension
    pub dimension: usize,
    /// Ranking metric
    pub metric: DistanceMetric,
    /// Number of shards, fixed for the life of the collection
    #[serde(alias = "shards")]
    pub shard_count: u32,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Creation time (microseconds since epoch)
    pub created_at: u64,
}

impl CollectionConfig {
    /// Create a validated configuration.
    ///
    /// # Errors
    /// - `InvalidDimension` if dimension is 0 or exceeds `max_dimension`
    /// - `InvalidShardCount` if shard_count is 0 or exceeds the shard limit
    pub fn new(
        name: CollectionName,
        dimension: usize,
        metric: DistanceMetric,
        shard_count: u32,
        max_dimension: usize,
    ) -> Result<Self> {
        let config = CollectionConfig {
            name,
            dimension,
            metric,
            shard_count,
            description: None,
            created_at: now_micros(),
        };
        config.validate(max_dimension)?;
        Ok(config)
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Re-check dimension and shard count bounds
    pub fn validate(&self, max_dimension: usize) -> Result<()> {
        let max = max_dimension.min(MAX_DIMENSION);
        if self.dimension == 0 || self.dimension > max {
            return Err(Error::InvalidDimension {
                dimension: self.dimension as u64,
                max,
            });
        }
        if self.shard_count == 0 || self.shard_count > MAX_SHARD_COUNT {
            return Err(Error::InvalidShardCount {
                shard_count: self.shard_count as u64,
            });
        }
        Ok(())
    }

    /// Reject vectors whose length differs from the collection dimension
    pub fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        Ok(())
    }
}

/// Tenant record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Project identifier
    #[serde(rename = "project_id")]
    pub id: ProjectId,
    /// Arbitrary metadata supplied at provisioning time
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Creation time (microseconds since epoch)
    pub created_at: u64,
}

impl Project {
    /// Create a project record stamped with the current time
    pub fn new(id: ProjectId, metadata: BTreeMap<String, serde_json::Value>) -> Self {
        Project {
            id,
            metadata,
            created_at: now_micros(),
        }
    }
}
