//! Result and diagnostics types
//!
//! - SearchHit: one ranked result
//! - ShardSearchReport / SearchDebug: per-shard outcome of a scatter-gather query
//! - ShardStats / CollectionInfo: shard balance diagnostics
//! - WriteReceipt / BatchReport: write acknowledgements

use crate::types::CollectionName;
use crate::vector::{CollectionConfig, Metadata, UpsertOutcome};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One ranked search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Vector id
    pub id: String,
    /// Score under the collection metric
    pub score: f32,
    /// Record metadata
    pub metadata: Metadata,
    /// Record document text, if any
    pub document: Option<String>,
}

/// How a shard took part in a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShardOutcome {
    /// Shard answered and its results were merged
    Responded,
    /// Shard returned an error and was excluded
    Failed,
    /// Shard did not answer before the deadline and was excluded
    TimedOut,
}

/// Per-shard diagnostics for one search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardSearchReport {
    /// Shard index
    pub shard: u32,
    /// Whether the shard answered
    pub outcome: ShardOutcome,
    /// Live vectors in the shard when it was scanned
    pub vector_count: usize,
    /// Live candidates scored by the shard
    pub candidates_scored: usize,
    /// Results the shard contributed to the merge
    pub returned: usize,
    /// Wall time spent by the shard task (milliseconds)
    pub elapsed_ms: f64,
    /// Error message for failed shards
    pub error: Option<String>,
}

impl ShardSearchReport {
    /// Report for a shard that never answered
    pub fn timed_out(shard: u32) -> Self {
        ShardSearchReport {
            shard,
            outcome: ShardOutcome::TimedOut,
            vector_count: 0,
            candidates_scored: 0,
            returned: 0,
            elapsed_ms: 0.0,
            error: None,
        }
    }

    /// Whether the shard's results were merged
    pub fn responded(&self) -> bool {
        self.outcome == ShardOutcome::Responded
    }
}

/// Debug channel of a search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchDebug {
    /// One entry per shard, ordered by shard index
    pub shards: Vec<ShardSearchReport>,
    /// Shards excluded from the merge (failed or timed out), ascending
    pub unavailable_shards: Vec<u32>,
    /// Merged candidates before the metadata filter was applied
    pub merged_candidates: usize,
    /// Total wall time of the search (milliseconds)
    pub elapsed_ms: f64,
}

impl SearchDebug {
    /// Whether any shard was excluded from the merge
    pub fn is_partial(&self) -> bool {
        !self.unavailable_shards.is_empty()
    }
}

/// Search answer: ranked hits plus diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Hits ordered best-first under the collection metric
    pub hits: Vec<SearchHit>,
    /// Per-shard diagnostics
    pub debug: SearchDebug,
}

impl SearchResponse {
    /// Ids of the hits, in rank order
    pub fn ids(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.id.as_str()).collect()
    }

    /// Non-fatal warning listing unavailable shards, if any
    pub fn warning(&self) -> Option<String> {
        if self.debug.is_partial() {
            Some(format!(
                "partial results: shards {:?} unavailable",
                self.debug.unavailable_shards
            ))
        } else {
            None
        }
    }
}

/// Shard diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardStats {
    /// Shard index
    pub shard: u32,
    /// Live (non-deleted) records
    pub vector_count: usize,
    /// Physical rows including logically deleted ones
    pub row_count: usize,
    /// Location of the shard log
    pub path: PathBuf,
}

/// Shard entry in collection info; `stats` is `None` when the shard could not be opened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardInfo {
    /// Shard index
    pub shard: u32,
    /// Stats, when the shard is readable
    pub stats: Option<ShardStats>,
    /// Open error, when it is not
    pub error: Option<String>,
}

/// Collection configuration plus shard balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Immutable configuration
    pub config: CollectionConfig,
    /// Live vectors across readable shards
    pub total_vectors: usize,
    /// Physical rows across readable shards
    pub total_rows: usize,
    /// Per-shard entries, ordered by shard index
    pub shards: Vec<ShardInfo>,
}

impl CollectionInfo {
    /// Collection name
    pub fn name(&self) -> &CollectionName {
        &self.config.name
    }
}

/// Acknowledgement of a single write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReceipt {
    /// Vector id
    pub id: String,
    /// Shard the write was routed to
    pub shard: u32,
    /// Set for upserts
    pub outcome: Option<UpsertOutcome>,
}

/// Per-item result of a batch write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    /// Vector id
    pub id: String,
    /// Whether the item was applied (for deletes: whether a live record was found)
    pub success: bool,
    /// Shard the item was routed to, when routing happened
    pub shard: Option<u32>,
    /// Upsert outcome, for upsert batches
    pub outcome: Option<UpsertOutcome>,
    /// Error message for failed items
    pub error: Option<String>,
}

/// Summary of a batch write
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Items submitted
    pub total: usize,
    /// Items applied
    pub successful: usize,
    /// Items rejected or failed
    pub failed: usize,
    /// Per-item results, in submission order
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    /// Append an item result and update the counters
    pub fn push(&mut self, item: BatchItem) {
        self.total += 1;
        if item.success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.items.push(item);
    }
}
