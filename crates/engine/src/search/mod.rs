//! Similarity search
//!
//! - `topk`: bounded per-shard selection and the k-way merge
//! - `scatter_gather`: parallel fan-out over a collection's shards

mod scatter_gather;
pub mod topk;

pub use scatter_gather::ScatterGatherSearchEngine;
pub use topk::{compare_ranked, merge_top_k, Candidate, TopK};

use shardvec_core::MetadataFilter;
use std::time::Duration;

/// A similarity query against one collection
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Query vector, same dimension as the collection
    pub query: Vec<f32>,
    /// Number of hits wanted
    pub k: usize,
    /// Equality filter applied to the merged results
    pub filter: Option<MetadataFilter>,
    /// Deadline override; the engine default applies when `None`
    pub timeout: Option<Duration>,
}

impl SearchRequest {
    /// Unfiltered request for the top `k`
    pub fn new(query: Vec<f32>, k: usize) -> Self {
        SearchRequest {
            query,
            k,
            filter: None,
            timeout: None,
        }
    }

    /// Builder: restrict hits to matching metadata
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Builder: per-request deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
