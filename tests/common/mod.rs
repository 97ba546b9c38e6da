//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Once};

pub use shardvec::{
    CollectionSpec, DistanceMetric, Error, MetadataFilter, SearchRequest, VectorDatabase,
    VectorRecord,
};
pub use shardvec_storage::testing::ShardLogTester;
use tempfile::TempDir;

pub const PROJECT: &str = "acme";

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness so it shows on failure.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

// ============================================================================
// TestDb - database in a temporary directory
// ============================================================================

/// Database in a temp dir with one project already provisioned.
pub struct TestDb {
    pub db: Arc<VectorDatabase>,
    pub dir: TempDir,
}

impl TestDb {
    pub fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db = VectorDatabase::open(dir.path()).expect("Failed to open test database");
        db.create_project(PROJECT, BTreeMap::new())
            .expect("Failed to create project");
        TestDb { db, dir }
    }

    /// Create a collection in the test project.
    pub fn collection(&self, name: &str, dimension: usize, metric: DistanceMetric, shards: u32) {
        self.db
            .create_collection(
                PROJECT,
                CollectionSpec::new(name, dimension)
                    .metric(metric)
                    .shards(shards),
            )
            .expect("Failed to create collection");
    }

    /// Close and reopen, replaying every shard log from disk.
    ///
    /// Any other `Arc<VectorDatabase>` clones must already be dropped.
    pub fn reopen(self) -> Self {
        let TestDb { db, dir } = self;
        drop(db);
        let db = VectorDatabase::open(dir.path()).expect("Failed to reopen test database");
        TestDb { db, dir }
    }

    /// Log file of one shard of a collection in the test project.
    pub fn shard_log(&self, collection: &str, shard: u32) -> PathBuf {
        self.dir
            .path()
            .join(PROJECT)
            .join("collections")
            .join(collection)
            .join(format!("shard_{}", shard))
            .join("vectors.log")
    }

    pub fn add(&self, collection: &str, id: &str, vector: Vec<f32>) {
        self.db
            .add(PROJECT, collection, VectorRecord::new(id, vector))
            .expect("Failed to add vector");
    }

    pub fn search(&self, collection: &str, query: Vec<f32>, k: usize) -> shardvec::SearchResponse {
        self.db
            .search(PROJECT, collection, &SearchRequest::new(query, k))
            .expect("Search failed")
    }
}

/// 2-d unit vector at `degrees` from the x axis.
pub fn unit(degrees: f32) -> Vec<f32> {
    let r = degrees.to_radians();
    vec![r.cos(), r.sin()]
}

/// Cosine similarity, computed independently of the engine.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (na * nb)
}
