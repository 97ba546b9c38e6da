//! Projects and collections: lifecycle, persistence, diagnostics.

use crate::common::*;
use serde_json::json;
use shardvec::{EngineConfig, VectorDatabaseBuilder};
use std::collections::BTreeMap;

#[test]
fn project_lifecycle() {
    let t = TestDb::new();
    let mut metadata = BTreeMap::new();
    metadata.insert("plan".to_string(), json!("pro"));
    let project = t.db.create_project("beta", metadata).unwrap();
    assert_eq!(project.id.as_str(), "beta");

    let err = t.db.create_project("beta", BTreeMap::new()).unwrap_err();
    assert!(matches!(err, Error::DuplicateProject { .. }));
    let err = t.db.create_project("no spaces", BTreeMap::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidName { .. }));

    assert_eq!(t.db.list_projects().unwrap(), vec!["acme", "beta"]);
    assert_eq!(t.db.get_project("beta").unwrap().metadata["plan"], json!("pro"));

    t.db.delete_project("beta").unwrap();
    assert!(!t.db.project_exists("beta"));
    assert!(matches!(
        t.db.get_project("beta").unwrap_err(),
        Error::ProjectNotFound { .. }
    ));
}

#[test]
fn deleting_a_project_removes_its_collections() {
    let t = TestDb::new();
    t.collection("c", 2, DistanceMetric::Cosine, 2);
    t.add("c", "a", vec![1.0, 0.0]);

    t.db.delete_project(PROJECT).unwrap();
    assert!(!t.dir.path().join(PROJECT).exists());
    assert!(!t.db.collection_exists(PROJECT, "c"));
    let err = t.db.get(PROJECT, "c", "a").unwrap_err();
    assert!(matches!(err, Error::ProjectNotFound { .. }));
}

#[test]
fn collection_creation_validation() {
    let t = TestDb::new();

    let err = t
        .db
        .create_collection(PROJECT, CollectionSpec::new("c", 3).shards(0))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidShardCount { shard_count: 0 }));

    let err = t
        .db
        .create_collection(PROJECT, CollectionSpec::new("c", 0))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidDimension { dimension: 0, .. }));

    let err = t
        .db
        .create_collection("nobody", CollectionSpec::new("c", 3))
        .unwrap_err();
    assert!(matches!(err, Error::ProjectNotFound { .. }));

    // Failed attempts leave nothing behind.
    assert!(!t.db.collection_exists(PROJECT, "c"));

    t.collection("c", 3, DistanceMetric::Cosine, 2);
    let err = t
        .db
        .create_collection(PROJECT, CollectionSpec::new("c", 8))
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateCollection { .. }));
}

#[test]
fn collections_survive_restart() {
    let t = TestDb::new();
    t.db.create_collection(
        PROJECT,
        CollectionSpec::new("images", 8)
            .metric(DistanceMetric::Euclidean)
            .shards(6)
            .description("thumbnails"),
    )
    .unwrap();
    t.collection("text", 3, DistanceMetric::DotProduct, 2);

    let t = t.reopen();
    assert_eq!(t.db.list_collections(PROJECT).unwrap(), vec!["images", "text"]);
    let info = t.db.collection_info(PROJECT, "images").unwrap();
    assert_eq!(info.config.dimension, 8);
    assert_eq!(info.config.metric, DistanceMetric::Euclidean);
    assert_eq!(info.config.shard_count, 6);
    assert_eq!(info.config.description.as_deref(), Some("thumbnails"));
    assert_eq!(info.shards.len(), 6);
    assert!(info.shards.iter().all(|s| s.error.is_none()));
}

#[test]
fn default_shard_count_comes_from_config() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let db = VectorDatabaseBuilder::new()
        .path(dir.path())
        .config(EngineConfig {
            default_shard_count: 3,
            ..EngineConfig::default()
        })
        .open()
        .unwrap();
    db.create_project("p", BTreeMap::new()).unwrap();
    let config = db
        .create_collection("p", CollectionSpec::new("c", 2))
        .unwrap();
    assert_eq!(config.shard_count, 3);

    // An explicit count wins.
    let config = db
        .create_collection("p", CollectionSpec::new("d", 2).shards(9))
        .unwrap();
    assert_eq!(config.shard_count, 9);
}

#[test]
fn collection_info_reports_shard_balance() {
    let t = TestDb::new();
    t.collection("c", 2, DistanceMetric::Cosine, 4);
    for i in 0..400 {
        t.add("c", &format!("vec-{}", i), vec![1.0, i as f32]);
    }
    t.db.delete(PROJECT, "c", "vec-7").unwrap();

    let info = t.db.collection_info(PROJECT, "c").unwrap();
    assert_eq!(info.total_vectors, 399);
    assert_eq!(info.total_rows, 400);
    let per_shard: Vec<usize> = info
        .shards
        .iter()
        .map(|s| s.stats.as_ref().unwrap().vector_count)
        .collect();
    assert_eq!(per_shard.iter().sum::<usize>(), 399);
    // xxh3 spreads 400 ids well; no shard is empty or holds most of them.
    assert!(per_shard.iter().all(|&n| n > 40 && n < 200), "{:?}", per_shard);
}
