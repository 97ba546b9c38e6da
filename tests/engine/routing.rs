//! Routing is a pure function of (id, shard count) and survives restarts.

use crate::common::*;
use shardvec::{ShardRouter, UpsertOutcome};

#[test]
fn receipts_match_router() {
    let t = TestDb::new();
    t.collection("docs", 3, DistanceMetric::Cosine, 5);

    for i in 0..50 {
        let id = format!("doc-{}", i);
        let receipt = t
            .db
            .add(PROJECT, "docs", VectorRecord::new(id.as_str(), vec![1.0, i as f32, 0.5]))
            .unwrap();
        assert_eq!(receipt.shard, ShardRouter::shard_for(&id, 5));
    }
}

#[test]
fn routing_is_stable_across_restart() {
    let t = TestDb::new();
    t.collection("docs", 2, DistanceMetric::DotProduct, 4);

    let ids: Vec<String> = (0..40).map(|i| format!("item/{}", i)).collect();
    for (i, id) in ids.iter().enumerate() {
        t.add("docs", id, vec![i as f32, 1.0]);
    }
    let before = t.db.collection_info(PROJECT, "docs").unwrap();

    let t = t.reopen();
    let after = t.db.collection_info(PROJECT, "docs").unwrap();
    assert_eq!(after.config.shard_count, 4);
    for (a, b) in before.shards.iter().zip(after.shards.iter()) {
        assert_eq!(
            a.stats.as_ref().map(|s| s.vector_count),
            b.stats.as_ref().map(|s| s.vector_count)
        );
    }

    // Every id is still found on the shard it was written to.
    for id in &ids {
        let record = t.db.get(PROJECT, "docs", id).unwrap();
        assert!(record.is_some(), "{} lost after restart", id);
        let receipt = t
            .db
            .upsert(PROJECT, "docs", VectorRecord::new(id.as_str(), vec![0.0, 1.0]))
            .unwrap();
        assert_eq!(receipt.outcome, Some(UpsertOutcome::Updated));
        assert_eq!(receipt.shard, ShardRouter::shard_for(id, 4));
    }
}

#[test]
fn upserts_never_move_an_id() {
    let t = TestDb::new();
    t.collection("docs", 2, DistanceMetric::Cosine, 7);

    for round in 0..5 {
        for i in 0..10 {
            let id = format!("u{}", i);
            let receipt = t
                .db
                .upsert(PROJECT, "docs", VectorRecord::new(id.as_str(), vec![round as f32, 1.0]))
                .unwrap();
            assert_eq!(receipt.shard, ShardRouter::shard_for(&id, 7));
        }
    }
    let info = t.db.collection_info(PROJECT, "docs").unwrap();
    assert_eq!(info.total_vectors, 10);
    assert_eq!(info.total_rows, 50);
}

#[test]
fn known_ids_land_on_pinned_shards() {
    let t = TestDb::new();
    t.collection("pinned", 2, DistanceMetric::Cosine, 7);

    for (id, shard) in [("doc-42", 4), ("user:1234567", 2), ("vector-0000000001", 6), ("a", 1)] {
        let receipt = t
            .db
            .add(PROJECT, "pinned", VectorRecord::new(id, vec![1.0, 0.0]))
            .unwrap();
        assert_eq!(receipt.shard, shard, "{}", id);
    }

    let info = t.db.collection_info(PROJECT, "pinned").unwrap();
    let counts: Vec<usize> = info
        .shards
        .iter()
        .map(|s| s.stats.as_ref().unwrap().vector_count)
        .collect();
    assert_eq!(counts, vec![0, 1, 1, 0, 1, 0, 1]);
}
