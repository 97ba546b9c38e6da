//! Scatter-gather search: ranking, filters, partial failure.

use crate::common::*;
use shardvec::{ShardOutcome, ShardRouter};
use std::time::Duration;

const NINE: [(&str, [f32; 3]); 9] = [
    ("n1", [1.0, 0.0, 0.0]),
    ("n2", [0.9, 0.1, 0.0]),
    ("n3", [0.7, 0.7, 0.0]),
    ("n4", [0.0, 1.0, 0.0]),
    ("n5", [0.0, 0.0, 1.0]),
    ("n6", [0.5, 0.2, 0.3]),
    ("n7", [-1.0, 0.0, 0.0]),
    ("n8", [0.8, 0.0, 0.6]),
    ("n9", [0.1, 0.9, 0.4]),
];

#[test]
fn returns_true_top_three_in_order() {
    let t = TestDb::new();
    t.collection("nine", 3, DistanceMetric::Cosine, 3);
    for (id, v) in NINE {
        t.add("nine", id, v.to_vec());
    }

    let query = vec![1.0, 0.2, 0.1];
    let mut expected: Vec<(&str, f32)> = NINE
        .iter()
        .map(|(id, v)| (*id, cosine(&query, v)))
        .collect();
    expected.sort_by(|a, b| b.1.total_cmp(&a.1));

    let response = t.search("nine", query.clone(), 3);
    assert_eq!(response.hits.len(), 3);
    for (hit, (id, score)) in response.hits.iter().zip(expected.iter()) {
        assert_eq!(hit.id, *id);
        assert!((hit.score - score).abs() < 1e-5, "{} vs {}", hit.score, score);
    }

    // Every shard answered and every live row was scored exactly once.
    assert!(!response.debug.is_partial());
    assert!(response.warning().is_none());
    let scored: usize = response
        .debug
        .shards
        .iter()
        .map(|s| s.candidates_scored)
        .sum();
    assert_eq!(scored, 9);
    let counted: usize = response.debug.shards.iter().map(|s| s.vector_count).sum();
    assert_eq!(counted, 9);
}

#[test]
fn k_larger_than_collection_returns_everything() {
    let t = TestDb::new();
    t.collection("nine", 3, DistanceMetric::DotProduct, 3);
    for (id, v) in NINE {
        t.add("nine", id, v.to_vec());
    }
    let response = t.search("nine", vec![1.0, 1.0, 1.0], 100);
    assert_eq!(response.hits.len(), 9);
    assert_eq!(response.hits.last().unwrap().id, "n7");
}

#[test]
fn invalid_requests() {
    let t = TestDb::new();
    t.collection("c", 3, DistanceMetric::Cosine, 2);

    let err = t
        .db
        .search(PROJECT, "c", &SearchRequest::new(vec![1.0, 0.0], 3))
        .unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 3, got: 2 }));

    let err = t
        .db
        .search(PROJECT, "c", &SearchRequest::new(vec![1.0, 0.0, 0.0], 0))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn filter_runs_after_merge_and_can_underfill() {
    let t = TestDb::new();
    t.collection("c", 2, DistanceMetric::Cosine, 4);
    for i in 0..20 {
        let lang = if i % 5 == 4 { "de" } else { "en" };
        t.db.add(
            PROJECT,
            "c",
            VectorRecord::new(format!("v{:02}", i), unit(i as f32 * 4.0)).with_metadata("lang", lang),
        )
        .unwrap();
    }

    let request = SearchRequest::new(unit(0.0), 4)
        .with_filter(MetadataFilter::new().eq("lang", "de"));
    let response = t.db.search(PROJECT, "c", &request).unwrap();
    // Top 4 overall are v00..v03, none German; v04 sits just outside.
    assert_eq!(response.debug.merged_candidates, 4);
    assert!(response.hits.is_empty());

    let request = SearchRequest::new(unit(0.0), 10)
        .with_filter(MetadataFilter::new().eq("lang", "de"));
    let response = t.db.search(PROJECT, "c", &request).unwrap();
    assert_eq!(response.ids(), vec!["v04", "v09"]);
}

#[test]
fn one_failed_shard_is_reported_not_fatal() {
    let t = TestDb::new();
    t.collection("c", 2, DistanceMetric::DotProduct, 4);
    let ids: Vec<String> = (0..40).map(|i| format!("id{}", i)).collect();
    for (i, id) in ids.iter().enumerate() {
        t.add("c", id, vec![1.0, i as f32]);
    }

    let bad = ShardRouter::shard_for(&ids[0], 4);
    let t = t.reopen();
    ShardLogTester::new(t.shard_log("c", bad))
        .corrupt_first_frame()
        .unwrap();

    let response = t.search("c", vec![0.0, 1.0], 40);
    assert_eq!(response.debug.unavailable_shards, vec![bad]);
    assert_eq!(
        response.debug.shards[bad as usize].outcome,
        ShardOutcome::Failed
    );
    let warning = response.warning().unwrap();
    assert!(warning.contains(&bad.to_string()));

    let survivors: Vec<&String> = ids
        .iter()
        .filter(|id| ShardRouter::shard_for(id, 4) != bad)
        .collect();
    assert_eq!(response.hits.len(), survivors.len());
    for hit in &response.hits {
        assert_ne!(ShardRouter::shard_for(&hit.id, 4), bad);
    }

    // Writes routed to the broken shard surface the storage error.
    let err = t
        .db
        .add(PROJECT, "c", VectorRecord::new(ids[0].as_str(), vec![1.0, 1.0]))
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));

    // Diagnostics name the broken shard too.
    let info = t.db.collection_info(PROJECT, "c").unwrap();
    assert!(info.shards[bad as usize].error.is_some());
    assert!(info.shards[bad as usize].stats.is_none());
}

#[test]
fn all_shards_failed_is_an_error() {
    let t = TestDb::new();
    t.collection("c", 2, DistanceMetric::Cosine, 3);
    t.add("c", "a", vec![1.0, 0.0]);

    let t = t.reopen();
    for shard in 0..3 {
        ShardLogTester::new(t.shard_log("c", shard))
            .corrupt_header()
            .unwrap();
    }

    let err = t
        .db
        .search(PROJECT, "c", &SearchRequest::new(vec![1.0, 0.0], 1))
        .unwrap_err();
    match err {
        Error::AllShardsUnavailable {
            shard_count,
            failed,
        } => {
            assert_eq!(shard_count, 3);
            assert_eq!(failed, vec![0, 1, 2]);
        }
        other => panic!("expected AllShardsUnavailable, got {:?}", other),
    }
}

#[test]
fn expired_deadline_times_out_every_shard() {
    let t = TestDb::new();
    t.collection("c", 2, DistanceMetric::Cosine, 2);
    t.add("c", "a", vec![1.0, 0.0]);

    let request = SearchRequest::new(vec![1.0, 0.0], 1).with_timeout(Duration::ZERO);
    let err = t.db.search(PROJECT, "c", &request).unwrap_err();
    assert!(matches!(err, Error::AllShardsUnavailable { .. }));

    // A generous deadline succeeds.
    let request = SearchRequest::new(vec![1.0, 0.0], 1).with_timeout(Duration::from_secs(30));
    assert_eq!(t.db.search(PROJECT, "c", &request).unwrap().ids(), vec!["a"]);
}
