//! End-to-end: create, insert, delete, upsert, search, restart.

use crate::common::*;
use shardvec::UpsertOutcome;

fn eight() -> Vec<(&'static str, Vec<f32>)> {
    vec![
        ("a", vec![1.0, 0.0, 0.0, 0.0]),
        ("b", vec![0.0, 1.0, 0.0, 0.0]),
        ("c", vec![0.0, 0.0, 1.0, 0.0]),
        ("d", vec![0.0, 0.0, 0.0, 1.0]),
        ("e", vec![1.0, 1.0, 0.0, 0.0]),
        ("f", vec![0.0, 1.0, 1.0, 0.0]),
        ("g", vec![0.0, 0.0, 1.0, 1.0]),
        ("h", vec![1.0, 0.0, 0.0, 1.0]),
    ]
}

#[test]
fn create_insert_delete_upsert_search() {
    let t = TestDb::new();
    t.collection("scenario", 4, DistanceMetric::Cosine, 4);
    for (id, v) in eight() {
        t.add("scenario", id, v);
    }

    assert!(t.db.delete(PROJECT, "scenario", "c").unwrap());

    let fresh = vec![0.1, 0.2, 0.9, 0.3];
    let receipt = t
        .db
        .upsert(PROJECT, "scenario", VectorRecord::new("a", fresh.clone()))
        .unwrap();
    assert_eq!(receipt.outcome, Some(UpsertOutcome::Updated));

    let check = |t: &TestDb| {
        let response = t.search("scenario", fresh.clone(), 3);
        assert_eq!(response.hits.len(), 3);
        assert_eq!(response.hits[0].id, "a");
        assert!((response.hits[0].score - 1.0).abs() < 1e-6);
        assert!(!response.ids().contains(&"c"));
        assert!(response.hits.windows(2).all(|w| w[0].score >= w[1].score));
    };
    check(&t);

    let info = t.db.collection_info(PROJECT, "scenario").unwrap();
    assert_eq!(info.total_vectors, 7);
    assert_eq!(info.total_rows, 9);
    assert_eq!(info.shards.len(), 4);

    let t = t.reopen();
    check(&t);
    assert!(t.db.get(PROJECT, "scenario", "c").unwrap().is_none());
    assert_eq!(
        t.db.get(PROJECT, "scenario", "a").unwrap().unwrap().vector,
        fresh
    );
}
