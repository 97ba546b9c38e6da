//! Write path: dimension checks, logical deletes, upsert labels, batches.

use crate::common::*;
use shardvec::UpsertOutcome;

#[test]
fn wrong_dimension_is_rejected_before_any_shard() {
    let t = TestDb::new();
    t.collection("c", 4, DistanceMetric::Cosine, 3);

    for len in [0usize, 1, 3, 5, 128] {
        let err = t
            .db
            .add(PROJECT, "c", VectorRecord::new("x", vec![0.5; len]))
            .unwrap_err();
        match err {
            Error::DimensionMismatch { expected, got } => {
                assert_eq!(expected, 4);
                assert_eq!(got, len);
            }
            other => panic!("expected DimensionMismatch, got {:?}", other),
        }
    }
    let err = t
        .db
        .upsert(PROJECT, "c", VectorRecord::new("x", vec![0.5; 2]))
        .unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { .. }));

    let info = t.db.collection_info(PROJECT, "c").unwrap();
    assert_eq!(info.total_rows, 0);
}

#[test]
fn deleted_ids_disappear_but_rows_remain() {
    let t = TestDb::new();
    t.collection("c", 2, DistanceMetric::Cosine, 3);
    for i in 0..6 {
        t.add("c", &format!("v{}", i), unit(i as f32 * 5.0));
    }

    assert!(t.db.delete(PROJECT, "c", "v0").unwrap());
    assert!(t.db.get(PROJECT, "c", "v0").unwrap().is_none());

    let response = t.search("c", unit(0.0), 6);
    assert!(!response.ids().contains(&"v0"));
    assert_eq!(response.hits.len(), 5);

    let info = t.db.collection_info(PROJECT, "c").unwrap();
    assert_eq!(info.total_vectors, 5);
    assert_eq!(info.total_rows, 6);

    // Still gone after replay.
    let t = t.reopen();
    assert!(t.db.get(PROJECT, "c", "v0").unwrap().is_none());
    assert_eq!(t.db.collection_info(PROJECT, "c").unwrap().total_rows, 6);
}

#[test]
fn delete_is_idempotent() {
    let t = TestDb::new();
    t.collection("c", 2, DistanceMetric::Cosine, 2);

    assert!(!t.db.delete(PROJECT, "c", "ghost").unwrap());
    t.add("c", "once", vec![1.0, 0.0]);
    assert!(t.db.delete(PROJECT, "c", "once").unwrap());
    assert!(!t.db.delete(PROJECT, "c", "once").unwrap());
}

#[test]
fn upsert_labels_and_latest_value() {
    let t = TestDb::new();
    t.collection("c", 2, DistanceMetric::Euclidean, 4);

    let first = t
        .db
        .upsert(
            PROJECT,
            "c",
            VectorRecord::new("k", vec![1.0, 1.0]).with_metadata("rev", 1i64),
        )
        .unwrap();
    assert_eq!(first.outcome, Some(UpsertOutcome::Inserted));

    let second = t
        .db
        .upsert(
            PROJECT,
            "c",
            VectorRecord::new("k", vec![2.0, 2.0]).with_metadata("rev", 2i64),
        )
        .unwrap();
    assert_eq!(second.outcome, Some(UpsertOutcome::Updated));

    let current = t.db.get(PROJECT, "c", "k").unwrap().unwrap();
    assert_eq!(current.vector, vec![2.0, 2.0]);
    assert_eq!(
        current.metadata.get("rev"),
        Some(&shardvec::MetadataValue::Int(2))
    );

    let response = t.search("c", vec![0.0, 0.0], 10);
    assert_eq!(response.ids(), vec!["k"]);
}

#[test]
fn batches_apply_items_independently() {
    let t = TestDb::new();
    t.collection("c", 2, DistanceMetric::Cosine, 3);

    let report = t
        .db
        .add_batch(
            PROJECT,
            "c",
            vec![
                VectorRecord::new("a", vec![1.0, 0.0]),
                VectorRecord::new("b", vec![1.0, 0.0, 0.0]),
                VectorRecord::new("c", vec![0.0, 1.0]),
                VectorRecord::new("d", vec![f32::NAN, 1.0]),
            ],
        )
        .unwrap();
    assert_eq!(report.total, 4);
    assert_eq!(report.successful, 2);
    assert_eq!(report.failed, 2);
    assert!(report.items[0].success && report.items[2].success);
    assert!(!report.items[1].success && !report.items[3].success);

    let report = t
        .db
        .upsert_batch(
            PROJECT,
            "c",
            vec![
                VectorRecord::new("a", vec![0.5, 0.5]),
                VectorRecord::new("e", vec![0.5, 0.5]),
            ],
        )
        .unwrap();
    let outcomes: Vec<_> = report.items.iter().map(|i| i.outcome).collect();
    assert_eq!(
        outcomes,
        vec![Some(UpsertOutcome::Updated), Some(UpsertOutcome::Inserted)]
    );

    let report = t.db.delete_batch(PROJECT, "c", &["a", "b", "c"]).unwrap();
    assert_eq!(report.successful, 2);
    assert!(!report.items[1].success);

    let info = t.db.collection_info(PROJECT, "c").unwrap();
    assert_eq!(info.total_vectors, 1);
}

#[test]
fn concurrent_writers_on_one_collection() {
    let t = TestDb::new();
    t.collection("c", 2, DistanceMetric::Cosine, 4);

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let db = &t.db;
            scope.spawn(move || {
                for i in 0..25 {
                    db.add(
                        PROJECT,
                        "c",
                        VectorRecord::new(format!("w{}-{}", worker, i), vec![1.0, i as f32]),
                    )
                    .unwrap();
                }
            });
        }
    });

    let info = t.db.collection_info(PROJECT, "c").unwrap();
    assert_eq!(info.total_vectors, 100);

    let t = t.reopen();
    assert_eq!(t.db.collection_info(PROJECT, "c").unwrap().total_vectors, 100);
}
