//! Quota gate, usage sink and embedding provider wiring.

use crate::common::*;
use shardvec::{
    EmbeddingProvider, Metadata, OperationKind, ProjectId, QuotaDecision, QuotaGate,
    UsageRecord, UsageSink,
};
use std::sync::{Arc, Mutex};

/// Denies one operation kind, allows the rest.
struct Deny(OperationKind);

impl QuotaGate for Deny {
    fn check(&self, _: &ProjectId, operation: OperationKind, _: usize) -> QuotaDecision {
        if operation == self.0 {
            QuotaDecision::deny(format!("{} budget exhausted", operation))
        } else {
            QuotaDecision::Allow
        }
    }
}

#[derive(Default)]
struct Collect(Mutex<Vec<UsageRecord>>);

impl UsageSink for Collect {
    fn record(&self, record: &UsageRecord) -> Result<(), String> {
        self.0.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Letter-frequency embedding over four buckets.
struct Buckets;

impl EmbeddingProvider for Buckets {
    fn dimension(&self) -> usize {
        4
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, String> {
        if text.is_empty() {
            return Err("empty text".to_string());
        }
        let mut v = vec![0.0f32; 4];
        for b in text.bytes() {
            v[(b % 4) as usize] += 1.0;
        }
        Ok(v)
    }
}

#[test]
fn denied_search_and_write_touch_nothing() {
    let t = TestDb::new();
    t.collection("c", 2, DistanceMetric::Cosine, 2);
    t.add("c", "a", vec![1.0, 0.0]);

    t.db.set_quota_gate(Arc::new(Deny(OperationKind::Search)));
    let err = t
        .db
        .search(PROJECT, "c", &SearchRequest::new(vec![1.0, 0.0], 1))
        .unwrap_err();
    match err {
        Error::QuotaExceeded { reason } => assert_eq!(reason, "search budget exhausted"),
        other => panic!("expected QuotaExceeded, got {:?}", other),
    }
    // Writes are still admitted.
    t.add("c", "b", vec![0.0, 1.0]);

    t.db.set_quota_gate(Arc::new(Deny(OperationKind::Upsert)));
    let err = t
        .db
        .upsert(PROJECT, "c", VectorRecord::new("z", vec![1.0, 1.0]))
        .unwrap_err();
    assert!(matches!(err, Error::QuotaExceeded { .. }));
    assert!(t.db.get(PROJECT, "c", "z").unwrap().is_none());
    assert_eq!(t.db.collection_info(PROJECT, "c").unwrap().total_rows, 2);
}

#[test]
fn usage_sink_sees_every_admitted_operation() {
    let t = TestDb::new();
    t.collection("c", 2, DistanceMetric::Cosine, 3);
    let sink = Arc::new(Collect::default());
    t.db.set_usage_sink(sink.clone());

    t.add("c", "a", vec![1.0, 0.0]);
    t.add("c", "b", vec![0.0, 1.0]);
    t.search("c", vec![1.0, 0.0], 5);
    t.db.add_batch(
        PROJECT,
        "c",
        vec![
            VectorRecord::new("x", vec![1.0, 1.0]),
            VectorRecord::new("y", vec![1.0]),
        ],
    )
    .unwrap();

    t.db.set_quota_gate(Arc::new(Deny(OperationKind::Add)));
    t.db.add(PROJECT, "c", VectorRecord::new("q", vec![1.0, 0.0]))
        .unwrap_err();

    let records = sink.0.lock().unwrap();
    let kinds: Vec<OperationKind> = records.iter().map(|r| r.operation).collect();
    assert_eq!(
        kinds,
        vec![
            OperationKind::Add,
            OperationKind::Add,
            OperationKind::Search,
            OperationKind::Add
        ]
    );
    assert_eq!(records[2].vector_count, 2);
    assert_eq!(records[3].vector_count, 1);
    assert!(records.iter().all(|r| r.success));
    assert!(records.iter().all(|r| r.project.as_str() == PROJECT));
}

#[test]
fn text_entry_points_embed_then_store() {
    let t = TestDb::new();
    t.collection("notes", 4, DistanceMetric::Cosine, 2);
    t.db.set_embedding_provider(Arc::new(Buckets));

    for (id, text) in [("n1", "aaaa"), ("n2", "bbbb"), ("n3", "abcd")] {
        t.db.add_text(PROJECT, "notes", id, text, Metadata::new())
            .unwrap();
    }
    let stored = t.db.get(PROJECT, "notes", "n1").unwrap().unwrap();
    assert_eq!(stored.document.as_deref(), Some("aaaa"));

    let response = t.db.search_text(PROJECT, "notes", "aa", 1, None).unwrap();
    assert_eq!(response.ids(), vec!["n1"]);
    assert_eq!(response.hits[0].document.as_deref(), Some("aaaa"));

    let err = t
        .db
        .add_text(PROJECT, "notes", "n4", "", Metadata::new())
        .unwrap_err();
    assert!(matches!(err, Error::Embedding(ref m) if m == "empty text"));
}
