//! Bounded top-k selection and k-way merge
//!
//! Ordering is the collection metric's natural order with ties broken by
//! ascending id, so the same data always ranks the same way regardless of
//! which shard or thread produced a candidate. NaN scores rank last.

use shardvec_core::{DistanceMetric, Metadata, SearchHit};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A scored candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Vector id
    pub id: String,
    /// Score under the collection metric
    pub score: f32,
    /// Record metadata
    pub metadata: Metadata,
    /// Record document
    pub document: Option<String>,
}

impl From<Candidate> for SearchHit {
    fn from(c: Candidate) -> Self {
        SearchHit {
            id: c.id,
            score: c.score,
            metadata: c.metadata,
            document: c.document,
        }
    }
}

/// Sort key: smaller is better.
///
/// Higher-is-better scores are negated so every metric sorts ascending.
/// `+ 0.0` folds -0.0 into 0.0 so `total_cmp` treats them as equal.
#[inline]
fn badness(metric: DistanceMetric, score: f32) -> f32 {
    if score.is_nan() {
        return f32::NAN;
    }
    let key = if metric.higher_is_better() {
        -score
    } else {
        score
    };
    key + 0.0
}

/// Best-first comparison of `(score, id)` pairs
pub fn compare_ranked(
    metric: DistanceMetric,
    a_score: f32,
    a_id: &str,
    b_score: f32,
    b_id: &str,
) -> Ordering {
    badness(metric, a_score)
        .total_cmp(&badness(metric, b_score))
        .then_with(|| a_id.cmp(b_id))
}

/// Candidate with its precomputed sort key
#[derive(Debug)]
struct Ranked {
    key: f32,
    candidate: Candidate,
}

impl Ranked {
    fn new(metric: DistanceMetric, candidate: Candidate) -> Self {
        Ranked {
            key: badness(metric, candidate.score),
            candidate,
        }
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .total_cmp(&other.key)
            .then_with(|| self.candidate.id.cmp(&other.candidate.id))
    }
}

/// Bounded best-k collector.
///
/// A max-heap on the sort key: the worst kept candidate sits on top and is
/// evicted when a better one arrives.
#[derive(Debug)]
pub struct TopK {
    metric: DistanceMetric,
    k: usize,
    heap: BinaryHeap<Ranked>,
}

impl TopK {
    /// Collector keeping the best `k` candidates
    pub fn new(metric: DistanceMetric, k: usize) -> Self {
        TopK {
            metric,
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(4096)),
        }
    }

    /// Whether a candidate with this score and id would be kept.
    ///
    /// Lets callers skip building candidates that cannot make the cut.
    pub fn would_accept(&self, score: f32, id: &str) -> bool {
        if self.k == 0 {
            return false;
        }
        if self.heap.len() < self.k {
            return true;
        }
        match self.heap.peek() {
            Some(worst) => {
                badness(self.metric, score)
                    .total_cmp(&worst.key)
                    .then_with(|| id.cmp(worst.candidate.id.as_str()))
                    == Ordering::Less
            }
            None => true,
        }
    }

    /// Offer a candidate
    pub fn push(&mut self, candidate: Candidate) {
        if !self.would_accept(candidate.score, &candidate.id) {
            return;
        }
        self.heap.push(Ranked::new(self.metric, candidate));
        if self.heap.len() > self.k {
            self.heap.pop();
        }
    }

    /// Candidates kept so far
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing has been kept
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Kept candidates, best first
    pub fn into_sorted_vec(self) -> Vec<Candidate> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|r| r.candidate)
            .collect()
    }
}

/// Head of one input list during the merge
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Head {
    ranked: Ranked,
    source: usize,
}

/// Merge best-first lists into one best-first list of at most `k` entries.
pub fn merge_top_k(
    metric: DistanceMetric,
    lists: Vec<Vec<Candidate>>,
    k: usize,
) -> Vec<Candidate> {
    let mut sources: Vec<std::vec::IntoIter<Candidate>> =
        lists.into_iter().map(Vec::into_iter).collect();

    let mut heap = BinaryHeap::with_capacity(sources.len());
    for (source, list) in sources.iter_mut().enumerate() {
        if let Some(candidate) = list.next() {
            heap.push(Reverse(Head {
                ranked: Ranked::new(metric, candidate),
                source,
            }));
        }
    }

    let mut merged = Vec::with_capacity(k.min(4096));
    while merged.len() < k {
        let Some(Reverse(head)) = heap.pop() else {
            break;
        };
        if let Some(next) = sources[head.source].next() {
            debug_assert!(
                compare_ranked(
                    metric,
                    head.ranked.candidate.score,
                    &head.ranked.candidate.id,
                    next.score,
                    &next.id
                ) != Ordering::Greater,
                "merge input must be sorted best-first"
            );
            heap.push(Reverse(Head {
                ranked: Ranked::new(metric, next),
                source: head.source,
            }));
        }
        merged.push(head.ranked.candidate);
    }
    merged
}
