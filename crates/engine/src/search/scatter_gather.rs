//! Scatter-gather search over a collection's shards
//!
//! # Algorithm
//!
//! 1. Validate `k` and the query against the collection.
//! 2. Spawn one worker thread per shard. Each opens its shard (if needed),
//!    scores every live row and sends back its local top-k, best first.
//! 3. Collect answers until every shard has reported or the deadline passes.
//!    A shard that errored, panicked or did not answer in time is excluded
//!    from the merge and listed in the debug report.
//! 4. K-way merge the local lists into the global top-k.
//! 5. Apply the metadata filter to the merged list.
//!
//! Workers are detached: a slow shard never holds up the caller past the
//! deadline. Its late answer is dropped with the channel.
//!
//! Filtering after the merge means a selective filter can return fewer than
//! `k` hits even when more matching vectors exist.

use crate::distance::QueryScorer;
use crate::registry::CollectionHandle;
use crate::search::topk::{merge_top_k, Candidate, TopK};
use crate::search::SearchRequest;
use shardvec_core::{
    Error, Result, SearchDebug, SearchHit, SearchResponse, ShardOutcome, ShardSearchReport,
};
use shardvec_storage::ShardStore;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What a shard worker sends back
struct ShardAnswer {
    shard: u32,
    elapsed: Duration,
    result: std::result::Result<LocalResult, String>,
}

/// Local top-k of one shard
struct LocalResult {
    hits: Vec<Candidate>,
    vector_count: usize,
    scored: usize,
}

/// Score every live row of `store` and keep the best `k`
fn scan_shard(store: &ShardStore, scorer: &QueryScorer, k: usize) -> LocalResult {
    let mut top = TopK::new(scorer.metric(), k);
    let scored = store.visit_candidates(|row| {
        let score = scorer.score(&row.vector);
        if top.would_accept(score, &row.id) {
            top.push(Candidate {
                id: row.id.clone(),
                score,
                metadata: row.metadata.clone(),
                document: row.document.clone(),
            });
        }
    });
    LocalResult {
        hits: top.into_sorted_vec(),
        vector_count: store.len(),
        scored,
    }
}

/// Cap for deadlines that would overflow `Instant`
const MAX_DEADLINE: Duration = Duration::from_secs(24 * 60 * 60);

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Parallel per-shard search with deadline and partial-failure tolerance
#[derive(Debug, Clone)]
pub struct ScatterGatherSearchEngine {
    default_timeout: Duration,
    max_top_k: usize,
}

impl Default for ScatterGatherSearchEngine {
    fn default() -> Self {
        ScatterGatherSearchEngine::new(Duration::from_millis(5000), 1000)
    }
}

impl ScatterGatherSearchEngine {
    /// Engine with a default deadline and an upper bound on `k`
    pub fn new(default_timeout: Duration, max_top_k: usize) -> Self {
        ScatterGatherSearchEngine {
            default_timeout,
            max_top_k,
        }
    }

    /// Deadline used when a request carries none
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Largest accepted `k`
    pub fn max_top_k(&self) -> usize {
        self.max_top_k
    }

    fn validate(&self, collection: &CollectionHandle, request: &SearchRequest) -> Result<()> {
        if request.k == 0 {
            return Err(Error::invalid_argument("k must be at least 1"));
        }
        if request.k > self.max_top_k {
            return Err(Error::invalid_argument(format!(
                "k = {} exceeds the maximum of {}",
                request.k, self.max_top_k
            )));
        }
        collection.config().check_dimension(&request.query)?;
        if request.query.iter().any(|x| !x.is_finite()) {
            return Err(Error::invalid_argument(
                "query vector contains non-finite values",
            ));
        }
        Ok(())
    }

    /// Top-k most similar live vectors in `collection`.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if the query length differs from the collection dimension
    /// - `InvalidArgument` if `k` is 0 or too large, or the query is not finite
    /// - `AllShardsUnavailable` if no shard answered successfully before the deadline
    pub fn search(
        &self,
        collection: &Arc<CollectionHandle>,
        request: &SearchRequest,
    ) -> Result<SearchResponse> {
        self.validate(collection, request)?;

        let started = Instant::now();
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let deadline = started
            .checked_add(timeout)
            .unwrap_or_else(|| started + MAX_DEADLINE);
        let shard_count = collection.shard_count();
        let k = request.k;
        let scorer = Arc::new(QueryScorer::new(collection.metric(), request.query.clone()));

        let mut reports: Vec<Option<ShardSearchReport>> = vec![None; shard_count as usize];
        let mut lists: Vec<Vec<Candidate>> = Vec::with_capacity(shard_count as usize);
        let mut pending = 0usize;

        let (tx, rx) = mpsc::channel::<ShardAnswer>();
        for shard in 0..shard_count {
            let tx = tx.clone();
            let collection = Arc::clone(collection);
            let scorer = Arc::clone(&scorer);
            let spawned = std::thread::Builder::new()
                .name(format!("shardvec-search-{}", shard))
                .spawn(move || {
                    let answer = run_worker(shard, || {
                        collection
                            .shard(shard)
                            .map(|store| scan_shard(&store, &scorer, k))
                    });
                    // Receiver may be gone after the deadline.
                    let _ = tx.send(answer);
                });
            match spawned {
                Ok(_) => pending += 1,
                Err(e) => {
                    reports[shard as usize] = Some(failed_report(
                        shard,
                        Duration::ZERO,
                        format!("failed to spawn search worker: {}", e),
                    ));
                }
            }
        }
        drop(tx);

        let mut workers_gone = false;
        while pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let answer = match rx.recv_timeout(remaining) {
                Ok(answer) => answer,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    workers_gone = true;
                    break;
                }
            };
            pending -= 1;

            let slot = &mut reports[answer.shard as usize];
            match answer.result {
                Ok(local) => {
                    *slot = Some(ShardSearchReport {
                        shard: answer.shard,
                        outcome: ShardOutcome::Responded,
                        vector_count: local.vector_count,
                        candidates_scored: local.scored,
                        returned: local.hits.len(),
                        elapsed_ms: millis(answer.elapsed),
                        error: None,
                    });
                    lists.push(local.hits);
                }
                Err(error) => {
                    *slot = Some(failed_report(answer.shard, answer.elapsed, error));
                }
            }
        }

        let shards: Vec<ShardSearchReport> = reports
            .into_iter()
            .enumerate()
            .map(|(shard, report)| {
                report.unwrap_or_else(|| {
                    if workers_gone {
                        failed_report(
                            shard as u32,
                            Duration::ZERO,
                            "search worker exited without answering".to_string(),
                        )
                    } else {
                        ShardSearchReport::timed_out(shard as u32)
                    }
                })
            })
            .collect();
        let unavailable: Vec<u32> = shards
            .iter()
            .filter(|r| !r.responded())
            .map(|r| r.shard)
            .collect();

        for report in shards.iter().filter(|r| !r.responded()) {
            warn!(
                target: "shardvec::search",
                project = %collection.project(),
                collection = %collection.name(),
                shard = report.shard,
                outcome = ?report.outcome,
                error = report.error.as_deref().unwrap_or(""),
                "Shard excluded from search"
            );
        }

        if unavailable.len() == shard_count as usize {
            return Err(Error::AllShardsUnavailable {
                shard_count,
                failed: unavailable,
            });
        }

        let merged = merge_top_k(collection.metric(), lists, k);
        let merged_candidates = merged.len();
        let hits: Vec<SearchHit> = match &request.filter {
            Some(filter) if !filter.is_empty() => merged
                .into_iter()
                .filter(|c| filter.matches(&c.metadata))
                .map(SearchHit::from)
                .collect(),
            _ => merged.into_iter().map(SearchHit::from).collect(),
        };

        let elapsed = started.elapsed();
        debug!(
            target: "shardvec::search",
            collection = %collection.name(),
            k,
            hits = hits.len(),
            unavailable = unavailable.len(),
            elapsed_ms = millis(elapsed),
            "search"
        );

        Ok(SearchResponse {
            hits,
            debug: SearchDebug {
                shards,
                unavailable_shards: unavailable,
                merged_candidates,
                elapsed_ms: millis(elapsed),
            },
        })
    }
}

/// Run one shard's work, turning an error or a panic into a failed answer
/// so the caller hears back immediately instead of waiting for the deadline.
fn run_worker<F>(shard: u32, work: F) -> ShardAnswer
where
    F: FnOnce() -> Result<LocalResult>,
{
    let begin = Instant::now();
    let result = match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(Ok(local)) => Ok(local),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(format!("search worker panicked: {}", message))
        }
    };
    ShardAnswer {
        shard,
        elapsed: begin.elapsed(),
        result,
    }
}

fn failed_report(shard: u32, elapsed: Duration, error: String) -> ShardSearchReport {
    ShardSearchReport {
        shard,
        outcome: ShardOutcome::Failed,
        vector_count: 0,
        candidates_scored: 0,
        returned: 0,
        elapsed_ms: millis(elapsed),
        error: Some(error),
    }
}
