//! External collaborator seams
//!
//! The database consults these around every operation but never looks inside:
//!
//! - [`QuotaGate`]: asked before `add` / `upsert` / `search` touch a shard
//! - [`UsageSink`]: told about every outcome, best-effort
//! - [`EmbeddingProvider`]: turns text into vectors for the text entry points

use shardvec_core::ProjectId;
use std::fmt;
use std::time::Duration;

/// Kind of operation reported to the quota gate and usage sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Insert of one or more vectors
    Add,
    /// Insert-or-replace of one or more vectors
    Upsert,
    /// Logical delete of one or more ids
    Delete,
    /// Similarity search
    Search,
}

impl OperationKind {
    /// Lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Add => "add",
            OperationKind::Upsert => "upsert",
            OperationKind::Delete => "delete",
            OperationKind::Search => "search",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer of a quota gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaDecision {
    /// Proceed
    Allow,
    /// Refuse; surfaced to the caller as `Error::QuotaExceeded`
    Deny {
        /// Human-readable reason
        reason: String,
    },
}

impl QuotaDecision {
    /// Deny with a reason
    pub fn deny(reason: impl Into<String>) -> Self {
        QuotaDecision::Deny {
            reason: reason.into(),
        }
    }
}

/// Pre-operation admission check
pub trait QuotaGate: Send + Sync {
    /// Decide whether `project` may perform `operation` on `requested` vectors
    fn check(&self, project: &ProjectId, operation: OperationKind, requested: usize)
        -> QuotaDecision;
}

/// Gate that admits everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl QuotaGate for AllowAll {
    fn check(&self, _: &ProjectId, _: OperationKind, _: usize) -> QuotaDecision {
        QuotaDecision::Allow
    }
}

/// One usage event
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    /// Project the operation ran in
    pub project: ProjectId,
    /// Operation kind
    pub operation: OperationKind,
    /// Vectors written, deleted or returned
    pub vector_count: usize,
    /// Wall time of the operation
    pub duration: Duration,
    /// Whether the operation succeeded
    pub success: bool,
}

/// Post-operation usage recorder.
///
/// Errors are logged and dropped; they never fail the operation.
pub trait UsageSink: Send + Sync {
    /// Record one usage event
    fn record(&self, record: &UsageRecord) -> Result<(), String>;
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUsageSink;

impl UsageSink for NoopUsageSink {
    fn record(&self, _: &UsageRecord) -> Result<(), String> {
        Ok(())
    }
}

/// Text-to-vector function
pub trait EmbeddingProvider: Send + Sync {
    /// Length of the vectors produced
    fn dimension(&self) -> usize;

    /// Embed one text
    fn embed(&self, text: &str) -> Result<Vec<f32>, String>;
}
