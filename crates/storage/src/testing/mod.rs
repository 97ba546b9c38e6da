//! Testing utilities for shard log recovery
//!
//! Used by this crate's unit tests and by the workspace integration tests to
//! damage shard logs on disk and observe how shards and searches react.

mod corruption;

pub use corruption::{ShardLogTester, TruncationResult};
