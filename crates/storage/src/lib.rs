//! Storage layer for shardvec
//!
//! This crate implements the per-shard storage backend:
//! - ShardRouter: deterministic id -> shard routing (xxh3-128 mod n)
//! - ShardStore: in-memory row table backed by an append-only, CRC-checked log
//! - StorageLayout: project -> collection -> shard directory layout and
//!   atomic JSON descriptors
//! - DurabilityMode: flush vs fsync after each shard write
//!
//! # Shard logs
//!
//! Each shard owns one `vectors.log`. Rows are appended, deletes are logged as
//! markers, and nothing is ever rewritten. Opening a shard replays its log.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod durability;
pub mod encoding;
pub mod layout;
pub mod router;
pub mod shard;
pub mod testing;

pub use durability::DurabilityMode;
pub use encoding::{DeleteMarker, ShardEntry, SHARD_LOG_MAGIC};
pub use layout::{read_json, write_json_atomic, StorageLayout};
pub use router::ShardRouter;
pub use shard::{ScanCandidates, ShardStore, SCAN_BATCH};
