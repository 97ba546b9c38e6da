//! Vector id to shard routing
//!
//! `shard_for(id, n) = xxh3_128(id bytes, seed 0) mod n`.
//!
//! XXH3 is specified over a canonical little-endian byte order, so the same
//! id routes to the same shard on every platform and across restarts. The
//! routing function is part of the on-disk contract: changing it would
//! silently relocate existing ids.

use xxhash_rust::xxh3::xxh3_128;

/// Pure id-to-shard router
#[derive(Debug, Clone, Copy, Default)]
pub struct ShardRouter;

impl ShardRouter {
    /// 128-bit routing hash of an id
    #[inline]
    pub fn route_hash(id: &str) -> u128 {
        xxh3_128(id.as_bytes())
    }

    /// Shard index for `id` in a collection of `shard_count` shards.
    ///
    /// Total: a shard count of 0 is treated as 1 (collections never have 0
    /// shards; configuration validation rejects it).
    #[inline]
    pub fn shard_for(id: &str, shard_count: u32) -> u32 {
        debug_assert!(shard_count > 0, "shard_count must be positive");
        let n = u128::from(shard_count.max(1));
        (Self::route_hash(id) % n) as u32
    }
}
