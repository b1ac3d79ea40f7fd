//! Fixed-count sharding over the rayon pool.
//!
//! Work is split into at most `shards` contiguous ranges; each shard returns
//! its own result and the caller merges them after all shards finish.

use rayon::prelude::*;

/// Items per shard so that `len` items fit in `shards` shards.
#[inline]
pub fn shard_len(len: usize, shards: usize) -> usize {
    len.div_ceil(shards.max(1)).max(1)
}

/// Run `f` on each shard of `items` in parallel, returning results in shard order.
pub fn run_sharded<T, R, F>(items: &[T], shards: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&[T]) -> R + Sync + Send,
{
    if items.is_empty() {
        return Vec::new();
    }
    items
        .par_chunks(shard_len(items.len(), shards))
        .map(f)
        .collect()
}
