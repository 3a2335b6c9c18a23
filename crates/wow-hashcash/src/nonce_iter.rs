//! `FastIter`: partitions the u64 nonce space into `N` disjoint shards and
//! yields little-endian nonce bytes from a chosen shard on demand.

use std::sync::Mutex;

struct ShardCursor {
    cursor: u128,
    end: u128,
}

/// A sharded cursor over the full `u64` nonce space. Each shard is
/// independently exhaustible; `next` never wraps once a shard is drained —
/// callers must move on to a different `seq`.
pub struct FastIter {
    shards: Vec<Mutex<ShardCursor>>,
}

impl FastIter {
    /// Splits `[0, 2^64)` into `n` shards of equal size, with the last shard
    /// absorbing `2^64 mod n`. `n` must be at least 1.
    #[must_use]
    pub fn new(n: u32) -> Self {
        Self::with_total(1u128 << 64, n)
    }

    /// Splits `[0, total)` into `n` shards. Exposed for tests that need a
    /// small, quickly-exhaustible space; production code always uses the
    /// full `2^64` range via [`FastIter::new`].
    fn with_total(total: u128, n: u32) -> Self {
        let n = n.max(1);
        let chunk = total / u128::from(n);
        let mut shards = Vec::with_capacity(n as usize);
        for i in 0..n {
            let start = chunk * u128::from(i);
            let end = if i + 1 == n { total } else { start + chunk };
            shards.push(Mutex::new(ShardCursor { cursor: start, end }));
        }
        Self { shards }
    }

    /// Number of shards (`N`).
    #[must_use]
    pub fn seq_size(&self) -> u32 {
        self.shards.len() as u32
    }

    /// Yields the next nonce from shard `seq`, advancing its cursor, or
    /// `None` once that shard is exhausted.
    ///
    /// # Panics
    ///
    /// Panics if `seq >= seq_size()`.
    #[allow(clippy::expect_used)]
    pub fn next(&self, seq: u32) -> Option<[u8; 8]> {
        let mut shard = self.shards[seq as usize].lock().expect("nonce shard mutex poisoned");
        if shard.cursor >= shard.end {
            return None;
        }
        let value = shard.cursor as u64;
        shard.cursor += 1;
        Some(value.to_le_bytes())
    }
}

/// Work-stealing claim counter shared by the parallel minter's workers:
/// `claim()` atomically hands out the next unclaimed shard index.
pub struct ShardClaimer {
    last_seq: Mutex<i64>,
    shard_count: u32,
}

impl ShardClaimer {
    /// Creates a claimer over `shard_count` shards, none of which are claimed yet.
    #[must_use]
    pub fn new(shard_count: u32) -> Self {
        Self { last_seq: Mutex::new(-1), shard_count }
    }

    /// Claims the next shard index, or `None` once all shards are claimed.
    #[allow(clippy::expect_used)]
    pub fn claim(&self) -> Option<u32> {
        let mut last_seq = self.last_seq.lock().expect("shard claimer mutex poisoned");
        *last_seq += 1;
        if *last_seq >= i64::from(self.shard_count) { None } else { Some(*last_seq as u32) }
    }
}
