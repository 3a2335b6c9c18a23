//! Per-IP token-bucket rate limiting.

use std::net::IpAddr;
use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

/// Default burst capacity per key.
pub const DEFAULT_CAPACITY: u32 = 10;
/// Default refill period for one token.
pub const DEFAULT_REFILL_PERIOD: Duration = Duration::from_secs(10);

/// Keyed token-bucket registry, one bucket per client IP created on first
/// sight and never evicted within a process lifetime.
///
/// `try_reserve` and `spend` are both non-consuming-on-reject admission
/// checks against the same underlying bucket; callers choose which to call
/// based on the call site (accept-time burst control vs. disconnect-time
/// cost-of-failure accounting), not on any behavioral difference.
pub struct Limiter {
    inner: RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>,
}

impl Limiter {
    /// # Panics
    ///
    /// Panics if `capacity` is zero or `refill_period` is zero; both are
    /// programmer errors, never runtime conditions.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(capacity: u32, refill_period: Duration) -> Self {
        let quota = Quota::with_period(refill_period)
            .expect("refill_period must be non-zero")
            .allow_burst(NonZeroU32::new(capacity).expect("capacity must be non-zero"));
        Self { inner: RateLimiter::keyed(quota) }
    }

    /// Attempts to admit `key`, consuming a token only on success.
    #[must_use]
    pub fn try_reserve(&self, key: IpAddr) -> bool {
        self.inner.check_key(&key).is_ok()
    }

    /// Consumes a token for `key` if one is available, for disconnect-time
    /// accounting of unverified clients. Semantically identical to
    /// [`Limiter::try_reserve`]; kept as a separate name to mirror the two
    /// call sites.
    pub fn spend(&self, key: IpAddr) {
        let _ = self.inner.check_key(&key);
    }
}

impl Default for Limiter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_REFILL_PERIOD)
    }
}
