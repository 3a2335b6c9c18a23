//! Periodic process CPU utilisation sampling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

/// Default sampling period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
struct CpuTime {
    user: Duration,
    system: Duration,
}

/// Source of cumulative process user+system CPU time. Abstracted so the
/// ticker in [`Sampler::spawn`] can be driven by a scripted sequence in
/// tests instead of the real process clock.
trait CpuTimeReader: Send + Sync + 'static {
    fn read(&self) -> Option<CpuTime>;
}

/// Reads cumulative process user+system CPU time via `getrusage(RUSAGE_SELF)`.
struct SystemCpuTimeReader;

impl CpuTimeReader for SystemCpuTimeReader {
    /// # Safety invariant
    /// `libc::getrusage` writes into a `libc::rusage` we own and fully
    /// initialise to zero before the call; the only unsafe surface is the FFI
    /// call itself, which cannot fail for `RUSAGE_SELF` on a conforming Unix.
    #[allow(unsafe_code)]
    fn read(&self) -> Option<CpuTime> {
        let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &raw mut usage) };
        if rc != 0 {
            return None;
        }
        let user =
            Duration::new(usage.ru_utime.tv_sec as u64, (usage.ru_utime.tv_usec as u32) * 1000);
        let system =
            Duration::new(usage.ru_stime.tv_sec as u64, (usage.ru_stime.tv_usec as u32) * 1000);
        Some(CpuTime { user, system })
    }
}

/// Holds the most recently published CPU utilisation fraction, updated by a
/// background ticker spawned with [`Sampler::spawn`].
pub struct Sampler {
    fraction_bits: AtomicU64,
}

impl Sampler {
    fn new() -> Self {
        Self { fraction_bits: AtomicU64::new(0.0f64.to_bits()) }
    }

    /// The most recently published utilisation fraction in `[0, 1]`.
    /// Returns `0.0` until the first sample completes.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        f64::from_bits(self.fraction_bits.load(Ordering::Relaxed))
    }

    fn publish(&self, fraction: f64) {
        self.fraction_bits.store(fraction.to_bits(), Ordering::Relaxed);
    }

    /// Spawns the periodic sampling task against the real process clock,
    /// returning the shared reader and a token that stops the ticker
    /// exactly once when cancelled.
    #[must_use]
    pub fn spawn(period: Duration, num_cpus: usize) -> (Arc<Self>, CancellationToken) {
        Self::spawn_with_reader(period, num_cpus, SystemCpuTimeReader)
    }

    fn spawn_with_reader(
        period: Duration,
        num_cpus: usize,
        reader: impl CpuTimeReader,
    ) -> (Arc<Self>, CancellationToken) {
        let sampler = Arc::new(Self::new());
        let cancel = CancellationToken::new();
        let task_sampler = Arc::clone(&sampler);
        let task_cancel = cancel.clone();
        let num_cpus = num_cpus.max(1) as f64;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            let mut last = reader.read();
            let mut last_instant = Instant::now();
            loop {
                tokio::select! {
                    () = task_cancel.cancelled() => break,
                    _ = interval.tick() => {},
                }
                let now = Instant::now();
                let elapsed = now.duration_since(last_instant);
                match (last, reader.read()) {
                    (Some(prev), Some(current)) if elapsed > Duration::ZERO => {
                        let delta_user = current.user.saturating_sub(prev.user);
                        let delta_system = current.system.saturating_sub(prev.system);
                        let delta = (delta_user + delta_system).as_secs_f64();
                        let fraction = delta / (elapsed.as_secs_f64() * num_cpus);
                        task_sampler.publish(fraction.clamp(0.0, 1.0));
                        last = Some(current);
                    },
                    (_, Some(current)) => {
                        last = Some(current);
                    },
                    (_, None) => {
                        tracing::warn!("failed to read process CPU time; retaining last fraction");
                    },
                }
                last_instant = now;
            }
        });

        (sampler, cancel)
    }
}
