// Process-wide sliding-window rate limiter for outbound API calls

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Counters kept by the limiter. Atomics so readers never contend with
/// the grant path.
#[derive(Debug, Default)]
pub struct LimiterStats {
    pub granted_count: AtomicUsize,
    pub throttled_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LimiterStatsReport {
    pub granted_count: usize,
    pub throttled_count: usize,
}

/// Sliding-window limiter: at most `max_calls` grants within any trailing
/// `window`. `acquire` never fails, it only delays. State is shared by all
/// concurrent fetchers in the process; the mutex around the grant log is the
/// single serialization point.
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    grants: Mutex<VecDeque<Instant>>,
    stats: LimiterStats,
}

impl RateLimiter {
    pub fn new(max_calls: u32, window: Duration) -> Self {
        Self {
            max_calls: max_calls as usize,
            window,
            grants: Mutex::new(VecDeque::with_capacity(max_calls as usize)),
            stats: LimiterStats::default(),
        }
    }

    /// Block (asynchronously) until a call slot is free in the trailing
    /// window, then claim it. Waiters are not served in any particular order
    /// but each one eventually gets a slot: the window keeps rolling forward,
    /// so capacity is always released.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut grants = self.grants.lock();
                let now = Instant::now();

                while let Some(oldest) = grants.front() {
                    if now.duration_since(*oldest) >= self.window {
                        grants.pop_front();
                    } else {
                        break;
                    }
                }

                if grants.len() < self.max_calls {
                    grants.push_back(now);
                    self.stats.granted_count.fetch_add(1, Ordering::Relaxed);
                    return;
                }

                // Oldest grant leaves the window first; sleep until then.
                let oldest = *grants.front().expect("window full implies non-empty");
                self.window - now.duration_since(oldest)
            };

            self.stats.throttled_count.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    pub fn stats(&self) -> LimiterStatsReport {
        LimiterStatsReport {
            granted_count: self.stats.granted_count.load(Ordering::Relaxed),
            throttled_count: self.stats.throttled_count.load(Ordering::Relaxed),
        }
    }
}
