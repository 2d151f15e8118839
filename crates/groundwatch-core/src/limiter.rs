//! Per-client fixed-window rate limiting with a background eviction sweep.
//!
//! Each client identity (source IP) gets a [`RateWindow`]: a request count
//! and the instant the window resets. The first request from an identity
//! opens a window and is admitted; requests past the cap inside the same
//! window are rejected with the whole seconds left until reset. When the
//! reset instant passes, the next request reopens the window.
//!
//! This is a fixed window, not a sliding one: a burst straddling a window
//! boundary can admit up to twice the cap in a short span. That is an
//! accepted approximation, matching the deployment this replaces.
//!
//! Stale windows are evicted by a background sweep task with an explicit
//! lifecycle ([`spawn_sweeper`] / [`SweeperHandle::stop`]), so the map
//! only ever holds recently-active clients.
//!
//! Timing uses [`tokio::time::Instant`] throughout, so tests drive the
//! clock with `start_paused` and `tokio::time::advance`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::RateLimitConfig;

/// Outcome of an admission check. Admission never fails; it either lets
/// the request through or names the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request may proceed.
    Allowed,
    /// The request is rejected until the client's window resets.
    Limited {
        /// Whole seconds until the client may retry, rounded up, at
        /// least 1.
        retry_after_secs: u64,
    },
}

impl Admission {
    /// Whether the request was admitted.
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// One client's request count within its current window.
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    /// Requests seen since the window opened, rejected ones included.
    count: u64,
    /// When the window expires and the count starts over.
    reset_at: Instant,
}

/// Fixed-window request limiter keyed by client identity.
#[derive(Debug)]
pub struct RateLimiter {
    /// Window length.
    window: Duration,
    /// Admitted requests allowed per window.
    max_requests: u64,
    /// How long past expiry a window lingers before the sweep drops it.
    grace: Duration,
    /// Live windows, keyed by client identity.
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl RateLimiter {
    /// Create a limiter with explicit settings.
    pub fn new(window: Duration, max_requests: u64, grace: Duration) -> Self {
        Self {
            window,
            max_requests,
            grace,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Create a limiter from the rate-limit configuration section.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            Duration::from_millis(config.window_ms),
            config.max_requests,
            Duration::from_secs(config.grace_secs),
        )
    }

    /// Check whether a request from `client_id` is admitted.
    ///
    /// A client with no live window, or whose window has expired, opens a
    /// fresh window with count 1 and is admitted. Otherwise the count is
    /// bumped and compared against the cap.
    pub async fn admit(&self, client_id: &str) -> Admission {
        let now = Instant::now();
        let reset_at = now.checked_add(self.window).unwrap_or(now);
        let mut windows = self.windows.lock().await;

        let Some(window) = windows.get_mut(client_id) else {
            windows.insert(client_id.to_owned(), RateWindow { count: 1, reset_at });
            return Admission::Allowed;
        };

        if now >= window.reset_at {
            *window = RateWindow { count: 1, reset_at };
            return Admission::Allowed;
        }

        window.count = window.count.saturating_add(1);
        if window.count > self.max_requests {
            Admission::Limited {
                retry_after_secs: ceil_secs(window.reset_at.saturating_duration_since(now)),
            }
        } else {
            Admission::Allowed
        }
    }

    /// Drop windows whose reset instant plus the grace period has passed.
    ///
    /// Returns the number of windows evicted. Holds the map lock only for
    /// the duration of one retain pass.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, window| {
            window
                .reset_at
                .checked_add(self.grace)
                .is_none_or(|expiry| now < expiry)
        });
        before.saturating_sub(windows.len())
    }

    /// Number of client windows currently tracked. Diagnostics only.
    pub async fn tracked_clients(&self) -> usize {
        self.windows.lock().await.len()
    }
}

/// Round a duration up to whole seconds, with a floor of 1.
fn ceil_secs(remaining: Duration) -> u64 {
    let secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs.max(1)
    }
}

// ---------------------------------------------------------------------------
// Background sweep task
// ---------------------------------------------------------------------------

/// Handle to the background sweep task; stopping it is explicit.
#[derive(Debug)]
pub struct SweeperHandle {
    /// Set to request the task exit its loop.
    stop: Arc<AtomicBool>,
    /// Wakes the task out of its sleep so it notices the stop flag.
    wake: Arc<Notify>,
    /// The spawned task itself.
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweep task to stop and wait for it to finish.
    pub async fn stop(self) {
        self.stop.store(true, Ordering::Release);
        self.wake.notify_waiters();
        let _ = self.task.await;
    }
}

/// Spawn the periodic eviction sweep for `limiter`.
///
/// The task sleeps for `interval`, runs one sweep pass, and repeats until
/// [`SweeperHandle::stop`] is called.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, interval: Duration) -> SweeperHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let wake = Arc::new(Notify::new());

    let task_stop = Arc::clone(&stop);
    let task_wake = Arc::clone(&wake);
    let task = tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "rate window sweeper started");
        loop {
            tokio::select! {
                () = tokio::time::sleep(interval) => {
                    if task_stop.load(Ordering::Acquire) {
                        break;
                    }
                    let evicted = limiter.sweep().await;
                    if evicted > 0 {
                        debug!(evicted, "swept stale rate windows");
                    }
                }
                () = task_wake.notified() => {
                    if task_stop.load(Ordering::Acquire) {
                        break;
                    }
                }
            }
        }
        info!("rate window sweeper stopped");
    });

    SweeperHandle { stop, wake, task }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn small_limiter() -> RateLimiter {
        RateLimiter::new(Duration::from_millis(1000), 3, Duration::from_secs(60))
    }

    #[tokio::test(start_paused = true)]
    async fn admits_up_to_cap_then_rejects() {
        let limiter = small_limiter();

        for _ in 0..3 {
            assert_eq!(limiter.admit("10.0.0.1").await, Admission::Allowed);
        }

        let fourth = limiter.admit("10.0.0.1").await;
        let Admission::Limited { retry_after_secs } = fourth else {
            panic!("fourth request should be limited, got {fourth:?}");
        };
        assert!(retry_after_secs > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn window_expiry_resets_count() {
        let limiter = small_limiter();

        for _ in 0..4 {
            let _ = limiter.admit("10.0.0.1").await;
        }
        assert!(!limiter.admit("10.0.0.1").await.is_allowed());

        // Let the 1s window lapse.
        tokio::time::advance(Duration::from_millis(1100)).await;

        assert!(limiter.admit("10.0.0.1").await.is_allowed());
        // The reopened window starts at count 1, so two more fit.
        assert!(limiter.admit("10.0.0.1").await.is_allowed());
        assert!(limiter.admit("10.0.0.1").await.is_allowed());
        assert!(!limiter.admit("10.0.0.1").await.is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn identities_are_independent() {
        let limiter = small_limiter();

        for _ in 0..4 {
            let _ = limiter.admit("10.0.0.1").await;
        }
        assert!(!limiter.admit("10.0.0.1").await.is_allowed());
        assert!(limiter.admit("10.0.0.2").await.is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_reflects_time_left() {
        let limiter = RateLimiter::new(Duration::from_secs(10), 1, Duration::from_secs(60));

        assert!(limiter.admit("c").await.is_allowed());
        tokio::time::advance(Duration::from_secs(4)).await;

        let rejected = limiter.admit("c").await;
        let Admission::Limited { retry_after_secs } = rejected else {
            panic!("expected limited, got {rejected:?}");
        };
        // 6 seconds remain; ceil keeps it at 6.
        assert_eq!(retry_after_secs, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_evicts_only_past_grace() {
        let limiter = RateLimiter::new(Duration::from_millis(1000), 3, Duration::from_secs(60));

        let _ = limiter.admit("old").await;
        assert_eq!(limiter.tracked_clients().await, 1);

        // Window expired but grace has not passed: keep.
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(limiter.sweep().await, 0);
        assert_eq!(limiter.tracked_clients().await, 1);

        // Past reset + grace: evict.
        tokio::time::advance(Duration::from_secs(32)).await;
        assert_eq!(limiter.sweep().await, 1);
        assert_eq!(limiter.tracked_clients().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_task_runs_and_stops() {
        let limiter = Arc::new(RateLimiter::new(
            Duration::from_millis(100),
            3,
            Duration::from_millis(100),
        ));
        let _ = limiter.admit("transient").await;

        let handle = spawn_sweeper(Arc::clone(&limiter), Duration::from_secs(1));

        // After window (100ms) + grace (100ms) + one sweep interval the
        // entry is gone.
        tokio::time::advance(Duration::from_millis(1500)).await;
        tokio::task::yield_now().await;
        assert_eq!(limiter.tracked_clients().await, 0);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_requests_do_not_extend_window() {
        let limiter = small_limiter();

        for _ in 0..10 {
            let _ = limiter.admit("hammer").await;
        }
        // Despite continuous rejections, the original window still
        // expires on schedule.
        tokio::time::advance(Duration::from_millis(1100)).await;
        assert!(limiter.admit("hammer").await.is_allowed());
    }
}
