//! Background purge of stale resolved incidents.
//!
//! Resolved records stop mattering to the live map almost immediately;
//! after the configured retention window they stop mattering to analytics
//! too and are deleted outright. The task here runs that purge on a fixed
//! interval for the lifetime of the process.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use groundwatch_core::config::RetentionConfig;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::service::IncidentService;

/// Handle to the background retention task; stopping it is explicit.
#[derive(Debug)]
pub struct RetentionHandle {
    /// Set to request the task exit its loop.
    stop: Arc<AtomicBool>,
    /// Wakes the task out of its sleep so it notices the stop flag.
    wake: Arc<Notify>,
    /// The spawned task itself.
    task: JoinHandle<()>,
}

impl RetentionHandle {
    /// Signal the retention task to stop and wait for it to finish.
    pub async fn stop(self) {
        self.stop.store(true, Ordering::Release);
        self.wake.notify_waiters();
        let _ = self.task.await;
    }
}

/// Spawn the periodic purge of resolved incidents older than the
/// configured retention window.
///
/// The task sleeps for the configured interval, runs one purge pass, and
/// repeats until [`RetentionHandle::stop`] is called. A failed pass is
/// logged and the task keeps its schedule.
pub fn spawn_retention(service: IncidentService, config: RetentionConfig) -> RetentionHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let wake = Arc::new(Notify::new());
    let interval = Duration::from_secs(config.sweep_interval_secs);

    let task_stop = Arc::clone(&stop);
    let task_wake = Arc::clone(&wake);
    let task = tokio::spawn(async move {
        info!(
            interval_secs = config.sweep_interval_secs,
            older_than_days = config.days,
            "retention task started"
        );
        loop {
            tokio::select! {
                () = tokio::time::sleep(interval) => {
                    if task_stop.load(Ordering::Acquire) {
                        break;
                    }
                    if let Err(err) = service.purge_resolved(config.days).await {
                        warn!(error = %err, "retention purge failed");
                    }
                }
                () = task_wake.notified() => {
                    if task_stop.load(Ordering::Acquire) {
                        break;
                    }
                }
            }
        }
        info!("retention task stopped");
    });

    RetentionHandle { stop, wake, task }
}
