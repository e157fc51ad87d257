//! Hourly job scheduling.
//!
//! The scheduler fires [`PostJob::run_once`] at the top of every hour,
//! evaluated in a configured IANA timezone. A tick whose predecessor is
//! still running is skipped rather than overlapped, and job failures are
//! logged without affecting later ticks. The run loop stops when its
//! [`CancellationToken`] is cancelled.

use crate::job::PostJob;
use chrono::{DateTime, TimeZone, Timelike};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Fires the repost job once per hour in a fixed timezone
pub struct HourlyScheduler {
    /// The job to invoke on each tick
    job: Arc<PostJob>,

    /// Timezone the top-of-hour boundary is evaluated in
    timezone: chrono_tz::Tz,

    /// Set while an invocation is in flight; ticks arriving meanwhile skip
    running: Arc<AtomicBool>,
}

impl HourlyScheduler {
    /// Creates a new hourly scheduler
    pub fn new(job: Arc<PostJob>, timezone: chrono_tz::Tz) -> Self {
        Self {
            job,
            timezone,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Time remaining until the next top-of-hour boundary
    ///
    /// Exactly on the boundary the full hour is returned, so a tick that just
    /// fired never double-fires.
    fn until_next_tick<Tz: TimeZone>(now: DateTime<Tz>) -> Duration {
        let into_hour = u64::from(now.minute()) * 60 + u64::from(now.second());
        Duration::from_secs(3600 - into_hour)
    }

    /// Runs the scheduler until `cancel` is cancelled
    ///
    /// Each tick spawns the invocation onto its own task so a slow invocation
    /// cannot delay the boundary computation; an overrunning invocation
    /// causes the next tick to be skipped with a warning instead.
    pub async fn run(self, cancel: CancellationToken) {
        info!(timezone = %self.timezone, "Scheduler started");

        loop {
            let now = chrono::Utc::now().with_timezone(&self.timezone);
            let wait = Self::until_next_tick(now);
            debug!(seconds = wait.as_secs(), "Sleeping until next tick");

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Scheduler shutting down");
                    break;
                }
                _ = sleep(wait) => {}
            }

            if self.running.swap(true, Ordering::SeqCst) {
                warn!("Previous invocation still running, skipping this tick");
                continue;
            }

            let job = self.job.clone();
            let running = self.running.clone();
            tokio::spawn(async move {
                if let Err(e) = job.run_once().await {
                    error!(error = %e, "Job invocation failed");
                }
                running.store(false, Ordering::SeqCst);
            });
        }

        info!("Scheduler stopped");
    }
}
