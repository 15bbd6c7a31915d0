//! Recurring sweep of expired posts.
//!
//! One job per process. Overlapping runs are not prevented; a sweep that
//! outlasts its interval simply races the next one, and both only ever
//! delete posts that are already expired.

use anyhow::{Result, anyhow};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::lifecycle::LifecycleManager;

/// Handle to the running sweep schedule.
pub struct SweepScheduler {
    scheduler: JobScheduler,
}

impl SweepScheduler {
    /// Starts sweeping on `schedule` (cron syntax with a seconds field,
    /// e.g. `"0 0 3 * * *"`).
    ///
    /// # Errors
    ///
    /// Returns an error if the schedule cannot be parsed or the scheduler
    /// fails to start.
    pub async fn start(lifecycle: LifecycleManager, schedule: &str) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow!("Failed to create sweep scheduler: {e:?}"))?;

        let job = Job::new_async(schedule, move |_id, _scheduler| {
            let lifecycle = lifecycle.clone();
            Box::pin(async move {
                run_sweep(&lifecycle).await;
            })
        })
        .map_err(|e| anyhow!("Invalid sweep schedule '{schedule}': {e:?}"))?;

        scheduler
            .add(job)
            .await
            .map_err(|e| anyhow!("Failed to register sweep job: {e:?}"))?;
        scheduler
            .start()
            .await
            .map_err(|e| anyhow!("Failed to start sweep scheduler: {e:?}"))?;

        info!(schedule, "Sweep scheduled");

        Ok(Self { scheduler })
    }

    /// Stops the schedule. A sweep already in progress is not interrupted.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler fails to shut down.
    pub async fn shutdown(mut self) -> Result<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| anyhow!("Failed to stop sweep scheduler: {e:?}"))
    }
}

/// Runs one sweep and logs the outcome.
pub async fn run_sweep(lifecycle: &LifecycleManager) {
    match lifecycle.sweep().await {
        Ok(report) => {
            for failure in &report.failures {
                warn!(%failure, "Sweep item failed");
            }
        },
        Err(e) => error!(error = %e, "Scheduled sweep failed"),
    }
}
