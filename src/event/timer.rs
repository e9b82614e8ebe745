//! Deferred jobs for event scheduling.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use tracing::debug;

/// Work to run once the scheduled time is reached
pub type Job = BoxFuture<'static, ()>;

/// Runs jobs at a future point in time.
pub trait Timer: Send + Sync {
    /// Run `job` at `at`. Times in the past run as soon as possible.
    fn schedule_at(&self, at: DateTime<Utc>, job: Job);
}

/// Timer backed by a tokio task per job. Must be used from within a runtime.
#[derive(Debug, Default, Clone)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn schedule_at(&self, at: DateTime<Utc>, job: Job) {
        let delay = (at - Utc::now()).to_std().unwrap_or_default();
        debug!("Scheduling job for {} (in {:?})", at, delay);

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            job.await;
        });
    }
}
