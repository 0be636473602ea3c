//! Periodic maintenance jobs over the hourly table.

pub mod backfill;
pub mod compaction;

use std::time::{Duration, Instant};

use powerlog_client::StoreError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub use backfill::{Backfill, BackfillOutcome};
pub use compaction::Compaction;

#[async_trait::async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run_cycle(&self) -> Result<(), StoreError>;
}

/// Run `job` immediately and then every `every` until `cancel` fires.
///
/// Cycles never overlap: a slow cycle delays the next tick instead of
/// stacking one behind it. A failed cycle is logged and the schedule goes on.
/// Cancellation is only observed between cycles.
pub async fn run_job<J: Job>(job: J, every: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(job = job.name(), interval_secs = every.as_secs(), "job started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let started = Instant::now();
        if let Err(e) = job.run_cycle().await {
            metrics::counter!("job_cycle_errors_total", "job" => job.name()).increment(1);
            tracing::error!(job = job.name(), error = %e, "job cycle failed");
        }
        metrics::histogram!("job_cycle_duration_seconds", "job" => job.name())
            .record(started.elapsed().as_secs_f64());
    }

    tracing::info!(job = job.name(), "job stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    struct Counting {
        cycles: Arc<AtomicU32>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Job for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run_cycle(&self) -> Result<(), StoreError> {
            self.cycles.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Codec("boom".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn failing_cycles_do_not_stop_the_job() {
        let cycles = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        let job = Counting { cycles: cycles.clone(), fail: true };

        let handle = tokio::spawn(run_job(job, Duration::from_millis(5), cancel.clone()));
        while cycles.load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn first_cycle_runs_at_start_and_cancel_skips_the_wait() {
        let cycles = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        let job = Counting { cycles: cycles.clone(), fail: false };

        let handle = tokio::spawn(run_job(job, Duration::from_secs(3_600), cancel.clone()));
        while cycles.load(Ordering::SeqCst) < 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert_eq!(cycles.load(Ordering::SeqCst), 1);
    }
}
