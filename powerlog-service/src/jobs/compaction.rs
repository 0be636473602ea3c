use std::sync::Arc;

use powerlog_client::{timefmt, CompactionOutcome, Store, StoreError};
use time::OffsetDateTime;

use super::Job;

/// Folds raw samples from finished hours into hourly buckets.
pub struct Compaction {
    store: Arc<Store>,
}

impl Compaction {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Compact every raw sample strictly before the start of the hour
    /// containing `now`. A sample exactly on the boundary waits for the next
    /// hour's pass.
    pub async fn compact(&self, now: OffsetDateTime) -> Result<CompactionOutcome, StoreError> {
        let cutoff = timefmt::hour_floor(now);
        let outcome = self.store.compact_before(cutoff).await?;

        if outcome.groups == 0 {
            tracing::debug!(%cutoff, "no raw samples to compact");
            return Ok(outcome);
        }

        metrics::counter!("hourly_buckets_compacted_total").increment(outcome.buckets_written);
        metrics::counter!("raw_samples_compacted_total").increment(outcome.samples_removed);
        tracing::info!(
            %cutoff,
            groups = outcome.groups,
            buckets_written = outcome.buckets_written,
            samples_removed = outcome.samples_removed,
            "raw samples compacted into hourly buckets"
        );
        if outcome.buckets_written < outcome.groups {
            tracing::warn!(
                skipped = outcome.groups - outcome.buckets_written,
                "hours already had a bucket; kept the existing ones"
            );
        }

        Ok(outcome)
    }
}

#[async_trait::async_trait]
impl Job for Compaction {
    fn name(&self) -> &'static str {
        "compaction"
    }

    async fn run_cycle(&self) -> Result<(), StoreError> {
        self.compact(OffsetDateTime::now_utc()).await.map(|_| ())
    }
}
