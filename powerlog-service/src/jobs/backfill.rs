use std::sync::Arc;

use powerlog_client::{
    domain::{HourlyBucket, HOURS_PER_DAY},
    Store, StoreError,
};

use super::Job;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillOutcome {
    pub dates_scanned: usize,
    pub dates_filled: usize,
    pub buckets_inserted: u64,
}

/// Zero-fills the missing hours of every elapsed day in the hourly table.
pub struct Backfill {
    store: Arc<Store>,
}

/// Hours of the day not listed in `present`, ascending.
pub fn missing_hours(present: &[u8]) -> Vec<u8> {
    (0..HOURS_PER_DAY).filter(|h| !present.contains(h)).collect()
}

impl Backfill {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// The latest date in the table may still be filling up and is left alone.
    pub async fn backfill(&self) -> Result<BackfillOutcome, StoreError> {
        let dates = self.store.distinct_dates().await?;
        let mut outcome = BackfillOutcome::default();

        let Some((latest, elapsed)) = dates.split_last() else {
            return Ok(outcome);
        };
        tracing::debug!(%latest, elapsed = elapsed.len(), "backfill scanning elapsed dates");

        for &date in elapsed {
            outcome.dates_scanned += 1;

            let present = self.store.hours_for_date(date).await?;
            if present.len() == usize::from(HOURS_PER_DAY) {
                continue;
            }

            let buckets: Vec<HourlyBucket> = missing_hours(&present)
                .into_iter()
                .map(|hour| HourlyBucket::zero(date, hour))
                .collect();
            let inserted = self.store.insert_hourly_buckets(&buckets).await?;

            outcome.dates_filled += 1;
            outcome.buckets_inserted += inserted;
            tracing::info!(%date, missing = buckets.len(), inserted, "zero-filled missing hours");
        }

        metrics::counter!("hourly_buckets_backfilled_total").increment(outcome.buckets_inserted);
        Ok(outcome)
    }
}

#[async_trait::async_trait]
impl Job for Backfill {
    fn name(&self) -> &'static str {
        "backfill"
    }

    async fn run_cycle(&self) -> Result<(), StoreError> {
        self.backfill().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_hours_is_the_complement_of_present() {
        let missing = missing_hours(&[0, 3, 7]);
        assert_eq!(missing.len(), 21);
        assert_eq!(&missing[..4], &[1, 2, 4, 5]);
        assert_eq!(missing.last(), Some(&23));

        assert!(missing_hours(&(0..24).collect::<Vec<u8>>()).is_empty());
        assert_eq!(missing_hours(&[]).len(), 24);
    }
}
