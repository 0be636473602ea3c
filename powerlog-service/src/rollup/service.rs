use std::sync::Arc;

use powerlog_client::{
    domain::{HourlyBucket, PriceRecord, RawSample},
    timefmt, Store, StoreError,
};
use time::{Date, OffsetDateTime};

use super::{
    daily_rollup, hourly_rollup, monthly_rollup, yearly_rollup, EnergyCost, HourlyEnergyCost,
    PriceTable, RollupError,
};
use crate::device::{DeviceError, DeviceReader, Reading};

/// Read side of the system: raw history, rollups, prices and a live reading.
pub struct QueryService {
    store: Arc<Store>,
    device: Arc<dyn DeviceReader>,
}

impl QueryService {
    pub fn new(store: Arc<Store>, device: Arc<dyn DeviceReader>) -> Self {
        Self { store, device }
    }

    /// Raw samples in `[start, end]`, either bound optional.
    pub async fn raw_samples(
        &self,
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
    ) -> Result<Vec<RawSample>, StoreError> {
        self.store.raw_samples(start, end).await
    }

    pub async fn hourly(&self) -> Result<Vec<HourlyEnergyCost>, RollupError> {
        let (buckets, prices) = self.load().await?;
        hourly_rollup(&buckets, &prices)
    }

    pub async fn daily(&self) -> Result<Vec<EnergyCost>, RollupError> {
        let (buckets, prices) = self.load().await?;
        daily_rollup(&buckets, &prices)
    }

    pub async fn monthly(&self) -> Result<Vec<EnergyCost>, RollupError> {
        let (buckets, prices) = self.load().await?;
        monthly_rollup(&buckets, &prices)
    }

    pub async fn yearly(&self) -> Result<Vec<EnergyCost>, RollupError> {
        let (buckets, prices) = self.load().await?;
        yearly_rollup(&buckets, &prices)
    }

    /// Fresh reading straight from the device; nothing is stored.
    pub async fn current_reading(&self) -> Result<Reading, DeviceError> {
        self.device.read().await
    }

    pub async fn prices(&self) -> Result<Vec<PriceRecord>, StoreError> {
        self.store.prices().await
    }

    /// Price of the month containing `date`.
    pub async fn price_for_day(&self, date: Date) -> Result<Option<PriceRecord>, StoreError> {
        self.store.price_for_month(timefmt::month_start(date)).await
    }

    async fn load(&self) -> Result<(Vec<HourlyBucket>, PriceTable), StoreError> {
        let buckets = self.store.hourly_buckets().await?;
        let prices = self.store.prices().await?;
        Ok((buckets, PriceTable::from_records(&prices)))
    }
}
