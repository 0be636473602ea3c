//! Energy and cost rollups over the hourly table.
//!
//! Energy for a day is the mean hourly power times 24 h; for a month it is
//! the mean hourly power times 24 h times the number of days in that month,
//! whether or not every day has data. Years sum their months. Everything is
//! computed at full precision and rounded to two decimals on output only.

mod service;

use std::collections::BTreeMap;

use powerlog_client::{
    domain::{HourlyBucket, PriceRecord},
    timefmt, StoreError,
};
use serde::Serialize;
use time::Date;

pub use service::QueryService;

#[derive(thiserror::Error, Debug)]
pub enum RollupError {
    #[error("no price recorded for the month starting {0}")]
    MissingPriceData(Date),
    #[error("calendar error: {0}")]
    Calendar(#[from] time::error::ComponentRange),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Energy (kWh) and cost for a day, month or year, labelled by its first date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyCost {
    pub date: Date,
    pub energy_kwh: f64,
    pub cost: f64,
}

/// One hour's average power (W) and the cost of drawing it for that hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyEnergyCost {
    pub date: Date,
    pub hour: String,
    pub energy_w: f64,
    pub cost: f64,
}

/// Monthly prices keyed by month start.
#[derive(Debug, Clone, Default)]
pub struct PriceTable(BTreeMap<Date, f64>);

impl PriceTable {
    pub fn from_records(records: &[PriceRecord]) -> Self {
        Self(records.iter().map(|r| (r.month_start, r.price)).collect())
    }

    pub fn for_month(&self, month_start: Date) -> Result<f64, RollupError> {
        self.0
            .get(&month_start)
            .copied()
            .ok_or(RollupError::MissingPriceData(month_start))
    }

    pub fn for_date(&self, date: Date) -> Result<f64, RollupError> {
        self.for_month(timefmt::month_start(date))
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean_power_by<K: Ord>(
    buckets: &[HourlyBucket],
    key: impl Fn(&HourlyBucket) -> K,
) -> BTreeMap<K, f64> {
    let mut sums: BTreeMap<K, (f64, u32)> = BTreeMap::new();
    for bucket in buckets {
        let entry = sums.entry(key(bucket)).or_insert((0.0, 0));
        entry.0 += bucket.power;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(k, (sum, count))| (k, sum / f64::from(count)))
        .collect()
}

pub fn hourly_rollup(
    buckets: &[HourlyBucket],
    prices: &PriceTable,
) -> Result<Vec<HourlyEnergyCost>, RollupError> {
    let mut out = Vec::with_capacity(buckets.len());
    for bucket in buckets {
        let price = prices.for_date(bucket.date)?;
        out.push(HourlyEnergyCost {
            date: bucket.date,
            hour: bucket.hour_label(),
            energy_w: round2(bucket.power),
            cost: round2(bucket.power * price / 1000.0),
        });
    }
    out.sort_by(|a, b| (a.date, &a.hour).cmp(&(b.date, &b.hour)));
    Ok(out)
}

pub fn daily_rollup(
    buckets: &[HourlyBucket],
    prices: &PriceTable,
) -> Result<Vec<EnergyCost>, RollupError> {
    mean_power_by(buckets, |b| b.date)
        .into_iter()
        .map(|(date, mean_w)| {
            let energy_kwh = mean_w / 1000.0 * 24.0;
            let price = prices.for_date(date)?;
            Ok(EnergyCost {
                date,
                energy_kwh: round2(energy_kwh),
                cost: round2(energy_kwh * price),
            })
        })
        .collect()
}

/// Unrounded monthly energy and cost, ascending by month.
fn monthly_totals(
    buckets: &[HourlyBucket],
    prices: &PriceTable,
) -> Result<Vec<EnergyCost>, RollupError> {
    mean_power_by(buckets, |b| timefmt::month_start(b.date))
        .into_iter()
        .map(|(month_start, mean_w)| {
            let days = time::util::days_in_year_month(month_start.year(), month_start.month());
            let energy_kwh = mean_w / 1000.0 * 24.0 * f64::from(days);
            let price = prices.for_month(month_start)?;
            Ok(EnergyCost {
                date: month_start,
                energy_kwh,
                cost: energy_kwh * price,
            })
        })
        .collect()
}

pub fn monthly_rollup(
    buckets: &[HourlyBucket],
    prices: &PriceTable,
) -> Result<Vec<EnergyCost>, RollupError> {
    let months = monthly_totals(buckets, prices)?;
    Ok(months
        .into_iter()
        .map(|m| EnergyCost {
            date: m.date,
            energy_kwh: round2(m.energy_kwh),
            cost: round2(m.cost),
        })
        .collect())
}

pub fn yearly_rollup(
    buckets: &[HourlyBucket],
    prices: &PriceTable,
) -> Result<Vec<EnergyCost>, RollupError> {
    let mut years: BTreeMap<i32, (f64, f64)> = BTreeMap::new();
    for month in monthly_totals(buckets, prices)? {
        let entry = years.entry(month.date.year()).or_insert((0.0, 0.0));
        entry.0 += month.energy_kwh;
        entry.1 += month.cost;
    }

    years
        .into_iter()
        .map(|(year, (energy_kwh, cost))| {
            Ok(EnergyCost {
                date: Date::from_ordinal_date(year, 1)?,
                energy_kwh: round2(energy_kwh),
                cost: round2(cost),
            })
        })
        .collect()
}
