use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use powerlog_client::{
    domain::{HourlyBucket, PriceRecord, RawSample, Reading},
    SqliteConnector, Store,
};
use powerlog_service::{
    device::{DeviceError, DeviceReader},
    jobs::{Backfill, Compaction},
    pipeline::Pipeline,
    rollup::RollupError,
    sinks::RawSampleSink,
    sources::DevicePollSource,
    transform::ReadingValidation,
    QueryService,
};
use tempfile::TempDir;
use time::{
    macros::{date, datetime},
    OffsetDateTime,
};
use tokio_util::sync::CancellationToken;

async fn open_store() -> (TempDir, Arc<Store>) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("powerlog.db").display());
    let store = Store::open(SqliteConnector::new(url, 2)).await.unwrap();
    (dir, Arc::new(store))
}

fn reading(poll_time: OffsetDateTime, power: f64) -> Reading {
    Reading {
        poll_time,
        voltage: 230.0,
        current: power / 230.0,
        power,
    }
}

async fn append(store: &Store, poll_time: OffsetDateTime, power: f64) {
    store
        .append_raw_sample(&RawSample::from(reading(poll_time, power)))
        .await
        .unwrap();
}

/// Replays a fixed list of results, then reports the device as gone.
struct Scripted {
    script: Mutex<VecDeque<Result<Reading, DeviceError>>>,
}

impl Scripted {
    fn new(script: Vec<Result<Reading, DeviceError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

#[async_trait::async_trait]
impl DeviceReader for Scripted {
    async fn read(&self) -> Result<Reading, DeviceError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DeviceError::Unavailable("unplugged".to_string())))
    }
}

#[tokio::test]
async fn sampling_stores_valid_readings_and_keeps_going_after_failures() {
    let (_dir, store) = open_store().await;
    let reader = Arc::new(Scripted::new(vec![
        Ok(reading(datetime!(2024-01-01 10:00:00 UTC), 100.0)),
        Err(DeviceError::Unavailable("timeout".to_string())),
        Err(DeviceError::Malformed("missing dps".to_string())),
        Ok(reading(datetime!(2024-01-01 10:02:00 UTC), -5.0)),
        Ok(reading(datetime!(2024-01-01 10:03:00.400 UTC), 300.0)),
    ]));

    let cancel = CancellationToken::new();
    let pipeline: Pipeline<_, Reading, _> = Pipeline {
        source: DevicePollSource::new(reader, Duration::from_millis(2), cancel.clone()),
        transforms: vec![Arc::new(ReadingValidation)],
        sink: RawSampleSink::new(store.clone()),
    };
    let handle = tokio::spawn(pipeline.run());

    let stored = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let samples = store.raw_samples(None, None).await.unwrap();
            if samples.len() >= 2 {
                return samples;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    cancel.cancel();
    handle.await.unwrap().unwrap();

    let powers: Vec<f64> = stored.iter().map(|s| s.power).collect();
    assert_eq!(powers, vec![100.0, 300.0]);
    assert_eq!(stored[1].poll_time, datetime!(2024-01-01 10:03:00 UTC));
}

#[tokio::test]
async fn boundary_sample_waits_for_the_next_hourly_pass() {
    let (_dir, store) = open_store().await;
    append(&store, datetime!(2024-01-01 09:10:00 UTC), 120.0).await;
    append(&store, datetime!(2024-01-01 09:50:00 UTC), 80.0).await;
    append(&store, datetime!(2024-01-01 10:00:00 UTC), 500.0).await;

    let compaction = Compaction::new(store.clone());
    let now = datetime!(2024-01-01 10:00:00 UTC);

    let first = compaction.compact(now).await.unwrap();
    assert_eq!(first.buckets_written, 1);
    assert_eq!(first.samples_removed, 2);

    let second = compaction.compact(now).await.unwrap();
    assert_eq!(second.groups, 0);

    assert_eq!(
        store.hourly_buckets().await.unwrap(),
        vec![HourlyBucket { date: date!(2024-01-01), hour: 9, power: 100.0 }]
    );
    let left = store.raw_samples(None, None).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].poll_time, now);

    let next_hour = compaction.compact(datetime!(2024-01-01 11:00:00 UTC)).await.unwrap();
    assert_eq!(next_hour.buckets_written, 1);
    assert_eq!(next_hour.samples_removed, 1);
    assert_eq!(
        store.hourly_buckets().await.unwrap(),
        vec![
            HourlyBucket { date: date!(2024-01-01), hour: 9, power: 100.0 },
            HourlyBucket { date: date!(2024-01-01), hour: 10, power: 500.0 },
        ]
    );
    assert!(store.raw_samples(None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn backfill_completes_elapsed_days_without_touching_real_buckets() {
    let (_dir, store) = open_store().await;
    append(&store, datetime!(2024-01-01 00:30:00 UTC), 10.0).await;
    append(&store, datetime!(2024-01-01 03:30:00 UTC), 30.0).await;
    append(&store, datetime!(2024-01-01 07:30:00 UTC), 70.0).await;
    append(&store, datetime!(2024-01-02 00:30:00 UTC), 5.0).await;

    Compaction::new(store.clone())
        .compact(datetime!(2024-01-02 01:15:00 UTC))
        .await
        .unwrap();

    let backfill = Backfill::new(store.clone());
    let outcome = backfill.backfill().await.unwrap();
    assert_eq!(outcome.dates_scanned, 1);
    assert_eq!(outcome.dates_filled, 1);
    assert_eq!(outcome.buckets_inserted, 21);

    let hours = store.hours_for_date(date!(2024-01-01)).await.unwrap();
    assert_eq!(hours, (0..24).collect::<Vec<u8>>());
    assert_eq!(store.hours_for_date(date!(2024-01-02)).await.unwrap(), vec![0]);

    let day_one: Vec<HourlyBucket> = store
        .hourly_buckets()
        .await
        .unwrap()
        .into_iter()
        .filter(|b| b.date == date!(2024-01-01))
        .collect();
    assert_eq!(day_one[3].power, 30.0);
    assert_eq!(day_one[7].power, 70.0);
    assert_eq!(day_one.iter().filter(|b| b.power == 0.0).count(), 21);

    let again = backfill.backfill().await.unwrap();
    assert_eq!(again.buckets_inserted, 0);
    assert_eq!(again.dates_filled, 0);
}

#[tokio::test]
async fn late_sample_for_a_zero_filled_hour_does_not_double_count() {
    let (_dir, store) = open_store().await;
    store
        .insert_hourly_buckets(&[
            HourlyBucket::zero(date!(2024-01-01), 5),
            HourlyBucket::zero(date!(2024-01-02), 0),
        ])
        .await
        .unwrap();
    append(&store, datetime!(2024-01-01 05:20:00 UTC), 400.0).await;

    let outcome = Compaction::new(store.clone())
        .compact(datetime!(2024-01-02 00:10:00 UTC))
        .await
        .unwrap();
    assert_eq!(outcome.groups, 1);
    assert_eq!(outcome.buckets_written, 0);

    let buckets = store.hourly_buckets().await.unwrap();
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].power, 0.0);
    assert!(store.raw_samples(None, None).await.unwrap().is_empty());
}

struct FixedReader;

#[async_trait::async_trait]
impl DeviceReader for FixedReader {
    async fn read(&self) -> Result<Reading, DeviceError> {
        Ok(reading(datetime!(2024-05-01 12:00:00 UTC), 42.0))
    }
}

#[tokio::test]
async fn query_service_rolls_up_stored_hours_with_monthly_prices() {
    let (_dir, store) = open_store().await;
    let buckets: Vec<HourlyBucket> = [date!(2024-01-01), date!(2024-01-02), date!(2024-01-03)]
        .into_iter()
        .flat_map(|date| (0..24).map(move |hour| HourlyBucket { date, hour, power: 1000.0 }))
        .collect();
    store.insert_hourly_buckets(&buckets).await.unwrap();
    store
        .insert_price(&PriceRecord { month_start: date!(2024-01-01), price: 0.30 })
        .await
        .unwrap();

    let queries = QueryService::new(store.clone(), Arc::new(FixedReader));

    let daily = queries.daily().await.unwrap();
    assert_eq!(daily.len(), 3);
    assert!(daily.iter().all(|d| d.energy_kwh == 24.0 && d.cost == 7.2));

    let monthly = queries.monthly().await.unwrap();
    assert_eq!(monthly.len(), 1);
    assert_eq!(monthly[0].energy_kwh, 744.0);
    assert_eq!(monthly[0].cost, 223.2);

    assert_eq!(queries.yearly().await.unwrap(), monthly);
    assert_eq!(queries.hourly().await.unwrap().len(), 72);

    let jan = queries.price_for_day(date!(2024-01-17)).await.unwrap();
    assert_eq!(jan.map(|p| p.price), Some(0.30));
    assert!(queries.price_for_day(date!(2024-02-17)).await.unwrap().is_none());
    assert_eq!(queries.prices().await.unwrap().len(), 1);

    assert_eq!(queries.current_reading().await.unwrap().power, 42.0);

    store
        .insert_hourly_buckets(&[HourlyBucket::zero(date!(2024-02-01), 0)])
        .await
        .unwrap();
    let err = queries.daily().await.unwrap_err();
    assert!(matches!(err, RollupError::MissingPriceData(month) if month == date!(2024-02-01)));
}
