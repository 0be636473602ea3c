use std::{
    future::Future,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use time::{Date, OffsetDateTime};
use tokio::sync::RwLock;

use super::{hourly_queries, price_queries, raw_sample_queries, schema};
use crate::{
    domain::{HourlyBucket, PriceRecord, RawSample},
    error::StoreError,
};

/// Produces a fresh connection pool; called once on open and again on every
/// reconnect.
#[async_trait::async_trait]
pub trait Connect: Send + Sync {
    async fn connect(&self) -> Result<SqlitePool, sqlx::Error>;
}

/// Connects to a SQLite database URL such as `sqlite://powerlog.db`.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    url: String,
    max_connections: u32,
}

impl SqliteConnector {
    pub fn new(url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            url: url.into(),
            max_connections: max_connections.max(1),
        }
    }
}

#[async_trait::async_trait]
impl Connect for SqliteConnector {
    async fn connect(&self) -> Result<SqlitePool, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&self.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .connect_with(options)
            .await
    }
}

/// Result of one compaction transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionOutcome {
    /// Distinct (date, hour) groups found before the cutoff.
    pub groups: u64,
    /// Buckets actually inserted; lower than `groups` when a bucket already existed.
    pub buckets_written: u64,
    pub samples_removed: u64,
}

/// The time-series store shared by every loop and query.
///
/// Each operation runs against the current pool. When it fails with a
/// transport error the pool is replaced once through the [`Connect`]
/// implementation and the whole operation runs again; a second failure is
/// returned to the caller.
pub struct Store {
    connector: Box<dyn Connect>,
    pool: RwLock<SqlitePool>,
    reconnects: AtomicU64,
}

impl Store {
    /// Connect and make sure the schema exists.
    pub async fn open<C>(connector: C) -> Result<Self, StoreError>
    where
        C: Connect + 'static,
    {
        let pool = connector.connect().await?;
        schema::apply(&pool).await?;

        Ok(Self {
            connector: Box::new(connector),
            pool: RwLock::new(pool),
            reconnects: AtomicU64::new(0),
        })
    }

    /// Number of reconnects performed since the store was opened.
    pub fn reconnect_count(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    /// Close the current pool. Call only after every user has stopped.
    pub async fn close(&self) {
        self.pool.read().await.close().await;
    }

    async fn run<T, F, Fut>(&self, op: &'static str, f: F) -> Result<T, StoreError>
    where
        F: Fn(SqlitePool) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let pool = self.pool.read().await.clone();
        match f(pool).await {
            Err(StoreError::Transport(e)) => {
                tracing::warn!(op, error = %e, "store operation failed, reconnecting and retrying");
                let pool = self.reconnect().await?;
                let res = f(pool).await;
                if let Err(e) = &res {
                    tracing::error!(op, error = %e, "store operation failed after reconnect, giving up");
                }
                res
            }
            res => res,
        }
    }

    async fn reconnect(&self) -> Result<SqlitePool, StoreError> {
        let mut guard = self.pool.write().await;
        self.reconnects.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("store_reconnects_total").increment(1);

        let fresh = self
            .connector
            .connect()
            .await
            .map_err(StoreError::Transport)?;
        let stale = std::mem::replace(&mut *guard, fresh.clone());
        tokio::spawn(async move { stale.close().await });

        Ok(fresh)
    }

    pub async fn append_raw_sample(&self, sample: &RawSample) -> Result<(), StoreError> {
        self.run("append_raw_sample", |pool| async move {
            raw_sample_queries::insert_raw_sample(&pool, sample).await
        })
        .await
    }

    pub async fn raw_samples(
        &self,
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
    ) -> Result<Vec<RawSample>, StoreError> {
        self.run("raw_samples", |pool| async move {
            raw_sample_queries::list_raw_samples(&pool, start, end).await
        })
        .await
    }

    /// Average every raw sample before `cutoff` into hourly buckets and delete
    /// those samples, in one transaction.
    ///
    /// The transaction takes the write lock before reading, so a concurrent
    /// append waits on the busy timeout instead of invalidating the snapshot.
    ///
    /// Bucket inserts skip (date, hour) keys that already exist, so a re-run
    /// over the same samples cannot produce a second bucket.
    pub async fn compact_before(&self, cutoff: OffsetDateTime) -> Result<CompactionOutcome, StoreError> {
        self.run("compact_before", |pool| async move {
            let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

            let groups = raw_sample_queries::average_power_by_hour_before(&mut *tx, cutoff).await?;
            if groups.is_empty() {
                return Ok(CompactionOutcome::default());
            }

            let buckets_written = hourly_queries::insert_hourly_buckets(&mut tx, &groups).await?;
            let samples_removed = raw_sample_queries::delete_raw_samples_before(&mut *tx, cutoff).await?;
            tx.commit().await?;

            Ok::<_, StoreError>(CompactionOutcome {
                groups: groups.len() as u64,
                buckets_written,
                samples_removed,
            })
        })
        .await
    }

    /// Insert buckets atomically, leaving existing (date, hour) keys untouched.
    pub async fn insert_hourly_buckets(&self, buckets: &[HourlyBucket]) -> Result<u64, StoreError> {
        if buckets.is_empty() {
            return Ok(0);
        }

        self.run("insert_hourly_buckets", |pool| async move {
            let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;
            let written = hourly_queries::insert_hourly_buckets(&mut tx, buckets).await?;
            tx.commit().await?;
            Ok::<_, StoreError>(written)
        })
        .await
    }

    pub async fn hourly_buckets(&self) -> Result<Vec<HourlyBucket>, StoreError> {
        self.run("hourly_buckets", |pool| async move {
            hourly_queries::list_hourly_buckets(&pool).await
        })
        .await
    }

    pub async fn distinct_dates(&self) -> Result<Vec<Date>, StoreError> {
        self.run("distinct_dates", |pool| async move {
            hourly_queries::distinct_dates(&pool).await
        })
        .await
    }

    pub async fn hours_for_date(&self, date: Date) -> Result<Vec<u8>, StoreError> {
        self.run("hours_for_date", |pool| async move {
            hourly_queries::hours_for_date(&pool, date).await
        })
        .await
    }

    pub async fn prices(&self) -> Result<Vec<PriceRecord>, StoreError> {
        self.run("prices", |pool| async move { price_queries::list_prices(&pool).await })
            .await
    }

    pub async fn price_for_month(&self, month_start: Date) -> Result<Option<PriceRecord>, StoreError> {
        self.run("price_for_month", |pool| async move {
            price_queries::price_for_month(&pool, month_start).await
        })
        .await
    }

    pub async fn insert_price(&self, record: &PriceRecord) -> Result<(), StoreError> {
        self.run("insert_price", |pool| async move {
            price_queries::insert_price(&pool, record).await
        })
        .await
    }
}
