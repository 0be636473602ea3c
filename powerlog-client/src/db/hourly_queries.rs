use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor};
use time::Date;

use crate::{domain::HourlyBucket, error::StoreError, timefmt};

/// Keeps each statement well below SQLite's bound-parameter limit.
const MAX_BUCKETS_PER_STATEMENT: usize = 500;

/// Insert buckets, skipping any (date, hour) that already exists.
///
/// Existing buckets are never updated. Returns the number of rows written.
pub async fn insert_hourly_buckets(
    conn: &mut SqliteConnection,
    buckets: &[HourlyBucket],
) -> Result<u64, StoreError> {
    let mut written = 0;

    for chunk in buckets.chunks(MAX_BUCKETS_PER_STATEMENT) {
        let dates = chunk
            .iter()
            .map(|b| timefmt::format_date(b.date))
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = QueryBuilder::<Sqlite>::new("INSERT INTO hourly_buckets (date, hour, power) ");
        builder.push_values(chunk.iter().zip(dates), |mut b, (bucket, date)| {
            b.push_bind(date)
                .push_bind(i64::from(bucket.hour))
                .push_bind(bucket.power);
        });
        builder.push(" ON CONFLICT (date, hour) DO NOTHING");

        let result = builder.build().execute(&mut *conn).await?;
        written += result.rows_affected();
    }

    Ok(written)
}

pub async fn list_hourly_buckets<'e>(
    exec: impl SqliteExecutor<'e>,
) -> Result<Vec<HourlyBucket>, StoreError> {
    let rows = sqlx::query_as::<_, HourlyBucket>(
        r#"
        SELECT date, hour, power
        FROM hourly_buckets
        ORDER BY date, hour
        "#,
    )
    .fetch_all(exec)
    .await?;

    Ok(rows)
}

/// Dates that have at least one bucket, ascending.
pub async fn distinct_dates<'e>(exec: impl SqliteExecutor<'e>) -> Result<Vec<Date>, StoreError> {
    let rows: Vec<String> =
        sqlx::query_scalar("SELECT DISTINCT date FROM hourly_buckets ORDER BY date")
            .fetch_all(exec)
            .await?;

    rows.iter()
        .map(|s| timefmt::parse_date(s).map_err(|e| StoreError::Codec(format!("bad bucket date {s:?}: {e}"))))
        .collect()
}

pub async fn hours_for_date<'e>(
    exec: impl SqliteExecutor<'e>,
    date: Date,
) -> Result<Vec<u8>, StoreError> {
    let rows: Vec<i64> =
        sqlx::query_scalar("SELECT hour FROM hourly_buckets WHERE date = $1 ORDER BY hour")
            .bind(timefmt::format_date(date)?)
            .fetch_all(exec)
            .await?;

    rows.into_iter()
        .map(|h| u8::try_from(h).map_err(|_| StoreError::Codec(format!("bad bucket hour {h}"))))
        .collect()
}
