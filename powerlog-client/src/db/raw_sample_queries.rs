use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};
use time::OffsetDateTime;

use crate::{
    domain::{HourlyBucket, RawSample},
    error::StoreError,
    timefmt,
};

pub async fn insert_raw_sample<'e>(
    exec: impl SqliteExecutor<'e>,
    sample: &RawSample,
) -> Result<(), StoreError> {
    let poll_time = timefmt::format_timestamp(sample.poll_time)?;
    sqlx::query(
        r#"
        INSERT INTO raw_samples (poll_time, voltage, current, power)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(poll_time)
    .bind(sample.voltage)
    .bind(sample.current)
    .bind(sample.power)
    .execute(exec)
    .await?;

    Ok(())
}

/// Raw samples with `start <= poll_time <= end`, either bound optional.
pub async fn list_raw_samples<'e>(
    exec: impl SqliteExecutor<'e>,
    start: Option<OffsetDateTime>,
    end: Option<OffsetDateTime>,
) -> Result<Vec<RawSample>, StoreError> {
    let mut builder =
        QueryBuilder::<Sqlite>::new("SELECT poll_time, voltage, current, power FROM raw_samples");

    let mut keyword = " WHERE ";
    if let Some(start) = start {
        builder.push(keyword).push("poll_time >= ");
        builder.push_bind(timefmt::format_timestamp(start)?);
        keyword = " AND ";
    }
    if let Some(end) = end {
        builder.push(keyword).push("poll_time <= ");
        builder.push_bind(timefmt::format_timestamp(end)?);
    }
    builder.push(" ORDER BY poll_time, id");

    let rows = builder.build_query_as::<RawSample>().fetch_all(exec).await?;
    Ok(rows)
}

/// Average power of all raw samples strictly before `cutoff`, one row per
/// (date, hour) of `poll_time`.
pub async fn average_power_by_hour_before<'e>(
    exec: impl SqliteExecutor<'e>,
    cutoff: OffsetDateTime,
) -> Result<Vec<HourlyBucket>, StoreError> {
    let rows = sqlx::query_as::<_, HourlyBucket>(
        r#"
        SELECT
            date(poll_time)                            AS date,
            CAST(strftime('%H', poll_time) AS INTEGER) AS hour,
            AVG(power)                                 AS power
        FROM raw_samples
        WHERE poll_time < $1
        GROUP BY date(poll_time), strftime('%H', poll_time)
        ORDER BY date, hour
        "#,
    )
    .bind(timefmt::format_timestamp(cutoff)?)
    .fetch_all(exec)
    .await?;

    Ok(rows)
}

pub async fn delete_raw_samples_before<'e>(
    exec: impl SqliteExecutor<'e>,
    cutoff: OffsetDateTime,
) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM raw_samples WHERE poll_time < $1")
        .bind(timefmt::format_timestamp(cutoff)?)
        .execute(exec)
        .await?;

    Ok(result.rows_affected())
}
