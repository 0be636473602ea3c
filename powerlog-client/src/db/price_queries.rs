use sqlx::SqliteExecutor;
use time::Date;

use crate::{domain::PriceRecord, error::StoreError, timefmt};

pub async fn list_prices<'e>(exec: impl SqliteExecutor<'e>) -> Result<Vec<PriceRecord>, StoreError> {
    let rows = sqlx::query_as::<_, PriceRecord>(
        "SELECT month_start, price FROM prices ORDER BY month_start",
    )
    .fetch_all(exec)
    .await?;

    Ok(rows)
}

pub async fn price_for_month<'e>(
    exec: impl SqliteExecutor<'e>,
    month_start: Date,
) -> Result<Option<PriceRecord>, StoreError> {
    let row = sqlx::query_as::<_, PriceRecord>(
        "SELECT month_start, price FROM prices WHERE month_start = $1",
    )
    .bind(timefmt::format_date(month_start)?)
    .fetch_optional(exec)
    .await?;

    Ok(row)
}

/// Plain insert: a second price for the same month is a
/// [`StoreError::DataIntegrity`].
pub async fn insert_price<'e>(
    exec: impl SqliteExecutor<'e>,
    record: &PriceRecord,
) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO prices (month_start, price) VALUES ($1, $2)")
        .bind(timefmt::format_date(record.month_start)?)
        .bind(record.price)
        .execute(exec)
        .await?;

    Ok(())
}
