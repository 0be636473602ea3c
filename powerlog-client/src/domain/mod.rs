mod hourly_bucket;
mod price;
mod raw_sample;
mod reading;

pub use hourly_bucket::{HourlyBucket, HOURS_PER_DAY};
pub use price::PriceRecord;
pub use raw_sample::RawSample;
pub use reading::Reading;

pub(crate) fn column_decode_error<E>(column: &str, source: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}
