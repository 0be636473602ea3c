use sqlx::{sqlite::SqliteRow, FromRow, Row};
use time::OffsetDateTime;

use super::{column_decode_error, Reading};
use crate::timefmt;

/// One instantaneous meter reading as persisted in `raw_samples`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawSample {
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub poll_time: OffsetDateTime,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
}

impl From<Reading> for RawSample {
    fn from(r: Reading) -> Self {
        RawSample {
            poll_time: timefmt::truncate_to_second(r.poll_time),
            voltage: r.voltage,
            current: r.current,
            power: r.power,
        }
    }
}

impl<'r> FromRow<'r, SqliteRow> for RawSample {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let poll_time: String = row.try_get("poll_time")?;
        Ok(Self {
            poll_time: timefmt::parse_timestamp(&poll_time)
                .map_err(|e| column_decode_error("poll_time", e))?,
            voltage: row.try_get("voltage")?,
            current: row.try_get("current")?,
            power: row.try_get("power")?,
        })
    }
}
