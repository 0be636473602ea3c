use sqlx::{sqlite::SqliteRow, FromRow, Row};
use time::Date;

use super::column_decode_error;
use crate::timefmt;

pub const HOURS_PER_DAY: u8 = 24;

/// Write-once average power for one UTC hour of one date.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HourlyBucket {
    pub date: Date,
    pub hour: u8,
    pub power: f64,
}

impl HourlyBucket {
    /// Placeholder for an hour without any real samples.
    pub fn zero(date: Date, hour: u8) -> Self {
        Self {
            date,
            hour,
            power: 0.0,
        }
    }

    /// Two-digit hour label, `"00"` through `"23"`.
    pub fn hour_label(&self) -> String {
        format!("{:02}", self.hour)
    }
}

impl<'r> FromRow<'r, SqliteRow> for HourlyBucket {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let date: String = row.try_get("date")?;
        let hour: i64 = row.try_get("hour")?;
        Ok(Self {
            date: timefmt::parse_date(&date).map_err(|e| column_decode_error("date", e))?,
            hour: u8::try_from(hour).map_err(|e| column_decode_error("hour", e))?,
            power: row.try_get("power")?,
        })
    }
}
