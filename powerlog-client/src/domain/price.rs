use sqlx::{sqlite::SqliteRow, FromRow, Row};
use time::Date;

use super::column_decode_error;
use crate::timefmt;

/// Energy price per kWh for the month starting at `month_start`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PriceRecord {
    pub month_start: Date,
    pub price: f64,
}

impl<'r> FromRow<'r, SqliteRow> for PriceRecord {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let month_start: String = row.try_get("month_start")?;
        Ok(Self {
            month_start: timefmt::parse_date(&month_start)
                .map_err(|e| column_decode_error("month_start", e))?,
            price: row.try_get("price")?,
        })
    }
}
