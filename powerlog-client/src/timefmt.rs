//! Text encodings used by the store, plus calendar helpers.
//!
//! Timestamps are persisted as UTC `YYYY-MM-DD HH:MM:SS` and dates as
//! `YYYY-MM-DD`, which keeps SQLite's `date()`/`strftime()` usable and makes
//! lexical comparison equal to chronological comparison.

use time::{macros::format_description, Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

pub fn format_timestamp(ts: OffsetDateTime) -> Result<String, time::error::Format> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    ts.to_offset(UtcOffset::UTC).format(&format)
}

pub fn parse_timestamp(s: &str) -> Result<OffsetDateTime, time::error::Parse> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    PrimitiveDateTime::parse(s, &format).map(PrimitiveDateTime::assume_utc)
}

pub fn format_date(date: Date) -> Result<String, time::error::Format> {
    let format = format_description!("[year]-[month]-[day]");
    date.format(&format)
}

pub fn parse_date(s: &str) -> Result<Date, time::error::Parse> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(s, &format)
}

/// Start of the UTC hour containing `ts`.
pub fn hour_floor(ts: OffsetDateTime) -> OffsetDateTime {
    let ts = ts.to_offset(UtcOffset::UTC);
    ts.replace_time(Time::MIDNIGHT + Duration::hours(i64::from(ts.hour())))
}

/// Drops sub-second precision.
pub fn truncate_to_second(ts: OffsetDateTime) -> OffsetDateTime {
    ts - Duration::nanoseconds(i64::from(ts.nanosecond()))
}

/// First day of the month containing `date`.
pub fn month_start(date: Date) -> Date {
    date - Duration::days(i64::from(date.day()) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn timestamp_text_is_second_precision_utc() {
        let ts = datetime!(2024-03-05 07:08:09.750 +02:00);
        let text = format_timestamp(truncate_to_second(ts)).unwrap();
        assert_eq!(text, "2024-03-05 05:08:09");
        assert_eq!(parse_timestamp(&text).unwrap(), datetime!(2024-03-05 05:08:09 UTC));
    }

    #[test]
    fn hour_floor_keeps_exact_boundaries() {
        assert_eq!(
            hour_floor(datetime!(2024-01-01 10:59:59.999 UTC)),
            datetime!(2024-01-01 10:00:00 UTC)
        );
        assert_eq!(
            hour_floor(datetime!(2024-01-01 11:00:00 UTC)),
            datetime!(2024-01-01 11:00:00 UTC)
        );
    }

    #[test]
    fn month_start_handles_last_day() {
        assert_eq!(month_start(date!(2024-02-29)), date!(2024-02-01));
        assert_eq!(month_start(date!(2024-12-01)), date!(2024-12-01));
        assert_eq!(parse_date("2024-12-01").unwrap(), date!(2024-12-01));
        assert_eq!(format_date(date!(2024-01-09)).unwrap(), "2024-01-09");
    }
}
