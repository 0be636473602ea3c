use crate::device::Reading;
use crate::pipeline::{Envelope, PipelineError, Transform};
use time::macros::datetime;

/// Pure validation of a device `Reading`.
///
/// Rules:
/// - voltage, current and power must be finite and non-negative.
/// - poll_time must be within [2000-01-01, 2100-01-01).
pub fn validate_reading(env: Envelope<Reading>) -> Result<Envelope<Reading>, PipelineError> {
    let r = &env.payload;

    for (name, value) in [("voltage", r.voltage), ("current", r.current), ("power", r.power)] {
        if !value.is_finite() || value < 0.0 {
            return Err(PipelineError::Rejected(format!("{name} must be finite and non-negative, got {value}")));
        }
    }

    let min_ts = datetime!(2000-01-01 00:00:00 UTC);
    let max_ts = datetime!(2100-01-01 00:00:00 UTC);

    if r.poll_time < min_ts || r.poll_time >= max_ts {
        return Err(PipelineError::Rejected("poll_time out of allowed range".to_string()));
    }

    Ok(env)
}

#[derive(Clone, Default)]
pub struct ReadingValidation;

#[async_trait::async_trait]
impl Transform<Reading, Reading> for ReadingValidation {
    async fn apply(&self, input: Envelope<Reading>) -> Result<Envelope<Reading>, PipelineError> {
        validate_reading(input).inspect_err(|_| {
            metrics::counter!("readings_rejected_total").increment(1);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn reading(poll_time: OffsetDateTime, power: f64) -> Envelope<Reading> {
        Envelope::now(Reading {
            poll_time,
            voltage: 231.4,
            current: power / 231.4,
            power,
        })
    }

    #[test]
    fn accepts_plausible_reading_including_zero_power() {
        assert!(validate_reading(reading(datetime!(2024-01-01 00:00:00 UTC), 120.5)).is_ok());
        assert!(validate_reading(reading(datetime!(2024-01-01 00:00:00 UTC), 0.0)).is_ok());
    }

    #[test]
    fn rejects_negative_or_nan_values() {
        let res = validate_reading(reading(datetime!(2024-01-01 00:00:00 UTC), -1.0));
        assert!(matches!(res, Err(PipelineError::Rejected(_))));

        let mut env = reading(datetime!(2024-01-01 00:00:00 UTC), 10.0);
        env.payload.voltage = f64::NAN;
        assert!(matches!(validate_reading(env), Err(PipelineError::Rejected(_))));
    }

    #[test]
    fn rejects_out_of_range_timestamp() {
        let res = validate_reading(reading(datetime!(1970-01-01 00:00:00 UTC), 1.0));
        assert!(matches!(res, Err(PipelineError::Rejected(_))));

        let res = validate_reading(reading(datetime!(2100-01-01 00:00:00 UTC), 1.0));
        assert!(matches!(res, Err(PipelineError::Rejected(_))));
    }
}
