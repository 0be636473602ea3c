use time::OffsetDateTime;

/// An instantaneous device reading. Never persisted directly; the sampling
/// loop turns it into a [`RawSample`](super::RawSample).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub poll_time: OffsetDateTime,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
}
