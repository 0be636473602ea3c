//! Access to the single metered device.

pub mod tuya_http;

pub use powerlog_client::domain::Reading;
pub use tuya_http::TuyaHttpReader;

#[derive(thiserror::Error, Debug)]
pub enum DeviceError {
    #[error("device unavailable: {0}")]
    Unavailable(String),
    #[error("malformed device payload: {0}")]
    Malformed(String),
}

/// Reads the meter once. Implementations never retry; the caller's polling
/// interval is the retry.
#[async_trait::async_trait]
pub trait DeviceReader: Send + Sync {
    async fn read(&self) -> Result<Reading, DeviceError>;
}
