use std::{pin::Pin, sync::Arc, time::Duration};

use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::{
    device::{DeviceReader, Reading},
    pipeline::{Envelope, PipelineError, Source},
};

/// Emits one item per polling interval: the reading, or the device failure.
///
/// Each cycle sleeps first and then reads. The stream ends when the token is
/// cancelled; a read already in flight completes first.
pub struct DevicePollSource {
    reader: Arc<dyn DeviceReader>,
    interval: Duration,
    cancel: CancellationToken,
}

impl DevicePollSource {
    pub fn new(reader: Arc<dyn DeviceReader>, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            reader,
            interval,
            cancel,
        }
    }
}

#[async_trait::async_trait]
impl Source<Reading> for DevicePollSource {
    async fn stream(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<Envelope<Reading>, PipelineError>> + Send>> {
        let reader = self.reader.clone();
        let interval = self.interval;
        let cancel = self.cancel.clone();

        let s = async_stream::stream! {
            tracing::info!(interval_secs = interval.as_secs(), "device polling started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }

                match reader.read().await {
                    Ok(reading) => yield Ok(Envelope::now(reading)),
                    Err(e) => yield Err(PipelineError::Device(e)),
                }
            }
            tracing::info!("device polling stopped");
        };

        Box::pin(s)
    }
}
