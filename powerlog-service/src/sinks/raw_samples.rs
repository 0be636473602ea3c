use std::sync::Arc;

use futures::StreamExt;
use powerlog_client::{domain::RawSample, Store};

use crate::{
    device::Reading,
    pipeline::{Envelope, PipelineError, Sink},
};

/// Appends exactly one raw sample per successful reading. No batching and no
/// dedup; failed items are logged and the stream keeps going. Latency is
/// measured from the moment the reading left the device.
pub struct RawSampleSink {
    store: Arc<Store>,
}

impl RawSampleSink {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    async fn append(&self, env: Envelope<Reading>) -> Result<(), PipelineError> {
        let sample = RawSample::from(env.payload);
        self.store.append_raw_sample(&sample).await?;

        let latency = env.received_at.elapsed().unwrap_or_default();
        metrics::counter!("raw_samples_appended_total").increment(1);
        metrics::histogram!("reading_store_latency_seconds").record(latency.as_secs_f64());
        tracing::debug!(
            poll_time = %sample.poll_time,
            current_a = sample.current,
            voltage_v = sample.voltage,
            power_w = sample.power,
            latency_ms = latency.as_millis() as u64,
            "raw sample stored"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl Sink<Reading> for RawSampleSink {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<Reading>, PipelineError>> + Send + Unpin + 'static,
    {
        while let Some(item) = input.next().await {
            match item {
                Ok(env) => {
                    if let Err(e) = self.append(env).await {
                        metrics::counter!("raw_sample_append_errors_total").increment(1);
                        tracing::error!(error = %e, "failed to store raw sample");
                    }
                }
                Err(PipelineError::Device(e)) => {
                    metrics::counter!("device_read_failures_total").increment(1);
                    tracing::warn!(error = %e, "device read failed, skipping cycle");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "reading dropped");
                }
            }
        }

        Ok(())
    }
}
