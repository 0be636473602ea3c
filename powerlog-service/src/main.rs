use anyhow::Result;
use powerlog_client::Store;
use powerlog_service::{
    config::AppConfig,
    device::{DeviceReader, Reading, TuyaHttpReader},
    jobs::{self, Backfill, Compaction},
    metrics_server, observability,
    pipeline::Pipeline,
    sinks::RawSampleSink,
    sources::DevicePollSource,
    transform,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let store = Arc::new(Store::open(cfg.store.connector()).await?);
    let reader: Arc<dyn DeviceReader> = Arc::new(TuyaHttpReader::new(
        cfg.device.status_url.clone(),
        cfg.device.auth_bearer_token.clone(),
        cfg.device.timeout(),
    )?);

    let cancel = CancellationToken::new();

    let sampling: Pipeline<_, Reading, _> = Pipeline {
        source: DevicePollSource::new(reader, cfg.sampling.interval(), cancel.clone()),
        transforms: vec![Arc::new(transform::ReadingValidation)],
        sink: RawSampleSink::new(store.clone()),
    };
    let sampling = tokio::spawn(sampling.run());
    let compaction = tokio::spawn(jobs::run_job(
        Compaction::new(store.clone()),
        cfg.compaction.interval(),
        cancel.clone(),
    ));
    let backfill = tokio::spawn(jobs::run_job(
        Backfill::new(store.clone()),
        cfg.backfill.interval(),
        cancel.clone(),
    ));

    tracing::info!("powerlog running; press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    cancel.cancel();

    let (sampling, compaction, backfill) = tokio::join!(sampling, compaction, backfill);
    sampling??;
    compaction?;
    backfill?;

    store.close().await;
    tracing::info!("powerlog stopped");
    Ok(())
}
