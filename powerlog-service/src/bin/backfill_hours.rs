use anyhow::Result;
use powerlog_client::Store;
use powerlog_service::{
    config::AppConfig,
    jobs::{Backfill, Compaction},
    observability,
};
use std::sync::Arc;
use time::OffsetDateTime;

/// One compaction pass followed by one zero-fill pass, then exit.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // POWERLOG_CONFIG may point at a maintenance-specific file.
    let cfg = AppConfig::load()?;
    let store = Arc::new(Store::open(cfg.store.connector()).await?);

    let compacted = Compaction::new(store.clone()).compact(OffsetDateTime::now_utc()).await?;
    let filled = Backfill::new(store.clone()).backfill().await?;

    tracing::info!(
        hours_compacted = compacted.buckets_written,
        samples_removed = compacted.samples_removed,
        dates_filled = filled.dates_filled,
        buckets_inserted = filled.buckets_inserted,
        "maintenance pass finished"
    );

    store.close().await;
    Ok(())
}
