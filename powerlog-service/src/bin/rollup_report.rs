use anyhow::{bail, Result};
use powerlog_client::Store;
use powerlog_service::{config::AppConfig, device::TuyaHttpReader, observability, QueryService};
use serde::Serialize;
use std::{env, io, sync::Arc};

const USAGE: &str = "usage: rollup_report <hourly|daily|monthly|yearly|prices> [--csv]";

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(view) = args.first() else {
        bail!(USAGE);
    };
    let csv_out = match args.get(1).map(String::as_str) {
        None => false,
        Some("--csv") => true,
        Some(other) => bail!("unexpected argument {other:?}; {USAGE}"),
    };

    let cfg = AppConfig::load()?;
    let store = Arc::new(Store::open(cfg.store.connector()).await?);
    let device = Arc::new(TuyaHttpReader::new(
        cfg.device.status_url.clone(),
        cfg.device.auth_bearer_token.clone(),
        cfg.device.timeout(),
    )?);
    let queries = QueryService::new(store.clone(), device);

    match view.as_str() {
        "hourly" => emit(&queries.hourly().await?, csv_out)?,
        "daily" => emit(&queries.daily().await?, csv_out)?,
        "monthly" => emit(&queries.monthly().await?, csv_out)?,
        "yearly" => emit(&queries.yearly().await?, csv_out)?,
        "prices" => emit(&queries.prices().await?, csv_out)?,
        other => bail!("unknown view {other:?}; {USAGE}"),
    }

    store.close().await;
    Ok(())
}

fn emit<T: Serialize>(rows: &[T], csv_out: bool) -> Result<()> {
    if csv_out {
        let mut writer = csv::Writer::from_writer(io::stdout().lock());
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    } else {
        serde_json::to_writer_pretty(io::stdout().lock(), rows)?;
        println!();
    }
    Ok(())
}
