use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "powerlog_service=info,powerlog_client=info,powerlog=info,backfill_hours=info,rollup_report=warn";

/// Install the global fmt subscriber on stderr, leaving stdout to report
/// output. `RUST_LOG` replaces the default directives.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
