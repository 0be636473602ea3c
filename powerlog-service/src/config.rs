use powerlog_client::SqliteConnector;
use serde::Deserialize;
use std::{fs, time::Duration};

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    4
}

impl StoreConfig {
    pub fn connector(&self) -> SqliteConnector {
        SqliteConnector::new(self.url.clone(), self.max_connections)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Endpoint returning the plug's Tuya data points as JSON.
    pub status_url: String,
    pub auth_bearer_token: Option<String>,
    #[serde(default = "default_device_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_device_timeout_ms() -> u64 {
    5_000
}

impl DeviceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntervalConfig {
    pub interval_secs: u64,
}

impl IntervalConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_sampling() -> IntervalConfig {
    IntervalConfig { interval_secs: 60 }
}

fn default_compaction() -> IntervalConfig {
    IntervalConfig { interval_secs: 3_600 }
}

fn default_backfill() -> IntervalConfig {
    IntervalConfig { interval_secs: 86_400 }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub device: DeviceConfig,
    #[serde(default = "default_sampling")]
    pub sampling: IntervalConfig,
    #[serde(default = "default_compaction")]
    pub compaction: IntervalConfig,
    #[serde(default = "default_backfill")]
    pub backfill: IntervalConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Read the TOML file named by `POWERLOG_CONFIG` (default
    /// `powerlog-config.toml`), then apply environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("POWERLOG_CONFIG").unwrap_or_else(|_| "powerlog-config.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config {path}: {e}"))?;
        let mut cfg = Self::from_toml(&contents)?;
        cfg.apply_overrides(|key| env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }

    /// `DATABASE_URL`, `DEVICE_URL`, `DEVICE_TOKEN` and `FREQUENCY` win over
    /// the file.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.store.url = url;
        }
        if let Some(url) = lookup("DEVICE_URL") {
            self.device.status_url = url;
        }
        if let Some(token) = lookup("DEVICE_TOKEN") {
            self.device.auth_bearer_token = Some(token);
        }
        if let Some(freq) = lookup("FREQUENCY") {
            self.sampling.interval_secs = freq
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid FREQUENCY {freq:?}: {e}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, section) in [
            ("sampling", &self.sampling),
            ("compaction", &self.compaction),
            ("backfill", &self.backfill),
        ] {
            if section.interval_secs == 0 {
                anyhow::bail!("{name}.interval_secs must be greater than zero");
            }
        }
        Ok(())
    }
}
