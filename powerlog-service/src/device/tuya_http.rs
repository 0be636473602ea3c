use std::{collections::HashMap, time::Duration};

use powerlog_client::timefmt;
use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;

use super::{DeviceError, DeviceReader, Reading};

/// Data point ids reported by Tuya smart plugs with energy metering.
const DPS_CURRENT_MA: &str = "18";
const DPS_POWER_DECIWATT: &str = "19";
const DPS_VOLTAGE_DECIVOLT: &str = "20";

/// Body of a DPS status request. Gateways report an unreachable plug through
/// `Error` instead of `dps`.
#[derive(Debug, Deserialize)]
struct DpsStatus {
    #[serde(default)]
    dps: Option<HashMap<String, Value>>,
    #[serde(rename = "Error", default)]
    error: Option<String>,
}

/// Polls a smart plug through an HTTP endpoint that returns its data points,
/// e.g. `{"dps": {"18": 1450, "19": 3312, "20": 2298}}`.
///
/// The endpoint is a tinytuya-style gateway running next to the plug. It owns
/// the local key and the encrypted LAN session, and must refresh the power
/// data points on every status request; this reader only speaks HTTP.
pub struct TuyaHttpReader {
    client: reqwest::Client,
    status_url: String,
    auth_bearer_token: Option<String>,
}

impl TuyaHttpReader {
    pub fn new(
        status_url: impl Into<String>,
        auth_bearer_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DeviceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeviceError::Unavailable(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            status_url: status_url.into(),
            auth_bearer_token,
        })
    }
}

#[async_trait::async_trait]
impl DeviceReader for TuyaHttpReader {
    async fn read(&self) -> Result<Reading, DeviceError> {
        let mut request = self.client.get(&self.status_url);
        if let Some(token) = &self.auth_bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DeviceError::Unavailable(e.to_string()))?;
        let status: DpsStatus = response
            .json()
            .await
            .map_err(|e| DeviceError::Malformed(e.to_string()))?;

        decode_status(status, timefmt::truncate_to_second(OffsetDateTime::now_utc()))
    }
}

fn decode_status(status: DpsStatus, poll_time: OffsetDateTime) -> Result<Reading, DeviceError> {
    if let Some(err) = status.error {
        return Err(DeviceError::Unavailable(err));
    }
    let dps = status
        .dps
        .ok_or_else(|| DeviceError::Malformed("response has no dps".to_string()))?;

    Ok(Reading {
        poll_time,
        current: dps_number(&dps, DPS_CURRENT_MA)? / 1000.0,
        power: dps_number(&dps, DPS_POWER_DECIWATT)? / 10.0,
        voltage: dps_number(&dps, DPS_VOLTAGE_DECIVOLT)? / 10.0,
    })
}

fn dps_number(dps: &HashMap<String, Value>, id: &str) -> Result<f64, DeviceError> {
    dps.get(id)
        .and_then(Value::as_f64)
        .ok_or_else(|| DeviceError::Malformed(format!("dps {id} missing or not numeric")))
}
