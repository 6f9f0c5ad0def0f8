//! ==============================================================================
//! provider.rs - current temperature from open-meteo
//! ==============================================================================
//!
//! purpose:
//!     the one external call the fetch loop makes. asks the forecast endpoint
//!     for current conditions at a fixed coordinate and pulls out
//!     `current.temperature_2m`.
//!
//! relationships:
//!     - used by: fetcher.rs (through the TemperatureSource trait)
//!     - configured by: config.rs (ProviderConfig: base url, timeout)
//!
//! ==============================================================================

use crate::config::ProviderConfig;
use crate::error::FetchError;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// coordinate the readings are taken for
pub const LATITUDE: f64 = 35.68;
pub const LONGITUDE: f64 = -0.6;

const FORECAST_PATH: &str = "/v1/forecast";
const CURRENT_FIELD: &str = "temperature_2m";

/// anything that can report the current temperature
#[async_trait]
pub trait TemperatureSource: Send + Sync {
    async fn current_temperature(&self) -> Result<f64, FetchError>;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentConditions>,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature_2m: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    client: Client,
    forecast_url: String,
}

impl OpenMeteoProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            forecast_url: format!("{}{}", config.base_url.trim_end_matches('/'), FORECAST_PATH),
        })
    }
}

#[async_trait]
impl TemperatureSource for OpenMeteoProvider {
    async fn current_temperature(&self) -> Result<f64, FetchError> {
        let response = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", LATITUDE.to_string()),
                ("longitude", LONGITUDE.to_string()),
                ("current", CURRENT_FIELD.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        parse_temperature(&body)
    }
}

/// extract `current.temperature_2m` from a forecast body
fn parse_temperature(body: &[u8]) -> Result<f64, FetchError> {
    if body.is_empty() {
        return Err(FetchError::MalformedBody("empty body".to_string()));
    }

    let parsed: ForecastResponse =
        serde_json::from_slice(body).map_err(|e| FetchError::MalformedBody(e.to_string()))?;

    parsed
        .current
        .and_then(|c| c.temperature_2m)
        .ok_or_else(|| FetchError::MalformedBody("missing current.temperature_2m".to_string()))
}
