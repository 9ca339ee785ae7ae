use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::geo::GeoPoint;
use crate::time::parse_timestamp;

pub const DEFAULT_TOMORROW_BASE_URL: &str = "https://api.tomorrow.io/v4";

const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("forecast provider unavailable: {0}")]
    Unavailable(String),
    #[error("forecast provider rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },
    #[error("failed to decode forecast payload: {0}")]
    Decode(String),
}

/// One entry of the provider's hourly timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyForecast {
    pub time: DateTime<Utc>,
    pub values: Map<String, JsonValue>,
}

#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Hourly timeline for one coordinate. An empty timeline is not an error.
    async fn fetch_hourly(&self, point: GeoPoint) -> Result<Vec<HourlyForecast>, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct TomorrowForecastResponse {
    #[serde(default)]
    timelines: Option<TomorrowTimelines>,
}

#[derive(Debug, Deserialize)]
struct TomorrowTimelines {
    #[serde(default)]
    hourly: Vec<TomorrowInterval>,
}

#[derive(Debug, Deserialize)]
struct TomorrowInterval {
    time: String,
    #[serde(default)]
    values: Map<String, JsonValue>,
}

pub fn parse_forecast_payload(body: &[u8]) -> Result<Vec<HourlyForecast>, ProviderError> {
    let payload: TomorrowForecastResponse =
        serde_json::from_slice(body).map_err(|err| ProviderError::Decode(err.to_string()))?;
    let Some(timelines) = payload.timelines else {
        return Ok(Vec::new());
    };

    let mut entries = Vec::with_capacity(timelines.hourly.len());
    for interval in timelines.hourly {
        let Some(time) = parse_timestamp(&interval.time) else {
            tracing::warn!(time = %interval.time, "skipping forecast entry with unparsable time");
            continue;
        };
        entries.push(HourlyForecast {
            time,
            values: interval.values,
        });
    }
    Ok(entries)
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn truncate_body(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Maps a non-success status to the provider error taxonomy.
fn status_error(status: StatusCode, headers: &HeaderMap, body: &str) -> ProviderError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return ProviderError::RateLimited {
            retry_after: parse_retry_after(headers),
        };
    }
    ProviderError::Unavailable(format!("HTTP {status}: {}", truncate_body(body)))
}

/// Tomorrow.io `weather/forecast` client (1h timesteps).
#[derive(Clone)]
pub struct TomorrowClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl TomorrowClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl ForecastProvider for TomorrowClient {
    async fn fetch_hourly(&self, point: GeoPoint) -> Result<Vec<HourlyForecast>, ProviderError> {
        let url = format!("{}/weather/forecast", self.base_url.trim_end_matches('/'));
        let mut request = self.http.get(&url).query(&[
            ("location", point.to_string()),
            ("timesteps", "1h".to_string()),
        ]);
        if let Some(api_key) = self.api_key.as_deref() {
            request = request.query(&[("apikey", api_key)]);
        }

        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| ProviderError::Unavailable(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &headers, &body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| ProviderError::Unavailable(format!("failed to read body: {err}")))?;
        let entries = parse_forecast_payload(&body)?;
        tracing::debug!(location = %point, entries = entries.len(), "fetched hourly forecast");
        Ok(entries)
    }
}

/// Serves a canned provider payload for every location, for development
/// without spending provider quota.
#[derive(Debug, Clone)]
pub struct FixtureProvider {
    entries: Vec<HourlyForecast>,
}

impl FixtureProvider {
    pub fn from_path(path: &Path) -> Result<Self> {
        let body = std::fs::read(path)
            .with_context(|| format!("failed to read forecast fixture {}", path.display()))?;
        let entries = parse_forecast_payload(&body)
            .with_context(|| format!("failed to parse forecast fixture {}", path.display()))?;
        Ok(Self { entries })
    }
}

#[async_trait]
impl ForecastProvider for FixtureProvider {
    async fn fetch_hourly(&self, _point: GeoPoint) -> Result<Vec<HourlyForecast>, ProviderError> {
        Ok(self.entries.clone())
    }
}
