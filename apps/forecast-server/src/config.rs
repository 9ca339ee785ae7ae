use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::geo::{parse_point_list, GeoPoint};
use crate::services::provider::DEFAULT_TOMORROW_BASE_URL;

const MIN_INGEST_INTERVAL_SECONDS: u64 = 60;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub provider_base_url: String,
    pub provider_api_key: Option<String>,
    pub provider_timeout_seconds: u64,
    pub provider_fixture_path: Option<PathBuf>,
    pub enable_ingestion: bool,
    pub ingest_interval_seconds: u64,
    pub seed_locations: Vec<GeoPoint>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env_optional_string("FORECAST_DATABASE_URL")
            .or_else(|| env_optional_string("DATABASE_URL"))
            .context("FORECAST_DATABASE_URL (or DATABASE_URL) must be set")?;
        let database_url = normalize_database_url(database_url);

        let db_max_connections = env_u32("FORECAST_DB_MAX_CONNECTIONS", 10).clamp(1, 100);
        let provider_base_url = env_string("TOMORROW_API_BASE_URL", DEFAULT_TOMORROW_BASE_URL);
        let provider_api_key = env_optional_string("TOMORROW_API_KEY");
        let provider_timeout_seconds =
            env_u64("FORECAST_PROVIDER_TIMEOUT_SECONDS", 20).clamp(1, 300);
        let provider_fixture_path =
            env_optional_string("FORECAST_PROVIDER_FIXTURE_PATH").map(PathBuf::from);
        let enable_ingestion = env_bool("FORECAST_ENABLE_INGESTION", true);
        let ingest_interval_seconds = env_u64("FORECAST_INGEST_INTERVAL_SECONDS", 3600)
            .max(MIN_INGEST_INTERVAL_SECONDS);
        let seed_locations = match env_optional_string("FORECAST_SEED_LOCATIONS") {
            Some(raw) => parse_point_list(&raw)
                .with_context(|| format!("FORECAST_SEED_LOCATIONS is invalid: {raw:?}"))?,
            None => Vec::new(),
        };

        if provider_api_key.is_none() && provider_fixture_path.is_none() && enable_ingestion {
            tracing::warn!("TOMORROW_API_KEY is not set; provider requests will be unauthenticated");
        }

        Ok(Self {
            database_url,
            db_max_connections,
            provider_base_url,
            provider_api_key,
            provider_timeout_seconds,
            provider_fixture_path,
            enable_ingestion,
            ingest_interval_seconds,
            seed_locations,
        })
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_seconds)
    }

    pub fn ingest_interval(&self) -> Duration {
        Duration::from_secs(self.ingest_interval_seconds)
    }
}

fn env_string(key: &str, default: &str) -> String {
    env_optional_string(key).unwrap_or_else(|| default.to_string())
}

fn env_optional_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|value| value.trim().to_lowercase())
    {
        Some(value) if value == "1" || value == "true" || value == "yes" => true,
        Some(value) if value == "0" || value == "false" || value == "no" => false,
        _ => default,
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

/// sqlx only understands plain `postgres://` / `postgresql://` URLs; strip the
/// driver suffix SQLAlchemy-style URLs carry.
fn normalize_database_url(url: String) -> String {
    if let Some(stripped) = url.strip_prefix("postgresql+psycopg2://") {
        return format!("postgresql://{stripped}");
    }
    if let Some(stripped) = url.strip_prefix("postgresql+asyncpg://") {
        return format!("postgresql://{stripped}");
    }
    url
}
