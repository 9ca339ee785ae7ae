mod postgres;

pub use postgres::PgForecastStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::geo::GeoPoint;
use crate::metric_catalog::{self, MetricSpec};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("forecast store read failed: {0}")]
    Read(#[source] sqlx::Error),
    #[error("forecast store write failed: {0}")]
    Write(#[source] sqlx::Error),
}

/// One provider snapshot for one location and forecast hour, as handed to the
/// store. The row id is assigned by storage on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub timestamp: DateTime<Utc>,
    pub point: GeoPoint,
    /// Present metrics keyed by catalog name; absent keys are stored as NULL.
    pub metrics: BTreeMap<&'static str, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

/// Persistence for tracked geolocations and hourly forecast rows.
///
/// Rows are insert-only. Several rows may share a (latitude, longitude,
/// timestamp) key; readers always resolve to the row with the highest id and
/// `purge_stale` removes the rest.
#[async_trait]
pub trait ForecastStore: Send + Sync {
    async fn list_geolocations(&self) -> Result<Vec<GeoPoint>, StoreError>;

    /// Inserts one location's batch atomically and returns the row count.
    async fn append_forecasts(&self, records: &[ForecastRecord]) -> Result<u64, StoreError>;

    /// Value from the newest row at `point` with `timestamp <= as_of`, ties on
    /// timestamp broken by the highest id.
    async fn latest_value(
        &self,
        point: GeoPoint,
        metric: &'static MetricSpec,
        as_of: DateTime<Utc>,
    ) -> Result<Option<f64>, StoreError>;

    /// One entry per distinct timestamp in `[from, to]`, ascending, each taken
    /// from the highest-id row for that timestamp.
    async fn time_series(
        &self,
        point: GeoPoint,
        metric: &'static MetricSpec,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SeriesPoint>, StoreError>;

    /// Deletes every row whose id is not the highest for its key.
    async fn purge_stale(&self) -> Result<u64, StoreError>;

    fn available_metrics(&self) -> Vec<&'static str> {
        metric_catalog::available_metrics()
    }
}
