use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::geo::GeoPoint;
use crate::metric_catalog::{self, MetricSpec};
use crate::store::{ForecastStore, SeriesPoint, StoreError};
use crate::time::series_window;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown metric {0:?}")]
    UnknownMetric(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read side of the service. Coordinates arrive already quantized.
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn ForecastStore>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn ForecastStore>) -> Self {
        Self { store }
    }

    fn resolve_metric(metric: &str) -> Result<&'static MetricSpec, QueryError> {
        metric_catalog::lookup(metric).ok_or_else(|| QueryError::UnknownMetric(metric.to_string()))
    }

    pub async fn most_recent(
        &self,
        point: GeoPoint,
        metric: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<f64>, QueryError> {
        let spec = Self::resolve_metric(metric)?;
        tracing::debug!(location = %point, metric, "querying most recent forecast value");
        Ok(self.store.latest_value(point, spec, now).await?)
    }

    pub async fn series(
        &self,
        point: GeoPoint,
        metric: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SeriesPoint>, QueryError> {
        let spec = Self::resolve_metric(metric)?;
        let (from, to) = series_window(now);
        Ok(self.store.time_series(point, spec, from, to).await?)
    }

    pub fn available_metrics(&self) -> Vec<&'static str> {
        self.store.available_metrics()
    }

    pub async fn geolocations(&self) -> Result<Vec<GeoPoint>, QueryError> {
        Ok(self.store.list_geolocations().await?)
    }
}
