use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::geo::GeoPoint;
use crate::metric_catalog;
use crate::services::provider::{ForecastProvider, HourlyForecast};
use crate::store::{ForecastRecord, ForecastStore, StoreError};

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct LocationFailure {
    pub latitude: f64,
    pub longitude: f64,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, utoipa::ToSchema)]
pub struct CycleReport {
    pub locations: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rows_appended: u64,
    pub unknown_fields_dropped: usize,
    pub failures: Vec<LocationFailure>,
}

#[derive(Debug, PartialEq)]
pub(crate) struct Conversion {
    pub(crate) records: Vec<ForecastRecord>,
    pub(crate) unknown_fields: usize,
}

/// Merges each timeline entry with its location into one record. Fields the
/// catalog does not know are dropped; non-numeric values are stored as NULL.
pub(crate) fn to_records(point: GeoPoint, entries: Vec<HourlyForecast>) -> Conversion {
    let mut unknown_fields = 0;
    let records = entries
        .into_iter()
        .map(|entry| {
            let mut metrics = BTreeMap::new();
            for (key, value) in entry.values {
                let Some(spec) = metric_catalog::lookup(&key) else {
                    unknown_fields += 1;
                    continue;
                };
                if let Some(value) = value.as_f64().filter(|v| v.is_finite()) {
                    metrics.insert(spec.name, value);
                }
            }
            ForecastRecord {
                timestamp: entry.time,
                point,
                metrics,
            }
        })
        .collect();
    Conversion {
        records,
        unknown_fields,
    }
}

/// Fetches and stores forecasts for every tracked location.
///
/// Locations are processed one at a time so a cycle never bursts the
/// provider's rate limit. A failure for one location is logged and recorded;
/// the remaining locations are still attempted.
pub struct IngestionEngine {
    store: Arc<dyn ForecastStore>,
    provider: Arc<dyn ForecastProvider>,
}

impl IngestionEngine {
    pub fn new(store: Arc<dyn ForecastStore>, provider: Arc<dyn ForecastProvider>) -> Self {
        Self { store, provider }
    }

    pub async fn run_cycle(&self) -> Result<CycleReport, StoreError> {
        let locations = self.store.list_geolocations().await?;
        tracing::info!(locations = locations.len(), "starting forecast ingestion cycle");

        let mut report = CycleReport {
            locations: locations.len(),
            ..CycleReport::default()
        };

        for point in locations {
            match self.ingest_location(point).await {
                Ok((rows, unknown_fields)) => {
                    report.succeeded += 1;
                    report.rows_appended += rows;
                    report.unknown_fields_dropped += unknown_fields;
                }
                Err(err) => {
                    tracing::warn!(
                        latitude = point.latitude,
                        longitude = point.longitude,
                        error = %err,
                        "forecast ingestion failed for location"
                    );
                    report.failed += 1;
                    report.failures.push(LocationFailure {
                        latitude: point.latitude,
                        longitude: point.longitude,
                        error: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            rows = report.rows_appended,
            "forecast ingestion cycle finished"
        );
        Ok(report)
    }

    async fn ingest_location(&self, point: GeoPoint) -> anyhow::Result<(u64, usize)> {
        let entries = self.provider.fetch_hourly(point).await?;
        let conversion = to_records(point, entries);
        if conversion.unknown_fields > 0 {
            tracing::debug!(
                location = %point,
                dropped = conversion.unknown_fields,
                "dropped unrecognized forecast fields"
            );
        }
        let rows = self.store.append_forecasts(&conversion.records).await?;
        tracing::debug!(location = %point, rows, "appended forecast rows");
        Ok((rows, conversion.unknown_fields))
    }
}
