use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::ServerConfig;
use crate::geo::GeoPoint;
use crate::metric_catalog::MetricSpec;
use crate::services::ingest::IngestionEngine;
use crate::services::provider::{ForecastProvider, HourlyForecast, ProviderError};
use crate::services::query::QueryEngine;
use crate::services::retention::RetentionSweeper;
use crate::services::scheduler::ForecastPipeline;
use crate::state::AppState;
use crate::store::{ForecastRecord, ForecastStore, SeriesPoint, StoreError};

pub fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: "postgresql://postgres@localhost/postgres".to_string(),
        db_max_connections: 2,
        provider_base_url: "http://127.0.0.1:9".to_string(),
        provider_api_key: None,
        provider_timeout_seconds: 5,
        provider_fixture_path: None,
        enable_ingestion: false,
        ingest_interval_seconds: 3600,
        seed_locations: Vec::new(),
    }
}

pub fn test_state(store: Arc<MemoryForecastStore>, provider: Arc<ScriptedProvider>) -> AppState {
    let pipeline = ForecastPipeline::new(
        IngestionEngine::new(store.clone(), provider),
        RetentionSweeper::new(store.clone()),
    );
    AppState {
        query: Arc::new(QueryEngine::new(store)),
        pipeline: Arc::new(pipeline),
    }
}

pub fn record(point: GeoPoint, timestamp: DateTime<Utc>, temperature: f64) -> ForecastRecord {
    ForecastRecord {
        timestamp,
        point,
        metrics: BTreeMap::from([("temperature", temperature)]),
    }
}

fn injected(message: &str) -> sqlx::Error {
    sqlx::Error::Protocol(message.to_string())
}

/// In-memory `ForecastStore` with the same max-id resolution rules as the
/// Postgres store, plus call counters and failure injection.
#[derive(Default)]
pub struct MemoryForecastStore {
    locations: Mutex<Vec<GeoPoint>>,
    rows: Mutex<Vec<(i64, ForecastRecord)>>,
    next_id: AtomicUsize,
    failing_writes: Mutex<HashSet<(i64, i64)>>,
    fail_reads: AtomicBool,
    append_calls: AtomicUsize,
    read_calls: AtomicUsize,
    purge_calls: AtomicUsize,
}

impl MemoryForecastStore {
    pub fn with_locations(locations: Vec<GeoPoint>) -> Self {
        let store = Self::default();
        *store.locations.lock().unwrap() = locations;
        store
    }

    pub fn fail_writes_for(&self, point: GeoPoint) {
        self.failing_writes.lock().unwrap().insert(point.key());
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn purge_calls(&self) -> usize {
        self.purge_calls.load(Ordering::SeqCst)
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn rows(&self) -> Vec<(i64, ForecastRecord)> {
        self.rows.lock().unwrap().clone()
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Read(injected("injected read failure")));
        }
        Ok(())
    }

    fn newest_per_timestamp(&self, point: GeoPoint) -> BTreeMap<DateTime<Utc>, ForecastRecord> {
        let mut newest: BTreeMap<DateTime<Utc>, (i64, ForecastRecord)> = BTreeMap::new();
        for (id, row) in self.rows.lock().unwrap().iter() {
            if row.point.key() != point.key() {
                continue;
            }
            let replace = newest
                .get(&row.timestamp)
                .map_or(true, |(best, _)| *id > *best);
            if replace {
                newest.insert(row.timestamp, (*id, row.clone()));
            }
        }
        newest
            .into_iter()
            .map(|(ts, (_, row))| (ts, row))
            .collect()
    }
}

#[async_trait]
impl ForecastStore for MemoryForecastStore {
    async fn list_geolocations(&self) -> Result<Vec<GeoPoint>, StoreError> {
        self.check_reads()?;
        Ok(self.locations.lock().unwrap().clone())
    }

    async fn append_forecasts(&self, records: &[ForecastRecord]) -> Result<u64, StoreError> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_writes.lock().unwrap();
        if records
            .iter()
            .any(|record| failing.contains(&record.point.key()))
        {
            return Err(StoreError::Write(injected("injected write failure")));
        }
        drop(failing);

        let mut rows = self.rows.lock().unwrap();
        for record in records {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
            rows.push((id, record.clone()));
        }
        Ok(records.len() as u64)
    }

    async fn latest_value(
        &self,
        point: GeoPoint,
        metric: &'static MetricSpec,
        as_of: DateTime<Utc>,
    ) -> Result<Option<f64>, StoreError> {
        self.check_reads()?;
        Ok(self
            .newest_per_timestamp(point)
            .range(..=as_of)
            .next_back()
            .and_then(|(_, row)| row.metrics.get(metric.name).copied()))
    }

    async fn time_series(
        &self,
        point: GeoPoint,
        metric: &'static MetricSpec,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SeriesPoint>, StoreError> {
        self.check_reads()?;
        Ok(self
            .newest_per_timestamp(point)
            .range(from..=to)
            .map(|(ts, row)| SeriesPoint {
                timestamp: *ts,
                value: row.metrics.get(metric.name).copied(),
            })
            .collect())
    }

    async fn purge_stale(&self) -> Result<u64, StoreError> {
        self.purge_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        let mut newest: HashMap<(i64, i64, DateTime<Utc>), i64> = HashMap::new();
        for (id, row) in rows.iter() {
            let (lat, lon) = row.point.key();
            let entry = newest.entry((lat, lon, row.timestamp)).or_insert(*id);
            *entry = (*entry).max(*id);
        }
        let before = rows.len();
        rows.retain(|(id, row)| {
            let (lat, lon) = row.point.key();
            newest.get(&(lat, lon, row.timestamp)) == Some(id)
        });
        Ok((before - rows.len()) as u64)
    }
}

type ErrorFactory = Box<dyn Fn() -> ProviderError + Send + Sync>;

/// Provider returning canned timelines per location and recording the order
/// of calls. Unscripted locations get an empty timeline.
#[derive(Default)]
pub struct ScriptedProvider {
    entries: HashMap<(i64, i64), Vec<HourlyForecast>>,
    errors: HashMap<(i64, i64), ErrorFactory>,
    calls: Mutex<Vec<GeoPoint>>,
}

impl ScriptedProvider {
    pub fn with_entries(mut self, point: GeoPoint, entries: Vec<HourlyForecast>) -> Self {
        self.entries.insert(point.key(), entries);
        self
    }

    pub fn with_error(
        mut self,
        point: GeoPoint,
        error: impl Fn() -> ProviderError + Send + Sync + 'static,
    ) -> Self {
        self.errors.insert(point.key(), Box::new(error));
        self
    }

    pub fn calls(&self) -> Vec<GeoPoint> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ForecastProvider for ScriptedProvider {
    async fn fetch_hourly(&self, point: GeoPoint) -> Result<Vec<HourlyForecast>, ProviderError> {
        self.calls.lock().unwrap().push(point);
        if let Some(error) = self.errors.get(&point.key()) {
            return Err(error());
        }
        Ok(self.entries.get(&point.key()).cloned().unwrap_or_default())
    }
}
