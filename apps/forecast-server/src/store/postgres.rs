use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{ForecastRecord, ForecastStore, SeriesPoint, StoreError};
use crate::geo::GeoPoint;
use crate::metric_catalog::{MetricKind, MetricSpec, METRICS};

// 3 key columns + 30 metrics per row keeps each statement far below the
// 65535 bind parameter limit.
const INSERT_CHUNK_ROWS: usize = 500;

#[derive(Clone)]
pub struct PgForecastStore {
    db: PgPool,
}

impl PgForecastStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn insert_prefix() -> String {
    let columns: Vec<&str> = METRICS.iter().map(|spec| spec.column).collect();
    format!(
        "INSERT INTO hourly_weather_forecasts (ts, latitude, longitude, {}) ",
        columns.join(", ")
    )
}

#[derive(sqlx::FromRow)]
struct SeriesRow {
    ts: DateTime<Utc>,
    value: Option<f64>,
}

#[async_trait]
impl ForecastStore for PgForecastStore {
    async fn list_geolocations(&self) -> Result<Vec<GeoPoint>, StoreError> {
        let rows: Vec<(f64, f64)> = sqlx::query_as(
            r#"
            SELECT latitude::float8, longitude::float8
            FROM geo_locations
            "#,
        )
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::Read)?;

        Ok(rows
            .into_iter()
            .map(|(latitude, longitude)| GeoPoint::new(latitude, longitude))
            .collect())
    }

    async fn append_forecasts(&self, records: &[ForecastRecord]) -> Result<u64, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let prefix = insert_prefix();
        let mut tx = self.db.begin().await.map_err(StoreError::Write)?;
        let mut inserted: u64 = 0;

        for chunk in records.chunks(INSERT_CHUNK_ROWS) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(&prefix);
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.timestamp)
                    .push_bind(record.point.latitude)
                    .push_bind(record.point.longitude);
                for spec in METRICS {
                    let value = record.metrics.get(spec.name).copied();
                    match spec.kind {
                        MetricKind::Numeric => {
                            row.push_bind(value);
                        }
                        MetricKind::Categorical => {
                            row.push_bind(value.map(|v| v.round() as i32));
                        }
                    }
                }
            });
            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(StoreError::Write)?;
            inserted += result.rows_affected();
        }

        // Dropping the transaction on any error above rolls the batch back.
        tx.commit().await.map_err(StoreError::Write)?;
        Ok(inserted)
    }

    async fn latest_value(
        &self,
        point: GeoPoint,
        metric: &'static MetricSpec,
        as_of: DateTime<Utc>,
    ) -> Result<Option<f64>, StoreError> {
        let sql = format!(
            r#"
            SELECT {column}::float8
            FROM hourly_weather_forecasts
            WHERE latitude = ROUND($1::numeric, 4)
              AND longitude = ROUND($2::numeric, 4)
              AND ts <= $3
            ORDER BY ts DESC, id DESC
            LIMIT 1
            "#,
            column = metric.column
        );
        let value: Option<Option<f64>> = sqlx::query_scalar(&sql)
            .bind(point.latitude)
            .bind(point.longitude)
            .bind(as_of)
            .fetch_optional(&self.db)
            .await
            .map_err(StoreError::Read)?;
        Ok(value.flatten())
    }

    async fn time_series(
        &self,
        point: GeoPoint,
        metric: &'static MetricSpec,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SeriesPoint>, StoreError> {
        let sql = format!(
            r#"
            SELECT DISTINCT ON (ts) ts, {column}::float8 AS value
            FROM hourly_weather_forecasts
            WHERE latitude = ROUND($1::numeric, 4)
              AND longitude = ROUND($2::numeric, 4)
              AND ts >= $3
              AND ts <= $4
            ORDER BY ts ASC, id DESC
            "#,
            column = metric.column
        );
        let rows: Vec<SeriesRow> = sqlx::query_as(&sql)
            .bind(point.latitude)
            .bind(point.longitude)
            .bind(from)
            .bind(to)
            .fetch_all(&self.db)
            .await
            .map_err(StoreError::Read)?;

        Ok(rows
            .into_iter()
            .map(|row| SeriesPoint {
                timestamp: row.ts,
                value: row.value,
            })
            .collect())
    }

    async fn purge_stale(&self) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM hourly_weather_forecasts stale
            USING hourly_weather_forecasts fresher
            WHERE stale.latitude = fresher.latitude
              AND stale.longitude = fresher.longitude
              AND stale.ts = fresher.ts
              AND stale.id < fresher.id
            "#,
        )
        .execute(&self.db)
        .await
        .map_err(StoreError::Write)?;
        Ok(result.rows_affected())
    }
}
