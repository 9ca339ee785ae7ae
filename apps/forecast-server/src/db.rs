use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::geo::GeoPoint;
use crate::metric_catalog::{MetricKind, METRICS};

pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(8))
        .connect_lazy(database_url)
        .context("Failed to create lazy database pool")
}

fn forecast_table_ddl() -> String {
    let metric_columns: Vec<String> = METRICS
        .iter()
        .map(|spec| {
            let sql_type = match spec.kind {
                MetricKind::Numeric => "DOUBLE PRECISION",
                MetricKind::Categorical => "INTEGER",
            };
            format!("{} {sql_type} NULL", spec.column)
        })
        .collect();
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS hourly_weather_forecasts (
            id BIGSERIAL PRIMARY KEY,
            ts TIMESTAMPTZ NOT NULL,
            latitude NUMERIC(10,4) NOT NULL,
            longitude NUMERIC(10,4) NOT NULL,
            {}
        )
        "#,
        metric_columns.join(",\n            ")
    )
}

/// Creates the forecast tables when missing. The (latitude, longitude, ts) key
/// is indexed but not unique: every fetch appends.
pub async fn ensure_schema(db: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS geo_locations (
            latitude NUMERIC(10,4) NOT NULL,
            longitude NUMERIC(10,4) NOT NULL,
            PRIMARY KEY (latitude, longitude)
        )
        "#,
    )
    .execute(db)
    .await
    .context("failed to create geo_locations")?;

    sqlx::query(&forecast_table_ddl())
        .execute(db)
        .await
        .context("failed to create hourly_weather_forecasts")?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS hourly_weather_forecasts_key_idx
        ON hourly_weather_forecasts (latitude, longitude, ts, id DESC)
        "#,
    )
    .execute(db)
    .await
    .context("failed to create hourly_weather_forecasts key index")?;

    Ok(())
}

/// Bootstrap-only provisioning of tracked locations; existing rows are kept.
pub async fn seed_geolocations(db: &PgPool, points: &[GeoPoint]) -> Result<u64> {
    let mut inserted = 0;
    for point in points {
        let result = sqlx::query(
            r#"
            INSERT INTO geo_locations (latitude, longitude)
            VALUES (ROUND($1::numeric, 4), ROUND($2::numeric, 4))
            ON CONFLICT (latitude, longitude) DO NOTHING
            "#,
        )
        .bind(point.latitude)
        .bind(point.longitude)
        .execute(db)
        .await
        .with_context(|| format!("failed to seed geolocation {point}"))?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_ddl_declares_every_metric_column() {
        let ddl = forecast_table_ddl();
        for spec in METRICS {
            assert!(ddl.contains(spec.column), "missing {}", spec.column);
        }
        assert!(ddl.contains("weather_code INTEGER NULL"));
        assert!(ddl.contains("temperature DOUBLE PRECISION NULL"));
        assert!(!ddl.contains("UNIQUE"));
    }
}
