use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::geo::{CoordinateError, GeoPoint};
use crate::metric_catalog::DEFAULT_SERIES_METRIC;
use crate::services::query::QueryEngine;
use crate::state::AppState;
use crate::time::format_timestamp;

#[derive(Debug, Clone, serde::Deserialize, utoipa::IntoParams)]
pub(crate) struct LatestWeatherQuery {
    latitude: Option<String>,
    longitude: Option<String>,
    metric: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize, utoipa::IntoParams)]
pub(crate) struct HourlyWeatherQuery {
    latitude: Option<String>,
    longitude: Option<String>,
    /// Defaults to `temperature`.
    metric: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub(crate) struct HourlyValue {
    pub(crate) timestamp: String,
    pub(crate) value: Option<f64>,
}

fn parse_point(latitude: Option<&str>, longitude: Option<&str>) -> Result<GeoPoint, AppError> {
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Ok(GeoPoint::parse(latitude, longitude)?),
        _ => Err(CoordinateError::Malformed.into()),
    }
}

#[utoipa::path(
    get,
    path = "/api/latest_weather",
    tag = "forecast",
    params(LatestWeatherQuery),
    responses(
        (status = 200, description = "Most recent forecast value keyed by metric name; null when absent", body = JsonValue),
        (status = 400, description = "Invalid coordinates or unknown metric"),
        (status = 500, description = "Storage failure")
    )
)]
pub(crate) async fn latest_weather(
    State(query): State<Arc<QueryEngine>>,
    Query(params): Query<LatestWeatherQuery>,
) -> AppResult<Json<JsonValue>> {
    let point = parse_point(params.latitude.as_deref(), params.longitude.as_deref())?;
    let metric = params
        .metric
        .as_deref()
        .map(str::trim)
        .filter(|metric| !metric.is_empty())
        .ok_or_else(|| AppError::bad_request("metric is required"))?;

    let value = query.most_recent(point, metric, Utc::now()).await?;
    let mut body = Map::new();
    body.insert(metric.to_string(), value.map_or(JsonValue::Null, JsonValue::from));
    Ok(Json(JsonValue::Object(body)))
}

#[utoipa::path(
    get,
    path = "/api/hourly_weather",
    tag = "forecast",
    params(HourlyWeatherQuery),
    responses(
        (status = 200, description = "Hourly values from one day back to five days ahead", body = Vec<HourlyValue>),
        (status = 400, description = "Invalid coordinates or unknown metric"),
        (status = 500, description = "Storage failure")
    )
)]
pub(crate) async fn hourly_weather(
    State(query): State<Arc<QueryEngine>>,
    Query(params): Query<HourlyWeatherQuery>,
) -> AppResult<Json<Vec<HourlyValue>>> {
    let point = parse_point(params.latitude.as_deref(), params.longitude.as_deref())?;
    let metric = params
        .metric
        .as_deref()
        .map(str::trim)
        .filter(|metric| !metric.is_empty())
        .unwrap_or(DEFAULT_SERIES_METRIC);

    let series = query.series(point, metric, Utc::now()).await?;
    Ok(Json(
        series
            .into_iter()
            .map(|entry| HourlyValue {
                timestamp: format_timestamp(entry.timestamp),
                value: entry.value,
            })
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/metrics",
    tag = "forecast",
    responses((status = 200, description = "Queryable metric names", body = Vec<String>))
)]
pub(crate) async fn list_metrics(State(query): State<Arc<QueryEngine>>) -> Json<Vec<&'static str>> {
    Json(query.available_metrics())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/latest_weather", get(latest_weather))
        .route("/hourly_weather", get(hourly_weather))
        .route("/metrics", get(list_metrics))
}
