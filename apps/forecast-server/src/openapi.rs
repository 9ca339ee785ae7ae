use serde_json::Value as JsonValue;
use utoipa::OpenApi;

use crate::geo::GeoPoint;
use crate::routes::health::HealthResponse;
use crate::routes::weather::HourlyValue;
use crate::services::ingest::{CycleReport, LocationFailure};
use crate::services::scheduler::PipelineReport;

#[derive(OpenApi)]
#[openapi(
    info(title = "forecast-server", description = "Hourly weather forecast ingestion and query API"),
    paths(
        crate::routes::health::healthz,
        crate::routes::geolocations::list_geolocations,
        crate::routes::weather::latest_weather,
        crate::routes::weather::hourly_weather,
        crate::routes::weather::list_metrics,
        crate::routes::load::load_forecasts,
    ),
    components(schemas(
        HealthResponse,
        GeoPoint,
        HourlyValue,
        CycleReport,
        LocationFailure,
        PipelineReport,
    )),
    tags(
        (name = "health", description = "Liveness"),
        (name = "forecast", description = "Forecast queries and manual ingestion")
    )
)]
pub struct ApiDoc;

pub fn openapi_json() -> JsonValue {
    serde_json::to_value(ApiDoc::openapi()).unwrap_or(JsonValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = openapi_json();
        let paths = doc["paths"].as_object().expect("paths object");
        for path in [
            "/healthz",
            "/api/geolocations",
            "/api/latest_weather",
            "/api/hourly_weather",
            "/api/metrics",
            "/api/load",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
        assert!(doc["paths"]["/api/load"]["post"].is_object());
        assert!(doc["components"]["schemas"]["PipelineReport"].is_object());
    }
}
