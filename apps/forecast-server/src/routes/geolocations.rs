use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use crate::error::AppResult;
use crate::geo::GeoPoint;
use crate::services::query::QueryEngine;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/geolocations",
    tag = "forecast",
    responses(
        (status = 200, description = "Tracked locations", body = Vec<GeoPoint>),
        (status = 500, description = "Storage failure")
    )
)]
pub(crate) async fn list_geolocations(
    State(query): State<Arc<QueryEngine>>,
) -> AppResult<Json<Vec<GeoPoint>>> {
    Ok(Json(query.geolocations().await?))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/geolocations", get(list_geolocations))
}
