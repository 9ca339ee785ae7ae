use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;

use crate::error::AppResult;
use crate::services::scheduler::{ForecastPipeline, PipelineReport};
use crate::state::AppState;

/// Runs one ingestion cycle plus retention sweep synchronously, exactly like a
/// scheduled tick.
#[utoipa::path(
    post,
    path = "/api/load",
    tag = "forecast",
    responses(
        (status = 200, description = "Cycle report", body = PipelineReport),
        (status = 429, description = "Rate limited"),
        (status = 500, description = "Location listing or sweep failed")
    )
)]
pub(crate) async fn load_forecasts(
    State(pipeline): State<Arc<ForecastPipeline>>,
) -> AppResult<Json<PipelineReport>> {
    tracing::info!("manual forecast load requested");
    Ok(Json(pipeline.run_once().await?))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/load", post(load_forecasts))
}
