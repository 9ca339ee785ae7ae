use axum::extract::FromRef;
use std::sync::Arc;

use crate::services::query::QueryEngine;
use crate::services::scheduler::ForecastPipeline;

#[derive(Clone)]
pub struct AppState {
    pub query: Arc<QueryEngine>,
    pub pipeline: Arc<ForecastPipeline>,
}

impl FromRef<AppState> for Arc<QueryEngine> {
    fn from_ref(state: &AppState) -> Arc<QueryEngine> {
        state.query.clone()
    }
}

impl FromRef<AppState> for Arc<ForecastPipeline> {
    fn from_ref(state: &AppState) -> Arc<ForecastPipeline> {
        state.pipeline.clone()
    }
}
