pub mod geolocations;
pub mod health;
pub mod load;
pub mod weather;

use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest(
            "/api",
            Router::new()
                .merge(geolocations::router())
                .merge(weather::router())
                .merge(load::router()),
        )
        .with_state(state)
}
