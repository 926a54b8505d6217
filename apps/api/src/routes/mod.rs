pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Pipeline settings and stateless derivation
        .route(
            "/api/v1/pipeline/settings",
            get(handlers::handle_get_settings),
        )
        .route("/api/v1/pipeline/derive", post(handlers::handle_derive))
        // Application pipelines
        .route(
            "/api/v1/applications",
            get(handlers::handle_list_applications),
        )
        .route(
            "/api/v1/applications/:id/pipeline",
            get(handlers::handle_get_pipeline),
        )
        .route(
            "/api/v1/applications/:id/pipeline/:round",
            put(handlers::handle_save_round),
        )
        .with_state(state)
}
