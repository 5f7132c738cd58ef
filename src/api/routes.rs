use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/admin/status", get(status_handler))
        .route("/admin/initialize", post(initialize_handler))
        .route("/admin/update-config", post(update_config_handler))
        .route("/admin/start", post(start_round_handler))
        .route("/admin/end", post(end_round_handler))
        .with_state(state)
}
