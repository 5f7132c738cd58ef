//! Request handlers
//!
//! Admin handlers hold no state of their own; each maps to one coordinator
//! operation. Submissions run on a spawned task so a client disconnect or the
//! request timeout cannot abandon a transition halfway.

use super::{
    errors::ApiError,
    extract::AdminBody,
    middleware::RequestId,
    models::*,
};
use crate::coordinator::{Coordinator, CoordinatorSnapshot};
use crate::errors::ControlResult;
use crate::games::types::{ConfigUpdate, CrashPoint};
use crate::metrics::RoundMetrics;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use std::{future::Future, sync::Arc};

pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub metrics: Arc<RoundMetrics>,
    pub version: String,
}

impl AppState {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self {
            metrics: coordinator.metrics(),
            coordinator,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Run a coordinator operation to completion on its own task
async fn detached<T, F>(request_id: &RequestId, operation: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: Future<Output = ControlResult<T>> + Send + 'static,
{
    tokio::spawn(operation)
        .await
        .map_err(|e| ApiError::internal(request_id, format!("admin task failed: {}", e)))?
        .map_err(|e| ApiError::from_control(request_id, e))
}

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.version.clone(),
    })
}

/// GET /admin/status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<CoordinatorSnapshot> {
    Json(state.coordinator.snapshot().await)
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// POST /admin/initialize
pub async fn initialize_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    AdminBody(body): AdminBody<InitializeRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let coordinator = state.coordinator.clone();
    let house_edge = body.house_edge();
    let tx = detached(&request_id, async move { coordinator.force_initialize(house_edge).await }).await?;
    Ok(Json(OkResponse::with_signature(tx.signature)))
}

/// POST /admin/update-config
pub async fn update_config_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    AdminBody(body): AdminBody<UpdateConfigRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let coordinator = state.coordinator.clone();
    let update = ConfigUpdate::from(body);
    let tx = detached(&request_id, async move { coordinator.update_config(update).await }).await?;
    Ok(Json(OkResponse::with_signature(tx.signature)))
}

/// POST /admin/start
pub async fn start_round_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    AdminBody(body): AdminBody<StartRoundRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let crash_point =
        CrashPoint::new(body.crash_point).map_err(|e| ApiError::from_control(&request_id, e))?;
    let coordinator = state.coordinator.clone();
    detached(&request_id, async move {
        coordinator.begin_round(body.round_id, crash_point).await
    })
    .await?;
    Ok(Json(OkResponse::new()))
}

/// POST /admin/end
pub async fn end_round_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    AdminBody(body): AdminBody<EndRoundRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let coordinator = state.coordinator.clone();
    detached(&request_id, async move { coordinator.end_round(body.round_id).await }).await?;
    Ok(Json(OkResponse::new()))
}
