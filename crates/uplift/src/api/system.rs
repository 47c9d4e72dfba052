//! System endpoints

use std::sync::Arc;

use axum::{Json, extract::State};
use uplift_api::responses::HealthResponse;
use uplift_core::GetEngineStatus;

use crate::api::error::AppError;
use crate::state::AppState;

/// Liveness check; fails when the engine actor is gone
///
/// # Errors
/// Returns `AppError` if the engine does not answer
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, body = HealthResponse),
        (status = 503, body = uplift_api::responses::ErrorResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    let status = state.engine.ask(GetEngineStatus).await?;
    tracing::debug!(
        executor = status.executor,
        active = status.active_upgrades,
        "health check"
    );
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}
