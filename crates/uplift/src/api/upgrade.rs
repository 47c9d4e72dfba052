//! Upgrade endpoints

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use uplift_api::requests::{CancelRequest, UpgradeRequest};
use uplift_api::responses::{ActiveUpgradeView, DispatchResponse, ErrorResponse};
use uplift_core::{CancelUpgrade, Dispatch, ListActive};

use crate::api::error::AppError;
use crate::state::AppState;

/// Trigger an upgrade
///
/// Returns once the upgrade is accepted; the tool runs in the background and its
/// outcome shows up in the history and on the event stream.
///
/// # Errors
/// Returns `AppError` if the request is rejected
#[utoipa::path(
    post,
    path = "/api/upgrade",
    tag = "upgrade",
    request_body = UpgradeRequest,
    responses(
        (status = 202, body = DispatchResponse),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
        (status = 409, body = ErrorResponse)
    )
)]
pub async fn trigger_upgrade(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpgradeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DispatchResponse>), AppError> {
    let Json(req) = payload?;
    let ticket = state
        .engine
        .ask(Dispatch {
            host_id: req.host_id,
            component_name: req.component_name,
            target_version: req.target_version,
            actor: req.actor,
        })
        .await?;

    tracing::info!(
        host = %ticket.host_id,
        component = %ticket.component_name,
        actor = %ticket.actor,
        "upgrade accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(DispatchResponse {
            accepted: true,
            host_id: ticket.host_id,
            component_name: ticket.component_name,
            from_version: ticket.from_version,
            target_version: ticket.target_version,
            message: "Upgrade triggered successfully via Automation Engine.".to_string(),
        }),
    ))
}

/// Cancel a running upgrade
///
/// # Errors
/// Returns `AppError` if nothing is running for the target
#[utoipa::path(
    post,
    path = "/api/upgrade/cancel",
    tag = "upgrade",
    request_body = CancelRequest,
    responses(
        (status = 202, description = "Cancellation signalled"),
        (status = 400, body = ErrorResponse),
        (status = 409, body = ErrorResponse)
    )
)]
pub async fn cancel_upgrade(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CancelRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(req) = payload?;
    state
        .engine
        .ask(CancelUpgrade {
            host_id: req.host_id,
            component_name: req.component_name,
        })
        .await?;
    Ok(StatusCode::ACCEPTED)
}

/// Upgrades currently running, oldest first
///
/// # Errors
/// Returns `AppError` if the engine does not answer
#[utoipa::path(
    get,
    path = "/api/upgrade/active",
    tag = "upgrade",
    responses((status = 200, body = Vec<ActiveUpgradeView>))
)]
pub async fn list_active(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ActiveUpgradeView>>, AppError> {
    let active = state.engine.ask(ListActive).await?;
    Ok(Json(active.iter().map(ActiveUpgradeView::from).collect()))
}
