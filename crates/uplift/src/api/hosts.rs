//! Inventory endpoints

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use uplift_api::responses::{ErrorResponse, HostView};
use uplift_core::{GetHost, ListHosts};

use crate::api::error::AppError;
use crate::state::AppState;

/// List all hosts with their components
///
/// # Errors
/// Returns `AppError` if the inventory cannot be read
#[utoipa::path(
    get,
    path = "/api/hosts",
    tag = "inventory",
    responses((status = 200, body = Vec<HostView>))
)]
pub async fn list_hosts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<HostView>>, AppError> {
    let hosts = state.engine.ask(ListHosts).await?;
    Ok(Json(hosts.iter().map(HostView::from).collect()))
}

/// Get one host
///
/// # Errors
/// Returns `AppError` if the host does not exist
#[utoipa::path(
    get,
    path = "/api/hosts/{id}",
    tag = "inventory",
    params(("id" = String, Path, description = "Host identifier")),
    responses(
        (status = 200, body = HostView),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn get_host(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<HostView>, AppError> {
    let host = state.engine.ask(GetHost { host_id: id }).await?;
    Ok(Json(HostView::from(&host)))
}
