//! HTTP router configuration

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api::{ApiDoc, history, hosts, system, upgrade, ws};
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // System endpoints
        .route("/health", get(system::health))
        // Upgrades
        .route("/api/upgrade", post(upgrade::trigger_upgrade))
        .route("/api/upgrade/cancel", post(upgrade::cancel_upgrade))
        .route("/api/upgrade/active", get(upgrade::list_active))
        // Inventory
        .route("/api/hosts", get(hosts::list_hosts))
        .route("/api/hosts/{id}", get(hosts::get_host))
        // Audit trail
        .route("/api/history", get(history::get_history))
        // Events
        .route("/ws/events", get(ws::ws_handler))
        // State
        .with_state(state)
        // API docs
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
}
