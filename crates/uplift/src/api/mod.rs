//! API route handlers

pub mod error;
pub mod history;
pub mod hosts;
pub mod system;
pub mod upgrade;
pub mod ws;

use utoipa::OpenApi;
use uplift_api::events::WsEvent;
use uplift_api::requests::{CancelRequest, UpgradeRequest};
use uplift_api::responses::{
    ActiveUpgradeView, AuditRecordView, ComponentView, DispatchResponse, ErrorResponse,
    HealthResponse, HostView,
};

/// OpenAPI document served at `/docs`
#[derive(OpenApi)]
#[openapi(
    info(title = "uplift", description = "Middleware upgrade orchestration"),
    paths(
        system::health,
        upgrade::trigger_upgrade,
        upgrade::cancel_upgrade,
        upgrade::list_active,
        hosts::list_hosts,
        hosts::get_host,
        history::get_history,
    ),
    components(schemas(
        UpgradeRequest,
        CancelRequest,
        DispatchResponse,
        ErrorResponse,
        HealthResponse,
        HostView,
        ComponentView,
        AuditRecordView,
        ActiveUpgradeView,
        WsEvent,
    )),
    tags(
        (name = "upgrade", description = "Trigger and track component upgrades"),
        (name = "inventory", description = "Hosts and their components"),
        (name = "audit", description = "Upgrade audit trail"),
    )
)]
pub struct ApiDoc;
