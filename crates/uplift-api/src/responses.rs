//! Response types for the API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Acknowledgment of an accepted upgrade
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub accepted: bool,
    pub host_id: String,
    pub component_name: String,
    pub from_version: String,
    pub target_version: String,
    pub message: String,
}

/// Error body returned for rejected requests
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable reason code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentView {
    pub name: String,
    pub kind: String,
    pub current_version: String,
    pub target_version: String,
    pub vulnerabilities: String,
    pub install_path: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostView {
    pub id: String,
    pub hostname: String,
    pub ip: String,
    pub environment: String,
    pub status: String,
    pub components: Vec<ComponentView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecordView {
    pub id: u64,
    pub host_id: String,
    pub hostname: String,
    pub component_name: String,
    pub from_version: String,
    pub to_version: String,
    pub status: String,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub output: String,
}

/// An upgrade currently running
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUpgradeView {
    pub host_id: String,
    pub component_name: String,
    pub target_version: String,
    pub actor: String,
    pub started_at: DateTime<Utc>,
}
