//! Request types for the API

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Trigger an upgrade of one component on one host
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequest {
    /// Host identifier
    #[serde(alias = "serverId")]
    pub host_id: String,
    /// Component name, matched case-insensitively
    pub component_name: String,
    /// Version to install
    pub target_version: String,
    /// Who triggered the upgrade
    #[serde(default = "default_actor")]
    pub actor: String,
}

fn default_actor() -> String {
    "UI_USER".to_string()
}

/// Cancel an in-flight upgrade
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    /// Host identifier
    #[serde(alias = "serverId")]
    pub host_id: String,
    /// Component name, matched case-insensitively
    pub component_name: String,
}

/// Query parameters for the history endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    /// Restrict to one host; all records when absent
    #[serde(default, alias = "serverId")]
    pub host_id: Option<String>,
}
