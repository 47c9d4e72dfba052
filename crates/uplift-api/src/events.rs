//! WebSocket event types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum WsEvent {
    UpgradeStarted {
        host: String,
        component: String,
        from_version: String,
        to_version: String,
    },
    UpgradeFinished {
        host: String,
        component: String,
        status: String,
        message: Option<String>,
    },
    HostStatusChanged {
        host: String,
        from: String,
        to: String,
    },
}
