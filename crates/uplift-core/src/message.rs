//! Message types for the upgrade engine
//!
//! Message handlers are implemented in `engine.rs`.

use kameo_macros::Reply;
use tokio::task::JoinHandle;

use crate::error::CoreError;
use crate::model::{AuditRecord, Host};

// ============================================================================
// Commands
// ============================================================================

/// Start an upgrade of one component on one host
#[derive(Debug, Clone)]
pub struct Dispatch {
    /// Host identifier
    pub host_id: String,
    /// Component name, matched case-insensitively
    pub component_name: String,
    /// Version to install
    pub target_version: String,
    /// Who asked for it
    pub actor: String,
}

/// Cancel the upgrade running for a target
#[derive(Debug, Clone)]
pub struct CancelUpgrade {
    /// Host identifier
    pub host_id: String,
    /// Component name, matched case-insensitively
    pub component_name: String,
}

// ============================================================================
// Queries
// ============================================================================

/// Get one host with its components
#[derive(Debug, Clone)]
pub struct GetHost {
    /// Host identifier
    pub host_id: String,
}

/// List all hosts
#[derive(Debug)]
pub struct ListHosts;

/// Read the audit trail
#[derive(Debug, Clone, Default)]
pub struct GetHistory {
    /// Restrict to one host (most recent first); everything when `None`
    pub host_id: Option<String>,
}

/// List upgrades currently in flight
#[derive(Debug)]
pub struct ListActive;

/// Get engine health summary
#[derive(Debug)]
pub struct GetEngineStatus;

/// Engine health summary
#[derive(Debug, Clone, Reply)]
pub struct EngineStatus {
    /// Executor kind in use
    pub executor: &'static str,
    /// Upgrades in flight
    pub active_upgrades: usize,
}

// ============================================================================
// Dispatch results
// ============================================================================

/// How an upgrade attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// Tool succeeded and the new version was recorded
    Succeeded,
    /// Tool failed, timed out, was cancelled or could not be launched
    ToolFailed,
    /// Tool result could not be persisted, or the target could not be loaded
    StateFailed,
}

/// Everything a finished upgrade task produced
#[derive(Debug, Clone)]
pub struct UpgradeReport {
    pub host_id: String,
    pub component_name: String,
    pub from_version: String,
    pub to_version: String,
    pub outcome: UpgradeOutcome,
    /// Audit record, `None` only if the audit store failed
    pub record: Option<AuditRecord>,
    /// Audit store failure, reported separately from the outcome
    pub audit_error: Option<String>,
    /// Host after the transition, when it could be applied
    pub host: Option<Host>,
}

/// Awaitable completion of a dispatched upgrade
#[derive(Debug)]
pub struct UpgradeHandle {
    inner: JoinHandle<UpgradeReport>,
}

impl UpgradeHandle {
    pub(crate) fn new(inner: JoinHandle<UpgradeReport>) -> Self {
        Self { inner }
    }

    /// Wait for the task to finish
    ///
    /// # Errors
    /// Returns `CoreError::TaskFailed` if the task panicked or was aborted.
    pub async fn wait(self) -> Result<UpgradeReport, CoreError> {
        self.inner
            .await
            .map_err(|e| CoreError::TaskFailed(e.to_string()))
    }
}

/// Acknowledgment of an accepted dispatch
///
/// Dropping the ticket does not stop the upgrade.
#[derive(Debug)]
pub struct UpgradeTicket {
    pub host_id: String,
    /// Component name as recorded in the inventory
    pub component_name: String,
    /// Component version at dispatch time
    pub from_version: String,
    pub target_version: String,
    pub actor: String,
    pub handle: UpgradeHandle,
}
