//! State transition manager
//!
//! The only writer of component and host status during an upgrade.

use std::sync::Arc;

use tracing::{debug, info};
use uplift_exec::ExecutionResult;

use crate::error::StoreError;
use crate::model::{Host, Status};
use crate::store::InventoryStore;

/// Host state after an outcome was applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTransition {
    /// Aggregate status before the outcome
    pub previous_status: Status,
    /// Host as stored after the outcome
    pub host: Host,
}

impl AppliedTransition {
    /// Whether the aggregate status changed
    #[must_use]
    pub fn host_status_changed(&self) -> bool {
        self.previous_status != self.host.status
    }
}

/// Applies executor outcomes to the inventory
pub struct StateTransitionManager {
    inventory: Arc<dyn InventoryStore>,
}

impl StateTransitionManager {
    /// Create a manager over `inventory`
    pub fn new(inventory: Arc<dyn InventoryStore>) -> Self {
        Self { inventory }
    }

    /// Apply `result` for `component` on `host_id`
    ///
    /// On success the component moves to `target_version` and `UpToDate`, and the host
    /// aggregate is recomputed, all in one atomic host replace. On failure nothing is
    /// written and the current host is returned.
    ///
    /// # Errors
    /// Returns `StoreError::HostNotFound` or `StoreError::ComponentNotFound` if the
    /// target vanished, or the store's own error if the write fails.
    pub async fn apply_outcome(
        &self,
        host_id: &str,
        component: &str,
        target_version: &str,
        result: &ExecutionResult,
    ) -> Result<AppliedTransition, StoreError> {
        if !result.is_success() {
            let host = self
                .inventory
                .get_host(host_id)
                .await?
                .ok_or_else(|| StoreError::HostNotFound(host_id.to_string()))?;
            if host.component(component).is_none() {
                return Err(StoreError::ComponentNotFound {
                    host: host_id.to_string(),
                    component: component.to_string(),
                });
            }
            debug!(host = %host_id, component = %component, "failed outcome, state unchanged");
            return Ok(AppliedTransition {
                previous_status: host.status,
                host,
            });
        }

        let name = component.to_string();
        let target = target_version.to_string();
        let (previous, host) = self
            .inventory
            .update_host(
                host_id,
                Box::new(move |host: &mut Host| {
                    let host_id = host.id.clone();
                    let c = host
                        .component_mut(&name)
                        .ok_or_else(|| StoreError::ComponentNotFound {
                            host: host_id,
                            component: name.clone(),
                        })?;
                    c.current_version = target;
                    c.status = Status::UpToDate;
                    host.refresh_status();
                    Ok(())
                }),
            )
            .await?;

        info!(
            host = %host_id,
            component = %component,
            version = %target_version,
            host_status = %host.status,
            "component upgraded"
        );

        Ok(AppliedTransition {
            previous_status: previous.status,
            host,
        })
    }
}
