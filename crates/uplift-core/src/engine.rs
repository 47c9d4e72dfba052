//! `UpgradeEngine`: upgrade orchestration
//!
//! Validates dispatches, holds the per-target guard and runs each accepted upgrade as
//! its own tokio task: read version, run executor, apply transition, write audit.

use std::sync::Arc;

use chrono::Utc;
use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::ActorStopReason;
use kameo::message::{Context, Message};
use kameo::prelude::*;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use uplift_api::events::WsEvent;
use uplift_exec::{AutomationExecutor, ExecutionResult, UpgradeJob};

use crate::audit::AuditTrail;
use crate::error::{CoreError, DispatchError, StoreError};
use crate::lock::{ActiveUpgrade, TargetGuard, TargetKey, TargetLocks};
use crate::message::{
    CancelUpgrade, Dispatch, EngineStatus, GetEngineStatus, GetHistory, GetHost, ListActive,
    ListHosts, UpgradeHandle, UpgradeOutcome, UpgradeReport, UpgradeTicket,
};
use crate::model::{AuditOutcome, AuditRecord, Host};
use crate::store::{AuditStore, InventoryStore};
use crate::transition::{AppliedTransition, StateTransitionManager};

const DEFAULT_ACTOR: &str = "UI_USER";

/// Arguments for spawning an `UpgradeEngine`
pub struct UpgradeEngineArgs {
    /// Host/component records
    pub inventory: Arc<dyn InventoryStore>,
    /// Audit record sink
    pub audit_store: Arc<dyn AuditStore>,
    /// Remediation tool runner
    pub executor: Arc<dyn AutomationExecutor>,
    /// Event broadcast sender for WebSocket
    pub event_tx: broadcast::Sender<WsEvent>,
    /// Bound on tool output stored in audit records
    pub max_output_bytes: usize,
}

/// Upgrade orchestrator
pub struct UpgradeEngine {
    inventory: Arc<dyn InventoryStore>,
    transitions: Arc<StateTransitionManager>,
    audit: Arc<AuditTrail>,
    executor: Arc<dyn AutomationExecutor>,
    locks: TargetLocks,
    event_tx: broadcast::Sender<WsEvent>,
}

impl Actor for UpgradeEngine {
    type Args = UpgradeEngineArgs;
    type Error = CoreError;

    async fn on_start(args: Self::Args, actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        if args.max_output_bytes == 0 {
            return Err(CoreError::ConfigError(
                "max_output_bytes must be greater than zero".to_string(),
            ));
        }

        info!(
            id = %actor_ref.id(),
            executor = args.executor.executor_type(),
            "UpgradeEngine starting"
        );

        Ok(Self {
            transitions: Arc::new(StateTransitionManager::new(args.inventory.clone())),
            audit: Arc::new(AuditTrail::new(args.audit_store, args.max_output_bytes)),
            inventory: args.inventory,
            executor: args.executor,
            locks: TargetLocks::new(),
            event_tx: args.event_tx,
        })
    }

    async fn on_stop(
        &mut self,
        _actor_ref: WeakActorRef<Self>,
        reason: ActorStopReason,
    ) -> Result<(), Self::Error> {
        let in_flight = self.locks.active().len();
        if in_flight > 0 {
            warn!(in_flight, "UpgradeEngine stopping with upgrades still running");
        }
        info!(reason = ?reason, "UpgradeEngine stopping");
        Ok(())
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Message<Dispatch> for UpgradeEngine {
    type Reply = Result<UpgradeTicket, DispatchError>;

    async fn handle(&mut self, msg: Dispatch, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        let host_id = msg.host_id.trim();
        let component_name = msg.component_name.trim();
        let target_version = msg.target_version.trim();

        if host_id.is_empty() {
            return Err(DispatchError::InvalidRequest("host id is empty".to_string()));
        }
        if component_name.is_empty() {
            return Err(DispatchError::InvalidRequest("component name is empty".to_string()));
        }
        if target_version.is_empty() {
            return Err(DispatchError::InvalidRequest("target version is empty".to_string()));
        }

        let host = self
            .inventory
            .get_host(host_id)
            .await
            .map_err(|e| DispatchError::Store(e.to_string()))?
            .ok_or_else(|| DispatchError::UnknownHost(host_id.to_string()))?;

        let component = host.component(component_name).ok_or_else(|| {
            DispatchError::UnknownComponent {
                host: host.id.clone(),
                component: component_name.to_string(),
            }
        })?;

        let actor = match msg.actor.trim() {
            "" => DEFAULT_ACTOR.to_string(),
            a => a.to_string(),
        };
        let cancel = CancellationToken::new();
        let active = ActiveUpgrade {
            host_id: host.id.clone(),
            component_name: component.name.clone(),
            target_version: target_version.to_string(),
            actor: actor.clone(),
            started_at: Utc::now(),
            cancel: cancel.clone(),
        };

        let guard = self
            .locks
            .try_acquire(TargetKey::new(&host.id, &component.name), active)
            .ok_or_else(|| DispatchError::UpgradeInFlight {
                host: host.id.clone(),
                component: component.name.clone(),
            })?;

        info!(
            host = %host.id,
            component = %component.name,
            from_version = %component.current_version,
            target_version = %target_version,
            actor = %actor,
            "upgrade dispatched"
        );

        let run = UpgradeRun {
            host_id: host.id.clone(),
            hostname: host.hostname.clone(),
            component_name: component.name.clone(),
            dispatched_version: component.current_version.clone(),
            target_version: target_version.to_string(),
            actor: actor.clone(),
            cancel,
            inventory: self.inventory.clone(),
            transitions: self.transitions.clone(),
            audit: self.audit.clone(),
            executor: self.executor.clone(),
            event_tx: self.event_tx.clone(),
        };

        let ticket = UpgradeTicket {
            host_id: host.id.clone(),
            component_name: component.name.clone(),
            from_version: component.current_version.clone(),
            target_version: target_version.to_string(),
            actor,
            handle: UpgradeHandle::new(tokio::spawn(run.execute(guard))),
        };

        Ok(ticket)
    }
}

impl Message<CancelUpgrade> for UpgradeEngine {
    type Reply = Result<(), DispatchError>;

    async fn handle(
        &mut self,
        msg: CancelUpgrade,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        let key = TargetKey::new(msg.host_id.trim(), &msg.component_name);
        if self.locks.cancel(&key) {
            info!(host = %key.host_id, component = %key.component, "upgrade cancellation requested");
            Ok(())
        } else {
            Err(DispatchError::NotInFlight {
                host: key.host_id,
                component: msg.component_name,
            })
        }
    }
}

impl Message<GetHost> for UpgradeEngine {
    type Reply = Result<Host, CoreError>;

    async fn handle(&mut self, msg: GetHost, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        match self.inventory.get_host(&msg.host_id).await? {
            Some(host) => Ok(host),
            None => Err(CoreError::HostNotFound(msg.host_id)),
        }
    }
}

impl Message<ListHosts> for UpgradeEngine {
    type Reply = Result<Vec<Host>, CoreError>;

    async fn handle(
        &mut self,
        _msg: ListHosts,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        Ok(self.inventory.list_hosts().await?)
    }
}

impl Message<GetHistory> for UpgradeEngine {
    type Reply = Result<Vec<AuditRecord>, CoreError>;

    async fn handle(
        &mut self,
        msg: GetHistory,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        Ok(self.audit.history(msg.host_id.as_deref()).await?)
    }
}

impl Message<ListActive> for UpgradeEngine {
    type Reply = Vec<ActiveUpgrade>;

    async fn handle(
        &mut self,
        _msg: ListActive,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.locks.active()
    }
}

impl Message<GetEngineStatus> for UpgradeEngine {
    type Reply = EngineStatus;

    async fn handle(
        &mut self,
        _msg: GetEngineStatus,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        EngineStatus {
            executor: self.executor.executor_type(),
            active_upgrades: self.locks.active().len(),
        }
    }
}

// ============================================================================
// Upgrade task
// ============================================================================

/// State moved into one upgrade task
struct UpgradeRun {
    host_id: String,
    hostname: String,
    component_name: String,
    dispatched_version: String,
    target_version: String,
    actor: String,
    cancel: CancellationToken,
    inventory: Arc<dyn InventoryStore>,
    transitions: Arc<StateTransitionManager>,
    audit: Arc<AuditTrail>,
    executor: Arc<dyn AutomationExecutor>,
    event_tx: broadcast::Sender<WsEvent>,
}

impl UpgradeRun {
    /// Task body; `_guard` keeps the target claimed until it returns
    async fn execute(self, _guard: TargetGuard) -> UpgradeReport {
        let (hostname, from_version, job) = match self.load_job().await {
            Ok(loaded) => loaded,
            Err(e) => {
                error!(
                    host = %self.host_id,
                    component = %self.component_name,
                    error = %e,
                    "upgrade target vanished before run"
                );
                let message = format!("Could not load upgrade target: {e}");
                return self
                    .finish(
                        &self.hostname,
                        &self.dispatched_version,
                        UpgradeOutcome::StateFailed,
                        &message,
                        "",
                        None,
                    )
                    .await;
            }
        };

        let _ = self.event_tx.send(WsEvent::UpgradeStarted {
            host: self.host_id.clone(),
            component: self.component_name.clone(),
            from_version: from_version.clone(),
            to_version: self.target_version.clone(),
        });

        let result = self.executor.run(&job, &self.cancel).await;
        let transition = self
            .transitions
            .apply_outcome(&self.host_id, &self.component_name, &self.target_version, &result)
            .await;

        let (outcome, headline, body, applied) = classify(&result, transition);

        self.finish(&hostname, &from_version, outcome, &headline, &body, applied)
            .await
    }

    /// Re-read the target and build the executor job
    async fn load_job(&self) -> Result<(String, String, UpgradeJob), StoreError> {
        let host = self
            .inventory
            .get_host(&self.host_id)
            .await?
            .ok_or_else(|| StoreError::HostNotFound(self.host_id.clone()))?;
        let component =
            host.component(&self.component_name)
                .ok_or_else(|| StoreError::ComponentNotFound {
                    host: self.host_id.clone(),
                    component: self.component_name.clone(),
                })?;

        let job = UpgradeJob {
            hostname: host.hostname.clone(),
            host_addr: host.ip.clone(),
            component: component.name.clone(),
            software_type: component.kind.clone(),
            install_path: component.install_path.clone(),
            target_version: self.target_version.clone(),
        };
        Ok((host.hostname.clone(), component.current_version.clone(), job))
    }

    /// Write the audit record, publish events and build the report
    async fn finish(
        &self,
        hostname: &str,
        from_version: &str,
        outcome: UpgradeOutcome,
        headline: &str,
        body: &str,
        applied: Option<AppliedTransition>,
    ) -> UpgradeReport {
        let audit_outcome = match outcome {
            UpgradeOutcome::Succeeded => AuditOutcome::Success,
            UpgradeOutcome::ToolFailed | UpgradeOutcome::StateFailed => AuditOutcome::Failed,
        };
        let output = self.audit.compose(headline, body);

        let (record, audit_error) = match self
            .audit
            .record(
                &self.host_id,
                hostname,
                &self.component_name,
                from_version,
                &self.target_version,
                audit_outcome,
                &self.actor,
                &output,
            )
            .await
        {
            Ok(record) => (Some(record), None),
            Err(e) => {
                // State already committed stays committed; only the record is missing.
                error!(
                    host = %self.host_id,
                    component = %self.component_name,
                    outcome = %audit_outcome,
                    error = %e,
                    "upgrade finished but audit record could not be written"
                );
                (None, Some(e.to_string()))
            }
        };

        let _ = self.event_tx.send(WsEvent::UpgradeFinished {
            host: self.host_id.clone(),
            component: self.component_name.clone(),
            status: audit_outcome.to_string(),
            message: Some(headline.to_string()),
        });

        if let Some(applied) = applied.as_ref().filter(|a| a.host_status_changed()) {
            let _ = self.event_tx.send(WsEvent::HostStatusChanged {
                host: self.host_id.clone(),
                from: applied.previous_status.to_string(),
                to: applied.host.status.to_string(),
            });
        }

        info!(
            host = %self.host_id,
            component = %self.component_name,
            from_version = %from_version,
            to_version = %self.target_version,
            outcome = ?outcome,
            "upgrade finished"
        );

        UpgradeReport {
            host_id: self.host_id.clone(),
            component_name: self.component_name.clone(),
            from_version: from_version.to_string(),
            to_version: self.target_version.clone(),
            outcome,
            record,
            audit_error,
            host: applied.map(|a| a.host),
        }
    }
}

/// Map tool result and transition result to an outcome and audit text
fn classify(
    result: &ExecutionResult,
    transition: Result<AppliedTransition, StoreError>,
) -> (UpgradeOutcome, String, String, Option<AppliedTransition>) {
    match (result.is_success(), transition) {
        (true, Ok(applied)) => (
            UpgradeOutcome::Succeeded,
            "Playbook execution successful.\nOutput:".to_string(),
            result.captured_output.clone(),
            Some(applied),
        ),
        (true, Err(e)) => (
            UpgradeOutcome::StateFailed,
            format!("Tool succeeded but could not persist result: {e}"),
            result.captured_output.clone(),
            None,
        ),
        (false, applied) => (
            UpgradeOutcome::ToolFailed,
            format!(
                "Error during automation: {}",
                result.error.as_deref().unwrap_or("unknown error")
            ),
            result.captured_output.clone(),
            applied.ok(),
        ),
    }
}
