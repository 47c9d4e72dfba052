//! uplift-core: Upgrade orchestration engine
//!
//! Implements the `UpgradeEngine` actor on top of kameo, the state transition
//! manager, the audit trail and the inventory/audit store seams.

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod lock;
pub mod message;
pub mod model;
pub mod store;
pub mod transition;

pub use audit::AuditTrail;
pub use config::{ComponentConfig, HostConfig};
pub use engine::{UpgradeEngine, UpgradeEngineArgs};
pub use error::{CoreError, DispatchError, StoreError};
pub use lock::{ActiveUpgrade, TargetGuard, TargetKey, TargetLocks};
pub use message::{
    CancelUpgrade, Dispatch, EngineStatus, GetEngineStatus, GetHistory, GetHost, ListActive,
    ListHosts, UpgradeHandle, UpgradeOutcome, UpgradeReport, UpgradeTicket,
};
pub use model::{AuditEntry, AuditOutcome, AuditRecord, Component, Host, Status};
pub use store::{AuditStore, FileAuditStore, InventoryStore, MemoryAuditStore, MemoryInventory};
pub use transition::{AppliedTransition, StateTransitionManager};
