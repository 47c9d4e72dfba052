//! Store seams for the inventory and the audit trail
//!
//! The engine only sees these traits; the daemon picks the implementations.

mod file;
mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{AuditEntry, AuditRecord, Host};

pub use file::FileAuditStore;
pub use memory::{MemoryAuditStore, MemoryInventory};

/// Atomic read-modify-write over one host aggregate
pub type HostUpdate = Box<dyn FnOnce(&mut Host) -> Result<(), StoreError> + Send>;

/// Host/component records
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Look up a host by id
    async fn get_host(&self, id: &str) -> Result<Option<Host>, StoreError>;

    /// All hosts, ordered by id
    async fn list_hosts(&self) -> Result<Vec<Host>, StoreError>;

    /// Add a new host
    async fn insert_host(&self, host: Host) -> Result<(), StoreError>;

    /// Apply `update` to a copy of the host and replace the stored aggregate
    ///
    /// Returns the host before and after the update. Readers observe either the old
    /// or the new aggregate, never a mix. If `update` fails the stored host is left
    /// untouched.
    async fn update_host(
        &self,
        id: &str,
        update: HostUpdate,
    ) -> Result<(Host, Host), StoreError>;
}

/// Append-only audit records
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist a new record and return it with its id
    async fn append(&self, entry: AuditEntry) -> Result<AuditRecord, StoreError>;

    /// Records for one host, most recent first
    async fn list_for_host(&self, host_id: &str) -> Result<Vec<AuditRecord>, StoreError>;

    /// Every record in insertion order
    async fn list_all(&self) -> Result<Vec<AuditRecord>, StoreError>;
}
