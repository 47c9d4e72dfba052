//! In-memory store implementations

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AuditStore, HostUpdate, InventoryStore};
use crate::error::StoreError;
use crate::model::{AuditEntry, AuditRecord, Host};

/// Inventory held in memory, listed in host id order
#[derive(Debug, Default)]
pub struct MemoryInventory {
    hosts: RwLock<BTreeMap<String, Host>>,
}

impl MemoryInventory {
    /// Empty inventory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inventory pre-filled with `hosts`; later duplicates replace earlier ones
    #[must_use]
    pub fn with_hosts(hosts: impl IntoIterator<Item = Host>) -> Self {
        let hosts = hosts.into_iter().map(|h| (h.id.clone(), h)).collect();
        Self {
            hosts: RwLock::new(hosts),
        }
    }

    /// Remove a host, returning it if present
    pub async fn remove_host(&self, id: &str) -> Option<Host> {
        self.hosts.write().await.remove(id)
    }
}

#[async_trait]
impl InventoryStore for MemoryInventory {
    async fn get_host(&self, id: &str) -> Result<Option<Host>, StoreError> {
        Ok(self.hosts.read().await.get(id).cloned())
    }

    async fn list_hosts(&self) -> Result<Vec<Host>, StoreError> {
        Ok(self.hosts.read().await.values().cloned().collect())
    }

    async fn insert_host(&self, host: Host) -> Result<(), StoreError> {
        let mut hosts = self.hosts.write().await;
        if hosts.contains_key(&host.id) {
            return Err(StoreError::HostAlreadyExists(host.id));
        }
        hosts.insert(host.id.clone(), host);
        Ok(())
    }

    async fn update_host(
        &self,
        id: &str,
        update: HostUpdate,
    ) -> Result<(Host, Host), StoreError> {
        let mut hosts = self.hosts.write().await;
        let current = hosts
            .get(id)
            .ok_or_else(|| StoreError::HostNotFound(id.to_string()))?;

        let previous = current.clone();
        let mut next = current.clone();
        update(&mut next)?;
        hosts.insert(id.to_string(), next.clone());
        Ok((previous, next))
    }
}

/// Audit trail held in memory
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    records: RwLock<Vec<AuditRecord>>,
}

impl MemoryAuditStore {
    /// Empty audit trail
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, entry: AuditEntry) -> Result<AuditRecord, StoreError> {
        let mut records = self.records.write().await;
        let id = records.len() as u64 + 1;
        let record = entry.into_record(id);
        records.push(record.clone());
        Ok(record)
    }

    async fn list_for_host(&self, host_id: &str) -> Result<Vec<AuditRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.host_id == host_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<AuditRecord>, StoreError> {
        Ok(self.records.read().await.clone())
    }
}
