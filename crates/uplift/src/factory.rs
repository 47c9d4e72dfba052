//! Builds the engine's collaborators from configuration

use std::sync::Arc;
use std::time::Duration;

use eyre::{Result, WrapErr};
use uplift_core::{
    AuditStore, FileAuditStore, HostConfig, InventoryStore, MemoryAuditStore, MemoryInventory,
};
use uplift_exec::{AutomationExecutor, PassThroughExecutor, PlaybookExecutor, ProcessRunner};

use crate::config::{AutomationConfig, AutomationMode, DaemonConfig};

/// Create the executor selected by `automation.mode`
///
/// # Errors
/// Returns error if the playbook executor is misconfigured
pub fn build_executor(config: &AutomationConfig) -> Result<Arc<dyn AutomationExecutor>> {
    match config.mode {
        AutomationMode::Playbook => {
            let runner = ProcessRunner::new(
                Duration::from_secs(config.timeout_secs),
                config.max_output_bytes,
            );
            let executor = PlaybookExecutor::new(
                &config.program,
                &config.playbook,
                &config.repo_url,
                runner,
            )
            .map_err(|e| eyre::eyre!("failed to create playbook executor: {e}"))?;
            tracing::info!(
                program = %config.program,
                playbook = %config.playbook.display(),
                timeout_secs = config.timeout_secs,
                "using playbook executor"
            );
            Ok(Arc::new(executor))
        }
        AutomationMode::PassThrough => {
            tracing::warn!(
                delay_ms = config.pass_through_delay_ms,
                "using pass-through executor, hosts will not be touched"
            );
            Ok(Arc::new(PassThroughExecutor::new(Duration::from_millis(
                config.pass_through_delay_ms,
            ))))
        }
    }
}

/// Open the audit store: JSON lines file when configured, memory otherwise
///
/// # Errors
/// Returns error if the audit file cannot be opened or replayed
pub async fn build_audit_store(config: &DaemonConfig) -> Result<Arc<dyn AuditStore>> {
    match &config.audit_log {
        Some(path) => {
            let store = FileAuditStore::open(path)
                .await
                .wrap_err_with(|| format!("failed to open audit log {}", path.display()))?;
            tracing::info!(path = %store.path().display(), "audit trail persisted to file");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("no audit_log configured, audit trail kept in memory only");
            Ok(Arc::new(MemoryAuditStore::new()))
        }
    }
}

/// Seed the inventory from the configured hosts
///
/// # Errors
/// Returns error if two hosts share an id
pub async fn seed_inventory(hosts: &[HostConfig]) -> Result<Arc<dyn InventoryStore>> {
    let inventory = MemoryInventory::new();
    for config in hosts {
        let host = config.clone().into_host();
        tracing::debug!(host = %host.id, components = host.components.len(), "seeding host");
        inventory
            .insert_host(host)
            .await
            .wrap_err("failed to seed inventory")?;
    }
    tracing::info!(hosts = hosts.len(), "inventory seeded");
    Ok(Arc::new(inventory))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(id: &str) -> HostConfig {
        HostConfig {
            id: id.to_string(),
            hostname: format!("app-{id}"),
            ip: "10.0.0.1".to_string(),
            environment: "Prod".to_string(),
            components: vec![],
        }
    }

    #[test]
    fn test_executor_follows_mode() {
        let mut config = AutomationConfig::default();
        assert_eq!(build_executor(&config).unwrap().executor_type(), "playbook");

        config.mode = AutomationMode::PassThrough;
        assert_eq!(build_executor(&config).unwrap().executor_type(), "pass-through");
    }

    #[test]
    fn test_empty_program_rejected() {
        let config = AutomationConfig {
            program: "  ".to_string(),
            ..AutomationConfig::default()
        };
        assert!(build_executor(&config).is_err());
    }

    #[tokio::test]
    async fn test_seed_inventory() {
        let inventory = seed_inventory(&[host("1"), host("2")]).await.unwrap();

        let hosts = inventory.list_hosts().await.unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].components[0].name, "Java");

        assert!(seed_inventory(&[host("1"), host("1")]).await.is_err());
    }

    #[tokio::test]
    async fn test_file_audit_store_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let config = DaemonConfig {
            audit_log: Some(dir.path().join("audit/audit.jsonl")),
            ..DaemonConfig::default()
        };

        let store = build_audit_store(&config).await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
        assert!(dir.path().join("audit").exists());
    }
}
