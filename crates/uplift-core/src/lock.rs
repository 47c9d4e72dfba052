//! Per-target single-flight guard
//!
//! At most one upgrade per (host, component) runs at a time. A second dispatch for a
//! busy target is rejected, not queued.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use uplift_api::responses::ActiveUpgradeView;

/// Upgrade target: host id plus lower-cased component name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetKey {
    pub host_id: String,
    pub component: String,
}

impl TargetKey {
    /// Build a key; the component name is normalised
    pub fn new(host_id: impl Into<String>, component: &str) -> Self {
        Self {
            host_id: host_id.into(),
            component: component.trim().to_lowercase(),
        }
    }
}

/// An upgrade holding a target
#[derive(Debug, Clone)]
pub struct ActiveUpgrade {
    pub host_id: String,
    pub component_name: String,
    pub target_version: String,
    pub actor: String,
    pub started_at: DateTime<Utc>,
    pub cancel: CancellationToken,
}

impl From<&ActiveUpgrade> for ActiveUpgradeView {
    fn from(a: &ActiveUpgrade) -> Self {
        Self {
            host_id: a.host_id.clone(),
            component_name: a.component_name.clone(),
            target_version: a.target_version.clone(),
            actor: a.actor.clone(),
            started_at: a.started_at,
        }
    }
}

type Registry = Arc<Mutex<HashMap<TargetKey, ActiveUpgrade>>>;

/// Registry of targets with an upgrade in flight
#[derive(Debug, Clone, Default)]
pub struct TargetLocks {
    inner: Registry,
}

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<TargetKey, ActiveUpgrade>> {
    // Entries stay consistent even if a holder panicked; keep going.
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TargetLocks {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key` for `upgrade`; `None` if the target is busy
    pub fn try_acquire(&self, key: TargetKey, upgrade: ActiveUpgrade) -> Option<TargetGuard> {
        let mut map = lock(&self.inner);
        if map.contains_key(&key) {
            return None;
        }
        map.insert(key.clone(), upgrade);
        Some(TargetGuard {
            key,
            inner: Arc::clone(&self.inner),
        })
    }

    /// Signal cancellation to the upgrade holding `key`
    pub fn cancel(&self, key: &TargetKey) -> bool {
        match lock(&self.inner).get(key) {
            Some(active) => {
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether `key` is held
    #[must_use]
    pub fn is_held(&self, key: &TargetKey) -> bool {
        lock(&self.inner).contains_key(key)
    }

    /// Snapshot of running upgrades, oldest first
    #[must_use]
    pub fn active(&self) -> Vec<ActiveUpgrade> {
        let mut active: Vec<_> = lock(&self.inner).values().cloned().collect();
        active.sort_by_key(|a| a.started_at);
        active
    }
}

/// Releases its target when dropped, including on panic
#[derive(Debug)]
pub struct TargetGuard {
    key: TargetKey,
    inner: Registry,
}

impl Drop for TargetGuard {
    fn drop(&mut self) {
        lock(&self.inner).remove(&self.key);
    }
}
