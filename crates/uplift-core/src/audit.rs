//! Audit trail writer

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};
use uplift_exec::{TRUNCATION_MARKER, bound_output};

use crate::error::StoreError;
use crate::model::{AuditEntry, AuditOutcome, AuditRecord};
use crate::store::AuditStore;

/// Default bound on stored tool output, in bytes
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 2000;

/// Writes and reads upgrade audit records
pub struct AuditTrail {
    store: Arc<dyn AuditStore>,
    max_output_bytes: usize,
}

impl AuditTrail {
    /// Create a trail over `store`, bounding output at `max_output_bytes`
    pub fn new(store: Arc<dyn AuditStore>, max_output_bytes: usize) -> Self {
        Self {
            store,
            max_output_bytes,
        }
    }

    /// Join a headline and tool output into audit text within the output bound
    ///
    /// The headline is kept whole; the body gives up its head first.
    #[must_use]
    pub fn compose(&self, headline: &str, body: &str) -> String {
        if body.is_empty() {
            return bound_output(headline, self.max_output_bytes);
        }
        let room = self.max_output_bytes.saturating_sub(headline.len() + 1);
        if body.len() > room && room <= TRUNCATION_MARKER.len() {
            return bound_output(headline, self.max_output_bytes);
        }
        format!("{headline}\n{}", bound_output(body, room))
    }

    /// Append one record
    ///
    /// # Errors
    /// Returns the store's error if the record could not be persisted. The caller
    /// decides how to report it; nothing is retried here.
    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        host_id: &str,
        hostname: &str,
        component_name: &str,
        from_version: &str,
        to_version: &str,
        outcome: AuditOutcome,
        actor: &str,
        output: &str,
    ) -> Result<AuditRecord, StoreError> {
        let entry = AuditEntry {
            host_id: host_id.to_string(),
            hostname: hostname.to_string(),
            component_name: component_name.to_string(),
            from_version: from_version.to_string(),
            to_version: to_version.to_string(),
            outcome,
            actor: actor.to_string(),
            timestamp: Utc::now(),
            output: bound_output(output, self.max_output_bytes),
        };

        match self.store.append(entry).await {
            Ok(record) => {
                debug!(id = record.id, host = %host_id, outcome = %outcome, "audit record appended");
                Ok(record)
            }
            Err(e) => {
                error!(host = %host_id, component = %component_name, error = %e, "audit write failed");
                Err(e)
            }
        }
    }

    /// History for one host (most recent first), or everything when `host_id` is `None`
    ///
    /// # Errors
    /// Returns the store's error if the history cannot be read.
    pub async fn history(&self, host_id: Option<&str>) -> Result<Vec<AuditRecord>, StoreError> {
        match host_id {
            Some(id) => self.store.list_for_host(id).await,
            None => self.store.list_all().await,
        }
    }
}
