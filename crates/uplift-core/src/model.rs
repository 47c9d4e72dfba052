//! Inventory and audit data model

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use uplift_api::responses::{AuditRecordView, ComponentView, HostView};

/// Lifecycle status of a component, and the derived status of a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "Outdated")]
    Outdated,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Up to Date")]
    UpToDate,
    #[serde(rename = "Failed")]
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Outdated => "Outdated",
            Status::InProgress => "In Progress",
            Status::UpToDate => "Up to Date",
            Status::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// An installable software unit on a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub kind: String,
    pub current_version: String,
    pub target_version: String,
    /// Free-form severity summary, e.g. `2 Critical`
    pub vulnerabilities: String,
    pub install_path: String,
    pub status: Status,
}

impl Component {
    /// Case-insensitive name match
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

/// A managed machine and the components it hosts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: String,
    pub hostname: String,
    pub ip: String,
    pub environment: String,
    pub status: Status,
    pub components: Vec<Component>,
}

impl Host {
    /// Find a component by case-insensitive name
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.matches(name))
    }

    /// Mutable variant of [`Host::component`]
    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.matches(name))
    }

    /// Whether every component is up to date
    #[must_use]
    pub fn all_up_to_date(&self) -> bool {
        self.components.iter().all(|c| c.status == Status::UpToDate)
    }

    /// Aggregate status derived from the components
    ///
    /// `UpToDate` iff every component is; otherwise the current non-`UpToDate`
    /// status is kept, falling back to `Outdated`.
    #[must_use]
    pub fn derived_status(&self) -> Status {
        if self.all_up_to_date() {
            Status::UpToDate
        } else if self.status == Status::UpToDate {
            Status::Outdated
        } else {
            self.status
        }
    }

    /// Recompute and store the aggregate status
    pub fn refresh_status(&mut self) {
        self.status = self.derived_status();
    }
}

/// Outcome recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    Success,
    Failed,
    InProgress,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditOutcome::Success => "SUCCESS",
            AuditOutcome::Failed => "FAILED",
            AuditOutcome::InProgress => "IN_PROGRESS",
        };
        f.write_str(s)
    }
}

/// Audit record before the store assigns an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub host_id: String,
    pub hostname: String,
    pub component_name: String,
    pub from_version: String,
    pub to_version: String,
    pub outcome: AuditOutcome,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub output: String,
}

impl AuditEntry {
    /// Attach the id assigned by the store
    #[must_use]
    pub fn into_record(self, id: u64) -> AuditRecord {
        AuditRecord {
            id,
            host_id: self.host_id,
            hostname: self.hostname,
            component_name: self.component_name,
            from_version: self.from_version,
            to_version: self.to_version,
            outcome: self.outcome,
            actor: self.actor,
            timestamp: self.timestamp,
            output: self.output,
        }
    }
}

/// Immutable record of one upgrade attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: u64,
    pub host_id: String,
    pub hostname: String,
    pub component_name: String,
    pub from_version: String,
    pub to_version: String,
    #[serde(rename = "status")]
    pub outcome: AuditOutcome,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub output: String,
}

impl From<&Component> for ComponentView {
    fn from(c: &Component) -> Self {
        Self {
            name: c.name.clone(),
            kind: c.kind.clone(),
            current_version: c.current_version.clone(),
            target_version: c.target_version.clone(),
            vulnerabilities: c.vulnerabilities.clone(),
            install_path: c.install_path.clone(),
            status: c.status.to_string(),
        }
    }
}

impl From<&Host> for HostView {
    fn from(h: &Host) -> Self {
        Self {
            id: h.id.clone(),
            hostname: h.hostname.clone(),
            ip: h.ip.clone(),
            environment: h.environment.clone(),
            status: h.status.to_string(),
            components: h.components.iter().map(ComponentView::from).collect(),
        }
    }
}

impl From<&AuditRecord> for AuditRecordView {
    fn from(r: &AuditRecord) -> Self {
        Self {
            id: r.id,
            host_id: r.host_id.clone(),
            hostname: r.hostname.clone(),
            component_name: r.component_name.clone(),
            from_version: r.from_version.clone(),
            to_version: r.to_version.clone(),
            status: r.outcome.to_string(),
            actor: r.actor.clone(),
            timestamp: r.timestamp,
            output: r.output.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, status: Status) -> Component {
        Component {
            name: name.to_string(),
            kind: name.to_string(),
            current_version: "1.0".to_string(),
            target_version: "2.0".to_string(),
            vulnerabilities: "0".to_string(),
            install_path: format!("/opt/{name}"),
            status,
        }
    }

    fn host(components: Vec<Component>, status: Status) -> Host {
        Host {
            id: "1".to_string(),
            hostname: "app-01".to_string(),
            ip: "10.0.0.1".to_string(),
            environment: "Prod".to_string(),
            status,
            components,
        }
    }

    #[test]
    fn test_component_lookup_is_case_insensitive() {
        let h = host(vec![component("Java", Status::Outdated)], Status::Outdated);
        assert!(h.component("java").is_some());
        assert!(h.component(" JAVA ").is_some());
        assert!(h.component("tomcat").is_none());
    }

    #[test]
    fn test_derived_status_all_up_to_date() {
        let h = host(
            vec![
                component("Java", Status::UpToDate),
                component("Tomcat", Status::UpToDate),
            ],
            Status::Outdated,
        );
        assert_eq!(h.derived_status(), Status::UpToDate);
    }

    #[test]
    fn test_derived_status_keeps_prior_non_up_to_date() {
        let h = host(
            vec![
                component("Java", Status::UpToDate),
                component("Tomcat", Status::Failed),
            ],
            Status::Failed,
        );
        assert_eq!(h.derived_status(), Status::Failed);
    }

    #[test]
    fn test_derived_status_never_up_to_date_with_outdated_component() {
        let h = host(
            vec![
                component("Java", Status::UpToDate),
                component("Tomcat", Status::Outdated),
            ],
            Status::UpToDate,
        );
        assert_eq!(h.derived_status(), Status::Outdated);
    }

    #[test]
    fn test_audit_outcome_wire_format() {
        assert_eq!(
            serde_json::to_string(&AuditOutcome::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
        assert_eq!(AuditOutcome::Success.to_string(), "SUCCESS");
    }
}
