//! Inventory seed configuration
//!
//! Hosts and their components are declared in the daemon's TOML file and loaded
//! into the inventory store at start-up.

use serde::{Deserialize, Serialize};

use crate::model::{Component, Host, Status};

/// Configuration for a single managed host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Unique host identifier
    pub id: String,
    /// Hostname
    pub hostname: String,
    /// IP address the remediation tool connects to
    pub ip: String,
    /// Owning environment (`Prod`, `Non-Prod`, ...)
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Installed components; a default Java component is used when empty
    #[serde(default, rename = "component")]
    pub components: Vec<ComponentConfig>,
}

fn default_environment() -> String {
    "Non-Prod".to_string()
}

/// Configuration for a component installed on a host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub current_version: String,
    pub target_version: String,
    #[serde(default = "default_vulnerabilities")]
    pub vulnerabilities: String,
    pub install_path: String,
    #[serde(default = "default_status")]
    pub status: Status,
}

fn default_vulnerabilities() -> String {
    "0".to_string()
}

fn default_status() -> Status {
    Status::Outdated
}

impl ComponentConfig {
    /// Component provisioned on hosts that declare none
    #[must_use]
    pub fn default_java() -> Self {
        Self {
            name: "Java".to_string(),
            kind: "Java".to_string(),
            current_version: "1.8.0.211".to_string(),
            target_version: "11.0.12".to_string(),
            vulnerabilities: "2 Critical".to_string(),
            install_path: "/opt/verizon/java".to_string(),
            status: Status::Outdated,
        }
    }
}

impl From<ComponentConfig> for Component {
    fn from(c: ComponentConfig) -> Self {
        Self {
            name: c.name,
            kind: c.kind,
            current_version: c.current_version,
            target_version: c.target_version,
            vulnerabilities: c.vulnerabilities,
            install_path: c.install_path,
            status: c.status,
        }
    }
}

impl HostConfig {
    /// Build the inventory host, deriving its status from the components
    #[must_use]
    pub fn into_host(self) -> Host {
        let components = if self.components.is_empty() {
            vec![ComponentConfig::default_java()]
        } else {
            self.components
        };

        let mut host = Host {
            id: self.id,
            hostname: self.hostname,
            ip: self.ip,
            environment: self.environment,
            status: Status::Outdated,
            components: components.into_iter().map(Component::from).collect(),
        };
        host.refresh_status();
        host
    }
}
