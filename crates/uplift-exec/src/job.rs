//! Input for a single remediation run

use serde::{Deserialize, Serialize};

/// Everything the remediation tool needs to upgrade one component on one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeJob {
    /// Hostname, used for logging only
    pub hostname: String,
    /// Network address the tool connects to
    pub host_addr: String,
    /// Component name as recorded in the inventory
    pub component: String,
    /// Software type tag (`Java`, `Tomcat`, ...)
    pub software_type: String,
    /// Filesystem install location on the host
    pub install_path: String,
    /// Version to install
    pub target_version: String,
}
