//! Configuration loading and types

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use eyre::{WrapErr, bail};
use serde::{Deserialize, Serialize};
use uplift_core::HostConfig;
use uplift_core::audit::DEFAULT_MAX_OUTPUT_BYTES;

/// Top-level configuration for the uplift daemon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Daemon server settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Remediation tool settings
    #[serde(default)]
    pub automation: AutomationConfig,
    /// Inventory seed
    #[serde(default)]
    pub host: Vec<HostConfig>,
}

/// Daemon server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Address and port to bind to
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,
    /// Audit trail file; records are kept in memory when unset
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
    /// Capacity of the event broadcast channel
    #[serde(default = "default_event_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
            log_json: false,
            audit_log: None,
            event_channel_capacity: default_event_capacity(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8081".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_capacity() -> usize {
    256
}

/// Which executor runs upgrades
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutomationMode {
    /// Run the configured playbook
    #[default]
    Playbook,
    /// Wait and report success without touching the host
    PassThrough,
}

/// Remediation tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    #[serde(default)]
    pub mode: AutomationMode,
    /// Tool binary
    #[serde(default = "default_program")]
    pub program: String,
    /// Playbook passed as the first argument
    #[serde(default = "default_playbook")]
    pub playbook: PathBuf,
    /// Binary repository handed to the playbook
    #[serde(default = "default_repo_url")]
    pub repo_url: String,
    /// Upper bound on one tool run
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Bound on tool output kept in memory and in audit records
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// Delay used by the pass-through executor
    #[serde(default = "default_pass_through_delay_ms")]
    pub pass_through_delay_ms: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            mode: AutomationMode::default(),
            program: default_program(),
            playbook: default_playbook(),
            repo_url: default_repo_url(),
            timeout_secs: default_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
            pass_through_delay_ms: default_pass_through_delay_ms(),
        }
    }
}

fn default_program() -> String {
    "ansible-playbook".to_string()
}

fn default_playbook() -> PathBuf {
    PathBuf::from("ansible/site.yml")
}

fn default_repo_url() -> String {
    "http://repo.example.com/middleware/binaries".to_string()
}

fn default_timeout_secs() -> u64 {
    1800
}

fn default_max_output_bytes() -> usize {
    DEFAULT_MAX_OUTPUT_BYTES
}

fn default_pass_through_delay_ms() -> u64 {
    2000
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read, parsed or fails validation
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .wrap_err_with(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, `UPLIFT_CONFIG`, default paths, or use defaults
    ///
    /// # Errors
    /// Returns error if a config file exists but is invalid
    pub fn load_default(explicit: Option<&Path>) -> eyre::Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        // Check environment variable
        if let Ok(path) = std::env::var("UPLIFT_CONFIG") {
            return Self::load(Path::new(&path));
        }

        // Try common paths
        let mut paths = vec![
            PathBuf::from("uplift.toml"),
            PathBuf::from("/etc/uplift/uplift.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("uplift/uplift.toml"));
        }

        for path in paths {
            if path.exists() {
                return Self::load(&path);
            }
        }

        // Return default config if no file found
        tracing::warn!("no config file found, using defaults");
        Ok(Config::default())
    }

    /// Reject settings the engine cannot run with
    ///
    /// # Errors
    /// Returns error describing the first invalid setting
    pub fn validate(&self) -> eyre::Result<()> {
        if self.automation.timeout_secs == 0 {
            bail!("automation.timeout_secs must be greater than zero");
        }
        if self.automation.max_output_bytes == 0 {
            bail!("automation.max_output_bytes must be greater than zero");
        }
        if self.daemon.event_channel_capacity == 0 {
            bail!("daemon.event_channel_capacity must be greater than zero");
        }

        let mut seen = HashSet::new();
        for host in &self.host {
            if host.id.trim().is_empty() {
                bail!("host {} has an empty id", host.hostname);
            }
            if !seen.insert(host.id.as_str()) {
                bail!("duplicate host id {}", host.id);
            }
            let mut names = HashSet::new();
            for component in &host.components {
                if !names.insert(component.name.to_lowercase()) {
                    bail!("host {} declares component {} twice", host.id, component.name);
                }
            }
        }
        Ok(())
    }
}
