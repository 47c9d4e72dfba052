//! Core error types for uplift-core

use thiserror::Error;

/// Reasons a dispatch is rejected
///
/// A rejected dispatch changes no state and writes no audit record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Host id does not resolve
    #[error("host not found: {0}")]
    UnknownHost(String),

    /// No component on the host matches the name
    #[error("component {component} not found on host {host}")]
    UnknownComponent {
        /// Host id
        host: String,
        /// Requested component name
        component: String,
    },

    /// Malformed request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The same host/component already has an upgrade running
    #[error("upgrade already in progress for {component} on host {host}")]
    UpgradeInFlight {
        /// Host id
        host: String,
        /// Component name
        component: String,
    },

    /// Nothing running for the target (cancel only)
    #[error("no upgrade in progress for {component} on host {host}")]
    NotInFlight {
        /// Host id
        host: String,
        /// Component name
        component: String,
    },

    /// Inventory store could not be read
    #[error("inventory unavailable: {0}")]
    Store(String),
}

impl DispatchError {
    /// Stable reason code for API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::UnknownHost(_) => "UNKNOWN_HOST",
            DispatchError::UnknownComponent { .. } => "UNKNOWN_COMPONENT",
            DispatchError::InvalidRequest(_) => "INVALID_REQUEST",
            DispatchError::UpgradeInFlight { .. } => "UPGRADE_IN_FLIGHT",
            DispatchError::NotInFlight { .. } => "NOT_IN_FLIGHT",
            DispatchError::Store(_) => "STORE_UNAVAILABLE",
        }
    }
}

/// Errors from inventory and audit stores
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Host is not in the inventory
    #[error("host not found: {0}")]
    HostNotFound(String),

    /// Component is not on the host
    #[error("component {component} not found on host {host}")]
    ComponentNotFound {
        /// Host id
        host: String,
        /// Component name
        component: String,
    },

    /// Host id already taken
    #[error("host already exists: {0}")]
    HostAlreadyExists(String),

    /// Backing store failed
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur in core engine operations
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Host not found in the inventory
    #[error("host not found: {0}")]
    HostNotFound(String),

    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Upgrade task panicked or was aborted
    #[error("upgrade task failed: {0}")]
    TaskFailed(String),

    /// Actor communication error
    #[error("actor communication error: {0}")]
    ActorError(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),
}
