//! Error types for uplift-exec

use thiserror::Error;

/// Errors raised by the process runner
///
/// These never cross the [`AutomationExecutor`](crate::traits::AutomationExecutor)
/// boundary; executors fold them into a failed
/// [`ExecutionResult`](crate::result::ExecutionResult).
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// The program could not be started
    #[error("failed to spawn {program}: {reason}")]
    Spawn {
        /// Program that was launched
        program: String,
        /// OS error description
        reason: String,
    },

    /// I/O error while waiting on the child
    #[error("I/O error: {0}")]
    Io(String),

    /// Invalid executor configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ExecError {
    /// Whether the failure happened before the tool ever ran
    #[must_use]
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, ExecError::Spawn { .. } | ExecError::Config(_))
    }
}
