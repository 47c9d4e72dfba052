//! Pass-through executor: waits, then reports success

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::job::UpgradeJob;
use crate::result::ExecutionResult;
use crate::traits::AutomationExecutor;

/// Executor that never touches the host
///
/// Sleeps for a fixed delay and reports success unconditionally. Meant for demos and
/// tests, never for production decisions.
#[derive(Debug, Clone)]
pub struct PassThroughExecutor {
    delay: Duration,
}

impl PassThroughExecutor {
    /// Create a pass-through executor with the given delay
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for PassThroughExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl AutomationExecutor for PassThroughExecutor {
    #[instrument(skip(self, cancel), fields(host = %job.hostname, component = %job.component))]
    async fn run(&self, job: &UpgradeJob, cancel: &CancellationToken) -> ExecutionResult {
        let start = Instant::now();

        tokio::select! {
            () = tokio::time::sleep(self.delay) => {}
            () = cancel.cancelled() => {
                return ExecutionResult::failure(None, "", "upgrade cancelled", start.elapsed());
            }
        }

        info!(target_version = %job.target_version, "pass-through upgrade reported success");

        ExecutionResult::success(
            format!(
                "pass-through: {} {} on {} ({})",
                job.software_type, job.target_version, job.host_addr, job.install_path
            ),
            start.elapsed(),
        )
    }

    fn executor_type(&self) -> &'static str {
        "pass-through"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> UpgradeJob {
        UpgradeJob {
            hostname: "app-01".to_string(),
            host_addr: "10.0.0.5".to_string(),
            component: "Java".to_string(),
            software_type: "Java".to_string(),
            install_path: "/opt/java".to_string(),
            target_version: "11.0.12".to_string(),
        }
    }

    #[tokio::test]
    async fn test_pass_through_succeeds() {
        let executor = PassThroughExecutor::new(Duration::from_millis(10));
        let result = executor.run(&job(), &CancellationToken::new()).await;

        assert!(result.is_success());
        assert!(result.captured_output.contains("11.0.12"));
    }

    #[tokio::test]
    async fn test_pass_through_honours_cancel() {
        let executor = PassThroughExecutor::new(Duration::from_secs(60));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = executor.run(&job(), &cancel).await;

        assert!(!result.is_success());
        assert_eq!(result.error.as_deref(), Some("upgrade cancelled"));
    }
}
