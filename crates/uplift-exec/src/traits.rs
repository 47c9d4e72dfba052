//! Automation executor trait

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::job::UpgradeJob;
use crate::result::ExecutionResult;

/// Runs a remediation against one host
///
/// Implementations never return an error: launch failures, non-zero exits, timeouts
/// and cancellation all come back as a failed [`ExecutionResult`].
#[async_trait]
pub trait AutomationExecutor: Send + Sync {
    /// Run the remediation and wait for it to finish
    async fn run(&self, job: &UpgradeJob, cancel: &CancellationToken) -> ExecutionResult;

    /// Short name used in logs
    fn executor_type(&self) -> &'static str;
}
