//! Playbook executor: drives `ansible-playbook` against a single host

use std::path::PathBuf;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::ExecError;
use crate::job::UpgradeJob;
use crate::process::ProcessRunner;
use crate::result::ExecutionResult;
use crate::traits::AutomationExecutor;

/// Runs the site playbook with the job encoded as extra vars
///
/// The argument vector is a pure function of the job and the executor settings:
///
/// ```text
/// <program> <playbook> -i <host_addr>, --extra-vars "target_software=.. target_version=.. install_path=.. repo_url=.."
/// ```
#[derive(Debug, Clone)]
pub struct PlaybookExecutor {
    program: String,
    playbook: PathBuf,
    repo_url: String,
    runner: ProcessRunner,
}

impl PlaybookExecutor {
    /// Create a playbook executor
    ///
    /// # Errors
    /// Returns `ExecError::Config` if the program name is empty.
    pub fn new(
        program: impl Into<String>,
        playbook: impl Into<PathBuf>,
        repo_url: impl Into<String>,
        runner: ProcessRunner,
    ) -> Result<Self, ExecError> {
        let program = program.into();
        if program.trim().is_empty() {
            return Err(ExecError::Config("automation program is empty".to_string()));
        }
        Ok(Self {
            program,
            playbook: playbook.into(),
            repo_url: repo_url.into(),
            runner,
        })
    }

    /// Extra vars string passed to the playbook
    #[must_use]
    pub fn extra_vars(&self, job: &UpgradeJob) -> String {
        format!(
            "target_software={} target_version={} install_path={} repo_url={}",
            job.software_type, job.target_version, job.install_path, self.repo_url
        )
    }

    /// Full argument vector for `job`
    #[must_use]
    pub fn command_args(&self, job: &UpgradeJob) -> Vec<String> {
        vec![
            self.playbook.display().to_string(),
            "-i".to_string(),
            // Trailing comma makes ansible treat the value as an inline inventory.
            format!("{},", job.host_addr),
            "--extra-vars".to_string(),
            self.extra_vars(job),
        ]
    }
}

#[async_trait]
impl AutomationExecutor for PlaybookExecutor {
    #[instrument(skip(self, cancel), fields(host = %job.hostname, component = %job.component))]
    async fn run(&self, job: &UpgradeJob, cancel: &CancellationToken) -> ExecutionResult {
        let args = self.command_args(job);

        info!(
            program = %self.program,
            target_version = %job.target_version,
            timeout = ?self.runner.timeout(),
            "starting playbook"
        );

        match self.runner.run(&self.program, &args, cancel).await {
            Ok(out) => {
                if out.truncated {
                    warn!(kept_bytes = out.output.len(), "playbook output truncated");
                }
                let result = ExecutionResult::from(out);
                if result.is_success() {
                    info!(duration = ?result.duration, "playbook succeeded");
                } else {
                    error!(
                        exit_status = ?result.exit_status,
                        error = ?result.error,
                        "playbook failed"
                    );
                }
                result
            }
            Err(e) => {
                error!(error = %e, "playbook could not be run");
                ExecutionResult::launch_failed(&e)
            }
        }
    }

    fn executor_type(&self) -> &'static str {
        "playbook"
    }
}
