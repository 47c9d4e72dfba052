//! uplift-exec: Automation executor
//!
//! Runs the external remediation tool against a single host and converts its raw
//! process outcome into a typed [`ExecutionResult`].

pub mod error;
pub mod job;
pub mod passthrough;
pub mod playbook;
pub mod process;
pub mod result;
pub mod traits;

pub use error::ExecError;
pub use job::UpgradeJob;
pub use passthrough::PassThroughExecutor;
pub use playbook::PlaybookExecutor;
pub use process::{CommandOutput, ProcessRunner, Termination};
pub use result::{ExecutionResult, TRUNCATION_MARKER, bound_output};
pub use traits::AutomationExecutor;
