//! Result types for remediation runs

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ExecError;
use crate::process::{CommandOutput, Termination};

/// Prepended to output that was cut
pub const TRUNCATION_MARKER: &str = "[output truncated]\n";

/// Outcome of one remediation tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit status of the tool, `None` if it never exited normally
    pub exit_status: Option<i32>,
    /// Combined stdout/stderr, bounded
    pub captured_output: String,
    /// Failure description, `None` on success
    pub error: Option<String>,
    /// Wall time spent in the tool
    pub duration: Duration,
}

impl ExecutionResult {
    /// Successful run
    pub fn success(output: impl Into<String>, duration: Duration) -> Self {
        Self {
            exit_status: Some(0),
            captured_output: output.into(),
            error: None,
            duration,
        }
    }

    /// Failed run
    pub fn failure(
        exit_status: Option<i32>,
        output: impl Into<String>,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            exit_status,
            captured_output: output.into(),
            error: Some(error.into()),
            duration,
        }
    }

    /// Tool could not be launched at all
    #[must_use]
    pub fn launch_failed(err: &ExecError) -> Self {
        Self::failure(None, String::new(), err.to_string(), Duration::ZERO)
    }

    /// Check if the tool exited with status 0
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.exit_status == Some(0)
    }

}

impl From<CommandOutput> for ExecutionResult {
    fn from(out: CommandOutput) -> Self {
        match out.termination {
            Termination::Exited(0) => Self::success(out.output, out.duration),
            Termination::Exited(code) => Self::failure(
                Some(code),
                out.output,
                format!("tool exited with status {code}"),
                out.duration,
            ),
            Termination::Signalled => Self::failure(
                None,
                out.output,
                "tool terminated by signal",
                out.duration,
            ),
            Termination::TimedOut(limit) => Self::failure(
                None,
                out.output,
                format!("tool timed out after {limit:?}"),
                out.duration,
            ),
            Termination::Cancelled => {
                Self::failure(None, out.output, "upgrade cancelled", out.duration)
            }
        }
    }
}

/// Bound `text` to at most `max_bytes`, keeping the tail
///
/// A playbook run prints its recap and failing task at the end.
/// A marker line is prepended when anything was cut.
#[must_use]
pub fn bound_output(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    // too small for the marker: plain tail
    if max_bytes <= TRUNCATION_MARKER.len() {
        return tail(text, max_bytes).to_string();
    }
    format!(
        "{TRUNCATION_MARKER}{}",
        tail(text, max_bytes - TRUNCATION_MARKER.len())
    )
}

/// Last `max_bytes` of `text` at most, on a char boundary
fn tail(text: &str, max_bytes: usize) -> &str {
    let mut start = text.len().saturating_sub(max_bytes);
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
