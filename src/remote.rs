use std::path::Path;
use std::time::Duration;

use crate::error::{DeployError, DeployResult};
use crate::logging::RunLog;

/// What to do when a remote command exits non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// Stop the plan and fail the run.
    Abort,
    /// Log and continue. Used for teardown of resources that may
    /// not exist.
    Ignore,
}

/// One shell command to run on the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub description: String,
    pub command: String,
    pub on_failure: OnFailure,
}

impl RemoteCommand {
    #[must_use]
    pub fn new(description: &str, command: &str) -> Self {
        Self {
            description: description.to_string(),
            command: command.to_string(),
            on_failure: OnFailure::Abort,
        }
    }

    /// A command whose failure is logged and skipped.
    #[must_use]
    pub fn tolerant(description: &str, command: &str) -> Self {
        Self {
            on_failure: OnFailure::Ignore,
            ..Self::new(description, command)
        }
    }
}

/// Authenticated channel to the remote host.
pub trait Transport {
    /// Run a no-op command within `timeout`. Fails with
    /// [`DeployError::Connectivity`].
    fn check(&self, timeout: Duration) -> DeployResult<()>;

    /// Run a shell command and capture its stdout.
    fn exec(&self, command: &str) -> DeployResult<String>;

    /// Write `content` to a root-owned remote file.
    fn write_file(&self, content: &str, remote_path: &str) -> DeployResult<()>;

    /// Mirror `local` into `remote`, deleting remote files that no
    /// longer exist locally. Fails with [`DeployError::Transfer`].
    fn sync_dir(&self, local: &Path, remote: &str) -> DeployResult<()>;
}

/// Execute `plan` in order. The first failing [`OnFailure::Abort`]
/// step stops the plan.
pub fn run_plan(transport: &dyn Transport, plan: &[RemoteCommand], log: &RunLog) -> DeployResult<()> {
    for step in plan {
        log.info(&format!("  {}", step.description));
        match transport.exec(&step.command) {
            Ok(_) => {}
            Err(e) if step.on_failure == OnFailure::Ignore => {
                log.info(&format!("  {} skipped: {e}", step.description));
            }
            Err(e) => {
                return Err(DeployError::RemoteCommand {
                    step: step.description.clone(),
                    source: Box::new(e),
                });
            }
        }
    }
    Ok(())
}
