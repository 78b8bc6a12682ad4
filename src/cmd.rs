use std::io::Write;
use std::process::{Command, Output, Stdio};

use crate::error::{DeployError, DeployResult};

/// Run a command and capture its output. Fails if the command
/// returns a non-zero exit code.
pub fn run(program: &str, args: &[&str]) -> DeployResult<String> {
    run_with(program, args, &[], None)
}

/// Run a command with extra environment variables.
///
/// The variables are not part of the formatted command line, so
/// credentials passed this way never reach logs or error messages.
pub fn run_with_env(program: &str, args: &[&str], env: &[(&str, &str)]) -> DeployResult<String> {
    run_with(program, args, env, None)
}

/// Run a command that pipes its stdin from a byte slice.
pub fn run_with_stdin(program: &str, args: &[&str], stdin_data: &[u8]) -> DeployResult<String> {
    run_with(program, args, &[], Some(stdin_data))
}

/// Check if a command exists on PATH.
#[must_use]
pub fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

fn run_with(
    program: &str,
    args: &[&str],
    env: &[(&str, &str)],
    stdin_data: Option<&[u8]>,
) -> DeployResult<String> {
    let command = format_command(program, args);
    tracing::debug!(%command, "running");

    let output = spawn(program, args, env, stdin_data)?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::debug!(%command, %stderr, "command failed");
        Err(DeployError::CommandFailed {
            command,
            status: output.status,
            stderr,
        })
    }
}

fn spawn(
    program: &str,
    args: &[&str],
    env: &[(&str, &str)],
    stdin_data: Option<&[u8]>,
) -> DeployResult<Output> {
    let mut child = Command::new(program)
        .args(args)
        .envs(env.iter().copied())
        .stdin(if stdin_data.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DeployError::CommandNotFound(program.to_string())
            } else {
                DeployError::Io(e)
            }
        })?;

    if let (Some(data), Some(stdin)) = (stdin_data, &mut child.stdin) {
        stdin.write_all(data)?;
    }
    drop(child.stdin.take());

    Ok(child.wait_with_output()?)
}

fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| (*a).to_string()));
    parts.join(" ")
}
