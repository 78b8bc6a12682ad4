use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cmd;
use crate::config::RemoteTarget;
use crate::error::{DeployError, DeployResult};
use crate::remote::Transport;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// SSH session wrapper for executing commands and transferring
/// files to a remote host.
///
/// Every invocation is non-interactive (`BatchMode=yes`) and uses
/// the configured private key.
pub struct SshSession {
    host: String,
    user: String,
    key: PathBuf,
    connect_timeout: Duration,
}

impl SshSession {
    #[must_use]
    pub fn new(target: &RemoteTarget) -> Self {
        Self {
            host: target.host.clone(),
            user: target.user.clone(),
            key: target.key_path.clone(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn build_ssh_args(&self, timeout: Duration, command: &str) -> Vec<String> {
        let mut args = self.ssh_base_args(timeout);
        args.push(self.destination());
        args.push(command.to_string());
        args
    }

    fn ssh_base_args(&self, timeout: Duration) -> Vec<String> {
        vec![
            "-i".to_string(),
            self.key.to_string_lossy().to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", timeout.as_secs().max(1)),
        ]
    }

    /// `rsync` arguments mirroring `local` into `remote`.
    fn rsync_args(&self, local: &Path, remote: &str) -> Vec<String> {
        let ssh = std::iter::once("ssh".to_string())
            .chain(
                self.ssh_base_args(self.connect_timeout)
                    .iter()
                    .map(String::as_str)
                    .map(rsync_quote),
            )
            .collect::<Vec<_>>()
            .join(" ");
        vec![
            "-az".to_string(),
            "--delete".to_string(),
            "--exclude".to_string(),
            ".git".to_string(),
            "-e".to_string(),
            ssh,
            format!("{}/", local.to_string_lossy().trim_end_matches('/')),
            format!("{}:{}/", self.destination(), remote.trim_end_matches('/')),
        ]
    }
}

/// Quote one word of an `rsync -e` command. rsync splits that
/// string on spaces and honors single quotes, where `''` stands for
/// a literal quote. Backslashes are not escapes.
fn rsync_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@+,".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "''"))
    }
}

impl Transport for SshSession {
    fn check(&self, timeout: Duration) -> DeployResult<()> {
        let args = self.build_ssh_args(timeout, "true");
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run("ssh", &refs)
            .map(|_| ())
            .map_err(|e| DeployError::Connectivity(self.destination(), Box::new(e)))
    }

    fn exec(&self, command: &str) -> DeployResult<String> {
        let args = self.build_ssh_args(self.connect_timeout, command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run("ssh", &refs)
    }

    fn write_file(&self, content: &str, remote_path: &str) -> DeployResult<()> {
        let command = format!("sudo tee {remote_path} > /dev/null");
        let args = self.build_ssh_args(self.connect_timeout, &command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run_with_stdin("ssh", &refs, content.as_bytes())?;
        Ok(())
    }

    fn sync_dir(&self, local: &Path, remote: &str) -> DeployResult<()> {
        let args = self.rsync_args(local, remote);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run("rsync", &refs).map(|_| ()).map_err(|e| match e {
            DeployError::CommandFailed { stderr, .. } => DeployError::Transfer(stderr),
            other => DeployError::Transfer(other.to_string()),
        })
    }
}
