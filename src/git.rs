use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::cmd;
use crate::config::{Credential, DeploymentConfig};
use crate::error::{DeployError, DeployResult};
use crate::logging::RunLog;

/// Git operations needed to bring a working copy to a branch tip.
pub trait Git {
    fn fetch(&self, dir: &Path, credential: &Credential) -> DeployResult<()>;

    fn checkout(&self, dir: &Path, branch: &str) -> DeployResult<()>;

    fn pull(&self, dir: &Path, branch: &str, credential: &Credential) -> DeployResult<()>;

    fn clone_repo(
        &self,
        url: &str,
        branch: &str,
        dest: &Path,
        credential: &Credential,
    ) -> DeployResult<()>;
}

/// [`Git`] backed by the `git` binary.
///
/// The token is passed as an HTTP `Authorization` header through
/// `GIT_CONFIG_*` environment variables, so it never appears in
/// the URL, the argument list, or `.git/config`.
pub struct GitCli;

impl GitCli {
    fn run(dir: Option<&Path>, args: &[&str], credential: Option<&Credential>) -> DeployResult<()> {
        let dir_str = dir.map(|d| d.to_string_lossy().to_string());
        let mut full: Vec<&str> = Vec::new();
        if let Some(d) = &dir_str {
            full.push("-C");
            full.push(d);
        }
        full.extend_from_slice(args);

        let header = credential.map(auth_header);
        let mut env = vec![("GIT_TERMINAL_PROMPT", "0")];
        if let Some(h) = &header {
            env.push(("GIT_CONFIG_COUNT", "1"));
            env.push(("GIT_CONFIG_KEY_0", "http.extraHeader"));
            env.push(("GIT_CONFIG_VALUE_0", h.as_str()));
        }

        cmd::run_with_env("git", &full, &env).map(|_| ())
    }
}

impl Git for GitCli {
    fn fetch(&self, dir: &Path, credential: &Credential) -> DeployResult<()> {
        Self::run(Some(dir), &["fetch", "--prune", "origin"], Some(credential))
    }

    fn checkout(&self, dir: &Path, branch: &str) -> DeployResult<()> {
        Self::run(Some(dir), &["checkout", branch], None)
    }

    fn pull(&self, dir: &Path, branch: &str, credential: &Credential) -> DeployResult<()> {
        Self::run(
            Some(dir),
            &["pull", "--ff-only", "origin", branch],
            Some(credential),
        )
    }

    fn clone_repo(
        &self,
        url: &str,
        branch: &str,
        dest: &Path,
        credential: &Credential,
    ) -> DeployResult<()> {
        let dest_str = dest.to_string_lossy();
        Self::run(
            None,
            &["clone", "--branch", branch, url, &dest_str],
            Some(credential),
        )
    }
}

/// `Authorization: Basic ...` header for token authentication over
/// HTTPS.
#[must_use]
pub fn auth_header(credential: &Credential) -> String {
    let pair = format!("x-access-token:{}", credential.expose());
    format!("Authorization: Basic {}", STANDARD.encode(pair))
}

/// Make sure `workdir/<repo name>` exists and sits at the tip of
/// the configured branch. Returns the working copy path.
///
/// An existing directory is updated with fetch, checkout and pull;
/// otherwise the repository is cloned.
pub fn sync_repository(
    git: &dyn Git,
    config: &DeploymentConfig,
    workdir: &Path,
    log: &RunLog,
) -> DeployResult<PathBuf> {
    let dir = workdir.join(config.repo_name());
    let branch = &config.branch;

    if dir.is_dir() {
        log.info(&format!(
            "Repository exists at {}, updating to '{branch}'",
            dir.display()
        ));
        git.fetch(&dir, &config.token)
            .map_err(|e| DeployError::GitFetch(branch.clone(), Box::new(e)))?;
        git.checkout(&dir, branch)
            .map_err(|e| DeployError::GitCheckout(branch.clone(), Box::new(e)))?;
        git.pull(&dir, branch, &config.token)
            .map_err(|e| DeployError::GitPull(branch.clone(), Box::new(e)))?;
    } else {
        log.info(&format!(
            "Cloning {} (branch '{branch}') into {}",
            config.repo_url,
            dir.display()
        ));
        git.clone_repo(&config.repo_url, branch, &dir, &config.token)
            .map_err(|e| DeployError::GitClone(config.repo_url.clone(), Box::new(e)))?;
        if !dir.is_dir() {
            return Err(DeployError::GitClone(
                config.repo_url.clone(),
                Box::new(DeployError::Other(format!(
                    "no working copy at {}",
                    dir.display()
                ))),
            ));
        }
    }

    log.info(&format!("Repository ready at {}", dir.display()));
    Ok(dir)
}
