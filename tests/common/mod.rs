//! Fake git, remote host and probe used to drive the pipeline
//! without a network.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use hoist::config::{Credential, DeploymentConfig, RawInputs};
use hoist::container::HealthGate;
use hoist::error::{DeployError, DeployResult};
use hoist::git::Git;
use hoist::probe::HealthProbe;
use hoist::remote::Transport;
use hoist::{Pipeline, RunLog};

pub const RUNNING_APP: &str = r#"{"ID":"3f2a","Image":"hoist-app:latest","Names":"hoist-app","Ports":"127.0.0.1:3000->3000/tcp","State":"running","Status":"Up 2 seconds"}"#;

#[derive(Default)]
pub struct GitState {
    pub ops: Vec<String>,
    pub credentials: Vec<String>,
    pub fail: Option<&'static str>,
    /// Files created inside the checkout on clone.
    pub files: Vec<(&'static str, &'static str)>,
}

#[derive(Clone, Default)]
pub struct FakeGit(pub Rc<RefCell<GitState>>);

impl FakeGit {
    pub fn with_files(files: Vec<(&'static str, &'static str)>) -> Self {
        let git = Self::default();
        git.0.borrow_mut().files = files;
        git
    }

    pub fn failing(op: &'static str) -> Self {
        let git = Self::default();
        git.0.borrow_mut().fail = Some(op);
        git
    }

    pub fn ops(&self) -> Vec<String> {
        self.0.borrow().ops.clone()
    }

    fn record(&self, op: &str, detail: String, credential: Option<&Credential>) -> DeployResult<()> {
        let mut state = self.0.borrow_mut();
        state.ops.push(format!("{op} {detail}"));
        if let Some(c) = credential {
            state.credentials.push(c.expose().to_string());
        }
        if state.fail == Some(op) {
            return Err(DeployError::Other(format!("{op} failed")));
        }
        Ok(())
    }
}

impl Git for FakeGit {
    fn fetch(&self, dir: &Path, credential: &Credential) -> DeployResult<()> {
        self.record("fetch", dir.display().to_string(), Some(credential))
    }

    fn checkout(&self, _dir: &Path, branch: &str) -> DeployResult<()> {
        self.record("checkout", branch.to_string(), None)
    }

    fn pull(&self, _dir: &Path, branch: &str, credential: &Credential) -> DeployResult<()> {
        self.record("pull", branch.to_string(), Some(credential))
    }

    fn clone_repo(
        &self,
        url: &str,
        branch: &str,
        dest: &Path,
        credential: &Credential,
    ) -> DeployResult<()> {
        self.record("clone", format!("{url} {branch}"), Some(credential))?;
        std::fs::create_dir_all(dest)?;
        for (name, content) in &self.0.borrow().files {
            std::fs::write(dest.join(name), content)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct HostState {
    pub unreachable: bool,
    /// Make `sync_dir` fail like an interrupted rsync.
    pub transfer_fails: bool,
    pub commands: Vec<String>,
    pub files: BTreeMap<String, String>,
    pub links: BTreeMap<String, String>,
    pub synced: Vec<(PathBuf, String)>,
    /// Substrings that make a matching command fail.
    pub failing: Vec<&'static str>,
    /// Output of `docker ps`.
    pub containers: String,
}

/// In-memory remote host. Tracks written files and symlinks so
/// repeated runs can be compared.
#[derive(Clone, Default)]
pub struct FakeHost(pub Rc<RefCell<HostState>>);

impl FakeHost {
    pub fn running() -> Self {
        let host = Self::default();
        host.0.borrow_mut().containers = RUNNING_APP.to_string();
        host
    }

    pub fn unreachable() -> Self {
        let host = Self::default();
        host.0.borrow_mut().unreachable = true;
        host
    }

    pub fn broken_transfer(self) -> Self {
        self.0.borrow_mut().transfer_fails = true;
        self
    }

    pub fn failing(self, pattern: &'static str) -> Self {
        self.0.borrow_mut().failing.push(pattern);
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.0.borrow().commands.clone()
    }

    pub fn ran(&self, needle: &str) -> bool {
        self.0.borrow().commands.iter().any(|c| c.contains(needle))
    }
}

impl Transport for FakeHost {
    fn check(&self, _timeout: Duration) -> DeployResult<()> {
        let mut state = self.0.borrow_mut();
        state.commands.push("check".to_string());
        if state.unreachable {
            return Err(DeployError::Connectivity(
                "deploy@fake".into(),
                Box::new(DeployError::Other("Connection timed out".into())),
            ));
        }
        Ok(())
    }

    fn exec(&self, command: &str) -> DeployResult<String> {
        let mut state = self.0.borrow_mut();
        state.commands.push(command.to_string());

        if state.failing.iter().any(|p| command.contains(p)) {
            return Err(DeployError::Other(format!("exit 1: {command}")));
        }

        if let Some(rest) = command.strip_prefix("sudo ln -sfn ") {
            let mut parts = rest.split_whitespace();
            if let (Some(target), Some(link)) = (parts.next(), parts.next()) {
                state.links.insert(link.to_string(), target.to_string());
            }
        }
        if let Some(path) = command.strip_prefix("sudo rm -f ") {
            state.links.remove(path);
            state.files.remove(path);
        }
        if command.contains("docker ps") {
            return Ok(state.containers.clone());
        }
        Ok(String::new())
    }

    fn write_file(&self, content: &str, remote_path: &str) -> DeployResult<()> {
        let mut state = self.0.borrow_mut();
        state.commands.push(format!("write {remote_path}"));
        state
            .files
            .insert(remote_path.to_string(), content.to_string());
        Ok(())
    }

    fn sync_dir(&self, local: &Path, remote: &str) -> DeployResult<()> {
        let mut state = self.0.borrow_mut();
        state.commands.push(format!("sync {remote}"));
        if state.transfer_fails {
            return Err(DeployError::Transfer("connection unexpectedly closed".into()));
        }
        state.synced.push((local.to_path_buf(), remote.to_string()));
        Ok(())
    }
}

pub struct FakeProbe {
    pub up: bool,
    pub urls: Rc<RefCell<Vec<String>>>,
}

impl FakeProbe {
    pub fn new(up: bool) -> Self {
        Self {
            up,
            urls: Rc::default(),
        }
    }
}

impl HealthProbe for FakeProbe {
    fn probe(&self, url: &str, _timeout: Duration) -> bool {
        self.urls.borrow_mut().push(url.to_string());
        self.up
    }
}

/// Scratch directory with a private key file and a work dir.
pub struct Sandbox {
    pub dir: tempfile::TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("id_test"), "-----BEGIN KEY-----\n").expect("key");
        std::fs::create_dir(dir.path().join("work")).expect("workdir");
        Self { dir }
    }

    pub fn key(&self) -> String {
        self.dir.path().join("id_test").display().to_string()
    }

    pub fn workdir(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    pub fn log(&self) -> RunLog {
        RunLog::at(&self.dir.path().join("run.log")).expect("log")
    }

    pub fn log_content(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("run.log")).unwrap_or_default()
    }

    pub fn inputs(&self) -> RawInputs {
        RawInputs {
            repo_url: Some("https://example.com/org/app.git".into()),
            token: Some("ghp_s3cret".into()),
            branch: None,
            user: Some("deploy".into()),
            host: Some("203.0.113.7".into()),
            key_path: Some(self.key()),
            port: Some("8080".into()),
        }
    }

    pub fn config(&self) -> DeploymentConfig {
        DeploymentConfig::from_inputs(&self.inputs()).expect("valid config")
    }

    pub fn pipeline(&self, git: &FakeGit, host: &FakeHost) -> Pipeline {
        Pipeline::new()
            .workdir(&self.workdir())
            .git(git.clone())
            .transport(host.clone())
            .probe(FakeProbe::new(true))
            .health_gate(Some(HealthGate {
                attempts: 2,
                interval: Duration::ZERO,
            }))
    }
}
