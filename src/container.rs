use std::thread;
use std::time::Duration;

use serde::Deserialize;

use crate::descriptor::Descriptor;
use crate::error::{DeployError, DeployResult};
use crate::logging::RunLog;
use crate::remote::{RemoteCommand, Transport};

/// Host interface the single-image container publishes its port on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Binding {
    /// `127.0.0.1`: reachable only through the reverse proxy.
    #[default]
    Loopback,
    /// `0.0.0.0`: also reachable directly on the app port.
    AllInterfaces,
}

impl Binding {
    #[must_use]
    pub const fn address(self) -> &'static str {
        match self {
            Self::Loopback => "127.0.0.1",
            Self::AllInterfaces => "0.0.0.0",
        }
    }
}

/// Polling schedule for the post-deploy running check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthGate {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for HealthGate {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_secs(3),
        }
    }
}

/// One row of `docker ps --format '{{json .}}'`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSummary {
    pub names: String,
    #[serde(default)]
    pub image: String,
    pub status: String,
    #[serde(default)]
    pub ports: String,
    #[serde(default)]
    pub state: String,
}

impl ContainerSummary {
    /// Older Docker releases omit `State`; fall back to the human
    /// status (`Up 3 seconds`).
    #[must_use]
    pub fn is_running(&self) -> bool {
        if self.state.is_empty() {
            self.status.starts_with("Up")
        } else {
            self.state == "running"
        }
    }
}

/// Remote commands that replace whatever is currently running with
/// a fresh build of the transferred sources.
#[must_use]
pub fn plan(
    descriptor: &Descriptor,
    remote_dir: &str,
    app: &str,
    port: u16,
    binding: Binding,
) -> Vec<RemoteCommand> {
    match descriptor {
        Descriptor::Compose { .. } => {
            let file = descriptor.file_name().unwrap_or_default();
            vec![
                RemoteCommand::tolerant(
                    "Stop compose services",
                    &format!("cd {remote_dir} && sudo docker compose -f {file} down --remove-orphans"),
                ),
                RemoteCommand::new(
                    "Build and start compose services",
                    &format!("cd {remote_dir} && sudo docker compose -f {file} up -d --build"),
                ),
            ]
        }
        Descriptor::Dockerfile { .. } => {
            let image = image_tag(app);
            let bind = binding.address();
            vec![
                RemoteCommand::new(
                    &format!("Build image {image}"),
                    &format!("sudo docker build -t {image} {remote_dir}"),
                ),
                RemoteCommand::tolerant(
                    &format!("Remove container {app}"),
                    &format!("sudo docker rm -f {app}"),
                ),
                RemoteCommand::new(
                    &format!("Start container {app}"),
                    &format!(
                        "sudo docker run -d --name {app} --restart unless-stopped \
                         -p {bind}:{port}:{port} {image}"
                    ),
                ),
            ]
        }
        Descriptor::Missing => Vec::new(),
    }
}

#[must_use]
pub fn image_tag(app: &str) -> String {
    format!("{app}:latest")
}

/// `docker ps` filter selecting the containers a descriptor starts.
#[must_use]
pub fn filter(descriptor: &Descriptor, remote_dir: &str, app: &str) -> Option<String> {
    match descriptor {
        Descriptor::Compose { .. } => Some(format!(
            "label=com.docker.compose.project.working_dir={remote_dir}"
        )),
        Descriptor::Dockerfile { .. } => Some(format!("name=^/{app}$")),
        Descriptor::Missing => None,
    }
}

pub fn parse_listing(output: &str) -> DeployResult<Vec<ContainerSummary>> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| serde_json::from_str(l).map_err(DeployError::from))
        .collect()
}

/// List containers on the remote host, optionally narrowed by a
/// `docker ps --filter` expression.
pub fn list(transport: &dyn Transport, filter: Option<&str>) -> DeployResult<Vec<ContainerSummary>> {
    let command = match filter {
        Some(f) => format!("sudo docker ps --all --filter '{f}' --format '{{{{json .}}}}'"),
        None => "sudo docker ps --format '{{json .}}'".to_string(),
    };
    parse_listing(&transport.exec(&command)?)
}

pub fn log_listing(containers: &[ContainerSummary], log: &RunLog) {
    if containers.is_empty() {
        log.info("No running containers");
        return;
    }
    for c in containers {
        log.info(&format!("  {} | {} | {}", c.names, c.status, c.ports));
    }
}

/// Poll until at least one container matching `filter` is running.
pub fn wait_running(
    transport: &dyn Transport,
    filter: &str,
    label: &str,
    gate: HealthGate,
    log: &RunLog,
) -> DeployResult<()> {
    for attempt in 1..=gate.attempts {
        match list(transport, Some(filter)) {
            Ok(containers) if containers.iter().any(ContainerSummary::is_running) => {
                log.info(&format!("{label} is running"));
                return Ok(());
            }
            Ok(_) => log.info(&format!(
                "  Running check ({attempt}/{}): {label} not running yet",
                gate.attempts
            )),
            Err(e) => log.info(&format!(
                "  Running check ({attempt}/{}): {e}",
                gate.attempts
            )),
        }
        if attempt < gate.attempts {
            thread::sleep(gate.interval);
        }
    }

    Err(DeployError::ContainerNotRunning(
        label.to_string(),
        gate.attempts,
    ))
}
