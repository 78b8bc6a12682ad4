use crate::remote::RemoteCommand;

const APT_INSTALL: &str = "sudo DEBIAN_FRONTEND=noninteractive apt-get install -y";

/// Idempotent host preparation: Docker, the compose plugin and
/// nginx installed and enabled, `user` in the `docker` group, and
/// `remote_dir` owned by `user`.
///
/// Each install is guarded by a presence check, so a second run is
/// a sequence of no-ops.
#[must_use]
pub fn plan(user: &str, remote_dir: &str) -> Vec<RemoteCommand> {
    vec![
        RemoteCommand::new("Refresh package index", "sudo apt-get update -y"),
        RemoteCommand::new(
            "Install Docker",
            &format!("command -v docker >/dev/null 2>&1 || {APT_INSTALL} docker.io"),
        ),
        RemoteCommand::new(
            "Install Docker Compose",
            &format!(
                "sudo docker compose version >/dev/null 2>&1 || \
                 {APT_INSTALL} docker-compose-v2 || \
                 {APT_INSTALL} docker-compose-plugin"
            ),
        ),
        RemoteCommand::new(
            "Install nginx",
            &format!("command -v nginx >/dev/null 2>&1 || {APT_INSTALL} nginx"),
        ),
        RemoteCommand::new(
            &format!("Add {user} to the docker group"),
            &format!("sudo usermod -aG docker {user}"),
        ),
        RemoteCommand::new(
            "Enable Docker service",
            "sudo systemctl enable --now docker",
        ),
        RemoteCommand::new("Enable nginx service", "sudo systemctl enable --now nginx"),
        RemoteCommand::new(
            &format!("Prepare {remote_dir}"),
            &format!("sudo mkdir -p {remote_dir} && sudo chown {user}:{user} {remote_dir}"),
        ),
    ]
}
