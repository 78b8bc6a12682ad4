use crate::container::image_tag;
use crate::nginx::{self, NginxSite};
use crate::remote::RemoteCommand;

/// Teardown of everything a deployment creates. Every step is
/// tolerant, so cleanup of a host that was never deployed to
/// succeeds.
#[must_use]
pub fn plan(app: &str, remote_dir: &str, site: &NginxSite) -> Vec<RemoteCommand> {
    vec![
        RemoteCommand::tolerant(
            "Stop compose services",
            &format!(
                "cd {remote_dir} && \
                 sudo docker compose down --remove-orphans --rmi local"
            ),
        ),
        RemoteCommand::tolerant(
            &format!("Remove container {app}"),
            &format!("sudo docker rm -f {app}"),
        ),
        RemoteCommand::tolerant(
            &format!("Remove image {}", image_tag(app)),
            &format!("sudo docker rmi -f {}", image_tag(app)),
        ),
        RemoteCommand::tolerant(
            &format!("Delete {remote_dir}"),
            &format!("sudo rm -rf {remote_dir}"),
        ),
        RemoteCommand::tolerant(
            "Remove enabled site",
            &format!("sudo rm -f {}", site.enabled_path()),
        ),
        RemoteCommand::tolerant(
            "Remove available site",
            &format!("sudo rm -f {}", site.available_path()),
        ),
        nginx::restore_default_site(),
        RemoteCommand::tolerant(
            "Reload nginx",
            "sudo nginx -t && sudo systemctl reload nginx",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::OnFailure;

    #[test]
    fn teardown_is_tolerant() {
        let plan = plan("hoist-app", "/opt/app", &NginxSite::new("hoist-app"));

        assert!(plan.iter().all(|c| c.on_failure == OnFailure::Ignore));
    }

    #[test]
    fn removes_both_site_copies() {
        let plan = plan("hoist-app", "/opt/app", &NginxSite::new("hoist-app"));
        let commands: Vec<&str> = plan.iter().map(|c| c.command.as_str()).collect();

        assert!(commands.contains(&"sudo rm -f /etc/nginx/sites-enabled/hoist-app"));
        assert!(commands.contains(&"sudo rm -f /etc/nginx/sites-available/hoist-app"));
        assert!(commands.contains(&"sudo rm -rf /opt/app"));
        assert!(commands.contains(&"sudo docker rmi -f hoist-app:latest"));
    }

    #[test]
    fn default_site_is_restored_before_reload() {
        let plan = plan("hoist-app", "/opt/app", &NginxSite::new("hoist-app"));
        let position = |description: &str| {
            plan.iter()
                .position(|c| c.description == description)
                .unwrap()
        };

        assert!(position("Remove enabled site") < position("Restore default site"));
        assert!(position("Restore default site") < position("Reload nginx"));
    }
}
