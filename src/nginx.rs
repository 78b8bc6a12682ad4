use crate::error::{DeployError, DeployResult};
use crate::logging::RunLog;
use crate::remote::{RemoteCommand, Transport, run_plan};

const SITES_AVAILABLE: &str = "/etc/nginx/sites-available";
const SITES_ENABLED: &str = "/etc/nginx/sites-enabled";

/// A site file under `sites-available`, linked into
/// `sites-enabled` under the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NginxSite {
    pub name: String,
}

impl NginxSite {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    #[must_use]
    pub fn available_path(&self) -> String {
        format!("{SITES_AVAILABLE}/{}", self.name)
    }

    #[must_use]
    pub fn enabled_path(&self) -> String {
        format!("{SITES_ENABLED}/{}", self.name)
    }
}

/// Render a server block proxying port 80 to the app on loopback.
#[must_use]
pub fn render(port: u16) -> String {
    format!(
        "\
server {{
    listen 80;
    listen [::]:80;
    server_name _;

    location / {{
        proxy_pass http://127.0.0.1:{port};
        proxy_http_version 1.1;
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
    }}
}}
"
    )
}

/// Commands run after the site file is written. The link is
/// replaced in place, and nginx is only reloaded once `nginx -t`
/// accepts the result.
#[must_use]
pub fn activation_plan(site: &NginxSite) -> Vec<RemoteCommand> {
    vec![
        RemoteCommand::new(
            "Enable site",
            &format!(
                "sudo ln -sfn {} {}",
                site.available_path(),
                site.enabled_path()
            ),
        ),
        RemoteCommand::tolerant(
            "Disable default site",
            &format!("sudo rm -f {SITES_ENABLED}/default"),
        ),
    ]
}

/// Re-enable the stock `default` site that [`activation_plan`]
/// disables, unless another site is still enabled. A no-op when the
/// distribution ships no default site.
#[must_use]
pub fn restore_default_site() -> RemoteCommand {
    RemoteCommand::tolerant(
        "Restore default site",
        &format!(
            "if [ -e {SITES_AVAILABLE}/default ] && [ -z \"$(ls -A {SITES_ENABLED})\" ]; then \
             sudo ln -s {SITES_AVAILABLE}/default {SITES_ENABLED}/default; fi"
        ),
    )
}

/// Write, link, validate and reload.
///
/// A rejected configuration fails with
/// [`DeployError::ProxyConfigInvalid`] before any reload, so the
/// running nginx keeps its previous configuration.
pub fn install(
    transport: &dyn Transport,
    site: &NginxSite,
    port: u16,
    log: &RunLog,
) -> DeployResult<()> {
    log.info(&format!("  Write {}", site.available_path()));
    transport
        .write_file(&render(port), &site.available_path())
        .map_err(|e| DeployError::RemoteCommand {
            step: format!("Write {}", site.available_path()),
            source: Box::new(e),
        })?;

    run_plan(transport, &activation_plan(site), log)?;

    log.info("  Validate nginx configuration");
    if let Err(e) = transport.exec("sudo nginx -t") {
        log.error(&format!("nginx -t failed: {e}"));
        return Err(DeployError::ProxyConfigInvalid);
    }

    run_plan(
        transport,
        &[RemoteCommand::new(
            "Reload nginx",
            "sudo systemctl reload nginx",
        )],
        log,
    )
}
