use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::bootstrap;
use crate::cleanup;
use crate::cmd;
use crate::config::{DeploymentConfig, RawInputs, RemoteTarget};
use crate::container::{self, Binding, ContainerSummary, HealthGate};
use crate::descriptor::Descriptor;
use crate::error::{DeployError, DeployResult};
use crate::git::{self, Git, GitCli};
use crate::logging::RunLog;
use crate::nginx::{self, NginxSite};
use crate::probe::{CurlProbe, DEFAULT_PROBE_TIMEOUT, HealthProbe};
use crate::prompt::{self, TerminalPrompter};
use crate::remote::{RemoteCommand, Transport, run_plan};
use crate::ssh::{DEFAULT_CONNECT_TIMEOUT, SshSession};

const STAGES: u32 = 8;

/// Result of a completed deployment.
#[derive(Debug)]
pub struct DeployReport {
    pub repo_dir: PathBuf,
    pub descriptor: Descriptor,
    /// Whether the public endpoint answered the final probe.
    pub reachable: bool,
}

/// Deployment orchestrator: one linear run that stops at the
/// first fatal error.
///
/// Remote names and paths are fixed per pipeline, so repeated runs
/// replace the same directory, container and nginx site.
pub struct Pipeline {
    app_name: String,
    remote_dir: String,
    workdir: PathBuf,
    binding: Binding,
    connect_timeout: Duration,
    probe_timeout: Duration,
    health_gate: Option<HealthGate>,
    git: Box<dyn Git>,
    transport: Option<Box<dyn Transport>>,
    probe: Box<dyn HealthProbe>,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self {
            app_name: "hoist-app".to_string(),
            remote_dir: "/opt/app".to_string(),
            workdir: PathBuf::from("."),
            binding: Binding::Loopback,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            health_gate: Some(HealthGate::default()),
            git: Box::new(GitCli),
            transport: None,
            probe: Box::new(CurlProbe),
        }
    }

    /// Name shared by the container, its image and the nginx site.
    #[must_use]
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = name.to_string();
        self
    }

    #[must_use]
    pub fn remote_dir(mut self, dir: &str) -> Self {
        self.remote_dir = dir.to_string();
        self
    }

    /// Local directory the repository is cloned into.
    #[must_use]
    pub fn workdir(mut self, dir: &Path) -> Self {
        self.workdir = dir.to_path_buf();
        self
    }

    #[must_use]
    pub const fn binding(mut self, binding: Binding) -> Self {
        self.binding = binding;
        self
    }

    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Fail the run when the deployed containers are not running.
    /// `None` keeps the container listing informational.
    #[must_use]
    pub const fn health_gate(mut self, gate: Option<HealthGate>) -> Self {
        self.health_gate = gate;
        self
    }

    #[must_use]
    pub fn git(mut self, git: impl Git + 'static) -> Self {
        self.git = Box::new(git);
        self
    }

    /// Replace the SSH transport built from the remote target.
    #[must_use]
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    #[must_use]
    pub fn probe(mut self, probe: impl HealthProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    #[must_use]
    pub fn site(&self) -> NginxSite {
        NginxSite::new(&self.app_name)
    }

    /// Run the full deployment sequence.
    pub fn deploy(&self, config: &DeploymentConfig, log: &RunLog) -> DeployResult<DeployReport> {
        log.info(&format!(
            "Deploying {} (branch '{}') to {}",
            config.repo_url,
            config.branch,
            config.remote.destination()
        ));

        stage(log, 1, "Local repository sync");
        let repo_dir = git::sync_repository(self.git.as_ref(), config, &self.workdir, log)?;

        stage(log, 2, "Precondition checks");
        let descriptor = check_descriptor(&repo_dir, log)?;

        stage(log, 3, "Remote connectivity check");
        let mut session = None;
        let transport = self.transport_for(&config.remote, &mut session);
        transport.check(self.connect_timeout)?;
        log.info(&format!("Connected to {}", config.remote.destination()));

        stage(log, 4, "Remote bootstrap");
        run_plan(
            transport,
            &bootstrap::plan(&config.remote.user, &self.remote_dir),
            log,
        )?;

        stage(log, 5, "File transfer");
        transport.sync_dir(&repo_dir, &self.remote_dir)?;
        log.info(&format!(
            "Synchronized {} to {}:{}",
            repo_dir.display(),
            config.remote.host,
            self.remote_dir
        ));

        stage(log, 6, "Container deployment");
        self.deploy_containers(transport, &descriptor, config.port, log)?;

        stage(log, 7, "Reverse-proxy configuration");
        nginx::install(transport, &self.site(), config.port, log)?;

        stage(log, 8, "Post-deploy validation");
        let url = format!("http://{}/", config.remote.host);
        let reachable = self.probe.probe(&url, self.probe_timeout);
        if reachable {
            log.info(&format!("{url} is reachable"));
        } else {
            log.warn(&format!(
                "{url} did not answer within {}s; the application may still be starting",
                self.probe_timeout.as_secs()
            ));
        }

        log.info("Deployment complete");
        Ok(DeployReport {
            repo_dir,
            descriptor,
            reachable,
        })
    }

    /// Tear down everything a deployment created on `target`.
    /// Missing resources are skipped.
    pub fn cleanup(&self, target: &RemoteTarget, log: &RunLog) -> DeployResult<()> {
        log.info(&format!("Cleaning up {}", target.destination()));

        let mut session = None;
        let transport = self.transport_for(target, &mut session);
        transport.check(self.connect_timeout)?;

        run_plan(
            transport,
            &cleanup::plan(&self.app_name, &self.remote_dir, &self.site()),
            log,
        )?;

        log.info("Cleanup complete");
        Ok(())
    }

    /// Running containers on `target`.
    pub fn status(&self, target: &RemoteTarget, log: &RunLog) -> DeployResult<Vec<ContainerSummary>> {
        let mut session = None;
        let transport = self.transport_for(target, &mut session);
        transport.check(self.connect_timeout)?;

        let containers = container::list(transport, None)?;
        container::log_listing(&containers, log);
        Ok(containers)
    }

    /// Print what a deployment would do without touching the
    /// network.
    pub fn dry_run(&self, config: &DeploymentConfig, out: &mut dyn Write) -> DeployResult<()> {
        let repo_dir = self.workdir.join(config.repo_name());
        let site = self.site();

        writeln!(out, "=== Dry run: no changes will be made ===")?;
        writeln!(out)?;
        writeln!(out, "Repository: {} (branch '{}')", config.repo_url, config.branch)?;
        writeln!(out, "Local copy: {}", repo_dir.display())?;
        writeln!(out, "Target:     {}:{}", config.remote.destination(), self.remote_dir)?;
        writeln!(out)?;

        writeln!(out, "--- Remote bootstrap ---")?;
        write_plan(out, &bootstrap::plan(&config.remote.user, &self.remote_dir))?;

        writeln!(out, "--- Container deployment ---")?;
        if repo_dir.is_dir() {
            let descriptor = Descriptor::detect(&repo_dir)?;
            let plan = container::plan(
                &descriptor,
                &self.remote_dir,
                &self.app_name,
                config.port,
                self.binding,
            );
            if plan.is_empty() {
                writeln!(out, "(no build descriptor, skipped)")?;
            }
            write_plan(out, &plan)?;
        } else {
            writeln!(out, "(decided after the repository is cloned)")?;
        }

        writeln!(out, "--- {} ---", site.available_path())?;
        write!(out, "{}", nginx::render(config.port))?;
        write_plan(out, &nginx::activation_plan(&site))?;

        Ok(())
    }

    fn deploy_containers(
        &self,
        transport: &dyn Transport,
        descriptor: &Descriptor,
        port: u16,
        log: &RunLog,
    ) -> DeployResult<()> {
        let plan = container::plan(
            descriptor,
            &self.remote_dir,
            &self.app_name,
            port,
            self.binding,
        );
        if plan.is_empty() {
            log.info("Skipping container deployment");
            return Ok(());
        }
        run_plan(transport, &plan, log)?;

        match container::list(transport, None) {
            Ok(containers) => container::log_listing(&containers, log),
            Err(e) => log.warn(&format!("Cannot list containers: {e}")),
        }

        if let (Some(gate), Some(filter)) = (
            self.health_gate,
            container::filter(descriptor, &self.remote_dir, &self.app_name),
        ) {
            container::wait_running(transport, &filter, &self.app_name, gate, log)?;
        }
        Ok(())
    }

    fn transport_for<'a>(
        &'a self,
        target: &RemoteTarget,
        session: &'a mut Option<SshSession>,
    ) -> &'a dyn Transport {
        match &self.transport {
            Some(t) => t.as_ref(),
            None => &*session.insert(SshSession::new(target).connect_timeout(self.connect_timeout)),
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn stage(log: &RunLog, n: u32, name: &str) {
    log.info(&format!("[{n}/{STAGES}] {name}"));
}

fn check_descriptor(repo_dir: &Path, log: &RunLog) -> DeployResult<Descriptor> {
    let descriptor = Descriptor::detect(repo_dir)?;
    match &descriptor {
        Descriptor::Compose { path, services } => {
            log.info(&format!("Found compose file {}", path.display()));
            for (name, source) in services {
                log.info(&format!("  service {name} ({source})"));
            }
        }
        Descriptor::Dockerfile { path } => {
            log.info(&format!("Found {}", path.display()));
        }
        Descriptor::Missing => {
            log.warn(&format!(
                "No Dockerfile or compose file in {}; the application will not be started",
                repo_dir.display()
            ));
        }
    }
    Ok(descriptor)
}

fn write_plan(out: &mut dyn Write, plan: &[RemoteCommand]) -> DeployResult<()> {
    for step in plan {
        writeln!(out, "# {}", step.description)?;
        writeln!(out, "{}", step.command)?;
    }
    Ok(())
}

fn require_tools(tools: &[&str]) -> DeployResult<()> {
    for tool in tools {
        if !cmd::command_exists(tool) {
            return Err(DeployError::CommandNotFound((*tool).to_string()));
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "hoist")]
#[command(version)]
#[command(about = "Deploy a Dockerized git repository to a remote Ubuntu host")]
pub struct Cli {
    /// Directory for the run log
    #[arg(long, global = true, default_value = ".")]
    pub log_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Clone, transfer, build and serve the application
    Deploy(DeployArgs),

    /// Remove the container, image, files and nginx site
    Cleanup(RemoteArgs),

    /// Show containers on the remote host
    Status(RemoteArgs),
}

#[derive(Args)]
pub struct RemoteArgs {
    /// Remote SSH username
    #[arg(long, env = "HOIST_USER")]
    pub user: Option<String>,

    /// Remote host address
    #[arg(long, env = "HOIST_HOST")]
    pub host: Option<String>,

    /// SSH private key path
    #[arg(long, env = "HOIST_KEY")]
    pub key: Option<String>,

    /// Fail instead of prompting for missing values
    #[arg(long)]
    pub non_interactive: bool,
}

impl RemoteArgs {
    #[must_use]
    pub fn raw_inputs(&self) -> RawInputs {
        RawInputs {
            user: self.user.clone(),
            host: self.host.clone(),
            key_path: self.key.clone(),
            ..RawInputs::default()
        }
    }
}

#[derive(Args)]
pub struct DeployArgs {
    /// Git repository URL (HTTPS)
    #[arg(long, env = "HOIST_REPO_URL")]
    pub repo_url: Option<String>,

    /// Personal access token for the repository
    #[arg(long, env = "HOIST_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Branch to deploy [default: main]
    #[arg(long, env = "HOIST_BRANCH")]
    pub branch: Option<String>,

    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Application port [default: 3000]
    #[arg(long, env = "HOIST_PORT")]
    pub port: Option<String>,

    /// Publish the container port on all interfaces, not only
    /// loopback
    #[arg(long)]
    pub public: bool,

    /// Keep the container listing informational
    #[arg(long)]
    pub no_health_gate: bool,

    /// Print the generated configuration and remote plan only
    #[arg(long)]
    pub dry_run: bool,

    /// Tear the deployment down instead
    #[arg(long)]
    pub cleanup: bool,

    /// Local directory for the repository checkout
    #[arg(long, default_value = ".")]
    pub workdir: PathBuf,
}

impl DeployArgs {
    #[must_use]
    pub fn raw_inputs(&self) -> RawInputs {
        RawInputs {
            repo_url: self.repo_url.clone(),
            token: self.token.clone(),
            branch: self.branch.clone(),
            port: self.port.clone(),
            ..self.remote.raw_inputs()
        }
    }

    #[must_use]
    pub fn pipeline(&self) -> Pipeline {
        let binding = if self.public {
            Binding::AllInterfaces
        } else {
            Binding::Loopback
        };
        let gate = if self.no_health_gate {
            None
        } else {
            Some(HealthGate::default())
        };
        Pipeline::new()
            .workdir(&self.workdir)
            .binding(binding)
            .health_gate(gate)
    }
}

/// Parse CLI arguments, dispatch, and return the process exit
/// code. Fatal errors are appended to the run log first.
#[must_use]
pub fn run() -> i32 {
    let cli = Cli::parse();

    let log = match RunLog::create(&cli.log_dir) {
        Ok(log) => log,
        Err(e) => {
            tracing::error!("cannot create run log in {}: {e}", cli.log_dir.display());
            return e.exit_code();
        }
    };
    tracing::info!("Logging to {}", log.path().display());

    match dispatch(&cli.command, &log) {
        Ok(()) => 0,
        Err(e) => {
            log.error(&e.to_string());
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                log.error(&format!("  caused by: {cause}"));
                source = cause.source();
            }
            e.exit_code()
        }
    }
}

fn dispatch(command: &Command, log: &RunLog) -> DeployResult<()> {
    match command {
        Command::Deploy(args) if args.cleanup => cmd_cleanup(&args.remote, log),
        Command::Deploy(args) => cmd_deploy(args, log),
        Command::Cleanup(args) => cmd_cleanup(args, log),
        Command::Status(args) => {
            let target = remote_target(args)?;
            require_tools(&["ssh"])?;
            Pipeline::new().status(&target, log).map(|_| ())
        }
    }
}

fn cmd_deploy(args: &DeployArgs, log: &RunLog) -> DeployResult<()> {
    let mut inputs = args.raw_inputs();
    if !args.remote.non_interactive {
        prompt::fill_missing(&mut inputs, &mut TerminalPrompter)?;
    }
    let config = DeploymentConfig::from_inputs(&inputs)?;
    let pipeline = args.pipeline();

    if args.dry_run {
        return pipeline.dry_run(&config, &mut std::io::stdout().lock());
    }

    require_tools(&["git", "ssh", "rsync"])?;
    pipeline.deploy(&config, log).map(|_| ())
}

fn cmd_cleanup(args: &RemoteArgs, log: &RunLog) -> DeployResult<()> {
    let target = remote_target(args)?;
    require_tools(&["ssh"])?;
    Pipeline::new().cleanup(&target, log)
}

fn remote_target(args: &RemoteArgs) -> DeployResult<RemoteTarget> {
    let mut inputs = args.raw_inputs();
    if !args.non_interactive {
        prompt::fill_remote(&mut inputs, &mut TerminalPrompter)?;
    }
    RemoteTarget::from_inputs(&inputs)
}
