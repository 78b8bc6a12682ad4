//! Push a Dockerized git repository to a single Ubuntu host.
//!
//! `hoist` clones (or updates) a repository locally, prepares the
//! remote host over SSH, mirrors the sources to it, (re)builds and
//! starts the application container, and puts nginx in front of it
//! on port 80.
//!
//! # Overview
//!
//! A deployment is driven by a [`Pipeline`] from a validated
//! [`DeploymentConfig`]:
//!
//! 1. **Repository sync** - clone, or fetch/checkout/pull an
//!    existing working copy ([`git`])
//! 2. **Preconditions** - find a compose file or a `Dockerfile`
//!    ([`descriptor`])
//! 3. **Connectivity** - a bounded, non-interactive SSH check
//! 4. **Bootstrap** - Docker, compose and nginx installed and
//!    enabled ([`bootstrap`])
//! 5. **Transfer** - `rsync --delete` into the remote app directory
//! 6. **Containers** - stop what runs, rebuild, start
//!    ([`container`])
//! 7. **Reverse proxy** - write, link, `nginx -t`, reload
//!    ([`nginx`])
//! 8. **Validation** - one HTTP probe; failure is only a warning
//!    ([`probe`])
//!
//! Any fatal error stops the run. Every stage is recorded in a
//! per-run [`RunLog`]. Remote work is expressed as ordered
//! [`RemoteCommand`](remote::RemoteCommand) lists executed through
//! the [`Transport`](remote::Transport) trait, so the whole sequence
//! can be exercised against a fake host.
//!
//! # Example
//!
//! ```rust,no_run
//! use hoist::{DeploymentConfig, Pipeline, RunLog};
//! use hoist::config::RawInputs;
//!
//! fn main() -> hoist::error::DeployResult<()> {
//!     let config = DeploymentConfig::from_inputs(&RawInputs {
//!         repo_url: Some("https://github.com/org/app.git".into()),
//!         token: Some(std::env::var("GITHUB_TOKEN").unwrap_or_default()),
//!         user: Some("ubuntu".into()),
//!         host: Some("203.0.113.10".into()),
//!         port: Some("8080".into()),
//!         ..RawInputs::default()
//!     })?;
//!
//!     let log = RunLog::create(std::path::Path::new("."))?;
//!     Pipeline::new().deploy(&config, &log)?;
//!     Ok(())
//! }
//! ```

// Allow noisy pedantic lints that don't add value for a
// deployment tool crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod bootstrap;
pub mod cleanup;
pub mod cmd;
pub mod config;
pub mod container;
pub mod descriptor;
pub mod error;
pub mod git;
pub mod logging;
pub mod nginx;
pub mod pipeline;
pub mod probe;
pub mod prompt;
pub mod remote;
pub mod ssh;

pub use config::DeploymentConfig;
pub use descriptor::Descriptor;
pub use logging::RunLog;
pub use pipeline::Pipeline;
pub use ssh::SshSession;
