use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{DeployError, DeployResult};

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_KEY: &str = "~/.ssh/id_rsa";

/// Repository access token.
///
/// Never printed: `Debug` and `Display` both render `***`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self(token.to_string())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Parameters as collected from flags, environment or prompts,
/// before validation.
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    pub repo_url: Option<String>,
    pub token: Option<String>,
    pub branch: Option<String>,
    pub user: Option<String>,
    pub host: Option<String>,
    pub key_path: Option<String>,
    pub port: Option<String>,
}

/// SSH destination shared by deploy, cleanup and status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub user: String,
    pub host: String,
    pub key_path: PathBuf,
}

impl RemoteTarget {
    /// Validate user, host and key path. The key must be an
    /// existing, readable file.
    pub fn from_inputs(inputs: &RawInputs) -> DeployResult<Self> {
        let user = required(inputs.user.as_deref(), DeployError::MissingUser)?;
        let host = required(inputs.host.as_deref(), DeployError::MissingHost)?;

        let home = std::env::var("HOME").ok();
        let key_path = resolve_key(inputs.key_path.as_deref(), home.as_deref())?;
        check_key(&key_path)?;

        Ok(Self {
            user,
            host,
            key_path,
        })
    }

    /// `user@host`
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    pub repo_url: String,
    pub token: Credential,
    pub branch: String,
    pub remote: RemoteTarget,
    pub port: u16,
}

impl DeploymentConfig {
    /// Validate raw inputs in order: URL, token, user, host, key
    /// path, port. The first missing field wins.
    pub fn from_inputs(inputs: &RawInputs) -> DeployResult<Self> {
        let repo_url = required(inputs.repo_url.as_deref(), DeployError::MissingRepoUrl)?;
        let token = required(inputs.token.as_deref(), DeployError::MissingToken)?;
        let branch = non_blank(inputs.branch.as_deref())
            .unwrap_or(DEFAULT_BRANCH)
            .to_string();
        let remote = RemoteTarget::from_inputs(inputs)?;
        let port = match non_blank(inputs.port.as_deref()) {
            Some(raw) => parse_port(raw)?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            repo_url,
            token: Credential::new(&token),
            branch,
            remote,
            port,
        })
    }

    /// Local directory name for the repository.
    #[must_use]
    pub fn repo_name(&self) -> String {
        repo_name(&self.repo_url)
    }
}

/// Base name of a repository URL without a trailing `.git`.
///
/// ```
/// assert_eq!(hoist::config::repo_name("https://example.com/org/app.git"), "app");
/// assert_eq!(hoist::config::repo_name("https://example.com/org/site/"), "site");
/// ```
#[must_use]
pub fn repo_name(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let base = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
    base.strip_suffix(".git").unwrap_or(base).to_string()
}

pub fn parse_port(raw: &str) -> DeployResult<u16> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(DeployError::InvalidPort(raw.to_string())),
        Ok(port) => Ok(port),
    }
}

/// Expand a leading `~/` against `$HOME`. Returns `None` when the
/// path needs `$HOME` and it is unset.
#[must_use]
pub fn expand_home(path: &str) -> Option<PathBuf> {
    expand_against(path, std::env::var("HOME").ok().as_deref())
}

fn expand_against(path: &str, home: Option<&str>) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => home.map(|home| PathBuf::from(home).join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

/// Key path from input, falling back to the default key. Without a
/// home directory the default cannot be located.
fn resolve_key(raw: Option<&str>, home: Option<&str>) -> DeployResult<PathBuf> {
    let key = non_blank(raw).unwrap_or(DEFAULT_KEY);
    expand_against(key, home).ok_or(DeployError::MissingKeyPath)
}

fn check_key(path: &Path) -> DeployResult<()> {
    if path.is_file() && File::open(path).is_ok() {
        Ok(())
    } else {
        Err(DeployError::KeyNotFound(path.display().to_string()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn required(value: Option<&str>, missing: DeployError) -> DeployResult<String> {
    non_blank(value).map(ToString::to_string).ok_or(missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_name_variants() {
        assert_eq!(repo_name("https://example.com/org/app.git"), "app");
        assert_eq!(repo_name("https://example.com/org/app"), "app");
        assert_eq!(repo_name("https://example.com/org/app.git/"), "app");
        assert_eq!(repo_name("git@github.com:org/tool.git"), "tool");
    }

    #[test]
    fn default_key_needs_a_home_directory() {
        let err = resolve_key(None, None).unwrap_err();
        assert!(matches!(err, DeployError::MissingKeyPath));
        assert_eq!(err.exit_code(), 14);

        assert!(matches!(resolve_key(Some("  "), None), Err(DeployError::MissingKeyPath)));
        assert_eq!(
            resolve_key(None, Some("/home/me")).unwrap(),
            PathBuf::from("/home/me/.ssh/id_rsa")
        );
        assert_eq!(
            resolve_key(Some("/keys/deploy"), None).unwrap(),
            PathBuf::from("/keys/deploy")
        );
    }

    #[test]
    fn port_parsing() {
        assert_eq!(parse_port("8080").unwrap(), 8080);
        assert_eq!(parse_port(" 3000 ").unwrap(), 3000);
        assert!(matches!(parse_port("0"), Err(DeployError::InvalidPort(_))));
        assert!(matches!(parse_port("http"), Err(DeployError::InvalidPort(_))));
        assert!(matches!(parse_port("70000"), Err(DeployError::InvalidPort(_))));
    }

    #[test]
    fn credential_is_redacted() {
        let token = Credential::new("ghp_secret");

        assert_eq!(token.to_string(), "***");
        assert_eq!(format!("{token:?}"), "Credential(***)");
        assert_eq!(token.expose(), "ghp_secret");
    }

    #[test]
    fn absolute_paths_are_untouched() {
        assert_eq!(
            expand_home("/keys/id_ed25519"),
            Some(PathBuf::from("/keys/id_ed25519"))
        );
    }
}
