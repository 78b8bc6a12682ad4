use std::process::ExitStatus;

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("repository URL is required")]
    MissingRepoUrl,

    #[error("access token is required")]
    MissingToken,

    #[error("remote username is required")]
    MissingUser,

    #[error("remote host address is required")]
    MissingHost,

    #[error("SSH private key path is required")]
    MissingKeyPath,

    #[error("SSH private key not found or unreadable: {0}")]
    KeyNotFound(String),

    #[error("invalid application port: {0}")]
    InvalidPort(String),

    #[error("git fetch failed for branch '{0}'")]
    GitFetch(String, #[source] Box<DeployError>),

    #[error("git checkout failed for branch '{0}'")]
    GitCheckout(String, #[source] Box<DeployError>),

    #[error("git pull failed for branch '{0}'")]
    GitPull(String, #[source] Box<DeployError>),

    #[error("git clone failed for {0}")]
    GitClone(String, #[source] Box<DeployError>),

    #[error("cannot reach {0} over SSH")]
    Connectivity(String, #[source] Box<DeployError>),

    #[error("remote step failed: {step}")]
    RemoteCommand {
        step: String,
        #[source]
        source: Box<DeployError>,
    },

    #[error("file transfer failed: {0}")]
    Transfer(String),

    #[error("nginx rejected the generated configuration")]
    ProxyConfigInvalid,

    #[error("container '{0}' is not running after {1} checks")]
    ContainerNotRunning(String, u32),

    #[error("command failed: {command}: {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl DeployError {
    /// Process exit code reported for this error.
    ///
    /// Codes start at 10 to stay clear of the usage-error code
    /// clap exits with.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::MissingRepoUrl => 10,
            Self::MissingToken => 11,
            Self::MissingUser => 12,
            Self::MissingHost => 13,
            Self::MissingKeyPath => 14,
            Self::KeyNotFound(_) => 15,
            Self::InvalidPort(_) => 16,
            Self::GitFetch(..) => 20,
            Self::GitCheckout(..) => 21,
            Self::GitPull(..) => 22,
            Self::GitClone(..) => 23,
            Self::Connectivity(..) => 30,
            Self::RemoteCommand { .. } => 31,
            Self::Transfer(_) => 32,
            Self::ProxyConfigInvalid => 33,
            Self::ContainerNotRunning(..) => 34,
            Self::CommandFailed { .. }
            | Self::CommandNotFound(_)
            | Self::Other(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Yaml(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_have_distinct_codes() {
        let codes = [
            DeployError::MissingRepoUrl.exit_code(),
            DeployError::MissingToken.exit_code(),
            DeployError::MissingUser.exit_code(),
            DeployError::MissingHost.exit_code(),
            DeployError::MissingKeyPath.exit_code(),
            DeployError::KeyNotFound("k".into()).exit_code(),
            DeployError::InvalidPort("0".into()).exit_code(),
        ];

        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn remote_command_wraps_source() {
        let err = DeployError::RemoteCommand {
            step: "install nginx".into(),
            source: Box::new(DeployError::Other("apt locked".into())),
        };

        assert_eq!(err.exit_code(), 31);
        assert_eq!(err.to_string(), "remote step failed: install nginx");
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("apt locked"));
    }
}
