use std::fmt;
use std::path::{Path, PathBuf};

use docker_compose_types::Compose;
use indexmap::IndexMap;

use crate::error::DeployResult;

/// Compose file names, in lookup order.
pub const COMPOSE_FILES: [&str; 4] = [
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

pub const DOCKERFILE: &str = "Dockerfile";

/// How a compose service gets its image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceSource {
    Image(String),
    Build,
}

impl fmt::Display for ServiceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(image) => write!(f, "image {image}"),
            Self::Build => f.write_str("build"),
        }
    }
}

/// Container build descriptor found in a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// Multi-service compose file, services in file order.
    Compose {
        path: PathBuf,
        services: IndexMap<String, ServiceSource>,
    },
    /// Single-image build file.
    Dockerfile { path: PathBuf },
    Missing,
}

impl Descriptor {
    /// Look for a compose file first, then a `Dockerfile`, at the
    /// root of `repo_dir`.
    pub fn detect(repo_dir: &Path) -> DeployResult<Self> {
        for name in COMPOSE_FILES {
            let path = repo_dir.join(name);
            if path.is_file() {
                let services = parse_services(&std::fs::read_to_string(&path)?)?;
                return Ok(Self::Compose { path, services });
            }
        }

        let path = repo_dir.join(DOCKERFILE);
        if path.is_file() {
            return Ok(Self::Dockerfile { path });
        }

        Ok(Self::Missing)
    }

    /// File name of the descriptor relative to the repository root.
    #[must_use]
    pub fn file_name(&self) -> Option<String> {
        match self {
            Self::Compose { path, .. } | Self::Dockerfile { path } => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string()),
            Self::Missing => None,
        }
    }
}

/// Declared services of a compose file.
pub fn parse_services(content: &str) -> DeployResult<IndexMap<String, ServiceSource>> {
    let compose: Compose = serde_yaml::from_str(content)?;

    Ok(compose
        .services
        .0
        .into_iter()
        .map(|(name, service)| {
            let source = service
                .and_then(|s| s.image)
                .map_or(ServiceSource::Build, ServiceSource::Image);
            (name, source)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn services_keep_file_order() {
        let yaml = "\
services:
  web:
    build: .
    ports:
      - \"3000:3000\"
  db:
    image: postgres:16
";
        let services = parse_services(yaml).unwrap();

        let names: Vec<&String> = services.keys().collect();
        assert_eq!(names, vec!["web", "db"]);
        assert_eq!(services["web"], ServiceSource::Build);
        assert_eq!(services["db"], ServiceSource::Image("postgres:16".into()));
    }

    #[test]
    fn source_display() {
        assert_eq!(ServiceSource::Build.to_string(), "build");
        assert_eq!(
            ServiceSource::Image("redis:7".into()).to_string(),
            "image redis:7"
        );
    }
}
