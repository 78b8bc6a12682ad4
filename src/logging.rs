use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::DeployResult;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// Per-run deployment log. Records are appended to a plain text
/// file as `<timestamp> <message>` and mirrored to the terminal
/// through `tracing`.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    /// Open a new timestamped log file (`deploy_YYYYMMDD_HHMMSS.log`)
    /// inside `dir`, creating the directory if needed.
    pub fn create(dir: &Path) -> DeployResult<Self> {
        std::fs::create_dir_all(dir)?;
        let name = format!("deploy_{}.log", Local::now().format("%Y%m%d_%H%M%S"));
        Self::at(&dir.join(name))
    }

    /// Open (or append to) the log file at `path`.
    pub fn at(path: &Path) -> DeployResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and mirror it to the terminal.
    ///
    /// A failed write to the file is reported through `tracing` but
    /// never aborts the run.
    pub fn append(&self, level: Level, message: &str) {
        match level {
            Level::Info => tracing::info!("{message}"),
            Level::Warn => tracing::warn!("{message}"),
            Level::Error => tracing::error!("{message}"),
        }

        let line = format_record(&Local::now().format(TIMESTAMP_FORMAT).to_string(), level, message);
        if let Err(e) = (&self.file).write_all(line.as_bytes()) {
            tracing::error!(path = %self.path.display(), "cannot write run log: {e}");
        }
    }

    pub fn info(&self, message: &str) {
        self.append(Level::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.append(Level::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.append(Level::Error, message);
    }
}

fn format_record(timestamp: &str, level: Level, message: &str) -> String {
    let prefix = match level {
        Level::Info => "",
        Level::Warn => "WARNING: ",
        Level::Error => "ERROR: ",
    };
    format!("{timestamp} {prefix}{message}\n")
}
