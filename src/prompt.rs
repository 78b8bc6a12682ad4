use std::io::{BufRead, Write};

use crate::config::{DEFAULT_BRANCH, DEFAULT_KEY, DEFAULT_PORT, RawInputs};
use crate::error::DeployResult;

/// Source of operator answers for parameters not given on the
/// command line.
pub trait Prompter {
    /// Ask for a visible value. An empty answer falls back to
    /// `default` when there is one.
    fn ask(&mut self, label: &str, default: Option<&str>) -> DeployResult<Option<String>>;

    /// Ask for a value without echoing it.
    fn ask_secret(&mut self, label: &str) -> DeployResult<Option<String>>;
}

/// Reads answers from the controlling terminal.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&mut self, label: &str, default: Option<&str>) -> DeployResult<Option<String>> {
        match default {
            Some(d) => eprint!("{label} [{d}]: "),
            None => eprint!("{label}: "),
        }
        std::io::stderr().flush()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(answer(&line, default))
    }

    fn ask_secret(&mut self, label: &str) -> DeployResult<Option<String>> {
        let value = rpassword::prompt_password(format!("{label}: "))?;
        Ok(answer(&value, None))
    }
}

/// Prompt for every field still unset. Fields already supplied
/// are left alone.
pub fn fill_missing(inputs: &mut RawInputs, prompter: &mut dyn Prompter) -> DeployResult<()> {
    let port = DEFAULT_PORT.to_string();

    if inputs.repo_url.is_none() {
        inputs.repo_url = prompter.ask("Git repository URL (HTTPS)", None)?;
    }
    if inputs.token.is_none() {
        inputs.token = prompter.ask_secret("Personal access token")?;
    }
    if inputs.branch.is_none() {
        inputs.branch = prompter.ask("Branch", Some(DEFAULT_BRANCH))?;
    }
    if inputs.user.is_none() {
        inputs.user = prompter.ask("Remote SSH username", None)?;
    }
    if inputs.host.is_none() {
        inputs.host = prompter.ask("Remote server IP or hostname", None)?;
    }
    if inputs.key_path.is_none() {
        inputs.key_path = prompter.ask("SSH private key path", Some(DEFAULT_KEY))?;
    }
    if inputs.port.is_none() {
        inputs.port = prompter.ask("Application port", Some(&port))?;
    }
    Ok(())
}

/// Prompt only for the SSH destination (cleanup and status).
pub fn fill_remote(inputs: &mut RawInputs, prompter: &mut dyn Prompter) -> DeployResult<()> {
    if inputs.user.is_none() {
        inputs.user = prompter.ask("Remote SSH username", None)?;
    }
    if inputs.host.is_none() {
        inputs.host = prompter.ask("Remote server IP or hostname", None)?;
    }
    if inputs.key_path.is_none() {
        inputs.key_path = prompter.ask("SSH private key path", Some(DEFAULT_KEY))?;
    }
    Ok(())
}

fn answer(raw: &str, default: Option<&str>) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        default.map(ToString::to_string)
    } else {
        Some(trimmed.to_string())
    }
}
