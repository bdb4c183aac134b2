//! Publishing targets: the platforms a candidate is reposted to.
//!
//! Platform API calls live outside the relay. A [`CommandTarget`] runs a
//! configured poster program per candidate: the candidate is written to its
//! stdin as JSON, `RELAY_ITEM_ID` carries the id, and exit status 0 means
//! the post went out.

use std::io::Write as _;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, instrument};

use crate::config::TargetConfig;
use crate::error::RelayError;
use crate::source::Candidate;

/// A destination a candidate can be posted to.
pub trait PublishTarget {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Post one candidate.
    ///
    /// # Errors
    /// [`RelayError::PublishTargetUnavailable`] when the post did not go out.
    fn publish(&mut self, candidate: &Candidate) -> Result<(), RelayError>;
}

/// Posts by running an external command.
#[derive(Clone, Debug)]
pub struct CommandTarget {
    name: String,
    program: String,
    args: Vec<String>,
    workdir: Option<PathBuf>,
}

impl CommandTarget {
    #[must_use]
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            workdir: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &TargetConfig) -> Self {
        Self::new(&config.name, &config.command, config.args.clone())
    }

    /// Run the command in `dir` instead of the current directory.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    fn unavailable(&self, candidate: &Candidate, detail: String) -> RelayError {
        RelayError::PublishTargetUnavailable {
            target: self.name.clone(),
            id: candidate.id.clone(),
            detail,
        }
    }
}

impl PublishTarget for CommandTarget {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip_all, fields(target = %self.name, id = %candidate.id))]
    fn publish(&mut self, candidate: &Candidate) -> Result<(), RelayError> {
        let payload = serde_json::to_vec(candidate)
            .map_err(|e| self.unavailable(candidate, format!("cannot encode candidate: {e}")))?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env("RELAY_ITEM_ID", candidate.id.as_str())
            .env("RELAY_TARGET", &self.name)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        if let Some(traceparent) = crate::telemetry::current_traceparent() {
            cmd.env("TRACEPARENT", traceparent);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| self.unavailable(candidate, format!("failed to run '{}': {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A poster that ignores stdin may exit before reading it; its
            // exit status is what decides success.
            if let Err(e) = stdin.write_all(&payload) {
                debug!(error = %e, "poster closed stdin early");
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| self.unavailable(candidate, format!("failed to wait for '{}': {e}", self.program)))?;

        if output.status.success() {
            debug!(stdout = %String::from_utf8_lossy(&output.stdout).trim(), "posted");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let last = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
        let status = output
            .status
            .code()
            .map_or_else(|| "killed by signal".to_owned(), |c| format!("exit code {c}"));
        Err(self.unavailable(candidate, format!("{status}: {}", last.trim())))
    }
}
