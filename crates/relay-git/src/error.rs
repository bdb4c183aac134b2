//! Error types for git operations.
//!
//! A rejected push is *not* an error: it is reported through
//! [`PushOutcome::Rejected`](crate::PushOutcome::Rejected) because callers
//! are expected to fetch, merge and retry. [`GitError`] covers everything
//! that retrying will not fix.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by [`GitCli`](crate::GitCli) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// `git` could not be spawned at all (not installed, bad cwd, ...).
    #[error("failed to spawn git in {}: {source}", dir.display())]
    Spawn {
        /// Directory git was run in.
        dir: PathBuf,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// A git command exited non-zero.
    #[error("`{command}` failed{}: {stderr}", exit_code.map(|c| format!(" (exit code {c})")).unwrap_or_default())]
    Command {
        /// The command line that was run (e.g. `"git push origin HEAD:main"`).
        command: String,
        /// Stderr from git, trimmed.
        stderr: String,
        /// Process exit code, if git was not killed by a signal.
        exit_code: Option<i32>,
    },

    /// The directory is not inside a git work tree.
    #[error("not a git repository: {}", path.display())]
    NotARepository {
        /// The path that was checked.
        path: PathBuf,
    },

    /// Git printed something we could not interpret.
    #[error("unexpected output from `{command}`: {output:?}")]
    UnexpectedOutput {
        /// The command that produced the output.
        command: String,
        /// The raw (trimmed) output.
        output: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_error_display_includes_exit_code() {
        let err = GitError::Command {
            command: "git push origin HEAD:main".to_owned(),
            stderr: "fatal: unable to access".to_owned(),
            exit_code: Some(128),
        };
        let msg = err.to_string();
        assert!(msg.contains("git push origin HEAD:main"));
        assert!(msg.contains("exit code 128"));
        assert!(msg.contains("unable to access"));
    }

    #[test]
    fn command_error_display_without_exit_code() {
        let err = GitError::Command {
            command: "git fetch".to_owned(),
            stderr: "killed".to_owned(),
            exit_code: None,
        };
        assert_eq!(err.to_string(), "`git fetch` failed: killed");
    }
}
