//! [`GitCli`]: run git commands in a working clone.
//!
//! Every method spawns `git` with the clone as its working directory. Push
//! rejection is classified from git's output, the same way for every remote
//! type git supports (file, ssh, https).

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, instrument};

use crate::error::GitError;
use crate::types::{CommitId, FetchOutcome, Identity, PushOutcome};

/// Phrases git uses when the remote refuses a push because it moved.
const REJECTION_MARKERS: &[&str] = &[
    "[rejected]",
    "non-fast-forward",
    "fetch first",
    "stale info",
    "failed to update ref",
    "cannot lock ref",
];

/// Phrases git uses when a fetched branch does not exist on the remote.
const MISSING_BRANCH_MARKERS: &[&str] = &["couldn't find remote ref", "could not find remote ref"];

/// A handle on one git working clone.
#[derive(Clone, Debug)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    /// Open the work tree containing `path`.
    ///
    /// # Errors
    /// [`GitError::NotARepository`] if `path` is not inside a git work tree,
    /// [`GitError::Spawn`] if git is not available.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let probe = Self {
            root: path.to_owned(),
        };
        let out = probe.output(&["rev-parse", "--show-toplevel"])?;
        if !out.status.success() {
            return Err(GitError::NotARepository {
                path: path.to_owned(),
            });
        }
        let top = String::from_utf8_lossy(&out.stdout).trim().to_owned();
        Ok(Self {
            root: PathBuf::from(top),
        })
    }

    /// Repository root (the work tree top level).
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fetch `branch` from `remote` into `refs/remotes/<remote>/<branch>`.
    ///
    /// # Errors
    /// Any git failure other than the branch not existing remotely.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn fetch(&self, remote: &str, branch: &str) -> Result<FetchOutcome, GitError> {
        let tracking = tracking_ref(remote, branch);
        let refspec = format!("+refs/heads/{branch}:{tracking}");
        let out = self.output(&["fetch", "--quiet", "--no-tags", remote, &refspec])?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr).trim().to_owned();
            if MISSING_BRANCH_MARKERS.iter().any(|m| stderr.contains(m)) {
                debug!(remote, branch, "remote branch does not exist yet");
                return Ok(FetchOutcome::MissingBranch);
            }
            return Err(GitError::Command {
                command: format!("git fetch --quiet --no-tags {remote} {refspec}"),
                stderr,
                exit_code: out.status.code(),
            });
        }

        match self.rev_parse_opt(&tracking)? {
            Some(tip) => Ok(FetchOutcome::Tip(tip)),
            None => Ok(FetchOutcome::MissingBranch),
        }
    }

    /// Move HEAD, index and work tree to `commit`, discarding local changes
    /// and local commits.
    ///
    /// # Errors
    /// Returns an error if git fails.
    pub fn reset_hard(&self, commit: &CommitId) -> Result<(), GitError> {
        self.run(&["reset", "--quiet", "--hard", commit.as_str()])?;
        Ok(())
    }

    /// Resolve a revision, returning `None` if it does not exist.
    ///
    /// # Errors
    /// Returns an error if git cannot be spawned or prints a malformed id.
    pub fn rev_parse_opt(&self, spec: &str) -> Result<Option<CommitId>, GitError> {
        let verify = format!("{spec}^{{commit}}");
        let out = self.output(&["rev-parse", "--verify", "--quiet", &verify])?;
        if !out.status.success() {
            return Ok(None);
        }
        let raw = String::from_utf8_lossy(&out.stdout).trim().to_owned();
        CommitId::parse(&raw)
            .map(Some)
            .ok_or_else(|| GitError::UnexpectedOutput {
                command: format!("git rev-parse --verify --quiet {verify}"),
                output: raw,
            })
    }

    /// Current HEAD commit, or `None` on an unborn branch.
    ///
    /// # Errors
    /// See [`rev_parse_opt`](Self::rev_parse_opt).
    pub fn head(&self) -> Result<Option<CommitId>, GitError> {
        self.rev_parse_opt("HEAD")
    }

    /// Stage one path (relative to the root, or absolute inside it).
    ///
    /// # Errors
    /// Returns an error if git fails.
    pub fn add(&self, path: &Path) -> Result<(), GitError> {
        let path = path.to_string_lossy();
        self.run(&["add", "--", &path])?;
        Ok(())
    }

    /// Returns `true` if the index differs from HEAD.
    ///
    /// # Errors
    /// Returns an error if git fails for a reason other than reporting a diff.
    pub fn has_staged_changes(&self) -> Result<bool, GitError> {
        let out = self.output(&["diff", "--cached", "--quiet"])?;
        match out.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            code => Err(GitError::Command {
                command: "git diff --cached --quiet".to_owned(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
                exit_code: code,
            }),
        }
    }

    /// Commit the index and return the new HEAD.
    ///
    /// # Errors
    /// Returns an error if git fails (including "nothing to commit").
    pub fn commit(&self, message: &str, identity: &Identity) -> Result<CommitId, GitError> {
        let mut args = identity.config_args();
        args.extend(["commit", "--quiet", "--no-verify", "-m", message].map(str::to_owned));
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&args)?;
        self.head()?.ok_or_else(|| GitError::UnexpectedOutput {
            command: "git commit".to_owned(),
            output: "HEAD is unborn after commit".to_owned(),
        })
    }

    /// Push HEAD to `refs/heads/<branch>` on `remote` without forcing.
    ///
    /// A non-fast-forward refusal comes back as [`PushOutcome::Rejected`].
    ///
    /// # Errors
    /// Transport failures (auth, network, missing remote).
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn push(&self, remote: &str, branch: &str) -> Result<PushOutcome, GitError> {
        let refspec = format!("HEAD:refs/heads/{branch}");
        let out = self.output(&["push", "--quiet", remote, &refspec])?;
        if out.status.success() {
            return Ok(PushOutcome::Accepted);
        }

        let stderr = String::from_utf8_lossy(&out.stderr).trim().to_owned();
        if REJECTION_MARKERS.iter().any(|m| stderr.contains(m)) {
            debug!(remote, branch, %stderr, "push rejected");
            return Ok(PushOutcome::Rejected { reason: stderr });
        }

        Err(GitError::Command {
            command: format!("git push --quiet {remote} {refspec}"),
            stderr,
            exit_code: out.status.code(),
        })
    }

    /// Run git and require success; returns trimmed stdout.
    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let out = self.output(args)?;
        if out.status.success() {
            return Ok(String::from_utf8_lossy(&out.stdout).trim().to_owned());
        }
        Err(GitError::Command {
            command: format!("git {}", args.join(" ")),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
            exit_code: out.status.code(),
        })
    }

    fn output(&self, args: &[&str]) -> Result<Output, GitError> {
        debug!(args = ?args, "git");
        Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|source| GitError::Spawn {
                dir: self.root.clone(),
                source,
            })
    }
}

fn tracking_ref(remote: &str, branch: &str) -> String {
    format!("refs/remotes/{remote}/{branch}")
}
