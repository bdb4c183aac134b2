//! Error types for meme-relay.
//!
//! [`RelayError`] covers every failure the ledger core can report. Messages
//! are operator-facing: each variant says what went wrong and what to do
//! about it, because the usual reader is someone looking at a failed CI run.
//!
//! Only [`RelayError::StoreCorrupt`], [`RelayError::PublishConflict`],
//! [`RelayError::Transport`] and [`RelayError::Config`] ever abort a run.
//! Source and target failures are per item: the run logs them and carries on.

use std::fmt;
use std::path::PathBuf;

use crate::config::ConfigError;
use crate::ledger::Identifier;

/// Unified error type for ledger, transport and collaborator failures.
#[derive(Debug)]
pub enum RelayError {
    /// The persisted ledger could not be parsed. Never auto-healed:
    /// overwriting it would throw away every recorded id.
    StoreCorrupt {
        /// Path of the ledger file.
        path: PathBuf,
        /// Parser message.
        detail: String,
    },

    /// The remote kept moving; the push lost the race on every attempt.
    PublishConflict {
        /// How many fetch-merge-push cycles were tried.
        attempts: u32,
        /// Identifiers posted this run that are not durably recorded.
        pending: Vec<Identifier>,
    },

    /// The content source could not supply candidates.
    SourceUnavailable {
        /// What failed.
        detail: String,
    },

    /// A publishing target failed for one item.
    PublishTargetUnavailable {
        /// Target name from the config.
        target: String,
        /// The item that was being posted.
        id: Identifier,
        /// What failed.
        detail: String,
    },

    /// The shared store's transport failed for a reason retrying won't fix.
    Transport(relay_git::GitError),

    /// The configuration file could not be loaded.
    Config(ConfigError),

    /// Local I/O on the ledger file failed.
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
}

impl RelayError {
    /// Returns `true` for per-item failures that must not abort a run.
    #[must_use]
    pub const fn is_per_item(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::PublishTargetUnavailable { .. }
        )
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreCorrupt { path, detail } => {
                write!(
                    f,
                    "ledger {} is corrupt: {detail}\n  \
                     The file must be a JSON array of non-empty strings.\n  \
                     To fix: repair it by hand (see `git log -p -- {}`), then re-run.",
                    path.display(),
                    path.display()
                )
            }
            Self::PublishConflict { attempts, pending } => {
                write!(
                    f,
                    "could not publish the ledger after {attempts} attempt(s): \
                     the remote kept advancing"
                )?;
                if !pending.is_empty() {
                    let ids: Vec<&str> = pending.iter().map(Identifier::as_str).collect();
                    write!(f, "\n  Not recorded this run: {}", ids.join(", "))?;
                }
                write!(
                    f,
                    "\n  To fix: nothing; the next scheduled run retries. \
                     Raise [publish] max_attempts if this keeps happening."
                )
            }
            Self::SourceUnavailable { detail } => {
                write!(f, "content source unavailable: {detail}")
            }
            Self::PublishTargetUnavailable { target, id, detail } => {
                write!(f, "target '{target}' failed to post {id}: {detail}")
            }
            Self::Transport(e) => {
                write!(
                    f,
                    "{e}\n  To fix: check the remote URL and push credentials, \
                     then run `git fetch` in the ledger repository."
                )
            }
            Self::Config(e) => write!(f, "{e}"),
            Self::Io { path, source } => write!(f, "I/O error on {}: {source}", path.display()),
        }
    }
}

impl std::error::Error for RelayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<relay_git::GitError> for RelayError {
    fn from(e: relay_git::GitError) -> Self {
        Self::Transport(e)
    }
}

impl From<ConfigError> for RelayError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_corrupt_display() {
        let err = RelayError::StoreCorrupt {
            path: PathBuf::from("posted_ids.json"),
            detail: "expected value at line 1 column 1".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("posted_ids.json is corrupt"));
        assert!(msg.contains("line 1 column 1"));
        assert!(msg.contains("To fix"));
    }

    #[test]
    fn publish_conflict_lists_pending() {
        let err = RelayError::PublishConflict {
            attempts: 3,
            pending: vec![Identifier::new("abc").unwrap(), Identifier::new("def").unwrap()],
        };
        let msg = err.to_string();
        assert!(msg.contains("after 3 attempt(s)"));
        assert!(msg.contains("abc, def"));
    }

    #[test]
    fn per_item_classification() {
        let id = Identifier::new("x").unwrap();
        assert!(
            RelayError::PublishTargetUnavailable {
                target: "bluesky".to_owned(),
                id,
                detail: "timeout".to_owned(),
            }
            .is_per_item()
        );
        assert!(
            RelayError::SourceUnavailable {
                detail: "feed missing".to_owned()
            }
            .is_per_item()
        );
        assert!(
            !RelayError::PublishConflict {
                attempts: 1,
                pending: Vec::new()
            }
            .is_per_item()
        );
    }
}
