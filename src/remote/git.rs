//! Git-backed [`LedgerRemote`].
//!
//! The ledger file lives in a working clone. `fetch` hard-resets the clone
//! to the remote branch tip, so any local commit left by a lost race is
//! discarded; the caller still holds its delta in memory and replays it.
//! `publish` writes the file, commits it and pushes without `--force`.
//! Git refuses the push if another run got there first, which is the
//! compare-and-swap this backend relies on.

use std::path::{Path, PathBuf};

use relay_git::{FetchOutcome, GitCli, Identity, PushOutcome};
use tracing::{debug, info};

use super::{LedgerRemote, PublishResult, RemoteState};
use crate::config::PublishConfig;
use crate::error::RelayError;
use crate::ledger::Ledger;
use crate::store::LedgerStore;

/// A ledger file inside a git working clone, shared through one remote
/// branch.
#[derive(Debug)]
pub struct GitRemote {
    git: GitCli,
    store: LedgerStore,
    rel_path: PathBuf,
    remote: String,
    branch: String,
    identity: Identity,
    message: String,
}

impl GitRemote {
    /// Wrap the clone `git`, with the ledger at `rel_path` under its root.
    #[must_use]
    pub fn new(git: GitCli, rel_path: &Path, publish: &PublishConfig) -> Self {
        let store = LedgerStore::new(git.root().join(rel_path));
        Self {
            git,
            store,
            rel_path: rel_path.to_owned(),
            remote: publish.remote.clone(),
            branch: publish.branch.clone(),
            identity: publish.identity(),
            message: publish.commit_message.clone(),
        }
    }

    /// The ledger file in the working clone.
    #[must_use]
    pub const fn store(&self) -> &LedgerStore {
        &self.store
    }
}

impl LedgerRemote for GitRemote {
    fn fetch(&mut self) -> Result<RemoteState, RelayError> {
        match self.git.fetch(&self.remote, &self.branch)? {
            FetchOutcome::Tip(tip) => {
                self.git.reset_hard(&tip)?;
                let ledger = self.store.load()?;
                debug!(tip = tip.short(), entries = ledger.len(), "fetched ledger");
                Ok(RemoteState {
                    ledger,
                    revision: Some(tip.as_str().to_owned()),
                })
            }
            FetchOutcome::MissingBranch => {
                info!(
                    remote = %self.remote,
                    branch = %self.branch,
                    "remote branch does not exist yet; starting from an empty ledger"
                );
                Ok(RemoteState::empty())
            }
        }
    }

    fn publish(
        &mut self,
        ledger: &Ledger,
        expected: Option<&str>,
    ) -> Result<PublishResult, RelayError> {
        self.store.save(ledger)?;
        self.git.add(&self.rel_path)?;

        if !self.git.has_staged_changes()? {
            // The tree already holds exactly this ledger.
            let head = self.git.head()?;
            return Ok(PublishResult::Published {
                revision: head.map(|h| h.as_str().to_owned()),
            });
        }

        let commit = self.git.commit(&self.message, &self.identity)?;
        debug!(commit = commit.short(), parent = ?expected, "committed ledger");

        match self.git.push(&self.remote, &self.branch)? {
            PushOutcome::Accepted => Ok(PublishResult::Published {
                revision: Some(commit.as_str().to_owned()),
            }),
            PushOutcome::Rejected { reason } => Ok(PublishResult::Rejected { reason }),
        }
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.remote, self.branch)
    }
}
