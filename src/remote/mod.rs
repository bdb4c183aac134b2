//! Shared-store transport trait and common types.
//!
//! The coordinator only needs two things from wherever the ledger is
//! shared: "give me the latest state" and "replace it with this, unless it
//! moved since I looked". [`LedgerRemote`] is that contract; the merge and
//! retry logic never learns which backend is behind it.
//!
//! - [`git::GitRemote`]: a working clone of a git repository; publish is
//!   commit + non-forced push, so a concurrent push shows up as a
//!   non-fast-forward rejection.
//! - [`memory::MemoryRemote`]: an in-process compare-and-swap cell, the
//!   shape a small key-value service would have.

pub mod git;
pub mod memory;

use crate::error::RelayError;
use crate::ledger::Ledger;

/// The remote-visible ledger at one point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteState {
    /// Ledger contents.
    pub ledger: Ledger,
    /// Backend version tag (commit id, counter), `None` if the store has
    /// never been published.
    pub revision: Option<String>,
}

impl RemoteState {
    /// The state of a store nobody has written yet.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ledger: Ledger::new(),
            revision: None,
        }
    }
}

/// Outcome of a conditional publish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublishResult {
    /// The new ledger is now the remote state.
    Published {
        /// Revision of the newly published state.
        revision: Option<String>,
    },
    /// The remote advanced since the state the caller merged against.
    /// Nothing was made visible; fetch and merge again.
    Rejected {
        /// Backend explanation, for logs.
        reason: String,
    },
}

/// Fetch-latest / conditional-publish access to the shared ledger.
///
/// # Key Invariants
///
/// - `publish` never makes a partial ledger visible: either the whole new
///   ledger becomes the remote state or nothing changes.
/// - `publish` with a stale `expected` revision returns
///   [`PublishResult::Rejected`]; it never overwrites a newer state.
/// - Transport failures that a retry cannot fix are errors, not rejections.
pub trait LedgerRemote {
    /// Sync with the shared store and return its current ledger.
    ///
    /// # Errors
    /// [`RelayError::StoreCorrupt`] if the stored ledger cannot be parsed,
    /// [`RelayError::Transport`] / [`RelayError::Io`] on backend failures.
    fn fetch(&mut self) -> Result<RemoteState, RelayError>;

    /// Replace the shared ledger with `ledger` if the store is still at
    /// `expected` (the revision returned by the `fetch` this merge used).
    ///
    /// # Errors
    /// Backend failures other than losing the race.
    fn publish(
        &mut self,
        ledger: &Ledger,
        expected: Option<&str>,
    ) -> Result<PublishResult, RelayError>;

    /// Short human-readable name for logs (e.g. `"origin/main"`).
    fn describe(&self) -> String;
}

