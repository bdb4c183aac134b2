//! Ledger merge: replay a run's additions onto a remote that moved.
//!
//! Two runs that started from the same snapshot never share a linear
//! history update, so a plain "write my ledger" would drop whatever the
//! other run added. Instead the run replays only its own additions on top of
//! the latest remote state:
//!
//! ```text
//! delta  = mine − base            (order from mine)
//! merged = dedup(remote ++ delta) (first occurrence wins)
//! ```
//!
//! # Properties
//!
//! - **No loss**: every identifier in `remote` survives, in its order.
//! - **No duplication**: the result never repeats an identifier.
//! - **Append-only**: new identifiers land after all of `remote`, in the
//!   order the run posted them.
//! - **Idempotent**: merging the result again with the same `mine` and
//!   `remote` changes nothing.
//!
//! Entries the remote dropped are not resurrected from `base`. Losing a race
//! means resetting to the remote and replaying the delta; this is not a
//! three-way merge.

use crate::ledger::{Delta, Ledger};

/// Result of [`merge`]: the new ledger plus the delta that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The ledger to persist.
    pub merged: Ledger,
    /// `mine − base`, before filtering out ids the remote already had.
    pub delta: Delta,
    /// How many delta ids were actually new to the remote.
    pub added: usize,
}

impl MergeOutcome {
    /// `true` if the merge leaves the remote unchanged.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.added == 0
    }
}

/// Merge this run's additions into the latest remote ledger.
#[must_use]
pub fn merge(base: &Ledger, mine: &Ledger, remote: &Ledger) -> MergeOutcome {
    let delta = Delta::between(base, mine);
    let mut merged = remote.clone();
    let added = merged.extend(delta.as_slice().iter().cloned());
    MergeOutcome {
        merged,
        delta,
        added,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
