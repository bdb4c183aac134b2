//! In-process [`LedgerRemote`] with compare-and-swap publish.
//!
//! Handles are cheap clones of one shared cell, so several simulated runs
//! (threads) can race against the same store exactly the way separate CI
//! jobs race against one git remote.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{LedgerRemote, PublishResult, RemoteState};
use crate::error::RelayError;
use crate::ledger::{Identifier, Ledger};

#[derive(Debug, Default)]
struct Cell {
    ledger: Ledger,
    version: u64,
}

/// A shared, versioned ledger cell.
#[derive(Clone, Debug, Default)]
pub struct MemoryRemote {
    cell: Arc<Mutex<Cell>>,
}

impl MemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `ledger` (at version 1).
    #[must_use]
    pub fn with_ledger(ledger: Ledger) -> Self {
        Self {
            cell: Arc::new(Mutex::new(Cell { ledger, version: 1 })),
        }
    }

    /// Current contents.
    #[must_use]
    pub fn ledger(&self) -> Ledger {
        self.lock().ledger.clone()
    }

    /// Number of successful publishes (plus one if seeded).
    #[must_use]
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    /// Append ids unconditionally, as a run on another machine would.
    pub fn advance<I: IntoIterator<Item = Identifier>>(&self, ids: I) {
        let mut cell = self.lock();
        cell.ledger.extend(ids);
        cell.version += 1;
    }

    fn lock(&self) -> MutexGuard<'_, Cell> {
        // A panicking writer cannot leave a half-written ledger behind:
        // the cell is only ever replaced whole.
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn revision_of(version: u64) -> Option<String> {
    (version > 0).then(|| version.to_string())
}

impl LedgerRemote for MemoryRemote {
    fn fetch(&mut self) -> Result<RemoteState, RelayError> {
        let cell = self.lock();
        Ok(RemoteState {
            ledger: cell.ledger.clone(),
            revision: revision_of(cell.version),
        })
    }

    fn publish(
        &mut self,
        ledger: &Ledger,
        expected: Option<&str>,
    ) -> Result<PublishResult, RelayError> {
        let mut cell = self.lock();
        let current = revision_of(cell.version);
        if current.as_deref() != expected {
            return Ok(PublishResult::Rejected {
                reason: format!(
                    "store is at version {}, expected {}",
                    current.as_deref().unwrap_or("none"),
                    expected.unwrap_or("none")
                ),
            });
        }
        cell.ledger = ledger.clone();
        cell.version += 1;
        Ok(PublishResult::Published {
            revision: revision_of(cell.version),
        })
    }

    fn describe(&self) -> String {
        "memory".to_owned()
    }
}
