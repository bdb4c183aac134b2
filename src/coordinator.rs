//! Publish coordinator: fetch, merge, conditional publish, bounded retry.
//!
//! ```text
//! attempt 1..=max_attempts:
//!   remote  = fetch()
//!   merged  = merge(snapshot, mine, remote)
//!   merged == remote        → done, nothing written
//!   publish(merged, remote.revision)
//!     Published             → done
//!     Rejected              → back off, next attempt
//! exhausted                 → PublishConflict (delta stays in memory)
//! ```
//!
//! No locks are taken anywhere: correctness comes from the merge, and the
//! conditional publish only decides who has to merge again.

use std::thread;
use std::time::Duration;

use rand::Rng as _;
use tracing::{info, instrument, warn};

use crate::config::PublishConfig;
use crate::error::RelayError;
use crate::ledger::{Delta, Ledger, Snapshot};
use crate::merge::merge;
use crate::remote::{LedgerRemote, PublishResult};

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// How many fetch-merge-publish cycles to try and how long to wait between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least 1.
    pub max_attempts: u32,
    /// Pause before the second attempt; doubles each time after.
    pub backoff: Duration,
    /// Upper bound of the random extra pause added to each backoff.
    pub jitter: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(publish: &PublishConfig) -> Self {
        Self {
            max_attempts: publish.effective_max_attempts(),
            backoff: publish.backoff(),
            jitter: publish.jitter(),
        }
    }

    /// Retry without sleeping.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Pause after failed attempt number `attempt` (1-based).
    fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(6);
        let base = self.backoff.saturating_mul(factor);
        if self.jitter.is_zero() {
            return base;
        }
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        base + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&PublishConfig::default())
    }
}

// ---------------------------------------------------------------------------
// PublishReport
// ---------------------------------------------------------------------------

/// What a successful publish cycle did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublishReport {
    /// Nothing new survived the merge; no write happened.
    Unchanged {
        /// Ids this run posted that the remote already had.
        already_recorded: usize,
    },
    /// The merged ledger is now the shared state.
    Published {
        /// Which attempt landed (1-based).
        attempts: u32,
        /// Ids newly recorded by this run.
        added: usize,
        /// Ledger size after publishing.
        entries: usize,
        /// Backend revision of the new state.
        revision: Option<String>,
    },
}

impl PublishReport {
    #[must_use]
    pub const fn wrote(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

// ---------------------------------------------------------------------------
// PublishCoordinator
// ---------------------------------------------------------------------------

/// Drives the fetch-merge-publish protocol against one [`LedgerRemote`].
#[derive(Debug)]
pub struct PublishCoordinator<R> {
    remote: R,
    policy: RetryPolicy,
}

impl<R: LedgerRemote> PublishCoordinator<R> {
    #[must_use]
    pub const fn new(remote: R, policy: RetryPolicy) -> Self {
        Self { remote, policy }
    }

    #[must_use]
    pub const fn remote(&self) -> &R {
        &self.remote
    }

    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Capture the run's starting point from the shared store.
    ///
    /// # Errors
    /// Propagates fetch failures; a corrupt store must stop the run before
    /// anything is posted.
    #[instrument(skip(self), fields(remote = %self.remote.describe()))]
    pub fn snapshot(&mut self) -> Result<Snapshot, RelayError> {
        let state = self.remote.fetch()?;
        info!(entries = state.ledger.len(), "ledger snapshot taken");
        Ok(Snapshot::at_run_start(state.ledger, state.revision))
    }

    /// Record `mine − base` in the shared store.
    ///
    /// # Errors
    /// [`RelayError::PublishConflict`] after `max_attempts` rejections;
    /// fetch/publish failures are returned as-is. In every error case the
    /// shared store is left as it was.
    #[instrument(skip_all, fields(remote = %self.remote.describe(), max_attempts = self.policy.max_attempts))]
    pub fn publish(&mut self, base: &Snapshot, mine: &Ledger) -> Result<PublishReport, RelayError> {
        let delta = Delta::between(base.ledger(), mine);
        if delta.is_empty() {
            info!("no new ids this run; nothing to publish");
            return Ok(PublishReport::Unchanged {
                already_recorded: 0,
            });
        }

        let max_attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let remote = self.remote.fetch()?;
            let outcome = merge(base.ledger(), mine, &remote.ledger);

            if outcome.is_noop() {
                info!(attempt, delta = %delta, "every new id is already recorded remotely");
                return Ok(PublishReport::Unchanged {
                    already_recorded: delta.len(),
                });
            }

            match self
                .remote
                .publish(&outcome.merged, remote.revision.as_deref())?
            {
                PublishResult::Published { revision } => {
                    info!(
                        attempt,
                        added = outcome.added,
                        entries = outcome.merged.len(),
                        revision = revision.as_deref().unwrap_or("-"),
                        "ledger published"
                    );
                    return Ok(PublishReport::Published {
                        attempts: attempt,
                        added: outcome.added,
                        entries: outcome.merged.len(),
                        revision,
                    });
                }
                PublishResult::Rejected { reason } => {
                    warn!(attempt, max_attempts, %reason, "remote advanced during publish");
                    if attempt < max_attempts {
                        thread::sleep(self.policy.delay_after(attempt));
                    }
                }
            }
        }

        Err(RelayError::PublishConflict {
            attempts: max_attempts,
            pending: delta.as_slice().to_vec(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
