//! meme-relay library crate.
//!
//! The primary interface is the `meme-relay` binary. This lib.rs exposes
//! the ledger, merge engine and publish coordinator so that integration
//! tests and benches can drive them directly without going through the CLI.

pub mod config;
pub mod coordinator;
pub mod cycle;
pub mod error;
pub mod ledger;
pub mod merge;
pub mod remote;
pub mod source;
pub mod store;
pub mod target;
pub mod telemetry;

pub use coordinator::{PublishCoordinator, PublishReport, RetryPolicy};
pub use error::RelayError;
pub use ledger::{Delta, Identifier, Ledger, Snapshot};
pub use merge::{MergeOutcome, merge};
