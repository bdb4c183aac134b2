//! Git transport for meme-relay.
//!
//! The ledger is shared between runs through an ordinary git remote. This
//! crate is the only place that knows how to talk to git; everything runs
//! through the `git` CLI in a working clone, so whatever credentials the CI
//! runner injected for `git push` apply unchanged.
//!
//! # Crate layout
//!
//! - [`cli`]: [`GitCli`], a thin handle that runs git in one directory.
//! - [`types`]: value types returned by the transport ([`FetchOutcome`],
//!   [`PushOutcome`], [`Identity`]).
//! - [`error`]: the [`GitError`] enum returned by every operation.

pub mod cli;
pub mod error;
pub mod types;

pub use cli::GitCli;
pub use error::GitError;
pub use types::{FetchOutcome, Identity, PushOutcome};
