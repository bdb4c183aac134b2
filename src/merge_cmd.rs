//! `meme-relay merge-driver` and `meme-relay merge`.
//!
//! The driver lets plain git reconcile the ledger file the same way the
//! publish coordinator does. Register it once per clone:
//!
//! ```text
//! # .gitattributes
//! posted_ids.json merge=relay-ledger
//!
//! git config merge.relay-ledger.name "meme-relay ledger union"
//! git config merge.relay-ledger.driver "meme-relay merge-driver %O %A %B"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use relay::ledger::Ledger;
use relay::merge::merge as merge_ledgers;
use relay::store::LedgerStore;

#[derive(Args)]
pub struct DriverArgs {
    /// Common ancestor version (%O)
    pub base: PathBuf,
    /// Current branch version (%A); receives the result
    pub ours: PathBuf,
    /// Other branch version (%B)
    pub theirs: PathBuf,
}

#[derive(Args)]
pub struct MergeArgs {
    /// Ledger both sides started from
    #[arg(long)]
    pub base: PathBuf,
    /// Ledger with the additions to replay
    #[arg(long)]
    pub mine: PathBuf,
    /// Latest shared ledger; kept first in the result
    #[arg(long)]
    pub remote: PathBuf,
    /// Write the result here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Resolve a git merge of the ledger: ours stays first, their additions
/// are appended.
pub fn driver(args: &DriverArgs) -> Result<()> {
    let base = load_side(&args.base, "base (%O)")?;
    let theirs = load_side(&args.theirs, "theirs (%B)")?;
    let ours = load_side(&args.ours, "ours (%A)")?;
    let ours_store = LedgerStore::new(&args.ours);

    let outcome = merge_ledgers(&base, &theirs, &ours);
    info!(added = outcome.added, entries = outcome.merged.len(), "ledger merge driver");
    if !outcome.is_noop() {
        ours_store
            .save(&outcome.merged)
            .with_context(|| format!("Failed to write merged ledger to {}", args.ours.display()))?;
    }
    Ok(())
}

pub fn merge(args: &MergeArgs) -> Result<()> {
    let base = load_side(&args.base, "--base")?;
    let mine = load_side(&args.mine, "--mine")?;
    let remote = load_side(&args.remote, "--remote")?;

    let outcome = merge_ledgers(&base, &mine, &remote);
    eprintln!(
        "delta {} ({} new), {} total",
        outcome.delta,
        outcome.added,
        outcome.merged.len()
    );

    match &args.output {
        Some(path) => LedgerStore::new(path).save(&outcome.merged)?,
        None => println!("{}", serde_json::to_string_pretty(&outcome.merged)?),
    }
    Ok(())
}

/// Load one side of a merge.
///
/// Git passes an empty file for a side that has no ledger: the base of an
/// add/add merge, where both branches created the file independently.
/// Those read as an empty ledger; anything else goes through the store's
/// normal validation.
fn load_side(path: &Path, role: &str) -> Result<Ledger> {
    if let Ok(raw) = fs::read_to_string(path)
        && raw.trim().is_empty()
    {
        return Ok(Ledger::new());
    }
    LedgerStore::new(path)
        .load()
        .with_context(|| format!("Failed to read {role} ledger"))
}
