use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use relay::config::{CONFIG_FILE, RelayConfig};
use relay::telemetry;

mod check;
mod merge_cmd;
mod run_cmd;

/// Scheduled meme reposter with a shared posted-ID ledger
///
/// Every run reads the ledger (a JSON array of already-posted ids kept in
/// a git repository), posts whatever is new, then merges its additions
/// into the latest remote ledger and pushes. Overlapping runs never lose
/// or duplicate an id: a rejected push is fetched, re-merged and retried.
///
/// QUICK START:
///
///   # in a clone of the repository that holds posted_ids.json
///   meme-relay check
///   meme-relay run --dry-run
///   meme-relay run
///
/// CONFIGURATION:
///
///   relay.toml at the repository root ([store], [publish], [source],
///   [[targets]], [log]). Every key is optional.
#[derive(Parser)]
#[command(name = "meme-relay")]
#[command(version, about, verbatim_doc_comment)]
#[command(propagate_version = true)]
#[command(after_help = "See 'meme-relay <command> --help' for more information on a specific command.")]
struct Cli {
    /// Working clone that holds the ledger [default: current directory]
    #[arg(long, global = true, env = "RELAY_REPO", value_name = "DIR")]
    repo: Option<PathBuf>,

    /// Config file [default: <repo>/relay.toml]
    #[arg(long, global = true, env = "RELAY_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also append logs to this file
    #[arg(long, global = true, env = "RELAY_LOG_FILE", value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Post new content and record it in the shared ledger
    ///
    /// Takes a snapshot of the remote ledger, reads the feed, posts every
    /// candidate the ledger does not contain to all enabled targets, then
    /// publishes the ids that went out. Exits non-zero only if the ledger
    /// is corrupt, the push kept losing races, or git itself failed.
    Run(run_cmd::RunArgs),

    /// Validate the local ledger file
    ///
    /// Prints the number of recorded ids. Exits non-zero if the file is
    /// not a JSON array of non-empty strings.
    Check,

    /// Git merge driver for the ledger file
    ///
    /// Writes the union of both sides into <OURS>, ours first, so a plain
    /// `git pull` of the ledger never conflicts. See `merge-driver --help`.
    #[command(name = "merge-driver")]
    MergeDriver(merge_cmd::DriverArgs),

    /// Merge three ledger files offline
    Merge(merge_cmd::MergeArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run(args) => {
            let (root, config) = load_config(&cli)?;
            let log_file = log_file(&cli, &root, &config);
            let _guard = telemetry::init(log_file.as_deref());
            run_cmd::run(&root, &config, args)
        }
        Commands::Check => {
            let (root, config) = load_config(&cli)?;
            let _guard = telemetry::init(log_file(&cli, &root, &config).as_deref());
            check::run(&root, &config)
        }
        Commands::MergeDriver(args) => {
            let _guard = telemetry::init(cli.log_file.as_deref());
            merge_cmd::driver(args)
        }
        Commands::Merge(args) => {
            let _guard = telemetry::init(cli.log_file.as_deref());
            merge_cmd::merge(args)
        }
    }
}

fn repo_root(cli: &Cli) -> Result<PathBuf> {
    match &cli.repo {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir().context("Failed to determine current directory"),
    }
}

fn load_config(cli: &Cli) -> Result<(PathBuf, RelayConfig)> {
    let root = repo_root(cli)?;
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| root.join(CONFIG_FILE));
    let config = RelayConfig::load(&path)?;
    Ok((root, config))
}

fn log_file(cli: &Cli, root: &Path, config: &RelayConfig) -> Option<PathBuf> {
    cli.log_file
        .clone()
        .or_else(|| config.log.file.as_ref().map(|f| root.join(f)))
}
