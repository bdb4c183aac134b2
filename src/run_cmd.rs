//! `meme-relay run`: one full bot cycle against the git-backed ledger.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use relay::config::RelayConfig;
use relay::coordinator::{PublishCoordinator, PublishReport, RetryPolicy};
use relay::cycle::{RunSummary, run_cycle};
use relay::remote::git::GitRemote;
use relay::source::FeedFileSource;
use relay::target::{CommandTarget, PublishTarget};
use relay_git::GitCli;

#[derive(Args)]
pub struct RunArgs {
    /// Post nothing and write nothing; print what would be posted
    #[arg(long)]
    pub dry_run: bool,

    /// Override [publish] max_attempts (clamped to 1..=10)
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Override [source] feed
    #[arg(long, value_name = "FILE")]
    pub feed: Option<PathBuf>,
}

pub fn run(root: &Path, config: &RelayConfig, args: &RunArgs) -> Result<()> {
    let git = GitCli::open(root)
        .with_context(|| format!("{} must be a git clone of the ledger repository", root.display()))?;
    let root = git.root().to_owned();

    let mut publish = config.publish.clone();
    if let Some(n) = args.max_attempts {
        publish.max_attempts = n;
    }
    let remote = GitRemote::new(git, &config.store.path, &publish);
    let mut coordinator = PublishCoordinator::new(remote, RetryPolicy::from_config(&publish));

    let feed = args.feed.as_ref().unwrap_or(&config.source.feed);
    let mut source = FeedFileSource::new(root.join(feed), config.source.limit);

    let mut targets: Vec<Box<dyn PublishTarget>> = config
        .enabled_targets()
        .map(|t| Box::new(CommandTarget::from_config(t).in_dir(&root)) as Box<dyn PublishTarget>)
        .collect();

    let summary = run_cycle(&mut source, &mut targets, &mut coordinator, args.dry_run)?;
    print_summary(&summary, args.dry_run);
    Ok(())
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    if let Some(err) = &summary.source_error {
        println!("Source unavailable: {err}");
    }
    println!(
        "Considered {} candidate(s), {} already posted.",
        summary.considered, summary.already_posted
    );

    if dry_run {
        if summary.would_post.is_empty() {
            println!("Dry run: nothing new to post.");
        } else {
            println!("Dry run: would post {}:", summary.would_post.len());
            for id in &summary.would_post {
                println!("  {id}");
            }
        }
        return;
    }

    println!("Posted {}, failed {}.", summary.posted.len(), summary.failed.len());
    for id in &summary.failed {
        println!("  not posted: {id}");
    }

    match &summary.publish {
        Some(PublishReport::Published {
            attempts,
            added,
            entries,
            revision,
        }) => {
            let rev = revision.as_deref().map_or("", |r| &r[..r.len().min(12)]);
            println!(
                "Ledger updated: +{added} id(s), {entries} total (attempt {attempts}) {rev}"
            );
        }
        Some(PublishReport::Unchanged { already_recorded }) if *already_recorded > 0 => {
            println!("Ledger unchanged: {already_recorded} id(s) were already recorded by another run.");
        }
        Some(PublishReport::Unchanged { .. }) | None => println!("Ledger unchanged."),
    }
}
