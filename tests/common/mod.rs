//! Shared helpers for meme-relay integration tests.
//!
//! All tests use temp directories, never the real repo.
//! A "shared store" is a bare git repository; every simulated run works in
//! its own clone of it, the way separate CI jobs would.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use relay::config::PublishConfig;
use relay::remote::git::GitRemote;
use relay_git::GitCli;
use tempfile::TempDir;

pub const LEDGER_FILE: &str = "posted_ids.json";

/// Run git in `dir` and return trimmed stdout, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to spawn git");
    assert!(
        out.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_owned()
}

/// A bare repository standing in for the shared remote.
pub fn bare_remote() -> TempDir {
    let dir = TempDir::new().expect("failed to create remote temp dir");
    git(dir.path(), &["init", "--bare", "--initial-branch=main"]);
    dir
}

/// A working clone of `remote` with a local identity configured.
pub fn clone_of(remote: &Path) -> TempDir {
    let dir = TempDir::new().expect("failed to create clone temp dir");
    git(
        dir.path(),
        &["clone", "--quiet", remote.to_str().expect("utf-8 path"), "."],
    );
    git(dir.path(), &["config", "user.name", "relay-test"]);
    git(dir.path(), &["config", "user.email", "relay-test@localhost"]);
    git(dir.path(), &["config", "commit.gpgsign", "false"]);
    git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
    dir
}

/// Publish `ids` as the remote ledger through a throwaway clone.
pub fn seed(remote: &Path, ids: &[&str]) {
    seed_raw(remote, &ledger_json(ids));
}

/// Publish arbitrary ledger file content (e.g. corrupt) to the remote.
pub fn seed_raw(remote: &Path, content: &str) {
    let work = clone_of(remote);
    if git_ok(work.path(), &["fetch", "--quiet", "origin", "main"]) {
        git(work.path(), &["reset", "--hard", "FETCH_HEAD"]);
    }
    std::fs::write(work.path().join(LEDGER_FILE), content).expect("write ledger");
    git(work.path(), &["add", LEDGER_FILE]);
    git(work.path(), &["commit", "--quiet", "-m", "seed ledger"]);
    git(work.path(), &["push", "--quiet", "origin", "HEAD:refs/heads/main"]);
}

/// The ledger as stored on the remote's `main` branch.
pub fn remote_ids(remote: &Path) -> Vec<String> {
    let raw = git(remote, &["show", &format!("main:{LEDGER_FILE}")]);
    serde_json::from_str(&raw).expect("remote ledger is valid JSON")
}

/// Number of commits on the remote's `main` branch.
pub fn remote_commits(remote: &Path) -> usize {
    git(remote, &["rev-list", "--count", "main"])
        .parse()
        .expect("rev-list count")
}

/// A [`GitRemote`] over `clone` with default publish settings.
pub fn git_remote(clone: &Path) -> GitRemote {
    let git = GitCli::open(clone).expect("clone is a git repository");
    GitRemote::new(git, Path::new(LEDGER_FILE), &PublishConfig::default())
}

/// Pretty JSON exactly as the store writes it.
pub fn ledger_json(ids: &[&str]) -> String {
    let mut s = serde_json::to_string_pretty(ids).expect("serialize ids");
    s.push('\n');
    s
}

fn git_ok(dir: &Path, args: &[&str]) -> bool {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .is_ok_and(|o| o.status.success())
}

// ---------------------------------------------------------------------------
// Binary
// ---------------------------------------------------------------------------

pub fn relay_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_meme-relay"))
}

/// Run `meme-relay` with `args` in `dir`.
pub fn relay_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(relay_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RELAY_REPO")
        .env_remove("RELAY_CONFIG")
        .env_remove("RELAY_LOG_FILE")
        .env_remove("OTEL_EXPORTER_OTLP_ENDPOINT")
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run meme-relay")
}

pub fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

pub fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}
