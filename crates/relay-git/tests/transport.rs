//! End-to-end checks for the git transport against real bare remotes.

use std::fs;
use std::path::Path;
use std::process::Command;

use relay_git::{FetchOutcome, GitCli, Identity, PushOutcome};
use tempfile::TempDir;

fn git_ok(dir: &Path, args: &[&str]) -> String {
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

fn bare_remote() -> TempDir {
    let dir = TempDir::new().unwrap();
    git_ok(dir.path(), &["init", "--bare", "--initial-branch=main"]);
    dir
}

fn clone(remote: &Path) -> TempDir {
    let dir = TempDir::new().unwrap();
    git_ok(dir.path(), &["clone", "--quiet", remote.to_str().unwrap(), "."]);
    git_ok(dir.path(), &["config", "commit.gpgsign", "false"]);
    git_ok(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
    dir
}

fn identity() -> Identity {
    Identity {
        name: Some("Test".to_owned()),
        email: Some("test@localhost".to_owned()),
    }
}

fn commit_file(git: &GitCli, name: &str, body: &str) {
    fs::write(git.root().join(name), body).unwrap();
    git.add(Path::new(name)).unwrap();
    git.commit(&format!("write {name}"), &identity()).unwrap();
}

#[test]
fn fetch_on_empty_remote_reports_missing_branch() {
    let remote = bare_remote();
    let work = clone(remote.path());
    let git = GitCli::open(work.path()).unwrap();

    assert_eq!(git.fetch("origin", "main").unwrap(), FetchOutcome::MissingBranch);
    assert_eq!(git.head().unwrap(), None);
}

#[test]
fn first_push_creates_branch() {
    let remote = bare_remote();
    let work = clone(remote.path());
    let git = GitCli::open(work.path()).unwrap();

    commit_file(&git, "ledger.json", "[]\n");
    assert_eq!(git.push("origin", "main").unwrap(), PushOutcome::Accepted);

    let head = git.head().unwrap().unwrap();
    assert_eq!(git.fetch("origin", "main").unwrap(), FetchOutcome::Tip(head));
}

#[test]
fn stale_push_is_rejected_not_errored() {
    let remote = bare_remote();
    let a = clone(remote.path());
    let git_a = GitCli::open(a.path()).unwrap();
    commit_file(&git_a, "ledger.json", "[]\n");
    git_a.push("origin", "main").unwrap();

    let b = clone(remote.path());
    let git_b = GitCli::open(b.path()).unwrap();
    let FetchOutcome::Tip(tip) = git_b.fetch("origin", "main").unwrap() else {
        panic!("expected remote branch to exist");
    };
    git_b.reset_hard(&tip).unwrap();

    // A advances the remote while B works from the older tip.
    commit_file(&git_a, "ledger.json", "[\"a\"]\n");
    assert!(git_a.push("origin", "main").unwrap().is_accepted());

    commit_file(&git_b, "ledger.json", "[\"b\"]\n");
    let outcome = git_b.push("origin", "main").unwrap();
    assert!(
        matches!(outcome, PushOutcome::Rejected { .. }),
        "expected rejection, got {outcome:?}"
    );

    // After fetch + reset, B sees A's content and can push on top of it.
    let FetchOutcome::Tip(tip) = git_b.fetch("origin", "main").unwrap() else {
        panic!("expected remote branch to exist");
    };
    git_b.reset_hard(&tip).unwrap();
    assert_eq!(
        fs::read_to_string(git_b.root().join("ledger.json")).unwrap(),
        "[\"a\"]\n"
    );
    commit_file(&git_b, "ledger.json", "[\"a\", \"b\"]\n");
    assert!(git_b.push("origin", "main").unwrap().is_accepted());
}

#[test]
fn staged_changes_detection() {
    let remote = bare_remote();
    let work = clone(remote.path());
    let git = GitCli::open(work.path()).unwrap();
    commit_file(&git, "ledger.json", "[]\n");

    assert!(!git.has_staged_changes().unwrap());
    fs::write(git.root().join("ledger.json"), "[\"x\"]\n").unwrap();
    git.add(Path::new("ledger.json")).unwrap();
    assert!(git.has_staged_changes().unwrap());
}

#[test]
fn push_to_unknown_remote_is_an_error() {
    let remote = bare_remote();
    let work = clone(remote.path());
    let git = GitCli::open(work.path()).unwrap();
    commit_file(&git, "ledger.json", "[]\n");

    assert!(git.push("nowhere", "main").is_err());
}
