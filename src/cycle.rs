//! One bot run, end to end.
//!
//! snapshot → candidates → skip already-posted → post to targets → record
//! successes → publish the ledger. A corrupt store stops the run before
//! anything is posted; source and target failures only cost the affected
//! items.

use tracing::{info, instrument, warn};

use crate::coordinator::{PublishCoordinator, PublishReport};
use crate::error::RelayError;
use crate::ledger::Identifier;
use crate::remote::LedgerRemote;
use crate::source::ContentSource;
use crate::target::PublishTarget;

/// What a run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Candidates the source offered.
    pub considered: usize,
    /// Candidates skipped because the ledger already had them.
    pub already_posted: usize,
    /// Ids posted to at least one target, in posting order.
    pub posted: Vec<Identifier>,
    /// Candidates no target accepted.
    pub failed: Vec<Identifier>,
    /// Candidates that would have been posted (dry run only).
    pub would_post: Vec<Identifier>,
    /// Set when the source could not be read.
    pub source_error: Option<String>,
    /// Ledger publish result; `None` on a dry run.
    pub publish: Option<PublishReport>,
}

/// Execute one run.
///
/// # Errors
/// Only run-aborting failures: a corrupt store, a transport failure, or
/// [`RelayError::PublishConflict`] when every publish attempt lost the race.
#[instrument(skip_all, fields(dry_run = dry_run, targets = targets.len()))]
pub fn run_cycle<S, R>(
    source: &mut S,
    targets: &mut [Box<dyn PublishTarget>],
    coordinator: &mut PublishCoordinator<R>,
    dry_run: bool,
) -> Result<RunSummary, RelayError>
where
    S: ContentSource + ?Sized,
    R: LedgerRemote,
{
    let snapshot = coordinator.snapshot()?;
    let mut mine = snapshot.working_ledger();
    let mut summary = RunSummary::default();

    let candidates = match source.candidates() {
        Ok(c) => c,
        Err(e) if e.is_per_item() => {
            warn!(error = %e, "no candidates this run");
            summary.source_error = Some(e.to_string());
            Vec::new()
        }
        Err(e) => return Err(e),
    };
    summary.considered = candidates.len();

    if targets.is_empty() && !candidates.is_empty() {
        warn!("no enabled targets; nothing will be posted");
    }

    for candidate in &candidates {
        if mine.contains(&candidate.id) {
            summary.already_posted += 1;
            continue;
        }
        if dry_run {
            info!(id = %candidate.id, title = %candidate.title, "would post");
            summary.would_post.push(candidate.id.clone());
            continue;
        }
        if targets.is_empty() {
            continue;
        }

        let mut delivered = 0usize;
        for target in targets.iter_mut() {
            match target.publish(candidate) {
                Ok(()) => {
                    delivered += 1;
                    info!(id = %candidate.id, target = target.name(), "posted");
                }
                Err(e) => warn!(error = %e, "post failed"),
            }
        }

        if delivered > 0 {
            mine.push(candidate.id.clone());
            summary.posted.push(candidate.id.clone());
        } else {
            summary.failed.push(candidate.id.clone());
        }
    }

    if dry_run {
        info!(
            would_post = summary.would_post.len(),
            already_posted = summary.already_posted,
            "dry run; ledger left untouched"
        );
        return Ok(summary);
    }

    summary.publish = Some(coordinator.publish(&snapshot, &mine)?);
    info!(
        considered = summary.considered,
        posted = summary.posted.len(),
        failed = summary.failed.len(),
        already_posted = summary.already_posted,
        "run finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::coordinator::RetryPolicy;
    use crate::ledger::{Ledger, ledger_of};
    use crate::remote::memory::MemoryRemote;
    use crate::remote::{PublishResult, RemoteState};
    use crate::source::Candidate;

    struct StaticSource(Result<Vec<Candidate>, String>);

    impl StaticSource {
        fn of(ids: &[&str]) -> Self {
            Self(Ok(ids
                .iter()
                .map(|id| Candidate::new(Identifier::new(*id).unwrap(), format!("meme {id}")))
                .collect()))
        }
    }

    impl ContentSource for StaticSource {
        fn candidates(&mut self) -> Result<Vec<Candidate>, RelayError> {
            self.0
                .clone()
                .map_err(|detail| RelayError::SourceUnavailable { detail })
        }
    }

    #[derive(Default)]
    struct RecordingTarget {
        name: String,
        refuse: HashSet<String>,
        posted: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
    }

    impl PublishTarget for RecordingTarget {
        fn name(&self) -> &str {
            &self.name
        }

        fn publish(&mut self, candidate: &Candidate) -> Result<(), RelayError> {
            if self.refuse.contains(candidate.id.as_str()) {
                return Err(RelayError::PublishTargetUnavailable {
                    target: self.name.clone(),
                    id: candidate.id.clone(),
                    detail: "refused".to_owned(),
                });
            }
            self.posted.borrow_mut().push(candidate.id.to_string());
            Ok(())
        }
    }

    fn target(name: &str, refuse: &[&str]) -> RecordingTarget {
        RecordingTarget {
            name: name.to_owned(),
            refuse: refuse.iter().map(|s| (*s).to_owned()).collect(),
            posted: std::rc::Rc::default(),
        }
    }

    fn coordinator(remote: &MemoryRemote) -> PublishCoordinator<MemoryRemote> {
        PublishCoordinator::new(remote.clone(), RetryPolicy::immediate(3))
    }

    #[test]
    fn posts_new_items_and_records_them() {
        let remote = MemoryRemote::with_ledger(ledger_of(&["a"]));
        let tw = target("twitter", &[]);
        let posted = tw.posted.clone();
        let mut targets: Vec<Box<dyn PublishTarget>> = vec![Box::new(tw)];

        let summary = run_cycle(
            &mut StaticSource::of(&["a", "b", "c"]),
            &mut targets,
            &mut coordinator(&remote),
            false,
        )
        .unwrap();

        assert_eq!(summary.considered, 3);
        assert_eq!(summary.already_posted, 1);
        assert_eq!(*posted.borrow(), ["b", "c"]);
        assert_eq!(remote.ledger(), ledger_of(&["a", "b", "c"]));
        assert!(summary.publish.unwrap().wrote());
    }

    #[test]
    fn item_is_recorded_when_any_target_succeeds() {
        let remote = MemoryRemote::new();
        let mut targets: Vec<Box<dyn PublishTarget>> = vec![
            Box::new(target("twitter", &["b"])),
            Box::new(target("instagram", &["b", "c"])),
        ];

        let summary = run_cycle(
            &mut StaticSource::of(&["b", "c"]),
            &mut targets,
            &mut coordinator(&remote),
            false,
        )
        .unwrap();

        assert_eq!(summary.failed, vec![Identifier::new("b").unwrap()]);
        assert_eq!(summary.posted, vec![Identifier::new("c").unwrap()]);
        assert_eq!(remote.ledger(), ledger_of(&["c"]));
    }

    #[test]
    fn source_failure_is_a_quiet_success() {
        let remote = MemoryRemote::with_ledger(ledger_of(&["a"]));
        let mut targets: Vec<Box<dyn PublishTarget>> = vec![Box::new(target("t", &[]))];

        let summary = run_cycle(
            &mut StaticSource(Err("feed missing".to_owned())),
            &mut targets,
            &mut coordinator(&remote),
            false,
        )
        .unwrap();

        assert!(summary.source_error.is_some());
        assert_eq!(
            summary.publish,
            Some(PublishReport::Unchanged { already_recorded: 0 })
        );
        assert_eq!(remote.version(), 1);
    }

    #[test]
    fn dry_run_posts_and_writes_nothing() {
        let remote = MemoryRemote::with_ledger(ledger_of(&["a"]));
        let tw = target("twitter", &[]);
        let posted = tw.posted.clone();
        let mut targets: Vec<Box<dyn PublishTarget>> = vec![Box::new(tw)];

        let summary = run_cycle(
            &mut StaticSource::of(&["a", "b"]),
            &mut targets,
            &mut coordinator(&remote),
            true,
        )
        .unwrap();

        assert_eq!(summary.would_post, vec![Identifier::new("b").unwrap()]);
        assert!(posted.borrow().is_empty());
        assert_eq!(summary.publish, None);
        assert_eq!(remote.version(), 1);
    }

    #[test]
    fn repeated_feed_entry_is_posted_once() {
        let remote = MemoryRemote::new();
        let tw = target("twitter", &[]);
        let posted = tw.posted.clone();
        let mut targets: Vec<Box<dyn PublishTarget>> = vec![Box::new(tw)];

        run_cycle(
            &mut StaticSource::of(&["x", "x"]),
            &mut targets,
            &mut coordinator(&remote),
            false,
        )
        .unwrap();

        assert_eq!(*posted.borrow(), ["x"]);
        assert_eq!(remote.ledger(), ledger_of(&["x"]));
    }

    struct CorruptRemote;

    impl LedgerRemote for CorruptRemote {
        fn fetch(&mut self) -> Result<RemoteState, RelayError> {
            Err(RelayError::StoreCorrupt {
                path: "posted_ids.json".into(),
                detail: "expected value at line 1 column 1".to_owned(),
            })
        }

        fn publish(&mut self, _: &Ledger, _: Option<&str>) -> Result<PublishResult, RelayError> {
            unreachable!("a corrupt store must never be written")
        }

        fn describe(&self) -> String {
            "corrupt".to_owned()
        }
    }

    #[test]
    fn corrupt_store_aborts_before_posting() {
        let tw = target("twitter", &[]);
        let posted = tw.posted.clone();
        let mut targets: Vec<Box<dyn PublishTarget>> = vec![Box::new(tw)];
        let mut coord = PublishCoordinator::new(CorruptRemote, RetryPolicy::immediate(3));

        let err = run_cycle(&mut StaticSource::of(&["a"]), &mut targets, &mut coord, false)
            .unwrap_err();

        assert!(matches!(err, RelayError::StoreCorrupt { .. }));
        assert!(posted.borrow().is_empty());
    }
}
