//! Ledger value types.
//!
//! A [`Ledger`] is the ordered, duplicate-free list of identifiers the bot
//! has already posted. A [`Snapshot`] is the ledger a run observed when it
//! started; a [`Delta`] is what that run added on top of it.
//!
//! Order never affects correctness, but it is preserved everywhere so the
//! persisted file diffs cleanly and merges are deterministic.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifier
// ---------------------------------------------------------------------------

/// Opaque id of one piece of source content (e.g. a post id).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Create an identifier.
    ///
    /// # Errors
    /// Returns [`EmptyIdentifier`] for the empty string. Anything else,
    /// whitespace included, is kept verbatim.
    pub fn new(s: impl Into<String>) -> Result<Self, EmptyIdentifier> {
        let s = s.into();
        if s.is_empty() {
            return Err(EmptyIdentifier);
        }
        Ok(Self(s))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identifier {
    type Error = EmptyIdentifier;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

/// Rejected an empty identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmptyIdentifier;

impl fmt::Display for EmptyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("identifier must not be empty")
    }
}

impl std::error::Error for EmptyIdentifier {}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Ordered set of posted identifiers.
///
/// Invariant: no identifier appears twice. Every constructor and mutator
/// keeps the first occurrence and drops later repeats.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Identifier>", into = "Vec<Identifier>")]
pub struct Ledger {
    order: Vec<Identifier>,
    seen: HashSet<Identifier>,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` unless it is already present. Returns `true` if added.
    pub fn push(&mut self, id: Identifier) -> bool {
        if self.seen.contains(&id) {
            return false;
        }
        self.seen.insert(id.clone());
        self.order.push(id);
        true
    }

    /// Append every id in order, skipping ones already present.
    /// Returns how many were added.
    pub fn extend<I: IntoIterator<Item = Identifier>>(&mut self, ids: I) -> usize {
        ids.into_iter().filter(|id| self.push(id.clone())).count()
    }

    #[must_use]
    pub fn contains(&self, id: &Identifier) -> bool {
        self.seen.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Identifier> {
        self.order.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Identifier] {
        &self.order
    }

    /// Identifiers of `self` that are not in `other`, in `self`'s order.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Vec<Identifier> {
        self.order
            .iter()
            .filter(|id| !other.contains(id))
            .cloned()
            .collect()
    }
}

impl PartialEq for Ledger {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl Eq for Ledger {}

impl FromIterator<Identifier> for Ledger {
    fn from_iter<I: IntoIterator<Item = Identifier>>(iter: I) -> Self {
        let mut ledger = Self::new();
        ledger.extend(iter);
        ledger
    }
}

impl From<Vec<Identifier>> for Ledger {
    fn from(ids: Vec<Identifier>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<Ledger> for Vec<Identifier> {
    fn from(ledger: Ledger) -> Self {
        ledger.order
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a Identifier;
    type IntoIter = std::slice::Iter<'a, Identifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Where a [`Snapshot`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provenance {
    /// Read from the shared store when the run started.
    RemoteAtRunStart,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteAtRunStart => write!(f, "remote-at-run-start"),
        }
    }
}

/// The ledger a run observed at start, frozen.
///
/// Used as the merge baseline: anything in the run's working ledger that is
/// not in the snapshot is that run's [`Delta`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    ledger: Ledger,
    provenance: Provenance,
    revision: Option<String>,
}

impl Snapshot {
    /// Capture `ledger` as this run's starting point.
    ///
    /// `revision` is the backend's version tag for the state that was read
    /// (a commit id for git), if it has one.
    #[must_use]
    pub const fn at_run_start(ledger: Ledger, revision: Option<String>) -> Self {
        Self {
            ledger,
            provenance: Provenance::RemoteAtRunStart,
            revision,
        }
    }

    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub const fn provenance(&self) -> Provenance {
        self.provenance
    }

    #[must_use]
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// A working copy of the snapshot the run may extend.
    #[must_use]
    pub fn working_ledger(&self) -> Ledger {
        self.ledger.clone()
    }
}

// ---------------------------------------------------------------------------
// Delta
// ---------------------------------------------------------------------------

/// Identifiers a run posted that were not in its snapshot.
///
/// Computed once; never mutated afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Delta(Vec<Identifier>);

impl Delta {
    /// `mine − base`, in `mine`'s order.
    #[must_use]
    pub fn between(base: &Ledger, mine: &Ledger) -> Self {
        Self(mine.difference(base))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Identifier] {
        &self.0
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.0.iter().map(Identifier::as_str).collect();
        write!(f, "[{}]", ids.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) fn ledger_of(ids: &[&str]) -> Ledger {
    ids.iter()
        .map(|s| Identifier::new(*s).expect("test ids are non-empty"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identifier {
        Identifier::new(s).unwrap()
    }

    #[test]
    fn identifier_rejects_empty() {
        assert_eq!(Identifier::new(""), Err(EmptyIdentifier));
        assert_eq!(id("1h2k3").as_str(), "1h2k3");
    }

    #[test]
    fn identifier_is_opaque() {
        assert_eq!(id(" ").as_str(), " ");
        assert_ne!(id("a "), id("a"));
        let parsed: Ledger = serde_json::from_str(r#"["abc", " "]"#).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn push_keeps_first_occurrence() {
        let mut ledger = Ledger::new();
        assert!(ledger.push(id("a")));
        assert!(ledger.push(id("b")));
        assert!(!ledger.push(id("a")));
        assert_eq!(ledger, ledger_of(&["a", "b"]));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn from_iter_dedupes_in_order() {
        let ledger = ledger_of(&["c", "a", "c", "b", "a"]);
        let ids: Vec<&str> = ledger.iter().map(Identifier::as_str).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn difference_preserves_order() {
        let mine = ledger_of(&["a", "x", "b", "y"]);
        let base = ledger_of(&["b", "a"]);
        assert_eq!(mine.difference(&base), vec![id("x"), id("y")]);
    }

    #[test]
    fn serde_is_a_plain_array() {
        let ledger = ledger_of(&["a", "b"]);
        assert_eq!(serde_json::to_string(&ledger).unwrap(), r#"["a","b"]"#);

        let parsed: Ledger = serde_json::from_str(r#"["b","a","b"]"#).unwrap();
        assert_eq!(parsed, ledger_of(&["b", "a"]));

        assert!(serde_json::from_str::<Ledger>(r#"["a",""]"#).is_err());
        assert!(serde_json::from_str::<Ledger>(r#"{"ids":[]}"#).is_err());
        assert!(serde_json::from_str::<Ledger>("[1,2]").is_err());
    }

    #[test]
    fn snapshot_is_tagged() {
        let snap = Snapshot::at_run_start(ledger_of(&["a"]), Some("abc".to_owned()));
        assert_eq!(snap.provenance(), Provenance::RemoteAtRunStart);
        assert_eq!(snap.provenance().to_string(), "remote-at-run-start");
        assert_eq!(snap.revision(), Some("abc"));

        let mut working = snap.working_ledger();
        working.push(id("b"));
        assert_eq!(snap.ledger().len(), 1);
    }

    #[test]
    fn delta_between() {
        let base = ledger_of(&["a", "b"]);
        let mine = ledger_of(&["a", "b", "c", "d"]);
        let delta = Delta::between(&base, &mine);
        assert_eq!(delta.as_slice(), &[id("c"), id("d")]);
        assert_eq!(delta.to_string(), "[c, d]");
        assert!(Delta::between(&mine, &mine).is_empty());
    }
}
