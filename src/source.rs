//! Content sources: where candidate posts come from.
//!
//! The relay never talks to the source platform itself. An external fetcher
//! writes a feed file (a JSON array of candidates, newest first) and
//! [`FeedFileSource`] reads it. Whether a candidate was already posted is
//! decided by the ledger, not by the source.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RelayError;
use crate::ledger::Identifier;

/// One piece of source content that may be reposted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Identifier,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Local path or URL of the media file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    /// Permalink on the source platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Candidate {
    /// A candidate with only an id and a title.
    #[must_use]
    pub const fn new(id: Identifier, title: String) -> Self {
        Self {
            id,
            title,
            author: None,
            media: None,
            url: None,
        }
    }
}

/// Supplies candidates for one run.
pub trait ContentSource {
    /// Candidates in the order they should be considered.
    ///
    /// # Errors
    /// [`RelayError::SourceUnavailable`] when nothing can be fetched.
    fn candidates(&mut self) -> Result<Vec<Candidate>, RelayError>;
}

/// Reads candidates from a JSON feed file.
#[derive(Clone, Debug)]
pub struct FeedFileSource {
    path: PathBuf,
    limit: usize,
}

impl FeedFileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ContentSource for FeedFileSource {
    fn candidates(&mut self) -> Result<Vec<Candidate>, RelayError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| RelayError::SourceUnavailable {
            detail: format!("cannot read feed {}: {e}", self.path.display()),
        })?;
        let mut items: Vec<Candidate> =
            serde_json::from_str(&raw).map_err(|e| RelayError::SourceUnavailable {
                detail: format!("feed {} is not a candidate list: {e}", self.path.display()),
            })?;
        items.truncate(self.limit);
        debug!(path = %self.path.display(), count = items.len(), "feed loaded");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_feed_and_applies_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed.json");
        fs::write(
            &path,
            r#"[
                {"id": "1h0x", "title": "first", "author": "u/a", "media": "1h0x.mp4"},
                {"id": "1h0y", "title": "second"},
                {"id": "1h0z"}
            ]"#,
        )
        .unwrap();

        let all = FeedFileSource::new(&path, 50).candidates().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].author.as_deref(), Some("u/a"));
        assert_eq!(all[2].title, "");

        let capped = FeedFileSource::new(&path, 2).candidates().unwrap();
        let ids: Vec<&str> = capped.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["1h0x", "1h0y"]);
    }

    #[test]
    fn missing_feed_is_source_unavailable() {
        let dir = TempDir::new().unwrap();
        let err = FeedFileSource::new(dir.path().join("nope.json"), 10)
            .candidates()
            .unwrap_err();
        assert!(matches!(err, RelayError::SourceUnavailable { .. }));
        assert!(err.is_per_item());
    }

    #[test]
    fn empty_id_in_feed_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed.json");
        fs::write(&path, r#"[{"id": ""}]"#).unwrap();
        let err = FeedFileSource::new(&path, 10).candidates().unwrap_err();
        assert!(matches!(err, RelayError::SourceUnavailable { .. }));
    }

    #[test]
    fn candidate_json_omits_absent_fields() {
        let c = Candidate::new(Identifier::new("abc").unwrap(), "t".to_owned());
        assert_eq!(
            serde_json::to_string(&c).unwrap(),
            r#"{"id":"abc","title":"t"}"#
        );
    }
}
