//! The on-disk ledger file.
//!
//! A single pretty-printed JSON array of strings. Writes go to a temporary
//! file in the same directory, are fsynced, then renamed over the target,
//! so a concurrent reader sees either the old file or the new one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::RelayError;
use crate::ledger::{Identifier, Ledger};

/// Reads and writes the ledger file at one path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the ledger. A missing file is the first-run case and yields an
    /// empty ledger.
    ///
    /// Repeated ids in an otherwise valid file are dropped (first occurrence
    /// wins) and logged; they can only come from a hand edit.
    ///
    /// # Errors
    /// [`RelayError::StoreCorrupt`] if the content is not a JSON array of
    /// non-empty strings, [`RelayError::Io`] if the file cannot be read.
    pub fn load(&self) -> Result<Ledger, RelayError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no ledger yet; starting empty");
                return Ok(Ledger::new());
            }
            Err(source) => {
                return Err(RelayError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let ids: Vec<Identifier> =
            serde_json::from_str(&contents).map_err(|e| RelayError::StoreCorrupt {
                path: self.path.clone(),
                detail: e.to_string(),
            })?;

        let raw_len = ids.len();
        let ledger = Ledger::from(ids);
        if ledger.len() != raw_len {
            warn!(
                path = %self.path.display(),
                dropped = raw_len - ledger.len(),
                "ledger contained repeated ids; keeping first occurrences"
            );
        }
        Ok(ledger)
    }

    /// Write the ledger atomically (temp file, fsync, rename).
    ///
    /// Creates the parent directory if needed.
    ///
    /// # Errors
    /// [`RelayError::Io`] on any filesystem failure. The previous file is
    /// left untouched in that case.
    pub fn save(&self, ledger: &Ledger) -> Result<(), RelayError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_owned(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|source| self.io(source))?;

        let mut json = serde_json::to_string_pretty(ledger).map_err(|e| RelayError::Io {
            path: self.path.clone(),
            source: std::io::Error::other(e),
        })?;
        json.push('\n');

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|source| self.io(source))?;
        tmp.write_all(json.as_bytes())
            .map_err(|source| self.io(source))?;
        tmp.as_file().sync_all().map_err(|source| self.io(source))?;
        tmp.persist(&self.path)
            .map_err(|e| self.io(e.error))?;

        debug!(path = %self.path.display(), entries = ledger.len(), "ledger saved");
        Ok(())
    }

    fn io(&self, source: std::io::Error) -> RelayError {
        RelayError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
