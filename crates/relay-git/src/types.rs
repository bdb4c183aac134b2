//! Value types returned by the git transport.

use std::fmt;

/// A validated 40-character lowercase hex commit id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommitId(String);

impl CommitId {
    /// Parse a commit id, returning `None` unless it is 40 lowercase hex chars.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let valid = s.len() == 40
            && s
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase());
        valid.then(|| Self(s.to_owned()))
    }

    /// Return the hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of fetching a branch from a remote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The remote branch exists; this is its tip after the fetch.
    Tip(CommitId),
    /// The remote has no such branch yet (fresh repository).
    MissingBranch,
}

/// Result of a push attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// The remote accepted the update.
    Accepted,
    /// The remote refused a non-fast-forward update: someone else pushed
    /// first. The caller should fetch, merge and try again.
    Rejected {
        /// Git's explanation, trimmed.
        reason: String,
    },
}

impl PushOutcome {
    /// Returns `true` if the push landed.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Committer identity passed as `git -c user.name=... -c user.email=...`.
///
/// CI runners rarely have a global git identity, so the bot supplies one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Identity {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    /// Build the `-c key=value` arguments for this identity.
    #[must_use]
    pub fn config_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(name) = &self.name {
            args.push("-c".to_owned());
            args.push(format!("user.name={name}"));
        }
        if let Some(email) = &self.email {
            args.push("-c".to_owned());
            args.push(format!("user.email={email}"));
        }
        args
    }
}
