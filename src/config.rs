//! Bot configuration (`relay.toml`).
//!
//! Every field has a default, and a missing file means "all defaults", so a
//! bare checkout with only `posted_ids.json` in it is a valid setup.
//!
//! ```toml
//! [store]
//! path = "posted_ids.json"
//!
//! [publish]
//! remote = "origin"
//! branch = "main"
//! max_attempts = 3
//! backoff_ms = 500
//! jitter_ms = 250
//! commit_message = "Update posted IDs"
//! author_name = "meme-relay"
//! author_email = "meme-relay@users.noreply.github.com"
//!
//! [source]
//! feed = "feed.json"
//! limit = 50
//!
//! [[targets]]
//! name = "bluesky"
//! command = "./post-bluesky"
//! args = ["--hashtags", "f1,formula1,memes"]
//!
//! [log]
//! file = "bot.log"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Default config file name, looked up in the repository root.
pub const CONFIG_FILE: &str = "relay.toml";

/// Upper bound on publish attempts; anything higher is clamped.
pub const MAX_ATTEMPTS_CAP: u32 = 10;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub source: SourceConfig,

    /// External poster commands, tried in order for every new item.
    #[serde(default)]
    pub targets: Vec<TargetConfig>,

    #[serde(default)]
    pub log: LogConfig,
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Where the ledger lives.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Ledger file, relative to the repository root (default `posted_ids.json`).
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("posted_ids.json")
}

// ---------------------------------------------------------------------------
// PublishConfig
// ---------------------------------------------------------------------------

/// How the merged ledger is pushed.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishConfig {
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    /// Fetch-merge-push cycles before giving up (clamped to `1..=10`).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base pause between attempts, doubled after each rejection.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Random extra pause (`0..=jitter_ms`) so racing runs spread out.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    #[serde(default)]
    pub author_name: Option<String>,

    #[serde(default)]
    pub author_email: Option<String>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            remote: default_remote(),
            branch: default_branch(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            jitter_ms: default_jitter_ms(),
            commit_message: default_commit_message(),
            author_name: None,
            author_email: None,
        }
    }
}

impl PublishConfig {
    /// `max_attempts` clamped into `1..=MAX_ATTEMPTS_CAP`.
    #[must_use]
    pub fn effective_max_attempts(&self) -> u32 {
        self.max_attempts.clamp(1, MAX_ATTEMPTS_CAP)
    }

    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    #[must_use]
    pub const fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }

    #[must_use]
    pub fn identity(&self) -> relay_git::Identity {
        relay_git::Identity {
            name: self.author_name.clone(),
            email: self.author_email.clone(),
        }
    }
}

fn default_remote() -> String {
    "origin".to_owned()
}

fn default_branch() -> String {
    "main".to_owned()
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_backoff_ms() -> u64 {
    500
}

const fn default_jitter_ms() -> u64 {
    250
}

fn default_commit_message() -> String {
    "Update posted IDs".to_owned()
}

// ---------------------------------------------------------------------------
// SourceConfig
// ---------------------------------------------------------------------------

/// Where candidates come from.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// JSON feed written by the external fetcher (default `feed.json`).
    #[serde(default = "default_feed")]
    pub feed: PathBuf,

    /// Consider at most this many candidates per run.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            feed: default_feed(),
            limit: default_limit(),
        }
    }
}

fn default_feed() -> PathBuf {
    PathBuf::from("feed.json")
}

const fn default_limit() -> usize {
    50
}

// ---------------------------------------------------------------------------
// TargetConfig
// ---------------------------------------------------------------------------

/// One publishing target, implemented by an external command.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Name used in logs and errors (e.g. `"bluesky"`).
    pub name: String,

    /// Program to run; receives the candidate as JSON on stdin.
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

// ---------------------------------------------------------------------------
// LogConfig
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Append log lines to this file as well as stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// A config file that could not be read or parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigError {
    /// The file being loaded, if any.
    pub path: Option<PathBuf>,
    /// Message, with a line number when the parser reported a position.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl RelayConfig {
    /// Load configuration from a TOML file; a missing file yields defaults.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors other than not-found, invalid
    /// TOML, unknown fields, or a target with an empty name or command.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// See [`load`](Self::load).
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (i, t) in self.targets.iter().enumerate() {
            if t.name.trim().is_empty() || t.command.trim().is_empty() {
                return Err(ConfigError {
                    path: None,
                    message: format!("targets[{i}]: `name` and `command` must not be empty"),
                });
            }
        }
        Ok(())
    }

    /// Targets with `enabled = true`.
    pub fn enabled_targets(&self) -> impl Iterator<Item = &TargetConfig> {
        self.targets.iter().filter(|t| t.enabled)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
