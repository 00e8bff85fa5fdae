//! CLI configuration from environment variables, overridable by flags.
//!
//! - `ATTEST_DATA_DIR` (default: `.attest`): attestations, audit chains and
//!   the local ledger live under this directory.
//! - `ATTEST_TEMPLATES` (default: built-in set): YAML template file.
//! - `ATTEST_LOG_FORMAT` (`text` | `json`, default: `text`).
//! - `ATTEST_LOCK_TIMEOUT_MS` (default: 10000): how long a mutating
//!   command waits for another invocation holding the same attestation.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub templates: Option<PathBuf>,
    pub log_format: LogFormat,
    pub lock_timeout: Duration,
}

impl CliConfig {
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);
}

impl CliConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = lookup("ATTEST_DATA_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".attest"));
        let templates = lookup("ATTEST_TEMPLATES")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
        let log_format = match lookup("ATTEST_LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => bail!("ATTEST_LOG_FORMAT must be `text` or `json`, got `{other}`"),
        };
        let lock_timeout = match lookup("ATTEST_LOCK_TIMEOUT_MS").as_deref().map(str::trim) {
            None | Some("") => Self::DEFAULT_LOCK_TIMEOUT,
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(e) => bail!("ATTEST_LOCK_TIMEOUT_MS must be milliseconds, got `{raw}`: {e}"),
            },
        };
        Ok(Self {
            data_dir,
            templates,
            log_format,
            lock_timeout,
        })
    }
}
