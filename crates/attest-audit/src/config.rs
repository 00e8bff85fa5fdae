//! Publish worker configuration.

use std::time::Duration;

use crate::error::ConfigError;

/// Retry and timeout settings for the publish worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    /// Attempts per event in one drain pass, including the first.
    pub max_attempts: u32,
    /// Delay after the first failure; doubles on each further failure.
    pub base_delay: Duration,
    /// Upper bound on a single publish call.
    pub call_timeout: Duration,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            call_timeout: Duration::from_secs(5),
        }
    }
}

impl PublishConfig {
    /// Load from environment variables, falling back to defaults.
    ///
    /// - `ATTEST_PUBLISH_MAX_ATTEMPTS` (default: 3, minimum 1)
    /// - `ATTEST_PUBLISH_BASE_DELAY_MS` (default: 200)
    /// - `ATTEST_PUBLISH_TIMEOUT_MS` (default: 5000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_attempts =
            parse_var::<u32>(&lookup, "ATTEST_PUBLISH_MAX_ATTEMPTS")?.unwrap_or(defaults.max_attempts);
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                var: "ATTEST_PUBLISH_MAX_ATTEMPTS".into(),
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        let base_delay = parse_var(&lookup, "ATTEST_PUBLISH_BASE_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.base_delay);
        let call_timeout = parse_var(&lookup, "ATTEST_PUBLISH_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.call_timeout);
        Ok(Self {
            max_attempts,
            base_delay,
            call_timeout,
        })
    }

    /// Backoff before retry number `attempt` (0-based): base, 2×base, 4×base…
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                var: var.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}
