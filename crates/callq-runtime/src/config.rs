//! Host and producer configuration.
//!
//! Both types follow the same builder shape: `new()` gives the defaults,
//! `with_*` methods override one field, and `validate()` reports values the
//! host refuses to run with.

use callq_common::{CallqError, Result};
use std::time::Duration;

/// Upper bound for any configured sleep or interval.
pub(crate) const MAX_DURATION: Duration = Duration::from_secs(3600);

/// Milliseconds from a script value as a `Duration`, capped at one hour.
pub(crate) fn capped_millis(ms: f64) -> Duration {
    Duration::from_millis(ms as u64).min(MAX_DURATION)
}

/// Settings for the script run loop.
///
/// # Example
///
/// ```
/// use callq_runtime::HostConfig;
/// use std::time::Duration;
///
/// let config = HostConfig::new()
///     .with_default_sleep(Duration::from_millis(10))
///     .with_max_iterations(100);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    /// Pause between loop iterations when the script does not set a numeric
    /// `sleepInterval` global.
    pub default_sleep: Duration,
    /// Stop after this many iterations even if `loop()` keeps returning true.
    pub max_iterations: Option<u64>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            default_sleep: Duration::from_millis(5),
            max_iterations: None,
        }
    }
}

impl HostConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_sleep(mut self, sleep: Duration) -> Self {
        self.default_sleep = sleep;
        self
    }

    pub fn with_max_iterations(mut self, iterations: u64) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    /// # Errors
    ///
    /// Returns `CallqError::InvalidConfig` if the default sleep exceeds one
    /// hour or the iteration cap is zero.
    pub fn validate(&self) -> Result<()> {
        if self.default_sleep > MAX_DURATION {
            return Err(CallqError::InvalidConfig(format!(
                "default sleep must be <= 1 hour (got {} seconds)",
                self.default_sleep.as_secs()
            )));
        }

        if self.max_iterations == Some(0) {
            return Err(CallqError::InvalidConfig(
                "max iterations must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Settings for the background producer task.
#[derive(Debug, Clone, PartialEq)]
pub struct ProducerConfig {
    /// Global function the producer calls.
    pub callee: String,
    /// Time between two appends.
    pub interval: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            callee: "test".to_string(),
            interval: Duration::from_millis(250),
        }
    }
}

impl ProducerConfig {
    pub fn new(callee: impl Into<String>) -> Self {
        Self {
            callee: callee.into(),
            ..Self::default()
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// # Errors
    ///
    /// Returns `CallqError::InvalidConfig` for an empty callee name or an
    /// interval that is zero or longer than one hour.
    pub fn validate(&self) -> Result<()> {
        if self.callee.is_empty() {
            return Err(CallqError::InvalidConfig(
                "producer callee must not be empty".to_string(),
            ));
        }

        if self.interval.is_zero() {
            return Err(CallqError::InvalidConfig(
                "producer interval must be greater than zero".to_string(),
            ));
        }

        if self.interval > MAX_DURATION {
            return Err(CallqError::InvalidConfig(format!(
                "producer interval must be <= 1 hour (got {} seconds)",
                self.interval.as_secs()
            )));
        }

        Ok(())
    }
}
