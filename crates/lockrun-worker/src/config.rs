//! Worker configuration.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by [`WorkerConfig::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("max_tasks must be at least 1")]
    ZeroMaxTasks,

    #[error("renewal margin ({margin:?}) must be shorter than the lease duration ({lease:?})")]
    RenewalMarginTooLarge { margin: Duration, lease: Duration },
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Topic to claim tasks for.
    pub topic: String,

    /// Upper bound on the size of one batch.
    pub max_tasks: u32,

    /// How long the backend may hold a fetch call open waiting for work.
    pub long_poll_timeout: Duration,

    /// Lock duration requested on fetch and on every renewal.
    pub lease_duration: Duration,

    /// Renewal fires this long before the lease would run out.
    pub renewal_margin: Duration,

    /// Delay between failed fetch attempts.
    pub retry_delay: Duration,
}

impl WorkerConfig {
    /// Default configuration for `topic`.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    /// Period of the lease renewal timer.
    pub fn renewal_interval(&self) -> Duration {
        self.lease_duration.saturating_sub(self.renewal_margin)
    }

    /// Check the settings the worker loop relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topic.trim().is_empty() {
            return Err(ConfigError::EmptyTopic);
        }
        if self.max_tasks == 0 {
            return Err(ConfigError::ZeroMaxTasks);
        }
        if self.renewal_margin >= self.lease_duration {
            return Err(ConfigError::RenewalMarginTooLarge {
                margin: self.renewal_margin,
                lease: self.lease_duration,
            });
        }
        Ok(())
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            topic: String::new(),
            max_tasks: 10,
            long_poll_timeout: Duration::from_secs(10),
            lease_duration: Duration::from_secs(30),
            renewal_margin: Duration::from_secs(5),
            retry_delay: Duration::from_secs(1),
        }
    }
}
