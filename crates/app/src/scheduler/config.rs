//! Scheduler configuration.

use std::time::Duration;

use serde::Deserialize;

use roomlease_domain::error::ValidationError;

/// Upper bound on `lease_duration_ms` (one day).
pub const MAX_LEASE_DURATION_MS: u64 = 86_400_000;

/// Admission policy knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Global ceiling on simultaneously active leases.
    pub max_concurrent_leases: usize,
    /// How long a grant lasts before it is rotated, in milliseconds.
    pub lease_duration_ms: u64,
    /// Maximum number of pending requests; new requests beyond it are rejected.
    pub max_queue_len: usize,
    /// Interval of the periodic status log line, in milliseconds (`0` disables it).
    pub status_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_leases: 4,
            lease_duration_ms: 10_000,
            max_queue_len: 256,
            status_interval_ms: 5_000,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn lease_duration(&self) -> Duration {
        Duration::from_millis(self.lease_duration_ms)
    }

    #[must_use]
    pub fn status_interval(&self) -> Option<Duration> {
        (self.status_interval_ms > 0).then(|| Duration::from_millis(self.status_interval_ms))
    }

    /// Check the policy is usable.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_concurrent_leases == 0 {
            return Err(ValidationError::ZeroCapacity);
        }
        if self.lease_duration_ms == 0 || self.lease_duration_ms > MAX_LEASE_DURATION_MS {
            return Err(ValidationError::LeaseDuration {
                actual: self.lease_duration_ms,
                max: MAX_LEASE_DURATION_MS,
            });
        }
        if self.max_queue_len == 0 {
            return Err(ValidationError::ZeroQueueLength);
        }
        Ok(())
    }
}
