//! Retry schedule with exponential backoff for resilient API calls.

use std::fmt;
use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt (total attempts = `max_retries + 1`)
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Set the number of retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the delay before the first retry
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the delay cap
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Total transport attempts this config allows
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait before retry number `retry` (1-based).
    ///
    /// `min(initial_delay * 2^(retry-1), max_delay)`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.initial_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Transient failures that trigger a retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransientError {
    /// Transport raised (connection refused, DNS, reset...)
    Network(String),
    /// Attempt exceeded the per-attempt timeout
    Timeout(Duration),
    /// Non-ok status outside the 4xx range
    Status(u16),
}

impl fmt::Display for TransientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransientError::Network(msg) => write!(f, "transport failure: {}", msg),
            TransientError::Timeout(limit) => {
                write!(f, "request timed out after {}ms", limit.as_millis())
            }
            TransientError::Status(status) => write!(f, "server responded with HTTP {}", status),
        }
    }
}

impl TransientError {
    /// HTTP status carried by this failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            TransientError::Status(status) => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_cap() {
        let config = RetryConfig::default()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(500));

        assert_eq!(config.delay_for_retry(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_retry(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_retry(3), Duration::from_millis(400));
        assert_eq!(config.delay_for_retry(4), Duration::from_millis(500));
        assert_eq!(config.delay_for_retry(40), Duration::from_millis(500));
    }

    #[test]
    fn test_total_attempts() {
        assert_eq!(RetryConfig::default().max_retries(0).total_attempts(), 1);
        assert_eq!(RetryConfig::default().max_retries(3).total_attempts(), 4);
    }

    #[test]
    fn test_transient_display() {
        assert_eq!(
            TransientError::Timeout(Duration::from_millis(250)).to_string(),
            "request timed out after 250ms"
        );
        assert_eq!(TransientError::Status(503).status(), Some(503));
        assert_eq!(TransientError::Network("reset".into()).status(), None);
    }
}
