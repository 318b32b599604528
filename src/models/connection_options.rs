use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection-level options for the feed connection.
///
/// These control reconnection behavior for the shared WebSocket; per-channel
/// behavior lives in [`SubscriptionOptions`](super::SubscriptionOptions).
///
/// # Example
///
/// ```rust
/// use confab_link::ConnectionOptions;
///
/// let options = ConnectionOptions::default()
///     .with_auto_reconnect(true)
///     .with_reconnect_delay_ms(2000)
///     .with_max_reconnect_attempts(Some(10));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Reconnect automatically when the feed connection drops.
    /// Default: true
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    /// Initial delay in milliseconds between reconnection attempts.
    /// Doubles per attempt up to `max_reconnect_delay_ms`.
    /// Default: 1000ms
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Cap on the exponential backoff delay.
    /// Default: 30000ms
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,

    /// Maximum number of reconnection attempts before giving up.
    /// Default: None (retry forever)
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30000
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            reconnect_delay_ms: 1000,
            max_reconnect_delay_ms: 30000,
            max_reconnect_attempts: None,
        }
    }
}

impl ConnectionOptions {
    /// Create new connection options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to automatically reconnect on connection loss.
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set the initial delay between reconnection attempts (milliseconds).
    pub fn with_reconnect_delay_ms(mut self, delay_ms: u64) -> Self {
        self.reconnect_delay_ms = delay_ms;
        self
    }

    /// Set the maximum backoff delay (milliseconds).
    pub fn with_max_reconnect_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_reconnect_delay_ms = max_delay_ms;
        self
    }

    /// Set the maximum number of reconnection attempts.
    /// Pass None for infinite retries, Some(0) to disable reconnection.
    pub fn with_max_reconnect_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_reconnect_attempts = max_attempts;
        self
    }

    /// Backoff delay for the given (zero-based) reconnect attempt:
    /// `reconnect_delay_ms * 2^attempt`, capped at `max_reconnect_delay_ms`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let delay = std::cmp::min(
            self.reconnect_delay_ms
                .saturating_mul(2u64.saturating_pow(attempt)),
            self.max_reconnect_delay_ms,
        );
        Duration::from_millis(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_exponential_until_cap() {
        let options = ConnectionOptions::default()
            .with_reconnect_delay_ms(1000)
            .with_max_reconnect_delay_ms(30000);

        assert_eq!(options.backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(options.backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(options.backoff_delay(3), Duration::from_millis(8000));
        assert_eq!(options.backoff_delay(5), Duration::from_millis(30000));
        assert_eq!(options.backoff_delay(20), Duration::from_millis(30000));
    }

    #[test]
    fn test_backoff_survives_overflowing_attempts() {
        let options = ConnectionOptions::default();
        // 2^200 saturates; the cap must still hold.
        assert_eq!(options.backoff_delay(200), Duration::from_millis(30000));
    }
}
