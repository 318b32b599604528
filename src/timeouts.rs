//! Timeout configuration for Confab client operations.
//!
//! Centralizes every deadline the client enforces: HTTP snapshot reads,
//! WebSocket connect/auth, edge-function calls, and keepalive probing.

use std::time::Duration;

/// Timeout configuration for Confab client operations.
///
/// # Examples
///
/// ```rust
/// use confab_link::ConfabLinkTimeouts;
/// use std::time::Duration;
///
/// // Defaults (recommended)
/// let timeouts = ConfabLinkTimeouts::default();
///
/// // Custom deadlines for a slow network
/// let timeouts = ConfabLinkTimeouts::builder()
///     .connection_timeout(Duration::from_secs(30))
///     .snapshot_timeout(Duration::from_secs(60))
///     .build();
///
/// // Aggressive deadlines for local development
/// let timeouts = ConfabLinkTimeouts::fast();
/// ```
#[derive(Debug, Clone)]
pub struct ConfabLinkTimeouts {
    /// Timeout for establishing connections (TCP + TLS handshake).
    /// Default: 10 seconds
    pub connection_timeout: Duration,

    /// Timeout for the WebSocket authentication handshake.
    /// Default: 5 seconds
    pub auth_timeout: Duration,

    /// Timeout for waiting on a subscription registration round-trip.
    /// Default: 5 seconds
    pub subscribe_timeout: Duration,

    /// Timeout for a snapshot read. The source system had none and a hung
    /// request would leave the loading flag stuck; set to 0 to opt back
    /// into waiting indefinitely.
    /// Default: 30 seconds
    pub snapshot_timeout: Duration,

    /// Timeout for translation/summary edge-function calls.
    /// Default: 30 seconds
    pub function_timeout: Duration,

    /// Keep-alive ping interval for the feed connection.
    /// Set to 0 to disable keep-alive pings.
    /// Default: 10 seconds
    pub keepalive_interval: Duration,

    /// Maximum wait for a Pong (or any frame) after a keepalive Ping before
    /// the connection is considered dead. Set to 0 to disable.
    /// Default: 5 seconds
    pub pong_timeout: Duration,
}

impl Default for ConfabLinkTimeouts {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            auth_timeout: Duration::from_secs(5),
            subscribe_timeout: Duration::from_secs(5),
            snapshot_timeout: Duration::from_secs(30),
            function_timeout: Duration::from_secs(30),
            keepalive_interval: Duration::from_secs(10),
            pong_timeout: Duration::from_secs(5),
        }
    }
}

impl ConfabLinkTimeouts {
    /// Create a new builder for custom timeout configuration.
    pub fn builder() -> ConfabLinkTimeoutsBuilder {
        ConfabLinkTimeoutsBuilder::new()
    }

    /// Timeouts optimized for fast local development.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(2),
            auth_timeout: Duration::from_secs(2),
            subscribe_timeout: Duration::from_secs(2),
            snapshot_timeout: Duration::from_secs(10),
            function_timeout: Duration::from_secs(10),
            keepalive_interval: Duration::from_secs(15),
            pong_timeout: Duration::from_secs(5),
        }
    }

    /// Timeouts optimized for high-latency or unreliable networks.
    pub fn relaxed() -> Self {
        Self {
            connection_timeout: Duration::from_secs(30),
            auth_timeout: Duration::from_secs(15),
            subscribe_timeout: Duration::from_secs(15),
            snapshot_timeout: Duration::from_secs(120),
            function_timeout: Duration::from_secs(120),
            keepalive_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
        }
    }

    /// Check if a duration represents "no timeout" (zero or absurdly large).
    pub fn is_no_timeout(duration: Duration) -> bool {
        duration.is_zero() || duration > Duration::from_secs(86400 * 365)
    }
}

/// Builder for [`ConfabLinkTimeouts`].
#[derive(Debug, Clone)]
pub struct ConfabLinkTimeoutsBuilder {
    timeouts: ConfabLinkTimeouts,
}

impl ConfabLinkTimeoutsBuilder {
    fn new() -> Self {
        Self {
            timeouts: ConfabLinkTimeouts::default(),
        }
    }

    /// Set the connection timeout (TCP + TLS handshake).
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connection_timeout = timeout;
        self
    }

    /// Set the WebSocket authentication handshake timeout.
    pub fn auth_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.auth_timeout = timeout;
        self
    }

    /// Set the subscription registration timeout.
    pub fn subscribe_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.subscribe_timeout = timeout;
        self
    }

    /// Set the snapshot read timeout. Set to 0 to wait indefinitely.
    pub fn snapshot_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.snapshot_timeout = timeout;
        self
    }

    /// Set the edge-function call timeout. Set to 0 to wait indefinitely.
    pub fn function_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.function_timeout = timeout;
        self
    }

    /// Set the keepalive ping interval. Set to 0 to disable pings.
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.timeouts.keepalive_interval = interval;
        self
    }

    /// Set the pong timeout. Set to 0 to disable dead-connection probing.
    pub fn pong_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.pong_timeout = timeout;
        self
    }

    /// Build the timeout configuration.
    pub fn build(self) -> ConfabLinkTimeouts {
        self.timeouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = ConfabLinkTimeouts::default();
        assert_eq!(timeouts.connection_timeout, Duration::from_secs(10));
        assert_eq!(timeouts.snapshot_timeout, Duration::from_secs(30));
        assert_eq!(timeouts.keepalive_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_builder() {
        let timeouts = ConfabLinkTimeouts::builder()
            .connection_timeout(Duration::from_secs(60))
            .snapshot_timeout(Duration::ZERO)
            .build();

        assert_eq!(timeouts.connection_timeout, Duration::from_secs(60));
        assert!(timeouts.snapshot_timeout.is_zero());
    }

    #[test]
    fn test_fast_preset() {
        let timeouts = ConfabLinkTimeouts::fast();
        assert!(timeouts.connection_timeout <= Duration::from_secs(5));
        assert!(timeouts.subscribe_timeout <= Duration::from_secs(5));
    }

    #[test]
    fn test_relaxed_preset() {
        let timeouts = ConfabLinkTimeouts::relaxed();
        assert!(timeouts.connection_timeout >= Duration::from_secs(30));
        assert!(timeouts.snapshot_timeout >= Duration::from_secs(60));
    }

    #[test]
    fn test_is_no_timeout() {
        assert!(ConfabLinkTimeouts::is_no_timeout(Duration::ZERO));
        assert!(!ConfabLinkTimeouts::is_no_timeout(Duration::from_secs(1)));
        assert!(ConfabLinkTimeouts::is_no_timeout(Duration::from_secs(
            86400 * 366
        )));
    }
}
