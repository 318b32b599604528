//! Change-feed connection management.
//!
//! One WebSocket per client, multiplexed across channel subscriptions:
//! - [`socket`]: low-level helpers (URL resolution, auth handshake,
//!   subscribe/unsubscribe frames, message parsing, keepalive jitter,
//!   payload decompression)
//! - [`connection`]: the shared connection task — routing, reconnect with
//!   exponential backoff, re-subscription, keepalive probing
//! - [`subscription`]: the per-channel consumer handle

pub mod connection;
pub mod socket;
pub mod subscription;

pub use connection::FeedState;
pub use subscription::Subscription;

pub(crate) use connection::FeedConnection;

/// Default capacity for subscription event channels.
pub(crate) const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 8192;

/// Maximum text message size (64 MiB).
pub(crate) const MAX_WS_TEXT_MESSAGE_BYTES: usize = 64 << 20;

/// Maximum binary message size before decompression (16 MiB).
pub(crate) const MAX_WS_BINARY_MESSAGE_BYTES: usize = 16 << 20;

/// Maximum decompressed message size (64 MiB).
pub(crate) const MAX_WS_DECOMPRESSED_MESSAGE_BYTES: usize = 64 << 20;

/// A duration far enough in the future (~100 years) to act as "never" for
/// deadline calculations without overflowing `Instant::now() + dur`.
pub(crate) const FAR_FUTURE: std::time::Duration =
    std::time::Duration::from_secs(100 * 365 * 24 * 3600);
