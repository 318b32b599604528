use serde::{Deserialize, Serialize};

/// Per-subscription options for a change-feed channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionOptions {
    /// Ask the server to include previous row values on Update events.
    /// Delete events always carry the old row. Default: server-configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_old_row: Option<bool>,
}

impl SubscriptionOptions {
    /// Create new subscription options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request previous row values on Update events.
    pub fn with_include_old_row(mut self, include: bool) -> Self {
        self.include_old_row = Some(include);
        self
    }
}

/// Wire payload registering a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    /// Client-chosen subscription ID, echoed on every event
    pub id: String,
    /// Channel name, `<resource>:<parent-id>`
    pub channel: String,
    /// Per-subscription options
    #[serde(default)]
    pub options: SubscriptionOptions,
}

/// Description of an active subscription, as reported by
/// [`ConfabLinkClient::list_subscriptions`](crate::ConfabLinkClient::list_subscriptions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    /// Subscription ID
    pub id: String,
    /// Channel name the subscription is bound to
    pub channel: String,
    /// Millis since epoch when the subscription was registered
    pub created_at_ms: u64,
    /// Millis since epoch of the most recent event, if any
    pub last_event_time_ms: Option<u64>,
}
