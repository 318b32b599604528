//! Main Confab client with builder pattern.
//!
//! The client owns the HTTP transport (snapshot reads, writes, function
//! calls) and a lazily-established shared feed connection multiplexing all
//! channel subscriptions.

use crate::auth::{AuthProvider, DynamicAuthProvider, ResolvedAuth};
use crate::error::{ConfabLinkError, Result};
use crate::event_handlers::EventHandlers;
use crate::feed::{FeedConnection, FeedState, Subscription};
use crate::functions::FunctionsClient;
use crate::models::{
    ChannelSpec, ConnectionOptions, HealthCheckResponse, Resource, Row, SubscriptionInfo,
    SubscriptionOptions,
};
use crate::sync::{LiveView, OrderPolicy, SnapshotLoader};
use crate::timeouts::ConfabLinkTimeouts;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Main Confab client.
///
/// Use [`ConfabLinkClientBuilder`] to construct instances with custom
/// configuration. The client is cheap to clone; clones share the HTTP pool
/// and the feed connection.
///
/// # Examples
///
/// ```rust,no_run
/// use confab_link::{ConfabLinkClient, Resource};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ConfabLinkClient::builder()
///     .base_url("http://localhost:3000")
///     .build()?;
///
/// let messages = client.snapshot(Resource::Messages, Some("mtg_42")).await?;
/// println!("{} messages", messages.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ConfabLinkClient {
    base_url: String,
    http_client: reqwest::Client,
    auth: ResolvedAuth,
    timeouts: ConfabLinkTimeouts,
    connection_options: ConnectionOptions,
    event_handlers: EventHandlers,
    feed: Arc<OnceCell<FeedConnection>>,
}

impl ConfabLinkClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> ConfabLinkClientBuilder {
        ConfabLinkClientBuilder::new()
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The configured timeouts.
    pub fn timeouts(&self) -> &ConfabLinkTimeouts {
        &self.timeouts
    }

    // ── Snapshot reads ──────────────────────────────────────────────────

    /// One ordered snapshot read of `resource` under `parent_id`.
    ///
    /// A `None` parent id performs no network I/O and returns an empty set.
    pub async fn snapshot(&self, resource: Resource, parent_id: Option<&str>) -> Result<Vec<Row>> {
        self.snapshot_loader().load(resource, parent_id).await
    }

    pub(crate) fn snapshot_loader(&self) -> SnapshotLoader {
        SnapshotLoader::new(
            self.base_url.clone(),
            self.http_client.clone(),
            self.auth.clone(),
            self.timeouts.snapshot_timeout,
        )
    }

    // ── Change feed ─────────────────────────────────────────────────────

    /// Subscribe to the change feed for `resource` under `parent_id`.
    pub async fn subscribe(&self, resource: Resource, parent_id: &str) -> Result<Subscription> {
        self.subscribe_with_options(
            ChannelSpec::new(resource, parent_id),
            SubscriptionOptions::default(),
        )
        .await
    }

    /// Subscribe with explicit channel and options.
    pub async fn subscribe_with_options(
        &self,
        channel: ChannelSpec,
        options: SubscriptionOptions,
    ) -> Result<Subscription> {
        let feed = self.feed().await?;

        // Unique subscription ID from timestamp nanos.
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let subscription_id = format!("sub_{}", nanos);

        let (event_rx, generation) = feed
            .subscribe(subscription_id.clone(), channel.clone(), options)
            .await?;

        Ok(Subscription::new(
            subscription_id,
            channel,
            event_rx,
            feed.unsubscribe_tx(),
            generation,
        ))
    }

    /// Open a [`LiveView`]: snapshot seed, then live reconciliation, with
    /// arrival ordering (append on insert, stable position on update).
    pub async fn live_view(
        &self,
        resource: Resource,
        parent_id: Option<&str>,
    ) -> Result<LiveView> {
        self.live_view_with_order(resource, parent_id, OrderPolicy::Arrival)
            .await
    }

    /// Open a [`LiveView`] with an explicit ordering policy — pass
    /// `OrderPolicy::ByKey(Row::designated_order)` for strict display order.
    pub async fn live_view_with_order(
        &self,
        resource: Resource,
        parent_id: Option<&str>,
        order: OrderPolicy<Row>,
    ) -> Result<LiveView> {
        let loader = self.snapshot_loader();
        let Some(parent_id) = parent_id else {
            return Ok(LiveView::detached(order, loader));
        };

        let channel = ChannelSpec::new(resource, parent_id);
        let mut view = LiveView::new(channel.clone(), order, loader);

        // A failed seed is not fatal: the view surfaces the error and the
        // feed still attaches, mirroring the upstream hook contract.
        if let Err(e) = view.load_snapshot().await {
            log::warn!("[confab-link] Initial snapshot for {} failed: {}", channel, e);
        }

        let subscription = self
            .subscribe_with_options(channel, SubscriptionOptions::default())
            .await?;
        view.attach(subscription);
        Ok(view)
    }

    /// Current feed connection state. [`FeedState::Connecting`] when no
    /// subscription has forced a connection yet.
    pub fn feed_state(&self) -> FeedState {
        match self.feed.get() {
            Some(feed) => feed.state(),
            None => FeedState::Connecting,
        }
    }

    /// Active subscriptions on the shared feed connection.
    pub async fn list_subscriptions(&self) -> Vec<SubscriptionInfo> {
        match self.feed.get() {
            Some(feed) => feed.list_subscriptions().await,
            None => Vec::new(),
        }
    }

    /// Shut down the feed connection. Active subscriptions end their
    /// streams; the HTTP paths keep working.
    pub async fn disconnect(&self) {
        if let Some(feed) = self.feed.get() {
            feed.shutdown().await;
        }
    }

    async fn feed(&self) -> Result<&FeedConnection> {
        self.feed
            .get_or_try_init(|| {
                FeedConnection::connect(
                    self.base_url.clone(),
                    self.auth.clone(),
                    self.timeouts.clone(),
                    self.connection_options.clone(),
                    self.event_handlers.clone(),
                )
            })
            .await
    }

    // ── Writes ──────────────────────────────────────────────────────────
    //
    // Mutations do not touch local state; the authoritative change comes
    // back over the feed and is applied by the reconciler.

    /// Insert a row. Returns the row as written by the backend.
    pub async fn insert_row(&self, row: &Row) -> Result<Row> {
        let url = format!("{}/v1/resources/{}", self.base_url, row.resource().as_str());
        let auth = self.auth.resolve().await?;
        let request = auth.apply_to_request(self.http_client.post(&url).json(&row.to_value()?))?;
        let body = send_checked(request).await?;
        Row::from_value(row.resource(), serde_json::from_str(&body)?)
    }

    /// Update a row by id. Returns the row as written by the backend.
    pub async fn update_row(&self, row: &Row) -> Result<Row> {
        let url = format!(
            "{}/v1/resources/{}/{}",
            self.base_url,
            row.resource().as_str(),
            row.id()
        );
        let auth = self.auth.resolve().await?;
        let request = auth.apply_to_request(self.http_client.patch(&url).json(&row.to_value()?))?;
        let body = send_checked(request).await?;
        Row::from_value(row.resource(), serde_json::from_str(&body)?)
    }

    /// Delete a row by id.
    pub async fn delete_row(&self, resource: Resource, id: &str) -> Result<()> {
        let url = format!("{}/v1/resources/{}/{}", self.base_url, resource.as_str(), id);
        let auth = self.auth.resolve().await?;
        let request = auth.apply_to_request(self.http_client.delete(&url))?;
        send_checked(request).await?;
        Ok(())
    }

    // ── Edge functions ──────────────────────────────────────────────────

    /// Handle for the translation/summary edge functions.
    pub fn functions(&self) -> FunctionsClient {
        FunctionsClient::new(
            self.base_url.clone(),
            self.http_client.clone(),
            self.auth.clone(),
            self.timeouts.function_timeout,
        )
    }

    // ── Health ──────────────────────────────────────────────────────────

    /// Check server health.
    pub async fn health_check(&self) -> Result<HealthCheckResponse> {
        let url = format!("{}/v1/health", self.base_url);
        let auth = self.auth.resolve().await?;
        let request = auth.apply_to_request(self.http_client.get(&url))?;
        let body = send_checked(request).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Send a request, mapping non-success statuses to `ApiError`.
async fn send_checked(request: reqwest::RequestBuilder) -> Result<String> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ConfabLinkError::ApiError {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(body)
}

/// Builder for [`ConfabLinkClient`].
pub struct ConfabLinkClientBuilder {
    base_url: Option<String>,
    auth: ResolvedAuth,
    timeouts: ConfabLinkTimeouts,
    connection_options: ConnectionOptions,
    event_handlers: EventHandlers,
}

impl Default for ConfabLinkClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfabLinkClientBuilder {
    /// Create a builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            auth: ResolvedAuth::Static(AuthProvider::None),
            timeouts: ConfabLinkTimeouts::default(),
            connection_options: ConnectionOptions::default(),
            event_handlers: EventHandlers::default(),
        }
    }

    /// Set the backend base URL (required), e.g. `https://api.confab.dev`.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set static credentials.
    pub fn auth(mut self, auth: AuthProvider) -> Self {
        self.auth = ResolvedAuth::Static(auth);
        self
    }

    /// Set a dynamic auth provider, consulted on every connect/reconnect.
    pub fn auth_provider(mut self, provider: Arc<dyn DynamicAuthProvider>) -> Self {
        self.auth = ResolvedAuth::Dynamic(provider);
        self
    }

    /// Set timeouts.
    pub fn timeouts(mut self, timeouts: ConfabLinkTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set connection options (reconnect/backoff behavior).
    pub fn connection_options(mut self, options: ConnectionOptions) -> Self {
        self.connection_options = options;
        self
    }

    /// Set lifecycle event handlers.
    pub fn event_handlers(mut self, handlers: EventHandlers) -> Self {
        self.event_handlers = handlers;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ConfabLinkClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| {
                ConfabLinkError::ConfigurationError("base_url is required".to_string())
            })?
            .trim()
            .trim_end_matches('/')
            .to_string();

        if base_url.is_empty() {
            return Err(ConfabLinkError::ConfigurationError(
                "base_url must not be empty".to_string(),
            ));
        }

        let mut http_builder = reqwest::Client::builder();
        if !ConfabLinkTimeouts::is_no_timeout(self.timeouts.connection_timeout) {
            http_builder = http_builder.connect_timeout(self.timeouts.connection_timeout);
        }
        let http_client = http_builder.build()?;

        Ok(ConfabLinkClient {
            base_url,
            http_client,
            auth: self.auth,
            timeouts: self.timeouts,
            connection_options: self.connection_options,
            event_handlers: self.event_handlers,
            feed: Arc::new(OnceCell::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_base_url() {
        let err = ConfabLinkClient::builder().build().unwrap_err();
        assert!(matches!(err, ConfabLinkError::ConfigurationError(_)));
    }

    #[test]
    fn test_builder_strips_trailing_slash() {
        let client = ConfabLinkClient::builder()
            .base_url("http://localhost:3000/")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn test_feed_state_before_first_subscribe() {
        let client = ConfabLinkClient::builder()
            .base_url("http://localhost:3000")
            .build()
            .unwrap();
        assert_eq!(client.feed_state(), FeedState::Connecting);
    }
}
