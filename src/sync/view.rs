//! `LiveView` — a collection kept consistent with the change feed.
//!
//! Control flow: snapshot read seeds the collection, then the subscription
//! delivers incremental events which are applied one at a time. The feed is
//! at-least-once, so a row delivered by both the snapshot and the feed is
//! absorbed by the reconciler's idempotent insert. A repeated subscription
//! Ack (the marker of an automatic reconnect) triggers a snapshot re-read to
//! close any gap the disconnect opened.

use crate::error::{ConfabLinkError, Result};
use crate::feed::Subscription;
use crate::models::{ChangeEvent, ChangeTypeRaw, ChannelSpec, Row};
use crate::sync::reconciler::{Applied, LiveCollection, OrderPolicy};
use crate::sync::snapshot::SnapshotLoader;

/// What a call to [`LiveView::next_change`] did to the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// One incremental change was applied
    Changed {
        /// The change kind as delivered by the feed
        kind: ChangeTypeRaw,
        /// Key of the affected row
        key: String,
        /// What the reconciler actually did
        outcome: Applied,
    },
    /// The collection was re-seeded from a snapshot after a reconnect
    Resynced {
        /// Row count after the re-read
        rows: usize,
    },
}

/// An in-memory view of one resource under one parent, owned by a single
/// consumer and kept current by the change feed.
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
/// let mut view = client.live_view(Resource::Messages, Some("mtg_42")).await?;
/// println!("{} messages at load", view.rows().len());
///
/// while let Some(update) = view.next_change().await {
///     match update {
///         Ok(_) => println!("now {} messages", view.rows().len()),
///         Err(e) => eprintln!("feed error: {}", e),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct LiveView {
    channel: Option<ChannelSpec>,
    collection: LiveCollection<Row>,
    subscription: Option<Subscription>,
    loader: SnapshotLoader,
    loading: bool,
    error: Option<String>,
    acked: bool,
    closed: bool,
}

impl LiveView {
    /// A view with no parent selected: empty, not loading, no feed.
    pub(crate) fn detached(order: OrderPolicy<Row>, loader: SnapshotLoader) -> Self {
        Self {
            channel: None,
            collection: LiveCollection::with_order(order),
            subscription: None,
            loader,
            loading: false,
            error: None,
            acked: false,
            closed: false,
        }
    }

    pub(crate) fn new(
        channel: ChannelSpec,
        order: OrderPolicy<Row>,
        loader: SnapshotLoader,
    ) -> Self {
        Self {
            channel: Some(channel),
            collection: LiveCollection::with_order(order),
            subscription: None,
            loader,
            loading: false,
            error: None,
            acked: false,
            closed: false,
        }
    }

    pub(crate) fn attach(&mut self, subscription: Subscription) {
        self.subscription = Some(subscription);
    }

    /// Seed (or re-seed) the collection from a snapshot read.
    ///
    /// On failure the previous contents are kept, the error is recorded, and
    /// the loading flag is cleared — exactly once per invocation either way.
    pub(crate) async fn load_snapshot(&mut self) -> Result<usize> {
        let Some(channel) = self.channel.clone() else {
            self.loading = false;
            return Ok(0);
        };

        self.loading = true;
        let result = self
            .loader
            .load(channel.resource, Some(channel.parent_id.as_str()))
            .await;
        self.loading = false;

        match result {
            Ok(rows) => {
                let count = rows.len();
                self.collection.replace_all(rows);
                self.error = None;
                Ok(count)
            },
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            },
        }
    }

    /// Wait for the next feed event and apply it to the collection.
    ///
    /// Returns `None` when the view is closed or the feed has ended. Errors
    /// are also recorded in [`error`](Self::error) so a consumer can render
    /// stale data plus an error indicator, per the source UI's contract.
    pub async fn next_change(&mut self) -> Option<Result<ViewEvent>> {
        loop {
            let subscription = self.subscription.as_mut()?;
            match subscription.next().await {
                None => return None,
                Some(Err(e)) => {
                    self.error = Some(e.to_string());
                    return Some(Err(e));
                },
                Some(Ok(event)) => match event {
                    ChangeEvent::Ack { .. } => {
                        if !self.acked {
                            // First Ack: the snapshot that seeded this view
                            // is current; nothing to do.
                            self.acked = true;
                            continue;
                        }
                        // Re-subscription after reconnect: re-read the
                        // snapshot to close the gap.
                        return match self.load_snapshot().await {
                            Ok(rows) => Some(Ok(ViewEvent::Resynced { rows })),
                            Err(e) => Some(Err(e)),
                        };
                    },
                    ChangeEvent::Error { code, message, .. } => {
                        let err = ConfabLinkError::FeedError { code, message };
                        self.error = Some(err.to_string());
                        return Some(Err(err));
                    },
                    ChangeEvent::Unknown { raw } => {
                        log::debug!("[confab-link] Ignoring unknown feed payload: {}", raw);
                        continue;
                    },
                    event @ (ChangeEvent::Insert { .. }
                    | ChangeEvent::Update { .. }
                    | ChangeEvent::Delete { .. }) => {
                        let kind = match &event {
                            ChangeEvent::Insert { .. } => ChangeTypeRaw::Insert,
                            ChangeEvent::Update { .. } => ChangeTypeRaw::Update,
                            _ => ChangeTypeRaw::Delete,
                        };
                        // Ack/Error/Unknown are handled above; a row change
                        // always converts.
                        let Some(change) = event.into_row_change() else {
                            continue;
                        };
                        let key = change.key().to_string();
                        let outcome = self.collection.apply(change);
                        return Some(Ok(ViewEvent::Changed { kind, key, outcome }));
                    },
                },
            }
        }
    }

    /// Current rows, in collection order.
    pub fn rows(&self) -> &[Row] {
        self.collection.rows()
    }

    /// Look up a row by id.
    pub fn get(&self, key: &str) -> Option<&Row> {
        self.collection.get(key)
    }

    /// Number of rows currently in the view.
    pub fn len(&self) -> usize {
        self.collection.len()
    }

    /// Returns true if the view holds no rows.
    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    /// The channel this view mirrors, if a parent is selected.
    pub fn channel(&self) -> Option<&ChannelSpec> {
        self.channel.as_ref()
    }

    /// True while a snapshot read is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The most recent error, if any. Cleared by a successful snapshot.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Tear down the view: unsubscribes the feed. Idempotent. After close,
    /// no further events mutate the collection; the rows remain readable.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close().await?;
        }
        Ok(())
    }
}
