//! `Subscription` — consumer handle for a single change-feed channel.
//!
//! Receives events routed by [`FeedConnection`](super::connection); closing
//! (or dropping) the handle unsubscribes the channel.

use crate::error::Result;
use crate::models::{ChangeEvent, ChannelSpec};
use tokio::sync::mpsc;

/// A live subscription to one channel.
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
/// let mut subscription = client.subscribe(Resource::Messages, "mtg_42").await?;
///
/// while let Some(event) = subscription.next().await {
///     match event {
///         Ok(change) => println!("change: {:?}", change),
///         Err(e) => eprintln!("error: {}", e),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Subscription {
    subscription_id: String,
    channel: ChannelSpec,
    /// Receives validated events from the connection task.
    event_rx: mpsc::Receiver<Result<ChangeEvent>>,
    /// Tells the connection task to unsubscribe us. The payload carries
    /// `(subscription_id, generation)`; the generation guards against a
    /// stale handle unsubscribing a newer subscription with the same id.
    unsubscribe_tx: Option<mpsc::Sender<(String, u64)>>,
    /// Generation tag assigned by the connection task.
    generation: u64,
    closed: bool,
}

impl Subscription {
    pub(crate) fn new(
        subscription_id: String,
        channel: ChannelSpec,
        event_rx: mpsc::Receiver<Result<ChangeEvent>>,
        unsubscribe_tx: mpsc::Sender<(String, u64)>,
        generation: u64,
    ) -> Self {
        Self {
            subscription_id,
            channel,
            event_rx,
            unsubscribe_tx: Some(unsubscribe_tx),
            generation,
            closed: false,
        }
    }

    /// Receive the next change event from the subscription.
    ///
    /// Returns `None` once the subscription is closed — by [`close`](Self::close),
    /// or because the connection shut down.
    pub async fn next(&mut self) -> Option<Result<ChangeEvent>> {
        if self.closed {
            return None;
        }
        match self.event_rx.recv().await {
            Some(item) => Some(item),
            None => {
                self.closed = true;
                None
            },
        }
    }

    /// The client-assigned subscription ID.
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// The channel this subscription is bound to.
    pub fn channel(&self) -> &ChannelSpec {
        &self.channel
    }

    /// Close the subscription.
    ///
    /// Safe to call multiple times — subsequent calls are no-ops. After
    /// close, [`next`](Self::next) returns `None` and no further events are
    /// delivered to this handle.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // Stop accepting routed events immediately, even if the
        // connection task processes the unsubscribe later.
        self.event_rx.close();

        if let Some(tx) = self.unsubscribe_tx.take() {
            let _ = tx
                .send((self.subscription_id.clone(), self.generation))
                .await;
        }

        Ok(())
    }

    /// Returns `true` if `close()` has been called or the feed ended.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Fire-and-forget unsubscribe.
        if let Some(tx) = self.unsubscribe_tx.take() {
            let id = self.subscription_id.clone();
            let generation = self.generation;
            let _ = tx.try_send((id, generation));
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::Resource;

    /// A `Subscription` wired to in-memory channels, plus the sender half
    /// for injecting events and the receiver half observing unsubscribes.
    pub(crate) fn make_test_subscription() -> (
        Subscription,
        mpsc::Sender<Result<ChangeEvent>>,
        mpsc::Receiver<(String, u64)>,
    ) {
        let (event_tx, event_rx) = mpsc::channel(16);
        let (unsub_tx, unsub_rx) = mpsc::channel(16);
        let sub = Subscription::new(
            "sub_test".to_string(),
            ChannelSpec::new(Resource::Messages, "mtg_1"),
            event_rx,
            unsub_tx,
            7,
        );
        (sub, event_tx, unsub_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::make_test_subscription;
    use super::*;
    use crate::models::{MessageRow, Row};

    fn insert_event(id: &str) -> ChangeEvent {
        ChangeEvent::Insert {
            subscription_id: "sub_test".to_string(),
            row: Row::Message(MessageRow {
                id: id.to_string(),
                meeting_id: "mtg_1".to_string(),
                user_id: "u1".to_string(),
                content: "hi".to_string(),
                language: None,
                created_at: "2026-08-01T10:00:00Z".to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn test_is_not_closed_initially() {
        let (sub, _tx, _unsub) = make_test_subscription();
        assert!(!sub.is_closed());
    }

    #[tokio::test]
    async fn test_next_yields_delivered_events() {
        let (mut sub, tx, _unsub) = make_test_subscription();
        tx.send(Ok(insert_event("m1"))).await.unwrap();
        let event = sub.next().await.unwrap().unwrap();
        assert_eq!(event.subscription_id(), Some("sub_test"));
    }

    #[tokio::test]
    async fn test_close_marks_subscription_as_closed() {
        let (mut sub, _tx, _unsub) = make_test_subscription();
        sub.close().await.unwrap();
        assert!(sub.is_closed());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (mut sub, _tx, mut unsub) = make_test_subscription();
        sub.close().await.unwrap();
        sub.close().await.unwrap();
        assert!(sub.is_closed());
        // Exactly one unsubscribe reaches the connection task.
        let (id, generation) = unsub.recv().await.unwrap();
        assert_eq!(id, "sub_test");
        assert_eq!(generation, 7);
        assert!(unsub.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_no_delivery_after_close() {
        let (mut sub, tx, _unsub) = make_test_subscription();
        sub.close().await.unwrap();
        // An event emitted after unsubscribe must not surface.
        let _ = tx.send(Ok(insert_event("m2"))).await;
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_next_returns_none_when_feed_ends() {
        let (mut sub, tx, _unsub) = make_test_subscription();
        drop(tx);
        assert!(sub.next().await.is_none());
        assert!(sub.is_closed());
    }

    #[tokio::test]
    async fn test_drop_sends_unsubscribe() {
        let (sub, _tx, mut unsub) = make_test_subscription();
        drop(sub);
        let (id, generation) = unsub.recv().await.unwrap();
        assert_eq!(id, "sub_test");
        assert_eq!(generation, 7);
    }
}
