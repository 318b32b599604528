//! Processed-id tracking for consumers that see a row twice.
//!
//! A snapshot read racing the live feed can deliver the same row through
//! both paths. Consumers whose handling is not idempotent (the translation
//! panel translates each message exactly once) track processed ids here;
//! consumers backed by a [`LiveCollection`](crate::sync::LiveCollection)
//! don't need this because Insert already replaces.

use std::collections::HashSet;

/// Per-consumer-lifetime set of already-processed row ids.
///
/// Created when the consumer starts, cleared on every restart, never
/// persisted.
///
/// # Examples
///
/// The translation panel translates each message exactly once, whether it
/// arrived via the snapshot or the live feed:
///
/// ```rust,no_run
/// use confab_link::{ConfabLinkClient, DedupGuard, Resource, Row, TranslateRequest};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let client = ConfabLinkClient::builder().base_url("http://localhost:3000").build()?;
/// let mut guard = DedupGuard::new();
/// let functions = client.functions();
///
/// let mut view = client.live_view(Resource::Messages, Some("mtg_42")).await?;
/// for row in view.rows().to_vec() {
///     if let Row::Message(message) = row {
///         if guard.claim(&message.id) {
///             let _ = functions
///                 .translate(TranslateRequest::detect(&message.content, "en"))
///                 .await;
///         }
///     }
/// }
/// while let Some(Ok(_)) = view.next_change().await {
///     // New rows go through the same guard before translation.
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct DedupGuard {
    processed: HashSet<String>,
}

impl DedupGuard {
    /// Create an empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if this id has not been processed yet.
    pub fn should_process(&self, id: &str) -> bool {
        !self.processed.contains(id)
    }

    /// Record an id as processed.
    pub fn mark_processed(&mut self, id: impl Into<String>) {
        self.processed.insert(id.into());
    }

    /// Combined check-and-mark: returns true exactly once per id.
    pub fn claim(&mut self, id: &str) -> bool {
        if self.processed.contains(id) {
            return false;
        }
        self.processed.insert(id.to_string());
        true
    }

    /// Forget everything. Called when the consumer is (re)started.
    pub fn reset(&mut self) {
        self.processed.clear();
    }

    /// Number of processed ids.
    pub fn len(&self) -> usize {
        self.processed.len()
    }

    /// Returns true if nothing has been processed.
    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unseen_id_should_process() {
        let guard = DedupGuard::new();
        assert!(guard.should_process("m1"));
    }

    #[test]
    fn test_marked_id_is_rejected_on_second_check() {
        let mut guard = DedupGuard::new();
        assert!(guard.should_process("m1"));
        guard.mark_processed("m1");
        assert!(!guard.should_process("m1"));
    }

    #[test]
    fn test_claim_returns_true_exactly_once() {
        let mut guard = DedupGuard::new();
        assert!(guard.claim("m1"));
        assert!(!guard.claim("m1"));
        assert!(guard.claim("m2"));
    }

    #[test]
    fn test_reset_forgets_processed_ids() {
        let mut guard = DedupGuard::new();
        guard.mark_processed("m1");
        guard.reset();
        assert!(guard.should_process("m1"));
        assert!(guard.is_empty());
    }
}
