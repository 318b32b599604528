use serde_json::Value as JsonValue;

use super::row::Row;
use crate::sync::RowChange;

/// Change event received via a feed subscription.
///
/// Rows are already validated against their channel's resource schema by the
/// time an event reaches a consumer.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    /// Acknowledgement of subscription registration.
    ///
    /// Delivered once after subscribing, and again after every automatic
    /// re-subscription following a reconnect — consumers seeded from a
    /// snapshot should treat a repeat Ack as a cue to re-read it.
    Ack {
        /// Subscription ID
        subscription_id: String,
        /// Channel name the subscription is bound to
        channel: String,
    },

    /// Insert notification
    Insert {
        /// Subscription ID the change belongs to
        subscription_id: String,
        /// Inserted row
        row: Row,
    },

    /// Update notification
    Update {
        /// Subscription ID the change belongs to
        subscription_id: String,
        /// Current row values
        row: Row,
        /// Previous row values, when the subscription requested them
        old_row: Option<Row>,
    },

    /// Delete notification
    Delete {
        /// Subscription ID the change belongs to
        subscription_id: String,
        /// Deleted row
        old_row: Row,
    },

    /// Error notification from the server
    Error {
        /// Subscription ID related to the error
        subscription_id: String,
        /// Error code
        code: String,
        /// Human-readable error message
        message: String,
    },

    /// Unknown payload (kept for logging/diagnostics)
    Unknown {
        /// Raw JSON payload
        raw: JsonValue,
    },
}

impl ChangeEvent {
    /// Returns true if this is an error event.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Returns the subscription ID for this event, if any.
    pub fn subscription_id(&self) -> Option<&str> {
        match self {
            Self::Ack { subscription_id, .. }
            | Self::Insert { subscription_id, .. }
            | Self::Update { subscription_id, .. }
            | Self::Delete { subscription_id, .. }
            | Self::Error { subscription_id, .. } => Some(subscription_id.as_str()),
            Self::Unknown { .. } => None,
        }
    }

    /// Convert into the reconciler operation this event represents, if it
    /// carries one (Ack/Error/Unknown do not).
    pub fn into_row_change(self) -> Option<RowChange<Row>> {
        match self {
            Self::Insert { row, .. } => Some(RowChange::Insert(row)),
            Self::Update { row, .. } => Some(RowChange::Update(row)),
            Self::Delete { old_row, .. } => Some(RowChange::Delete(old_row.id().to_string())),
            Self::Ack { .. } | Self::Error { .. } | Self::Unknown { .. } => None,
        }
    }
}
