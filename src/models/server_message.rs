use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::change_type_raw::ChangeTypeRaw;

/// WebSocket message types sent from server to client.
///
/// Row payloads arrive as raw JSON; they are validated into typed
/// [`Row`](super::Row) variants at the routing layer, where the owning
/// subscription's channel determines the expected schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authentication successful response
    AuthSuccess {
        /// Authenticated user ID
        user_id: String,
    },

    /// Authentication failed response
    AuthError {
        /// Error message
        message: String,
    },

    /// Acknowledgement of successful subscription registration
    SubscriptionAck {
        /// The subscription ID that was registered
        subscription_id: String,
        /// The channel name the subscription is bound to
        channel: String,
    },

    /// Change notification for INSERT/UPDATE/DELETE operations
    Change {
        /// The subscription ID this notification is for
        subscription_id: String,

        /// Type of change: "insert", "update", or "delete"
        change_type: ChangeTypeRaw,

        /// New/current row values (for INSERT and UPDATE)
        #[serde(skip_serializing_if = "Option::is_none")]
        row: Option<JsonValue>,

        /// Previous row values (for UPDATE and DELETE)
        #[serde(skip_serializing_if = "Option::is_none")]
        old_row: Option<JsonValue>,
    },

    /// Error notification scoped to one subscription
    Error {
        /// The subscription ID this error is for
        subscription_id: String,

        /// Error code
        code: String,

        /// Error message
        message: String,
    },
}
