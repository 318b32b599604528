use serde::{Deserialize, Serialize};

use super::subscription::SubscriptionRequest;

/// Credentials carried in the in-band WebSocket `Authenticate` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum WsAuthCredentials {
    /// JWT bearer token
    Jwt { token: String },
    /// Project API key
    ApiKey { key: String },
    /// Localhost bypass
    None {},
}

/// Client-to-server request messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authenticate the WebSocket connection.
    ///
    /// Sent immediately after the connection is established; the server
    /// responds with AuthSuccess or AuthError.
    Authenticate {
        /// Authentication credentials
        #[serde(flatten)]
        credentials: WsAuthCredentials,
    },

    /// Subscribe to a change-feed channel
    Subscribe {
        /// Subscription to register
        subscription: SubscriptionRequest,
    },

    /// Unsubscribe from a change-feed channel
    Unsubscribe {
        /// The subscription ID to unsubscribe
        subscription_id: String,
    },
}
