//! Error types for confab-link.

use thiserror::Error;

/// Errors surfaced by the Confab client.
#[derive(Error, Debug)]
pub enum ConfabLinkError {
    /// Invalid client configuration (bad URL, bad header value, …)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Transport-level HTTP failure (connect, TLS, body read)
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// WebSocket connection or protocol failure
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Authentication was rejected or is missing where required
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// An operation exceeded its configured timeout
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// Subscription-scoped error delivered over the change feed
    #[error("Feed error [{code}]: {message}")]
    FeedError { code: String, message: String },

    /// A row payload did not match the schema of its resource
    #[error("Invalid {resource} payload: {message}")]
    InvalidPayload { resource: String, message: String },

    /// Edge-function invocation failure (translation, summary)
    #[error(transparent)]
    FunctionError(#[from] FunctionError),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A voice-session command that is not legal in the current state
    #[error("Invalid voice command '{command}' in state '{state}'")]
    InvalidTransition { state: String, command: String },

    /// Bug-shaped internal failures (poisoned locks, dead tasks)
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Failures from the translation/summary edge functions.
///
/// The quota condition is distinguished because the UI renders it with its
/// own troubleshooting message, as does a function that was never deployed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FunctionError {
    /// HTTP 429, or an error body tagged `quota_exceeded`
    #[error("Quota exceeded: {message}")]
    QuotaExceeded { message: String },

    /// HTTP 404 — the function endpoint does not exist on this backend
    #[error("Function '{function}' is not deployed")]
    NotDeployed { function: String },

    /// Empty or undecodable response body on a success status
    #[error("Malformed function response: {message}")]
    MalformedResponse { message: String },

    /// Everything else, with the status code when one was received
    #[error("Function call failed: {message}")]
    Failed { status: Option<u16>, message: String },
}

/// Result type for confab-link operations.
pub type Result<T> = std::result::Result<T, ConfabLinkError>;
