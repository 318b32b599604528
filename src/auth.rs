//! Authentication for the Confab client.
//!
//! Handles API keys, JWT bearer tokens, HTTP Basic Auth, and async dynamic
//! auth providers.
//!
//! ## Dynamic Auth Provider
//!
//! Use [`DynamicAuthProvider`] to supply credentials lazily — it is called
//! on every connect or reconnect. This is the right choice for:
//! - OAuth / OIDC token flows where tokens expire
//! - Credentials fetched from secure storage
//! - Automatic refresh-token rotation
//!
//! ```rust,no_run
//! use confab_link::{AuthProvider, DynamicAuthProvider};
//!
//! struct MyTokenStore { /* ... */ }
//!
//! #[async_trait::async_trait]
//! impl DynamicAuthProvider for MyTokenStore {
//!     async fn get_auth(&self) -> confab_link::Result<AuthProvider> {
//!         // fetch / refresh token here
//!         Ok(AuthProvider::jwt_token("fresh-token".into()))
//!     }
//! }
//! ```

use crate::error::{ConfabLinkError, Result};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;

/// Authentication credentials for the Confab backend.
///
/// # Examples
///
/// ```rust
/// use confab_link::AuthProvider;
///
/// // Project API key (service-to-service)
/// let auth = AuthProvider::api_key("cfb_live_...".to_string());
///
/// // JWT bearer token (end-user sessions)
/// let auth = AuthProvider::jwt_token("eyJhbGc...".to_string());
///
/// // No authentication (localhost bypass mode)
/// let auth = AuthProvider::none();
/// ```
#[derive(Debug, Clone)]
pub enum AuthProvider {
    /// Project API key, sent as the `x-api-key` header
    ApiKey(String),

    /// HTTP Basic Auth (username, password) — HTTP endpoints only
    BasicAuth(String, String),

    /// JWT bearer token
    JwtToken(String),

    /// No authentication (localhost bypass)
    None,
}

impl AuthProvider {
    /// Create API-key authentication.
    pub fn api_key(key: String) -> Self {
        Self::ApiKey(key)
    }

    /// Create HTTP Basic Auth.
    ///
    /// Encodes username:password as base64 for an `Authorization: Basic`
    /// header following RFC 7617. Only valid for HTTP endpoints; the feed
    /// requires an API key or JWT.
    pub fn basic_auth(username: String, password: String) -> Self {
        Self::BasicAuth(username, password)
    }

    /// Create JWT bearer-token authentication.
    pub fn jwt_token(token: String) -> Self {
        Self::JwtToken(token)
    }

    /// No authentication.
    pub fn none() -> Self {
        Self::None
    }

    /// Apply these credentials to an outgoing HTTP request.
    pub fn apply_to_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        match self {
            Self::ApiKey(key) => Ok(builder.header("x-api-key", key)),
            Self::BasicAuth(username, password) => {
                let encoded =
                    general_purpose::STANDARD.encode(format!("{}:{}", username, password));
                Ok(builder.header("Authorization", format!("Basic {}", encoded)))
            },
            Self::JwtToken(token) => {
                Ok(builder.header("Authorization", format!("Bearer {}", token)))
            },
            Self::None => Ok(builder),
        }
    }

    /// Returns `true` if credentials are present.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Async provider of [`AuthProvider`] credentials, consulted on every
/// connect and reconnect.
#[async_trait::async_trait]
pub trait DynamicAuthProvider: Send + Sync {
    /// Produce current credentials, refreshing them if necessary.
    async fn get_auth(&self) -> Result<AuthProvider>;
}

/// Auth as stored in the client: either static credentials or a dynamic
/// provider resolved per connection attempt.
#[derive(Clone)]
pub enum ResolvedAuth {
    /// Fixed credentials supplied at build time
    Static(AuthProvider),
    /// Provider called on every connect/reconnect
    Dynamic(Arc<dyn DynamicAuthProvider>),
}

impl ResolvedAuth {
    /// Resolve to concrete credentials.
    pub async fn resolve(&self) -> Result<AuthProvider> {
        match self {
            Self::Static(auth) => Ok(auth.clone()),
            Self::Dynamic(provider) => provider.get_auth().await,
        }
    }
}

impl std::fmt::Debug for ResolvedAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(auth) => f.debug_tuple("Static").field(auth).finish(),
            Self::Dynamic(_) => f.debug_tuple("Dynamic").field(&"<provider>").finish(),
        }
    }
}

impl From<AuthProvider> for ResolvedAuth {
    fn from(auth: AuthProvider) -> Self {
        Self::Static(auth)
    }
}

/// Reject credential kinds that cannot authenticate a feed connection.
///
/// Basic Auth is HTTP-only; the WebSocket handshake accepts API keys and
/// JWTs, and `None` is tolerated for localhost bypass deployments.
pub(crate) fn require_feed_credentials(auth: &AuthProvider) -> Result<()> {
    match auth {
        AuthProvider::BasicAuth(_, _) => Err(ConfabLinkError::AuthenticationError(
            "Feed connections require an API key or JWT token; Basic Auth is HTTP-only"
                .to_string(),
        )),
        _ => Ok(()),
    }
}
