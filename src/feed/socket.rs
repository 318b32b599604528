//! Low-level WebSocket helpers for the change feed.

use crate::auth::AuthProvider;
use crate::compression;
use crate::error::{ConfabLinkError, Result};
use crate::feed::{MAX_WS_BINARY_MESSAGE_BYTES, MAX_WS_DECOMPRESSED_MESSAGE_BYTES};
use crate::models::{ClientMessage, ServerMessage, SubscriptionRequest, WsAuthCredentials};
use futures_util::{SinkExt, StreamExt};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use tokio::time::Instant as TokioInstant;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use url::Url;

/// The concrete stream type for feed connections.
pub(crate) type WebSocketStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Derive the feed WebSocket URL from the client's base URL.
pub(crate) fn resolve_ws_url(base_url: &str) -> Result<String> {
    let base = Url::parse(base_url.trim()).map_err(|e| {
        ConfabLinkError::ConfigurationError(format!("Invalid base_url '{}': {}", base_url, e))
    })?;

    validate_base_url(&base)?;

    let mut ws_url = base.clone();
    let ws_scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ConfabLinkError::ConfigurationError(format!(
                "Unsupported base_url scheme '{}'; expected http(s) or ws(s)",
                other
            )));
        },
    };

    ws_url.set_scheme(ws_scheme).map_err(|_| {
        ConfabLinkError::ConfigurationError("Failed to set WebSocket URL scheme".to_string())
    })?;
    ws_url.set_fragment(None);
    ws_url.set_query(None);
    ws_url.set_path("/v1/feed");

    Ok(ws_url.to_string())
}

fn validate_base_url(url: &Url) -> Result<()> {
    if url.host_str().is_none() {
        return Err(ConfabLinkError::ConfigurationError(
            "base_url must include a host".to_string(),
        ));
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(ConfabLinkError::ConfigurationError(
            "base_url must not include username/password credentials".to_string(),
        ));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfabLinkError::ConfigurationError(
            "base_url must not include query parameters or fragments".to_string(),
        ));
    }

    Ok(())
}

/// Attach header-based credentials to the WebSocket handshake request.
pub(crate) fn apply_ws_auth_headers(
    request: &mut tokio_tungstenite::tungstenite::http::Request<()>,
    auth: &AuthProvider,
) -> Result<()> {
    match auth {
        AuthProvider::ApiKey(key) => {
            let header_value = HeaderValue::from_str(key).map_err(|e| {
                ConfabLinkError::ConfigurationError(format!("Invalid API key for header: {}", e))
            })?;
            request.headers_mut().insert("x-api-key", header_value);
        },
        AuthProvider::JwtToken(token) => {
            let value = format!("Bearer {}", token);
            let header_value = HeaderValue::from_str(&value).map_err(|e| {
                ConfabLinkError::ConfigurationError(format!(
                    "Invalid JWT token for Authorization header: {}",
                    e
                ))
            })?;
            request.headers_mut().insert(AUTHORIZATION, header_value);
        },
        AuthProvider::BasicAuth(_, _) => {
            return Err(ConfabLinkError::AuthenticationError(
                "Feed connections require an API key or JWT token".to_string(),
            ));
        },
        AuthProvider::None => {},
    }

    Ok(())
}

fn ws_credentials(auth: &AuthProvider) -> Result<WsAuthCredentials> {
    match auth {
        AuthProvider::ApiKey(key) => Ok(WsAuthCredentials::ApiKey { key: key.clone() }),
        AuthProvider::JwtToken(token) => Ok(WsAuthCredentials::Jwt {
            token: token.clone(),
        }),
        AuthProvider::None => Ok(WsAuthCredentials::None {}),
        AuthProvider::BasicAuth(_, _) => Err(ConfabLinkError::AuthenticationError(
            "Feed connections require an API key or JWT token".to_string(),
        )),
    }
}

/// Send the in-band Authenticate message and wait for AuthSuccess.
///
/// Tolerates Ping/Pong and unrelated frames arriving during the handshake.
pub(crate) async fn send_auth_and_wait(
    ws_stream: &mut WebSocketStream,
    auth: &AuthProvider,
    auth_timeout: Duration,
) -> Result<()> {
    let auth_message = ClientMessage::Authenticate {
        credentials: ws_credentials(auth)?,
    };
    let payload = serde_json::to_string(&auth_message).map_err(|e| {
        ConfabLinkError::WebSocketError(format!("Failed to serialize auth message: {}", e))
    })?;

    ws_stream
        .send(Message::Text(payload.into()))
        .await
        .map_err(|e| {
            ConfabLinkError::WebSocketError(format!("Failed to send auth message: {}", e))
        })?;

    let deadline = TokioInstant::now() + auth_timeout;
    loop {
        let remaining = deadline.saturating_duration_since(TokioInstant::now());
        if remaining.is_zero() {
            return Err(ConfabLinkError::TimeoutError(format!(
                "Authentication timeout ({:?})",
                auth_timeout
            )));
        }

        match tokio::time::timeout(remaining, ws_stream.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(ServerMessage::AuthSuccess { user_id: _ }) => return Ok(()),
                    Ok(ServerMessage::AuthError { message }) => {
                        return Err(ConfabLinkError::AuthenticationError(format!(
                            "Feed authentication failed: {}",
                            message
                        )));
                    },
                    // Tolerate other messages during the handshake.
                    Ok(_) => continue,
                    Err(e) => {
                        return Err(ConfabLinkError::WebSocketError(format!(
                            "Failed to parse auth response: {}",
                            e
                        )));
                    },
                }
            },
            Ok(Some(Ok(Message::Ping(payload)))) => {
                let _ = ws_stream.send(Message::Pong(payload)).await;
            },
            Ok(Some(Ok(Message::Pong(_) | Message::Binary(_) | Message::Frame(_)))) => {
                continue;
            },
            Ok(Some(Ok(Message::Close(_)))) => {
                return Err(ConfabLinkError::WebSocketError(
                    "Connection closed during authentication".to_string(),
                ));
            },
            Ok(Some(Err(e))) => {
                return Err(ConfabLinkError::WebSocketError(format!(
                    "WebSocket error during authentication: {}",
                    e
                )));
            },
            Ok(None) => {
                return Err(ConfabLinkError::WebSocketError(
                    "Connection closed before authentication completed".to_string(),
                ));
            },
            Err(_) => {
                return Err(ConfabLinkError::TimeoutError(format!(
                    "Authentication timeout ({:?})",
                    auth_timeout
                )));
            },
        }
    }
}

/// Send a Subscribe frame.
pub(crate) async fn send_subscribe(
    ws_stream: &mut WebSocketStream,
    request: &SubscriptionRequest,
) -> Result<()> {
    let message = ClientMessage::Subscribe {
        subscription: request.clone(),
    };
    let payload = serde_json::to_string(&message).map_err(|e| {
        ConfabLinkError::WebSocketError(format!("Failed to serialize subscribe: {}", e))
    })?;
    ws_stream
        .send(Message::Text(payload.into()))
        .await
        .map_err(|e| ConfabLinkError::WebSocketError(format!("Failed to send subscribe: {}", e)))
}

/// Send an Unsubscribe frame.
pub(crate) async fn send_unsubscribe(
    ws_stream: &mut WebSocketStream,
    subscription_id: &str,
) -> Result<()> {
    let message = ClientMessage::Unsubscribe {
        subscription_id: subscription_id.to_string(),
    };
    let payload = serde_json::to_string(&message).map_err(|e| {
        ConfabLinkError::WebSocketError(format!("Failed to serialize unsubscribe: {}", e))
    })?;
    ws_stream
        .send(Message::Text(payload.into()))
        .await
        .map_err(|e| {
            ConfabLinkError::WebSocketError(format!("Failed to send unsubscribe: {}", e))
        })
}

/// Parse a text frame into a typed server message.
pub(crate) fn parse_message(text: &str) -> Result<ServerMessage> {
    serde_json::from_str::<ServerMessage>(text).map_err(|e| {
        ConfabLinkError::WebSocketError(format!("Failed to parse server message: {}", e))
    })
}

/// Spread keepalive pings across connections to avoid synchronized bursts.
///
/// Deterministic jitter derived from `key` so a reconnecting client keeps
/// its phase.
pub(crate) fn jitter_keepalive_interval(base: Duration, key: &str) -> Duration {
    if base.is_zero() {
        return base;
    }

    let base_ms = base.as_millis() as u64;
    if base_ms <= 1 {
        return base;
    }

    // +/-20% jitter window.
    let jitter_span = (base_ms / 5).max(1);
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    let hashed = hasher.finish();

    let offset = (hashed % (2 * jitter_span + 1)) as i64 - jitter_span as i64;
    let jittered_ms = if offset >= 0 {
        base_ms.saturating_add(offset as u64)
    } else {
        base_ms.saturating_sub((-offset) as u64).max(1)
    };

    Duration::from_millis(jittered_ms)
}

/// Decode a binary (gzip-compressed) WebSocket payload into a UTF-8 string.
pub(crate) fn decode_ws_payload(data: &[u8]) -> Result<String> {
    if data.len() > MAX_WS_BINARY_MESSAGE_BYTES {
        return Err(ConfabLinkError::WebSocketError(format!(
            "Binary WebSocket message too large ({} bytes > {} bytes)",
            data.len(),
            MAX_WS_BINARY_MESSAGE_BYTES
        )));
    }

    let decompressed =
        compression::decompress_gzip(data, MAX_WS_DECOMPRESSED_MESSAGE_BYTES).map_err(|e| {
            ConfabLinkError::WebSocketError(format!("Failed to decompress message: {}", e))
        })?;
    String::from_utf8(decompressed).map_err(|e| {
        ConfabLinkError::WebSocketError(format!("Invalid UTF-8 in decompressed message: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url_conversion() {
        assert_eq!(
            resolve_ws_url("http://localhost:3000").unwrap(),
            "ws://localhost:3000/v1/feed"
        );
        assert_eq!(
            resolve_ws_url("https://api.confab.dev").unwrap(),
            "wss://api.confab.dev/v1/feed"
        );
    }

    #[test]
    fn test_ws_url_trailing_slash_stripped() {
        assert_eq!(
            resolve_ws_url("http://localhost:3000/").unwrap(),
            "ws://localhost:3000/v1/feed"
        );
    }

    #[test]
    fn test_ws_url_rejects_query_and_fragment() {
        assert!(resolve_ws_url("http://localhost:3000?x=1").is_err());
        assert!(resolve_ws_url("http://localhost:3000#frag").is_err());
    }

    #[test]
    fn test_ws_url_rejects_userinfo() {
        assert!(resolve_ws_url("http://user:pw@localhost:3000").is_err());
    }

    #[test]
    fn test_ws_url_rejects_unsupported_scheme() {
        assert!(resolve_ws_url("ftp://localhost:3000").is_err());
    }

    #[test]
    fn test_keepalive_jitter_is_deterministic() {
        let base = Duration::from_secs(10);
        let a = jitter_keepalive_interval(base, "sub_1");
        let b = jitter_keepalive_interval(base, "sub_1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_keepalive_jitter_stays_within_bounds() {
        let base = Duration::from_secs(10);
        for key in ["a", "b", "c", "d", "e", "sub_123456"] {
            let jittered = jitter_keepalive_interval(base, key);
            assert!(jittered >= Duration::from_secs(8), "jitter too low: {:?}", jittered);
            assert!(jittered <= Duration::from_secs(12), "jitter too high: {:?}", jittered);
        }
    }

    #[test]
    fn test_zero_keepalive_is_untouched() {
        assert!(jitter_keepalive_interval(Duration::ZERO, "x").is_zero());
    }

    #[test]
    fn test_basic_auth_has_no_ws_credentials() {
        assert!(ws_credentials(&AuthProvider::BasicAuth("u".into(), "p".into())).is_err());
        assert!(ws_credentials(&AuthProvider::ApiKey("k".into())).is_ok());
    }
}
