//! Shared WebSocket connection for the change feed.
//!
//! One connection per client, multiplexed across channel subscriptions:
//!
//! - Message routing to the owning subscription by `subscription_id`
//! - Row validation against the subscription's resource schema
//! - Automatic reconnection with exponential backoff
//! - Re-subscription of all active channels after reconnect
//! - Connection lifecycle events (`on_connect`, `on_disconnect`, `on_error`)
//! - Keepalive pings with pong-timeout dead-connection detection

use crate::auth::{require_feed_credentials, ResolvedAuth};
use crate::error::{ConfabLinkError, Result};
use crate::event_handlers::{ConnectionError, DisconnectReason, EventHandlers};
use crate::feed::socket::{
    apply_ws_auth_headers, decode_ws_payload, jitter_keepalive_interval, parse_message,
    resolve_ws_url, send_auth_and_wait, send_subscribe, send_unsubscribe, WebSocketStream,
};
use crate::feed::{DEFAULT_EVENT_CHANNEL_CAPACITY, FAR_FUTURE, MAX_WS_TEXT_MESSAGE_BYTES};
use crate::models::{
    ChangeEvent, ChangeTypeRaw, ChannelSpec, ConnectionOptions, Row, ServerMessage,
    SubscriptionInfo, SubscriptionOptions, SubscriptionRequest,
};
use crate::timeouts::ConfabLinkTimeouts;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant as TokioInstant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{client::IntoClientRequest, protocol::Message};

/// Connection state of the shared feed socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    /// Initial connection attempt in progress
    Connecting,
    /// Connected and authenticated
    Connected,
    /// Connection lost; no reconnect in progress (disabled or exhausted)
    Disconnected,
    /// Connection lost; waiting out backoff before the next attempt
    Reconnecting,
    /// Shut down by the client; terminal
    Closed,
}

/// Current time in millis since Unix epoch.
#[inline]
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn set_state(state: &Arc<RwLock<FeedState>>, new: FeedState) {
    if let Ok(mut guard) = state.write() {
        *guard = new;
    }
}

/// Build a `Vec<SubscriptionInfo>` snapshot from the internal subs map.
fn snapshot_subscriptions(subs: &HashMap<String, SubEntry>) -> Vec<SubscriptionInfo> {
    subs.iter()
        .map(|(id, entry)| SubscriptionInfo {
            id: id.clone(),
            channel: entry.channel.name(),
            created_at_ms: entry.created_at_ms,
            last_event_time_ms: entry.last_event_time_ms,
        })
        .collect()
}

// ── Commands ────────────────────────────────────────────────────────────────

/// Commands sent from the public API to the background connection task.
enum ConnCmd {
    Subscribe {
        id: String,
        channel: ChannelSpec,
        options: SubscriptionOptions,
        event_tx: mpsc::Sender<Result<ChangeEvent>>,
        result_tx: oneshot::Sender<Result<u64>>,
    },
    Unsubscribe {
        id: String,
        generation: Option<u64>,
    },
    ListSubscriptions {
        result_tx: oneshot::Sender<Vec<SubscriptionInfo>>,
    },
    Shutdown,
}

// ── Per-subscription state ──────────────────────────────────────────────────

struct SubEntry {
    channel: ChannelSpec,
    options: SubscriptionOptions,
    event_tx: mpsc::Sender<Result<ChangeEvent>>,
    generation: u64,
    created_at_ms: u64,
    last_event_time_ms: Option<u64>,
}

// ── FeedConnection (public handle) ──────────────────────────────────────────

#[derive(Debug)]
pub(crate) struct FeedConnection {
    cmd_tx: mpsc::Sender<ConnCmd>,
    unsub_tx: mpsc::Sender<(String, u64)>,
    state: Arc<RwLock<FeedState>>,
    _task: JoinHandle<()>,
    _unsub_bridge: JoinHandle<()>,
}

impl FeedConnection {
    pub async fn connect(
        base_url: String,
        auth: ResolvedAuth,
        timeouts: ConfabLinkTimeouts,
        connection_options: ConnectionOptions,
        event_handlers: EventHandlers,
    ) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<ConnCmd>(256);
        let state = Arc::new(RwLock::new(FeedState::Connecting));

        let state_clone = state.clone();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();

        let task = tokio::spawn(async move {
            connection_task(
                cmd_rx,
                base_url,
                auth,
                timeouts,
                connection_options,
                event_handlers,
                state_clone,
                Some(ready_tx),
            )
            .await;
        });

        match ready_rx.await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => {
                log::warn!("[confab-link] Initial feed connection failed: {}", e);
            },
            Err(_) => {
                log::warn!("[confab-link] Feed task exited before signalling readiness");
            },
        }

        let (unsub_tx, mut unsub_rx) = mpsc::channel::<(String, u64)>(256);
        let cmd_tx_bridge = cmd_tx.clone();
        let unsub_bridge = tokio::spawn(async move {
            while let Some((id, generation)) = unsub_rx.recv().await {
                let _ = cmd_tx_bridge
                    .send(ConnCmd::Unsubscribe {
                        id,
                        generation: Some(generation),
                    })
                    .await;
            }
        });

        Ok(Self {
            cmd_tx,
            unsub_tx,
            state,
            _task: task,
            _unsub_bridge: unsub_bridge,
        })
    }

    pub async fn subscribe(
        &self,
        id: String,
        channel: ChannelSpec,
        options: SubscriptionOptions,
    ) -> Result<(mpsc::Receiver<Result<ChangeEvent>>, u64)> {
        let (event_tx, event_rx) = mpsc::channel(DEFAULT_EVENT_CHANNEL_CAPACITY);
        let (result_tx, result_rx) = oneshot::channel();

        self.cmd_tx
            .send(ConnCmd::Subscribe {
                id: id.clone(),
                channel,
                options,
                event_tx,
                result_tx,
            })
            .await
            .map_err(|_| {
                ConfabLinkError::WebSocketError("Feed connection task is not running".to_string())
            })?;

        let generation = result_rx.await.map_err(|_| {
            ConfabLinkError::WebSocketError(
                "Feed connection task died before confirming subscribe".to_string(),
            )
        })??;

        Ok((event_rx, generation))
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(ConnCmd::Shutdown).await;
    }

    pub async fn list_subscriptions(&self) -> Vec<SubscriptionInfo> {
        let (result_tx, result_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(ConnCmd::ListSubscriptions { result_tx })
            .await
            .is_err()
        {
            return Vec::new();
        }
        result_rx.await.unwrap_or_default()
    }

    pub fn state(&self) -> FeedState {
        self.state.read().map(|s| *s).unwrap_or(FeedState::Closed)
    }

    pub(crate) fn unsubscribe_tx(&self) -> mpsc::Sender<(String, u64)> {
        self.unsub_tx.clone()
    }
}

impl Drop for FeedConnection {
    fn drop(&mut self) {
        let _ = self.cmd_tx.try_send(ConnCmd::Shutdown);
    }
}

// ── Background connection task ──────────────────────────────────────────────

async fn establish_ws(
    base_url: &str,
    auth: &ResolvedAuth,
    timeouts: &ConfabLinkTimeouts,
    event_handlers: &EventHandlers,
) -> Result<WebSocketStream> {
    log::debug!("[confab-link] Establishing feed connection to {}", base_url);
    let credentials = auth.resolve().await?;
    require_feed_credentials(&credentials)?;

    let request_url = resolve_ws_url(base_url)?;

    let mut request = request_url.into_client_request().map_err(|e| {
        ConfabLinkError::WebSocketError(format!("Failed to build WebSocket request: {}", e))
    })?;

    apply_ws_auth_headers(&mut request, &credentials)?;

    let connect_result = if !ConfabLinkTimeouts::is_no_timeout(timeouts.connection_timeout) {
        tokio::time::timeout(timeouts.connection_timeout, connect_async(request)).await
    } else {
        Ok(connect_async(request).await)
    };

    let mut ws_stream = match connect_result {
        Ok(Ok((stream, _))) => stream,
        Ok(Err(tokio_tungstenite::tungstenite::error::Error::Http(response))) => {
            let status = response.status();
            let body_text = response
                .into_body()
                .as_ref()
                .and_then(|b| {
                    if b.is_empty() {
                        None
                    } else {
                        Some(String::from_utf8_lossy(b).into_owned())
                    }
                })
                .unwrap_or_default();
            let message = match status.as_u16() {
                401 => "Unauthorized: feed requires valid credentials".to_string(),
                403 => "Forbidden: access to feed denied".to_string(),
                code => {
                    if body_text.is_empty() {
                        format!("Feed HTTP error: {}", code)
                    } else {
                        format!("Feed HTTP error {}: {}", code, body_text)
                    }
                },
            };
            event_handlers.emit_error(ConnectionError::new(&message, false));
            return Err(ConfabLinkError::WebSocketError(message));
        },
        Ok(Err(e)) => {
            let msg = format!("Connection failed: {}", e);
            event_handlers.emit_error(ConnectionError::new(&msg, true));
            return Err(ConfabLinkError::WebSocketError(msg));
        },
        Err(_) => {
            let msg = format!("Connection timeout ({:?})", timeouts.connection_timeout);
            event_handlers.emit_error(ConnectionError::new(&msg, true));
            return Err(ConfabLinkError::TimeoutError(msg));
        },
    };

    send_auth_and_wait(&mut ws_stream, &credentials, timeouts.auth_timeout).await?;
    log::info!("[confab-link] Feed connection authenticated");

    Ok(ws_stream)
}

/// Validate a raw change payload into a typed event for one subscription.
fn typed_change_event(
    subscription_id: &str,
    entry: &SubEntry,
    change_type: ChangeTypeRaw,
    row: Option<serde_json::Value>,
    old_row: Option<serde_json::Value>,
) -> Result<ChangeEvent> {
    let resource = entry.channel.resource;
    let missing = |what: &str| ConfabLinkError::InvalidPayload {
        resource: resource.as_str().to_string(),
        message: format!("{} event without {}", change_type.as_str(), what),
    };

    match change_type {
        ChangeTypeRaw::Insert => {
            let row = Row::from_value(resource, row.ok_or_else(|| missing("row"))?)?;
            Ok(ChangeEvent::Insert {
                subscription_id: subscription_id.to_string(),
                row,
            })
        },
        ChangeTypeRaw::Update => {
            let row = Row::from_value(resource, row.ok_or_else(|| missing("row"))?)?;
            // A malformed old_row degrades to None rather than dropping the
            // whole event; the current values are what consumers reconcile.
            let old_row = old_row.and_then(|value| match Row::from_value(resource, value) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    log::warn!("[confab-link] Dropping malformed old_row on update: {}", e);
                    None
                },
            });
            Ok(ChangeEvent::Update {
                subscription_id: subscription_id.to_string(),
                row,
                old_row,
            })
        },
        ChangeTypeRaw::Delete => {
            let old_row = Row::from_value(resource, old_row.ok_or_else(|| missing("old_row"))?)?;
            Ok(ChangeEvent::Delete {
                subscription_id: subscription_id.to_string(),
                old_row,
            })
        },
    }
}

/// Route one parsed server message to its owning subscription.
async fn route_message(msg: ServerMessage, subs: &mut HashMap<String, SubEntry>) {
    let (sub_id, event) = match msg {
        ServerMessage::AuthSuccess { .. } | ServerMessage::AuthError { .. } => return,
        ServerMessage::SubscriptionAck {
            subscription_id,
            channel,
        } => {
            let event = ChangeEvent::Ack {
                subscription_id: subscription_id.clone(),
                channel,
            };
            (subscription_id, Ok(event))
        },
        ServerMessage::Change {
            subscription_id,
            change_type,
            row,
            old_row,
        } => match subs.get(&subscription_id) {
            Some(entry) => {
                let event = typed_change_event(&subscription_id, entry, change_type, row, old_row);
                if let Err(e) = &event {
                    log::warn!(
                        "[confab-link] Invalid change payload on '{}': {}",
                        subscription_id,
                        e
                    );
                }
                (subscription_id, event)
            },
            None => {
                log::debug!("No subscription found for id: {}", subscription_id);
                return;
            },
        },
        ServerMessage::Error {
            subscription_id,
            code,
            message,
        } => {
            let event = ChangeEvent::Error {
                subscription_id: subscription_id.clone(),
                code,
                message,
            };
            (subscription_id, Ok(event))
        },
    };

    if let Some(entry) = subs.get_mut(&sub_id) {
        entry.last_event_time_ms = Some(now_ms());
        if entry.event_tx.send(event).await.is_err() {
            log::debug!("Subscription {} receiver dropped", sub_id);
        }
    } else {
        log::debug!("No subscription found for id: {}", sub_id);
    }
}

async fn resubscribe_all(
    ws: &mut WebSocketStream,
    subs: &HashMap<String, SubEntry>,
    event_handlers: &EventHandlers,
) {
    log::info!(
        "[confab-link] Re-subscribing {} active channel(s) after reconnect",
        subs.len()
    );
    for (id, entry) in subs.iter() {
        let request = SubscriptionRequest {
            id: id.clone(),
            channel: entry.channel.name(),
            options: entry.options.clone(),
        };
        if let Err(e) = send_subscribe(ws, &request).await {
            log::warn!("Failed to re-subscribe {}: {}", id, e);
            event_handlers.emit_error(ConnectionError::new(
                format!("Failed to re-subscribe {}: {}", id, e),
                true,
            ));
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn connection_task(
    mut cmd_rx: mpsc::Receiver<ConnCmd>,
    base_url: String,
    auth: ResolvedAuth,
    timeouts: ConfabLinkTimeouts,
    connection_options: ConnectionOptions,
    event_handlers: EventHandlers,
    state: Arc<RwLock<FeedState>>,
    ready_tx: Option<oneshot::Sender<Result<()>>>,
) {
    let mut subs: HashMap<String, SubEntry> = HashMap::new();
    let mut ws_stream: Option<WebSocketStream> = None;
    let mut shutdown_requested = false;
    let mut next_generation: u64 = 1;
    let mut reconnect_attempts: u32 = 0;

    let keepalive_dur = if timeouts.keepalive_interval.is_zero() {
        FAR_FUTURE
    } else {
        jitter_keepalive_interval(timeouts.keepalive_interval, &base_url)
    };
    let has_keepalive = !timeouts.keepalive_interval.is_zero();
    let mut idle_deadline = TokioInstant::now() + keepalive_dur;

    let pong_timeout_dur = timeouts.pong_timeout;
    let has_pong_timeout = has_keepalive && !pong_timeout_dur.is_zero();
    let mut awaiting_pong = false;
    let mut pong_deadline = TokioInstant::now() + FAR_FUTURE;

    match establish_ws(&base_url, &auth, &timeouts, &event_handlers).await {
        Ok(stream) => {
            ws_stream = Some(stream);
            set_state(&state, FeedState::Connected);
            event_handlers.emit_connect();
            idle_deadline = TokioInstant::now() + keepalive_dur;
            if let Some(tx) = ready_tx {
                let _ = tx.send(Ok(()));
            }
        },
        Err(e) => {
            log::warn!(
                "Initial feed connection failed (will retry on schedule): {}",
                e
            );
            set_state(&state, FeedState::Disconnected);
            if let Some(tx) = ready_tx {
                let _ = tx.send(Err(e));
            }
        },
    }

    loop {
        if shutdown_requested {
            if let Some(ref mut ws) = ws_stream {
                for id in subs.keys() {
                    let _ = send_unsubscribe(ws, id).await;
                }
                let _ = ws.close(None).await;
            }
            let was_connected = matches!(
                state.read().map(|s| *s),
                Ok(FeedState::Connected)
            );
            set_state(&state, FeedState::Closed);
            if was_connected {
                event_handlers.emit_disconnect(DisconnectReason::new("Client disconnected"));
            }
            return;
        }

        if let Some(ref mut ws) = ws_stream {
            let idle_sleep = tokio::time::sleep_until(idle_deadline);
            tokio::pin!(idle_sleep);

            let pong_sleep = tokio::time::sleep_until(pong_deadline);
            tokio::pin!(pong_sleep);

            tokio::select! {
                biased;

                _ = &mut pong_sleep, if has_pong_timeout && awaiting_pong => {
                    log::warn!(
                        "[confab-link] Pong timeout ({:?}), treating feed connection as dead",
                        pong_timeout_dur,
                    );
                    event_handlers.emit_disconnect(DisconnectReason::new(format!(
                        "Pong timeout ({:?}), server unresponsive",
                        pong_timeout_dur,
                    )));
                    set_state(&state, FeedState::Disconnected);
                    awaiting_pong = false;
                    ws_stream = None;
                    continue;
                }

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(ConnCmd::Subscribe { id, channel, options, event_tx, result_tx }) => {
                            if subs.contains_key(&id) {
                                log::debug!(
                                    "[confab-link] Replacing existing subscription '{}'",
                                    id,
                                );
                                let _ = send_unsubscribe(ws, &id).await;
                                subs.remove(&id);
                            }
                            let request = SubscriptionRequest {
                                id: id.clone(),
                                channel: channel.name(),
                                options: options.clone(),
                            };
                            let result = send_subscribe(ws, &request).await;
                            let gen = next_generation;
                            if result.is_ok() {
                                next_generation += 1;
                                subs.insert(id.clone(), SubEntry {
                                    channel,
                                    options,
                                    event_tx,
                                    generation: gen,
                                    created_at_ms: now_ms(),
                                    last_event_time_ms: None,
                                });
                            }
                            let _ = result_tx.send(result.map(|()| gen));
                        },
                        Some(ConnCmd::Unsubscribe { id, generation }) => {
                            let should_remove = match generation {
                                Some(gen) => subs.get(&id).is_some_and(|e| e.generation == gen),
                                None => true,
                            };
                            if should_remove {
                                subs.remove(&id);
                                let _ = send_unsubscribe(ws, &id).await;
                            } else {
                                log::debug!(
                                    "[confab-link] Ignoring stale unsubscribe for '{}' (gen={:?})",
                                    id, generation,
                                );
                            }
                        },
                        Some(ConnCmd::ListSubscriptions { result_tx }) => {
                            let _ = result_tx.send(snapshot_subscriptions(&subs));
                        },
                        Some(ConnCmd::Shutdown) | None => {
                            shutdown_requested = true;
                            continue;
                        },
                    }
                }

                _ = &mut idle_sleep, if has_keepalive && !awaiting_pong => {
                    if let Err(e) = ws.send(Message::Ping(Bytes::new())).await {
                        log::warn!("Keepalive ping failed: {}", e);
                        event_handlers.emit_disconnect(DisconnectReason::new(format!(
                            "Keepalive ping failed: {}", e
                        )));
                        set_state(&state, FeedState::Disconnected);
                        awaiting_pong = false;
                        ws_stream = None;
                        continue;
                    }
                    if has_pong_timeout {
                        awaiting_pong = true;
                        pong_deadline = TokioInstant::now() + pong_timeout_dur;
                    }
                    idle_deadline = TokioInstant::now() + keepalive_dur;
                }

                frame = ws.next() => {
                    idle_deadline = TokioInstant::now() + keepalive_dur;
                    if awaiting_pong {
                        awaiting_pong = false;
                        pong_deadline = TokioInstant::now() + FAR_FUTURE;
                    }

                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            if text.len() > MAX_WS_TEXT_MESSAGE_BYTES {
                                log::warn!("Text message too large ({} bytes)", text.len());
                                continue;
                            }
                            event_handlers.emit_receive(&text);
                            match parse_message(&text) {
                                Ok(msg) => route_message(msg, &mut subs).await,
                                Err(e) => log::warn!("Failed to parse feed message: {}", e),
                            }
                        },
                        Some(Ok(Message::Binary(data))) => {
                            match decode_ws_payload(&data) {
                                Ok(text) => {
                                    event_handlers.emit_receive(&text);
                                    match parse_message(&text) {
                                        Ok(msg) => route_message(msg, &mut subs).await,
                                        Err(e) => log::warn!(
                                            "Failed to parse decompressed feed message: {}", e
                                        ),
                                    }
                                },
                                Err(e) => {
                                    event_handlers.emit_error(
                                        ConnectionError::new(e.to_string(), false)
                                    );
                                },
                            }
                        },
                        Some(Ok(Message::Close(frame))) => {
                            let reason = if let Some(f) = frame {
                                DisconnectReason::with_code(f.reason.to_string(), f.code.into())
                            } else {
                                DisconnectReason::new("Server closed connection")
                            };
                            event_handlers.emit_disconnect(reason);
                            set_state(&state, FeedState::Disconnected);
                            ws_stream = None;
                            continue;
                        },
                        Some(Ok(Message::Ping(payload))) => {
                            let _ = ws.send(Message::Pong(payload)).await;
                        },
                        Some(Ok(Message::Pong(_))) => {},
                        Some(Ok(Message::Frame(_))) => {},
                        Some(Err(e)) => {
                            let msg = e.to_string();
                            event_handlers.emit_error(ConnectionError::new(&msg, true));
                            event_handlers.emit_disconnect(DisconnectReason::new(format!(
                                "WebSocket error: {}", msg
                            )));
                            set_state(&state, FeedState::Disconnected);
                            ws_stream = None;
                            continue;
                        },
                        None => {
                            event_handlers.emit_disconnect(
                                DisconnectReason::new("WebSocket stream ended")
                            );
                            set_state(&state, FeedState::Disconnected);
                            ws_stream = None;
                            continue;
                        },
                    }
                }
            }
        } else {
            // ── Not connected: reconnect or wait ────────────────────────
            if !connection_options.auto_reconnect || shutdown_requested {
                set_state(&state, FeedState::Disconnected);
                match cmd_rx.recv().await {
                    Some(ConnCmd::Subscribe { result_tx, .. }) => {
                        let _ = result_tx.send(Err(ConfabLinkError::WebSocketError(
                            "Not connected and auto-reconnect is disabled".to_string(),
                        )));
                    },
                    Some(ConnCmd::Unsubscribe { id, generation }) => {
                        let should_remove = match generation {
                            Some(gen) => subs.get(&id).is_some_and(|e| e.generation == gen),
                            None => true,
                        };
                        if should_remove {
                            subs.remove(&id);
                        }
                    },
                    Some(ConnCmd::ListSubscriptions { result_tx }) => {
                        let _ = result_tx.send(snapshot_subscriptions(&subs));
                    },
                    Some(ConnCmd::Shutdown) | None => return,
                }
                continue;
            }

            let attempt = reconnect_attempts;
            reconnect_attempts += 1;
            if let Some(max) = connection_options.max_reconnect_attempts {
                if attempt >= max {
                    log::warn!("Max reconnection attempts ({}) reached", max);
                    event_handlers.emit_error(ConnectionError::new(
                        format!("Max reconnection attempts ({}) reached", max),
                        false,
                    ));
                    set_state(&state, FeedState::Disconnected);
                    let err_msg = "Max reconnection attempts reached".to_string();
                    for (_id, entry) in subs.drain() {
                        let _ = entry
                            .event_tx
                            .try_send(Err(ConfabLinkError::WebSocketError(err_msg.clone())));
                    }
                    loop {
                        match cmd_rx.recv().await {
                            Some(ConnCmd::Subscribe { result_tx, .. }) => {
                                let _ = result_tx.send(Err(ConfabLinkError::WebSocketError(
                                    "Max reconnection attempts reached".to_string(),
                                )));
                            },
                            Some(ConnCmd::Unsubscribe { id, .. }) => {
                                subs.remove(&id);
                            },
                            Some(ConnCmd::ListSubscriptions { result_tx }) => {
                                let _ = result_tx.send(snapshot_subscriptions(&subs));
                            },
                            Some(ConnCmd::Shutdown) | None => {
                                set_state(&state, FeedState::Closed);
                                return;
                            },
                        }
                    }
                }
            }

            set_state(&state, FeedState::Reconnecting);
            let delay = connection_options.backoff_delay(attempt);
            log::info!(
                "Attempting feed reconnection in {:?} (attempt {})",
                delay,
                attempt + 1
            );

            let sleep_fut = tokio::time::sleep(delay);
            tokio::pin!(sleep_fut);

            let mut got_shutdown = false;
            loop {
                tokio::select! {
                    biased;
                    cmd = cmd_rx.recv() => {
                        match cmd {
                            Some(ConnCmd::Subscribe { id, channel, options, event_tx, result_tx }) => {
                                // Register now; the subscribe frame goes out
                                // with the post-reconnect re-subscription.
                                subs.remove(&id);
                                let gen = next_generation;
                                next_generation += 1;
                                subs.insert(id, SubEntry {
                                    channel,
                                    options,
                                    event_tx,
                                    generation: gen,
                                    created_at_ms: now_ms(),
                                    last_event_time_ms: None,
                                });
                                let _ = result_tx.send(Ok(gen));
                            },
                            Some(ConnCmd::Unsubscribe { id, generation }) => {
                                let should_remove = match generation {
                                    Some(gen) => subs.get(&id).is_some_and(|e| e.generation == gen),
                                    None => true,
                                };
                                if should_remove { subs.remove(&id); }
                            },
                            Some(ConnCmd::ListSubscriptions { result_tx }) => {
                                let _ = result_tx.send(snapshot_subscriptions(&subs));
                            },
                            Some(ConnCmd::Shutdown) | None => {
                                got_shutdown = true;
                                break;
                            },
                        }
                    }
                    _ = &mut sleep_fut => { break; }
                }
            }

            if got_shutdown {
                shutdown_requested = true;
                continue;
            }

            match establish_ws(&base_url, &auth, &timeouts, &event_handlers).await {
                Ok(mut stream) => {
                    log::info!("Feed reconnection successful");
                    reconnect_attempts = 0;
                    set_state(&state, FeedState::Connected);
                    event_handlers.emit_connect();
                    resubscribe_all(&mut stream, &subs, &event_handlers).await;
                    ws_stream = Some(stream);
                    idle_deadline = TokioInstant::now() + keepalive_dur;
                    awaiting_pong = false;
                    pong_deadline = TokioInstant::now() + FAR_FUTURE;
                },
                Err(e) => {
                    log::warn!("Feed reconnection attempt {} failed: {}", attempt + 1, e);
                    set_state(&state, FeedState::Disconnected);
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Resource;
    use serde_json::json;

    fn test_entry(resource: Resource) -> (SubEntry, mpsc::Receiver<Result<ChangeEvent>>) {
        let (event_tx, event_rx) = mpsc::channel(16);
        (
            SubEntry {
                channel: ChannelSpec::new(resource, "mtg_1"),
                options: SubscriptionOptions::default(),
                event_tx,
                generation: 1,
                created_at_ms: 0,
                last_event_time_ms: None,
            },
            event_rx,
        )
    }

    fn message_value(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "meeting_id": "mtg_1",
            "user_id": "u1",
            "content": "hi",
            "created_at": "2026-08-01T10:00:00Z"
        })
    }

    #[test]
    fn test_insert_payload_is_validated() {
        let (entry, _rx) = test_entry(Resource::Messages);
        let event =
            typed_change_event("s1", &entry, ChangeTypeRaw::Insert, Some(message_value("m1")), None)
                .unwrap();
        match event {
            ChangeEvent::Insert { row, .. } => assert_eq!(row.id(), "m1"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_insert_without_row_is_invalid() {
        let (entry, _rx) = test_entry(Resource::Messages);
        let err = typed_change_event("s1", &entry, ChangeTypeRaw::Insert, None, None).unwrap_err();
        assert!(matches!(err, ConfabLinkError::InvalidPayload { .. }));
    }

    #[test]
    fn test_malformed_row_is_rejected() {
        let (entry, _rx) = test_entry(Resource::Messages);
        let err = typed_change_event(
            "s1",
            &entry,
            ChangeTypeRaw::Insert,
            Some(json!({"id": "m1"})),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfabLinkError::InvalidPayload { .. }));
    }

    #[test]
    fn test_malformed_old_row_degrades_to_none() {
        let (entry, _rx) = test_entry(Resource::Messages);
        let event = typed_change_event(
            "s1",
            &entry,
            ChangeTypeRaw::Update,
            Some(message_value("m1")),
            Some(json!({"bogus": true})),
        )
        .unwrap();
        match event {
            ChangeEvent::Update { old_row, .. } => assert!(old_row.is_none()),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_delete_requires_old_row() {
        let (entry, _rx) = test_entry(Resource::Messages);
        let err = typed_change_event("s1", &entry, ChangeTypeRaw::Delete, None, None).unwrap_err();
        assert!(matches!(err, ConfabLinkError::InvalidPayload { .. }));

        let event = typed_change_event(
            "s1",
            &entry,
            ChangeTypeRaw::Delete,
            None,
            Some(message_value("m1")),
        )
        .unwrap();
        match event {
            ChangeEvent::Delete { old_row, .. } => assert_eq!(old_row.id(), "m1"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_route_message_delivers_to_owner() {
        let (entry, mut rx) = test_entry(Resource::Messages);
        let mut subs = HashMap::new();
        subs.insert("s1".to_string(), entry);

        route_message(
            ServerMessage::Change {
                subscription_id: "s1".to_string(),
                change_type: ChangeTypeRaw::Insert,
                row: Some(message_value("m1")),
                old_row: None,
            },
            &mut subs,
        )
        .await;

        let event = rx.recv().await.unwrap().unwrap();
        assert_eq!(event.subscription_id(), Some("s1"));
        assert!(subs["s1"].last_event_time_ms.is_some());
    }

    #[tokio::test]
    async fn test_route_message_for_unknown_subscription_is_dropped() {
        let (entry, mut rx) = test_entry(Resource::Messages);
        let mut subs = HashMap::new();
        subs.insert("s1".to_string(), entry);

        route_message(
            ServerMessage::Change {
                subscription_id: "ghost".to_string(),
                change_type: ChangeTypeRaw::Insert,
                row: Some(message_value("m1")),
                old_row: None,
            },
            &mut subs,
        )
        .await;

        assert!(rx.try_recv().is_err(), "no event should be delivered");
    }
}
