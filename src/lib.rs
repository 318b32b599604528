//! # confab-link
//!
//! Rust client SDK for the Confab realtime meeting backend.
//!
//! The SDK keeps in-memory collections (messages, highlights, recordings,
//! team structure) consistent with the backend's row-level change feed:
//! a snapshot read seeds a collection, a WebSocket subscription delivers
//! incremental insert/update/delete events, and the reconciler applies them
//! under idempotent-merge rules. The feed connection is shared, reconnects
//! with exponential backoff, and re-subscribes its channels automatically.
//!
//! ```rust,no_run
//! use confab_link::{ConfabLinkClient, Resource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ConfabLinkClient::builder()
//!     .base_url("https://api.confab.dev")
//!     .auth(confab_link::AuthProvider::api_key("cfb_live_...".into()))
//!     .build()?;
//!
//! // A live view: snapshot seed + change-feed reconciliation.
//! let mut messages = client.live_view(Resource::Messages, Some("mtg_42")).await?;
//! while let Some(update) = messages.next_change().await {
//!     match update {
//!         Ok(_) => println!("{} messages", messages.rows().len()),
//!         Err(e) => eprintln!("feed error: {}", e),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod compression;
pub mod error;
pub mod event_handlers;
pub mod feed;
pub mod functions;
pub mod models;
pub mod speech;
pub mod sync;
pub mod timeouts;

pub use auth::{AuthProvider, DynamicAuthProvider};
pub use client::{ConfabLinkClient, ConfabLinkClientBuilder};
pub use error::{ConfabLinkError, FunctionError, Result};
pub use event_handlers::{ConnectionError, DisconnectReason, EventHandlers};
pub use feed::{FeedState, Subscription};
pub use functions::{translation_failure_text, FunctionsClient};
pub use models::{
    ChangeEvent, ChangeTypeRaw, ChannelSpec, ConnectionOptions, DepartmentRow, HealthCheckResponse, HighlightRow,
    MessageRow, RecordingRow, Resource, RoleRow, Row, SubscriptionInfo, SubscriptionOptions,
    Summary, SummaryRequest, TeamMemberRow, TranslateRequest, Translation,
};
pub use speech::{
    select_voice_for_language, speak_auto, ErrorDisposition, RecognitionErrorKind,
    RecognitionSession, SpeechSynthesizer, TranscriptSegment, Utterance, UtteranceConfig, Voice,
    VoiceSession, VoiceSessionState, INTERIM_CONFIDENCE_THRESHOLD,
};
pub use sync::{Applied, DedupGuard, Keyed, LiveCollection, LiveView, OrderPolicy, RowChange, ViewEvent};
pub use timeouts::{ConfabLinkTimeouts, ConfabLinkTimeoutsBuilder};
