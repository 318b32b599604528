//! Data models for the confab-link client library.
//!
//! Defines the typed row variants, change-feed wire protocol, and
//! edge-function request/response structures.

pub mod change_event;
pub mod change_type_raw;
pub mod client_message;
pub mod connection_options;
pub mod functions;
pub mod health_check_response;
pub mod resource;
pub mod row;
pub mod server_message;
pub mod subscription;

#[cfg(test)]
mod tests;

pub use change_event::ChangeEvent;
pub use change_type_raw::ChangeTypeRaw;
pub use client_message::{ClientMessage, WsAuthCredentials};
pub use connection_options::ConnectionOptions;
pub use functions::{Summary, SummaryRequest, TranslateRequest, Translation};
pub use health_check_response::HealthCheckResponse;
pub use resource::{ChannelSpec, Resource};
pub use row::{
    DepartmentRow, HighlightRow, MessageRow, RecordingRow, RoleRow, Row, TeamMemberRow,
};
pub use server_message::ServerMessage;
pub use subscription::{SubscriptionInfo, SubscriptionOptions, SubscriptionRequest};
