//! Typed row variants for each live resource.
//!
//! Rows cross the wire as plain JSON objects; the subscription's channel
//! determines which variant a payload must validate against. Malformed
//! payloads become [`ConfabLinkError::InvalidPayload`] at the boundary
//! instead of leaking loosely-typed values into collections.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;

use crate::error::{ConfabLinkError, Result};
use crate::models::resource::Resource;
use crate::sync::Keyed;

/// A chat message inside a meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRow {
    pub id: String,
    pub meeting_id: String,
    pub user_id: String,
    pub content: String,
    /// BCP-47 tag of the message language, when the sender's client knew it
    #[serde(default)]
    pub language: Option<String>,
    pub created_at: String,
}

/// A highlighted span of a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRow {
    pub id: String,
    pub recording_id: String,
    pub user_id: String,
    pub label: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub created_at: String,
}

/// A meeting recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingRow {
    pub id: String,
    pub meeting_id: String,
    pub title: String,
    #[serde(default)]
    pub storage_path: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    pub created_at: String,
}

/// An organizational department within a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentRow {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub created_at: String,
}

/// A role within a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRow {
    pub id: String,
    pub team_id: String,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub created_at: String,
}

/// A member of a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMemberRow {
    pub id: String,
    pub team_id: String,
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub role_id: Option<String>,
    pub joined_at: String,
}

/// A validated row, tagged by resource kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Message(MessageRow),
    Highlight(HighlightRow),
    Recording(RecordingRow),
    Department(DepartmentRow),
    Role(RoleRow),
    TeamMember(TeamMemberRow),
}

impl Row {
    /// Validate a raw JSON payload against the schema for `resource`.
    pub fn from_value(resource: Resource, value: JsonValue) -> Result<Self> {
        let invalid = |e: serde_json::Error| ConfabLinkError::InvalidPayload {
            resource: resource.as_str().to_string(),
            message: e.to_string(),
        };
        match resource {
            Resource::Messages => serde_json::from_value(value).map(Self::Message).map_err(invalid),
            Resource::Highlights => {
                serde_json::from_value(value).map(Self::Highlight).map_err(invalid)
            },
            Resource::Recordings => {
                serde_json::from_value(value).map(Self::Recording).map_err(invalid)
            },
            Resource::Departments => {
                serde_json::from_value(value).map(Self::Department).map_err(invalid)
            },
            Resource::Roles => serde_json::from_value(value).map(Self::Role).map_err(invalid),
            Resource::TeamMembers => {
                serde_json::from_value(value).map(Self::TeamMember).map_err(invalid)
            },
        }
    }

    /// Serialize back to the wire representation (no kind tag; the channel
    /// or REST path carries the resource).
    pub fn to_value(&self) -> Result<JsonValue> {
        let value = match self {
            Self::Message(r) => serde_json::to_value(r)?,
            Self::Highlight(r) => serde_json::to_value(r)?,
            Self::Recording(r) => serde_json::to_value(r)?,
            Self::Department(r) => serde_json::to_value(r)?,
            Self::Role(r) => serde_json::to_value(r)?,
            Self::TeamMember(r) => serde_json::to_value(r)?,
        };
        Ok(value)
    }

    /// The resource kind this row belongs to.
    pub fn resource(&self) -> Resource {
        match self {
            Self::Message(_) => Resource::Messages,
            Self::Highlight(_) => Resource::Highlights,
            Self::Recording(_) => Resource::Recordings,
            Self::Department(_) => Resource::Departments,
            Self::Role(_) => Resource::Roles,
            Self::TeamMember(_) => Resource::TeamMembers,
        }
    }

    /// Unique row identifier.
    pub fn id(&self) -> &str {
        match self {
            Self::Message(r) => &r.id,
            Self::Highlight(r) => &r.id,
            Self::Recording(r) => &r.id,
            Self::Department(r) => &r.id,
            Self::Role(r) => &r.id,
            Self::TeamMember(r) => &r.id,
        }
    }

    /// The parent entity this row is scoped to.
    pub fn parent_id(&self) -> &str {
        match self {
            Self::Message(r) => &r.meeting_id,
            Self::Highlight(r) => &r.recording_id,
            Self::Recording(r) => &r.meeting_id,
            Self::Department(r) => &r.team_id,
            Self::Role(r) => &r.team_id,
            Self::TeamMember(r) => &r.team_id,
        }
    }

    /// Compare two rows by their resource's designated sort field
    /// (timestamp for messages/recordings/members, offset for highlights,
    /// name for departments and roles). Used by
    /// [`OrderPolicy::ByKey`](crate::sync::OrderPolicy).
    pub fn designated_order(a: &Row, b: &Row) -> Ordering {
        match (a, b) {
            (Row::Message(x), Row::Message(y)) => x.created_at.cmp(&y.created_at),
            (Row::Highlight(x), Row::Highlight(y)) => x.start_ms.cmp(&y.start_ms),
            (Row::Recording(x), Row::Recording(y)) => x.created_at.cmp(&y.created_at),
            (Row::Department(x), Row::Department(y)) => x.name.cmp(&y.name),
            (Row::Role(x), Row::Role(y)) => x.name.cmp(&y.name),
            (Row::TeamMember(x), Row::TeamMember(y)) => x.joined_at.cmp(&y.joined_at),
            // Mixed kinds never share a collection; fall back to id order.
            _ => a.id().cmp(b.id()),
        }
    }
}

impl Keyed for Row {
    fn key(&self) -> &str {
        self.id()
    }
}
