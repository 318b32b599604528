use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConfabLinkError, Result};

/// The resource kinds that carry live collections.
///
/// Every resource is scoped to a single parent entity: chat messages and
/// recordings to a meeting, highlights to a recording, and org structure
/// (departments, roles, members) to a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Messages,
    Highlights,
    Recordings,
    Departments,
    Roles,
    TeamMembers,
}

impl Resource {
    /// Wire name of the resource, used in REST paths and channel names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Messages => "messages",
            Self::Highlights => "highlights",
            Self::Recordings => "recordings",
            Self::Departments => "departments",
            Self::Roles => "roles",
            Self::TeamMembers => "team_members",
        }
    }

    /// The foreign-key field scoping rows of this resource to their parent.
    pub fn parent_field(&self) -> &'static str {
        match self {
            Self::Messages | Self::Recordings => "meeting_id",
            Self::Highlights => "recording_id",
            Self::Departments | Self::Roles | Self::TeamMembers => "team_id",
        }
    }

    /// The field snapshot reads are ordered by (ascending).
    pub fn order_field(&self) -> &'static str {
        match self {
            Self::Messages | Self::Recordings => "created_at",
            Self::Highlights => "start_ms",
            Self::Departments | Self::Roles => "name",
            Self::TeamMembers => "joined_at",
        }
    }

    /// Parse a wire name back into a resource kind.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "messages" => Ok(Self::Messages),
            "highlights" => Ok(Self::Highlights),
            "recordings" => Ok(Self::Recordings),
            "departments" => Ok(Self::Departments),
            "roles" => Ok(Self::Roles),
            "team_members" => Ok(Self::TeamMembers),
            other => Err(ConfabLinkError::ConfigurationError(format!(
                "Unknown resource '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A change-feed channel: one resource filtered to one parent entity.
///
/// The wire name is `<resource>:<parent-id>`, e.g. `messages:mtg_42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Resource kind delivered on this channel
    pub resource: Resource,
    /// Parent entity id the subscription is filtered by
    pub parent_id: String,
}

impl ChannelSpec {
    /// Create a channel spec for one resource under one parent.
    pub fn new(resource: Resource, parent_id: impl Into<String>) -> Self {
        Self {
            resource,
            parent_id: parent_id.into(),
        }
    }

    /// The wire channel name, `<resource>:<parent-id>`.
    pub fn name(&self) -> String {
        format!("{}:{}", self.resource.as_str(), self.parent_id)
    }

    /// Parse a wire channel name.
    pub fn parse(name: &str) -> Result<Self> {
        let (resource, parent_id) = name.split_once(':').ok_or_else(|| {
            ConfabLinkError::ConfigurationError(format!(
                "Invalid channel name '{}': expected '<resource>:<parent-id>'",
                name
            ))
        })?;
        if parent_id.is_empty() {
            return Err(ConfabLinkError::ConfigurationError(format!(
                "Invalid channel name '{}': empty parent id",
                name
            )));
        }
        Ok(Self {
            resource: Resource::parse(resource)?,
            parent_id: parent_id.to_string(),
        })
    }
}

impl fmt::Display for ChannelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource.as_str(), self.parent_id)
    }
}
