use serde::{Deserialize, Serialize};

/// Raw change-type tag as delivered on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeTypeRaw {
    Insert,
    Update,
    Delete,
}

impl ChangeTypeRaw {
    /// Wire name of the change type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}
