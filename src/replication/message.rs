// ReplicationMessage - wire format for mirroring history between peers

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One history transition, as sent to remote peers
///
/// Serialized with a `type` tag, e.g.
/// `{"type":"changeAdded","change":{"name":"ParameterValueChange",...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReplicationMessage {
    /// A change was added; `change` is its registry envelope `{name, ...}`
    ChangeAdded { change: Value },
    /// The current change received a live update
    ChangeUpdated { data: Value },
    Undo,
    Redo,
    /// The in-progress change was aborted
    Cancel,
}

impl ReplicationMessage {
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json_str(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChangeAdded { .. } => "changeAdded",
            Self::ChangeUpdated { .. } => "changeUpdated",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Cancel => "cancel",
        }
    }
}
