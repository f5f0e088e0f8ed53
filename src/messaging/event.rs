// History events - payloads emitted by the UndoRedoManager

use crate::change::ChangeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of history notification
///
/// The serialized names are the wire contract shared with UI and replication layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryEventKind {
    ChangeAdded,
    ChangeUpdated,
    ChangeUndone,
    ChangeRedone,
}

impl HistoryEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryEventKind::ChangeAdded => "changeAdded",
            HistoryEventKind::ChangeUpdated => "changeUpdated",
            HistoryEventKind::ChangeUndone => "changeUndone",
            HistoryEventKind::ChangeRedone => "changeRedone",
        }
    }
}

impl fmt::Display for HistoryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A history notification with owned payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub kind: HistoryEventKind,
    pub change_id: ChangeId,
    pub description: String,
    /// Update data for `changeUpdated`, absent otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEvent {
    pub fn new(kind: HistoryEventKind, change_id: ChangeId, description: String) -> Self {
        Self {
            kind,
            change_id,
            description,
            data: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}
