// Change trait definition

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::TypeId;
use std::fmt;
use uuid::Uuid;

use crate::host::HostError;

/// Result type for change operations
pub type ChangeResult<T> = Result<T, ChangeError>;

/// Errors that can occur while applying, reverting or rebuilding a change
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChangeError {
    /// A change type does not implement an optional operation it was asked for.
    /// This is a programming error and is never swallowed by the manager.
    #[error("{change} does not implement {method}")]
    NotImplemented {
        change: String,
        method: &'static str,
    },

    /// A path in serialized data does not resolve in the host
    #[error("Unresolved path: {0}")]
    UnresolvedPath(String),

    /// Serialized data is missing a field or has the wrong shape
    #[error("Malformed change data: {0}")]
    MalformedData(String),

    /// Operation used before the change was populated
    #[error("Change not initialized: {0}")]
    Uninitialized(String),

    /// The host no longer matches what the change recorded
    #[error("Scene conflict: {0}")]
    Conflict(String),

    /// No undoable change with this id in the manager
    #[error("Unknown change: {0}")]
    UnknownChange(ChangeId),

    #[error("Registry error: {0}")]
    Registry(#[from] crate::change::registry::RegistryError),

    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

/// Identity of a change while it lives in a manager's history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeId(Uuid);

impl ChangeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ChangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single reversible edit to a host `S`
///
/// `undo` followed by `redo` must restore the exact post-edit state, and
/// `redo` followed by `undo` the exact pre-edit state.
///
/// Lifecycle: constructed (usually already applied), live while it is the
/// manager's current change and receives `update` calls, inert once stacked,
/// and finally destroyed when it leaves history for good.
///
/// # Example
/// ```
/// use scene_history::change::{Change, ChangeResult};
///
/// struct Counter(i64);
///
/// struct Increment;
///
/// impl Change<Counter> for Increment {
///     fn description(&self) -> String {
///         "Increment".to_string()
///     }
///
///     fn undo(&mut self, host: &mut Counter) -> ChangeResult<()> {
///         host.0 -= 1;
///         Ok(())
///     }
///
///     fn redo(&mut self, host: &mut Counter) -> ChangeResult<()> {
///         host.0 += 1;
///         Ok(())
///     }
/// }
/// ```
pub trait Change<S>: 'static {
    /// Human-readable label, e.g. for "Undo: Radius Changed"
    fn description(&self) -> String;

    /// Revert the effect of this change
    fn undo(&mut self, host: &mut S) -> ChangeResult<()>;

    /// Re-apply the effect of this change after an `undo`
    fn redo(&mut self, host: &mut S) -> ChangeResult<()>;

    /// Replace the live (not yet finalized) state and apply it immediately
    fn update(&mut self, _data: &Value, _host: &mut S) -> ChangeResult<()> {
        Err(ChangeError::NotImplemented {
            change: self.description(),
            method: "update",
        })
    }

    /// Structural snapshot sufficient to rebuild this change elsewhere
    fn to_json(&self, _host: &S) -> ChangeResult<Value> {
        Ok(Value::Object(Default::default()))
    }

    /// Restore internal state from `to_json` output, resolving paths through the host
    fn from_json(&mut self, _json: &Value, _host: &mut S) -> ChangeResult<()> {
        Err(ChangeError::NotImplemented {
            change: self.description(),
            method: "from_json",
        })
    }

    /// Apply a remotely originated incremental update
    fn update_from_json(&mut self, data: &Value, host: &mut S) -> ChangeResult<()> {
        self.update(data, host)
    }

    /// Release anything held on the host for this change's sake
    fn destroy(&mut self, _host: &mut S) {}

    /// Concrete type of this change, used by the registry for reverse lookup
    fn change_type_id(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}

/// Read a required field from serialized change data
pub(crate) fn field<'a>(json: &'a Value, key: &str) -> ChangeResult<&'a Value> {
    json.get(key)
        .ok_or_else(|| ChangeError::MalformedData(format!("missing field '{}'", key)))
}

/// Read a required string field from serialized change data
pub(crate) fn str_field<'a>(json: &'a Value, key: &str) -> ChangeResult<&'a str> {
    field(json, key)?
        .as_str()
        .ok_or_else(|| ChangeError::MalformedData(format!("field '{}' is not a string", key)))
}
