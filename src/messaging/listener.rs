// HistoryListener - observer interface for the UndoRedoManager

use crate::change::{Change, ChangeId};
use serde_json::Value;

/// Handle returned by `UndoRedoManager::add_listener`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Observer of history transitions
///
/// Every method has an empty default so observers only implement what they
/// care about. Callbacks run synchronously inside the manager operation that
/// triggered them, in registration order.
pub trait HistoryListener<S> {
    fn change_added(&mut self, _id: ChangeId, _change: &dyn Change<S>, _host: &S) {}

    /// Only fired for the current change
    fn change_updated(&mut self, _id: ChangeId, _change: &dyn Change<S>, _data: &Value, _host: &S) {
    }

    fn change_undone(&mut self, _id: ChangeId, _change: &dyn Change<S>, _host: &S) {}

    fn change_redone(&mut self, _id: ChangeId, _change: &dyn Change<S>, _host: &S) {}
}
