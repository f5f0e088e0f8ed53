// SharedManager - one history per session, created on first use
//
// The composition root owns a SharedManager for the whole session and hands
// out handles to every component that records changes. Tests simply build
// their own.

use crate::change::config::HistoryConfig;
use crate::change::manager::UndoRedoManager;
use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

/// Shared handle to a session's manager
pub type ManagerHandle<S> = Rc<RefCell<UndoRedoManager<S>>>;

/// Lazily constructed, reused UndoRedoManager
pub struct SharedManager<S> {
    cell: OnceCell<ManagerHandle<S>>,
    config: HistoryConfig,
}

impl<S: 'static> SharedManager<S> {
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default())
    }

    /// The config is used when the manager is first accessed
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            cell: OnceCell::new(),
            config,
        }
    }

    /// Get the manager, constructing it on first access
    pub fn get(&self) -> ManagerHandle<S> {
        self.cell
            .get_or_init(|| {
                tracing::debug!(max_history = ?self.config.max_history, "Creating undo/redo manager");
                Rc::new(RefCell::new(UndoRedoManager::with_config(self.config.clone())))
            })
            .clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<S: 'static> Default for SharedManager<S> {
    fn default() -> Self {
        Self::new()
    }
}
