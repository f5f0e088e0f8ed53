// Scene History - undo/redo change stack for scene editing

pub mod change;
pub mod host;
pub mod messaging;
pub mod replication;
pub mod scene;

// Re-export commonly used types for convenience
pub use change::variants::{
    CreateGeomChange, HoldObjectsChange, ParameterValueChange, SelectionChange, TreeItemAddChange,
    TreeItemMoveChange, TreeItemsRemoveChange, register_standard_changes,
};
pub use change::{
    Change, ChangeError, ChangeId, ChangeRegistry, ChangeResult, HistoryConfig, SharedManager,
    UndoRedoManager,
};
pub use host::{GeometryHost, HostError, OperatorHost, ParameterHost, SelectionHost, TreeHost};
pub use messaging::{HistoryEvent, HistoryEventKind, HistoryListener};
pub use replication::{RemoteReplayer, ReplicationMessage, ReplicationOutbox};
pub use scene::{NodeId, ParamRef, SceneTree};
