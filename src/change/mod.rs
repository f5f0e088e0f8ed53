// Change stack for undo/redo and collaborative replication
//
// Every undoable edit in the application goes through this module.
//
// Architecture:
// - Change trait: undo(), redo(), update(), to_json()/from_json(), destroy()
// - UndoRedoManager: undo/redo stacks plus the "current" change slot
// - ChangeRegistry: name -> factory, so serialized changes can be rebuilt
// - Concrete changes in `variants`: parameter values, selection, tree edits,
//   held objects, geometry creation
//
// Changes are generic over the host state `S` (the scene graph). They only
// ever touch it through the capability traits in `crate::host`.

pub mod config;
pub mod instance;
pub mod manager;
pub mod registry;
pub mod trait_def;
pub mod variants;

pub use config::{ConfigError, HistoryConfig};
pub use instance::{ManagerHandle, SharedManager};
pub use manager::UndoRedoManager;
pub use registry::{ChangeFactory, ChangeRegistry, RegistryError};
pub use trait_def::{Change, ChangeError, ChangeId, ChangeResult};
