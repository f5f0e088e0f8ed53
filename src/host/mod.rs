// Host contracts - the narrow surface a scene graph exposes to changes
//
// Changes never own scene objects. They hold host-issued ids and receive the
// host as `&mut S` whenever they apply or revert an edit, the same way a
// command receives the application state it mutates.
//
// Capabilities are split so each change only asks for what it touches:
// - ParameterHost: addressable values (get/set by id, path <-> id)
// - TreeHost: hierarchy mutation primitives plus item (de)serialization
// - OperatorHost: computed-value bindings hanging off tree items
// - SelectionHost: the current selection set
// - GeometryHost: creation of new geometry items

use serde_json::Value;
use std::fmt::Debug;
use std::hash::Hash;

/// Result type for host operations
pub type HostResult<T> = Result<T, HostError>;

/// Errors a host reports back to a change
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Index {index} out of range for '{parent}' ({len} children)")]
    IndexOutOfRange {
        parent: String,
        index: usize,
        len: usize,
    },

    #[error("Name '{name}' already used under '{parent}'")]
    DuplicateName { parent: String, name: String },

    #[error("Invalid item data: {0}")]
    InvalidItemData(String),
}

/// Addressable, mutable values ("parameters")
pub trait ParameterHost {
    type ParamId: Clone + PartialEq + Debug + 'static;

    /// Resolve a parameter path such as `/root/obj.Param`
    fn resolve_parameter(&self, path: &str) -> Option<Self::ParamId>;

    /// Stable addressable path of a parameter
    fn parameter_path(&self, param: &Self::ParamId) -> Option<String>;

    /// Display name of a parameter (used for change descriptions)
    fn parameter_name(&self, param: &Self::ParamId) -> Option<String>;

    fn parameter_value(&self, param: &Self::ParamId) -> HostResult<Value>;

    fn set_parameter_value(&mut self, param: &Self::ParamId, value: Value) -> HostResult<()>;
}

/// Hierarchical item tree
pub trait TreeHost {
    type NodeId: Copy + Eq + Hash + Debug + 'static;

    fn resolve_item(&self, path: &str) -> Option<Self::NodeId>;

    fn item_path(&self, item: Self::NodeId) -> Option<String>;

    fn item_name(&self, item: Self::NodeId) -> Option<String>;

    fn parent_of(&self, item: Self::NodeId) -> Option<Self::NodeId>;

    fn child_index(&self, parent: Self::NodeId, child: Self::NodeId) -> Option<usize>;

    fn child_count(&self, parent: Self::NodeId) -> usize;

    /// Insert `child` under `parent` at `index` (`index == child_count` appends)
    fn insert_child(
        &mut self,
        parent: Self::NodeId,
        child: Self::NodeId,
        index: usize,
    ) -> HostResult<()>;

    /// Detach and return the child at `index`. The item stays alive while retained.
    fn remove_child(&mut self, parent: Self::NodeId, index: usize) -> HostResult<Self::NodeId>;

    /// Pre-order traversal of the subtree rooted at `item`, `item` first
    fn descendants(&self, item: Self::NodeId) -> Vec<Self::NodeId>;

    /// Structural snapshot of a (possibly detached) subtree
    fn item_to_json(&self, item: Self::NodeId) -> HostResult<Value>;

    /// Build a detached subtree from a snapshot produced by `item_to_json`
    fn item_from_json(&mut self, json: &Value) -> HostResult<Self::NodeId>;

    /// Keep an item alive while detached from the tree
    fn retain(&mut self, item: Self::NodeId);

    /// Drop one hold on an item; detached items with no holds are disposed
    fn release(&mut self, item: Self::NodeId);
}

/// Computed-value bindings ("operators") attached to tree items
pub trait OperatorHost: TreeHost {
    type OperatorId: Copy + Eq + Hash + Debug + 'static;

    /// Operators reading from or writing to parameters owned by `item`
    fn bound_operators(&self, item: Self::NodeId) -> Vec<Self::OperatorId>;

    /// Operators whose outputs feed the inputs of `op`
    fn operator_dependencies(&self, op: Self::OperatorId) -> Vec<Self::OperatorId>;

    fn detach_operator(&mut self, op: Self::OperatorId) -> HostResult<()>;

    fn reattach_operator(&mut self, op: Self::OperatorId) -> HostResult<()>;
}

/// The selection set
pub trait SelectionHost: TreeHost {
    fn selection(&self) -> Vec<Self::NodeId>;

    fn set_selection(&mut self, items: &[Self::NodeId]);
}

/// Creation of geometry items with shape parameters
pub trait GeometryHost: TreeHost + ParameterHost {
    /// Create a detached geometry item of the given kind (e.g. "Line", "Circle")
    fn create_geom_item(&mut self, name: &str, kind: &str) -> HostResult<Self::NodeId>;

    fn geom_kind(&self, item: Self::NodeId) -> Option<String>;

    fn item_parameter(&self, item: Self::NodeId, name: &str) -> Option<Self::ParamId>;
}
