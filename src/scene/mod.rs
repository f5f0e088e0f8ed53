// SceneTree - in-memory host for the change stack
//
// A small hierarchical scene: named items with ordered parameters, operators
// binding parameters together, and a selection set. It implements every
// capability trait in `crate::host` and serves as the reference host for
// tests, benchmarks and the demo binary.
//
// Items live in an arena and are addressed by NodeId. Detached items stay in
// the arena while something retains them; releasing the last hold on a
// detached item disposes its whole subtree.

pub mod operators;
pub mod parameters;
pub mod path;
pub mod tree;

pub use operators::{Operator, OperatorFn};
pub use path::{PARAM_SEPARATOR, PATH_SEPARATOR};

use crate::host::{HostError, HostResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind tag of plain tree items
pub const TREE_ITEM_KIND: &str = "TreeItem";

/// Kind tag of geometry items
pub const GEOM_ITEM_KIND: &str = "GeomItem";

/// Name of the root item
pub const ROOT_NAME: &str = "root";

/// Arena index of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

/// Arena index of an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperatorId(usize);

/// A parameter, addressed by owning item and parameter name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamRef {
    pub item: NodeId,
    pub name: String,
}

impl ParamRef {
    pub fn new(item: NodeId, name: impl Into<String>) -> Self {
        Self {
            item,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) name: String,
    pub(crate) kind: String,
    pub(crate) geom_kind: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) params: Vec<(String, Value)>,
    pub(crate) holds: usize,
}

impl Node {
    fn new(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            geom_kind: None,
            parent: None,
            children: Vec::new(),
            params: Vec::new(),
            holds: 0,
        }
    }
}

/// In-memory scene graph
pub struct SceneTree {
    pub(crate) nodes: Vec<Option<Node>>,
    pub(crate) root: NodeId,
    pub(crate) operators: Vec<Option<Operator>>,
    pub(crate) selection: Vec<NodeId>,
}

impl SceneTree {
    /// Create a scene containing only the root item
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::new(ROOT_NAME, TREE_ITEM_KIND))],
            root: NodeId(0),
            operators: Vec::new(),
            selection: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a detached item
    pub fn create_item(&mut self, name: &str) -> NodeId {
        self.alloc(Node::new(name, TREE_ITEM_KIND))
    }

    /// Create an item and append it under `parent`
    pub fn add_item(&mut self, parent: NodeId, name: &str) -> HostResult<NodeId> {
        let item = self.create_item(name);
        let index = self.node(parent)?.children.len();
        if let Err(err) = self.attach(parent, item, index) {
            self.nodes[item.0] = None;
            return Err(err);
        }
        Ok(item)
    }

    /// Add a parameter to an item, replacing any parameter with the same name
    pub fn add_parameter(&mut self, item: NodeId, name: &str, value: Value) -> HostResult<ParamRef> {
        let node = self.node_mut(item)?;
        match node.params.iter_mut().find(|(param, _)| param == name) {
            Some((_, existing)) => *existing = value,
            None => node.params.push((name.to_string(), value)),
        }
        Ok(ParamRef::new(item, name))
    }

    /// Look up a parameter of an item
    pub fn param(&self, item: NodeId, name: &str) -> Option<ParamRef> {
        let node = self.node(item).ok()?;
        node.params
            .iter()
            .any(|(param, _)| param == name)
            .then(|| ParamRef::new(item, name))
    }

    /// Current value at a parameter path, for inspection
    pub fn value_at(&self, path: &str) -> Option<Value> {
        use crate::host::ParameterHost;
        let param = self.resolve_parameter(path)?;
        self.parameter_value(&param).ok()
    }

    pub fn children(&self, item: NodeId) -> Vec<NodeId> {
        self.node(item)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    /// True while the item has not been disposed
    pub fn is_alive(&self, item: NodeId) -> bool {
        self.nodes.get(item.0).is_some_and(Option::is_some)
    }

    /// True if the item is reachable from the root
    pub fn is_attached(&self, item: NodeId) -> bool {
        let mut cursor = Some(item);
        while let Some(id) = cursor {
            if id == self.root {
                return true;
            }
            cursor = self.node(id).ok().and_then(|node| node.parent);
        }
        false
    }

    pub fn holds(&self, item: NodeId) -> usize {
        self.node(item).map(|node| node.holds).unwrap_or(0)
    }

    /// Number of live items, root included
    pub fn item_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(Some(node));
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn node(&self, id: NodeId) -> HostResult<&Node> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| HostError::UnknownItem(format!("{:?}", id)))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> HostResult<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| HostError::UnknownItem(format!("{:?}", id)))
    }
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}
