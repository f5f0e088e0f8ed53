// Tree, selection and geometry capabilities of SceneTree

use super::path::{self, PATH_SEPARATOR};
use super::{GEOM_ITEM_KIND, Node, NodeId, ParamRef, SceneTree};
use crate::host::{GeometryHost, HostError, HostResult, SelectionHost, TreeHost};
use serde_json::{Value, json};

/// Shape parameters created for each supported geometry kind
fn shape_parameters(kind: &str) -> Option<&'static [&'static str]> {
    match kind {
        "Line" => Some(&["Length"]),
        "Circle" | "Sphere" => Some(&["Radius"]),
        "Rect" => Some(&["X", "Y"]),
        "Cuboid" => Some(&["X", "Y", "Z"]),
        "Cone" => Some(&["Radius", "Height"]),
        "FreehandLine" => Some(&["Points"]),
        _ => None,
    }
}

impl SceneTree {
    /// Attach a detached item under `parent` at `index`
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId, index: usize) -> HostResult<()> {
        let child_node = self.node(child)?;
        if child_node.parent.is_some() || child == self.root {
            return Err(HostError::InvalidItemData(format!(
                "'{}' is already attached",
                child_node.name
            )));
        }
        let name = child_node.name.clone();

        // refuse to create a cycle
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(HostError::InvalidItemData(format!(
                    "'{}' cannot become its own descendant",
                    name
                )));
            }
            cursor = self.node(id)?.parent;
        }

        let parent_label = self.label(parent);
        let siblings = &self.node(parent)?.children;
        if index > siblings.len() {
            return Err(HostError::IndexOutOfRange {
                parent: parent_label,
                index,
                len: siblings.len(),
            });
        }
        for sibling in siblings {
            if self.node(*sibling)?.name == name {
                return Err(HostError::DuplicateName {
                    parent: parent_label,
                    name,
                });
            }
        }

        self.node_mut(parent)?.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn label(&self, item: NodeId) -> String {
        self.item_path(item)
            .or_else(|| self.item_name(item))
            .unwrap_or_else(|| format!("{:?}", item))
    }

    /// Remove a detached subtree from the arena
    fn dispose(&mut self, item: NodeId) {
        let doomed = self.descendants(item);
        tracing::debug!(?item, count = doomed.len(), "Disposing detached subtree");

        for slot in self.operators.iter_mut() {
            let bound = slot.as_ref().is_some_and(|op| {
                op.inputs
                    .iter()
                    .chain(op.outputs.iter())
                    .any(|param| doomed.contains(&param.item))
            });
            if bound {
                *slot = None;
            }
        }
        self.selection.retain(|id| !doomed.contains(id));
        for id in doomed {
            if let Some(slot) = self.nodes.get_mut(id.0) {
                *slot = None;
            }
        }
    }

    fn build_from_json(&mut self, json: &Value) -> HostResult<NodeId> {
        let name = json
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| HostError::InvalidItemData("missing 'name'".to_string()))?;
        let kind = json
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or(super::TREE_ITEM_KIND);

        let mut node = Node::new(name, kind);
        node.geom_kind = json
            .get("geomKind")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(params) = json.get("params").and_then(Value::as_array) {
            for pair in params {
                let (Some(param), Some(value)) = (pair.get(0).and_then(Value::as_str), pair.get(1))
                else {
                    return Err(HostError::InvalidItemData(format!(
                        "bad parameter entry on '{}'",
                        name
                    )));
                };
                node.params.push((param.to_string(), value.clone()));
            }
        }

        let item = self.alloc(node);
        if let Some(children) = json.get("children").and_then(Value::as_array) {
            for child_json in children {
                let child = self.build_from_json(child_json)?;
                let index = self.node(item)?.children.len();
                self.attach(item, child, index)?;
            }
        }
        Ok(item)
    }
}

impl TreeHost for SceneTree {
    type NodeId = NodeId;

    fn resolve_item(&self, path: &str) -> Option<NodeId> {
        let names = path::segments(path)?;
        let (first, rest) = names.split_first()?;
        if self.node(self.root).ok()?.name != *first {
            return None;
        }
        let mut current = self.root;
        for name in rest {
            current = *self
                .node(current)
                .ok()?
                .children
                .iter()
                .find(|child| self.node(**child).is_ok_and(|node| node.name == *name))?;
        }
        Some(current)
    }

    fn item_path(&self, item: NodeId) -> Option<String> {
        let mut names = Vec::new();
        let mut cursor = Some(item);
        while let Some(id) = cursor {
            let node = self.node(id).ok()?;
            names.push(node.name.as_str());
            if id == self.root {
                names.reverse();
                let mut path = String::new();
                for name in names {
                    path.push(PATH_SEPARATOR);
                    path.push_str(name);
                }
                return Some(path);
            }
            cursor = node.parent;
        }
        // detached
        None
    }

    fn item_name(&self, item: NodeId) -> Option<String> {
        self.node(item).ok().map(|node| node.name.clone())
    }

    fn parent_of(&self, item: NodeId) -> Option<NodeId> {
        self.node(item).ok()?.parent
    }

    fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.node(parent)
            .ok()?
            .children
            .iter()
            .position(|id| *id == child)
    }

    fn child_count(&self, parent: NodeId) -> usize {
        self.node(parent).map(|node| node.children.len()).unwrap_or(0)
    }

    fn insert_child(&mut self, parent: NodeId, child: NodeId, index: usize) -> HostResult<()> {
        self.attach(parent, child, index)
    }

    fn remove_child(&mut self, parent: NodeId, index: usize) -> HostResult<NodeId> {
        let parent_label = self.label(parent);
        let node = self.node_mut(parent)?;
        if index >= node.children.len() {
            return Err(HostError::IndexOutOfRange {
                parent: parent_label,
                index,
                len: node.children.len(),
            });
        }
        let child = node.children.remove(index);
        self.node_mut(child)?.parent = None;
        Ok(child)
    }

    fn descendants(&self, item: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![item];
        while let Some(id) = stack.pop() {
            let Ok(node) = self.node(id) else {
                continue;
            };
            out.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    fn item_to_json(&self, item: NodeId) -> HostResult<Value> {
        let node = self.node(item)?;
        let params: Vec<Value> = node
            .params
            .iter()
            .map(|(name, value)| json!([name, value]))
            .collect();
        let children = node
            .children
            .iter()
            .map(|child| self.item_to_json(*child))
            .collect::<HostResult<Vec<_>>>()?;

        let mut json = json!({
            "name": node.name,
            "kind": node.kind,
            "params": params,
            "children": children,
        });
        if let Some(geom_kind) = &node.geom_kind {
            json["geomKind"] = Value::String(geom_kind.clone());
        }
        Ok(json)
    }

    fn item_from_json(&mut self, json: &Value) -> HostResult<NodeId> {
        self.build_from_json(json)
    }

    fn retain(&mut self, item: NodeId) {
        if let Ok(node) = self.node_mut(item) {
            node.holds += 1;
        }
    }

    fn release(&mut self, item: NodeId) {
        let Ok(node) = self.node_mut(item) else {
            return;
        };
        node.holds = node.holds.saturating_sub(1);
        if node.holds == 0 && node.parent.is_none() && item != self.root {
            self.dispose(item);
        }
    }
}

impl SelectionHost for SceneTree {
    fn selection(&self) -> Vec<NodeId> {
        self.selection.clone()
    }

    fn set_selection(&mut self, items: &[NodeId]) {
        self.selection = items
            .iter()
            .copied()
            .filter(|item| self.is_alive(*item))
            .collect();
    }
}

impl GeometryHost for SceneTree {
    fn create_geom_item(&mut self, name: &str, kind: &str) -> HostResult<NodeId> {
        let shape = shape_parameters(kind)
            .ok_or_else(|| HostError::InvalidItemData(format!("unknown geometry kind '{}'", kind)))?;

        let mut node = Node::new(name, GEOM_ITEM_KIND);
        node.geom_kind = Some(kind.to_string());
        node.params.push(("Visible".to_string(), Value::Bool(true)));
        node.params
            .push(("GlobalXfo".to_string(), json!({ "tr": [0.0, 0.0, 0.0] })));
        for param in shape {
            node.params.push((param.to_string(), json!(0.0)));
        }
        Ok(self.alloc(node))
    }

    fn geom_kind(&self, item: NodeId) -> Option<String> {
        self.node(item).ok()?.geom_kind.clone()
    }

    fn item_parameter(&self, item: NodeId, name: &str) -> Option<ParamRef> {
        self.param(item, name)
    }
}
