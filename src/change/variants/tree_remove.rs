// TreeItemsRemoveChange - remove one or more items from the tree
//
// Operators bound anywhere in a removed subtree are detached before the
// subtree leaves the tree, downstream operators first, so nothing evaluates
// against half-removed state. Undo reinserts the items and walks the
// reinserted subtrees again, reattaching every bound operator upstream first.

use crate::change::trait_def::{Change, ChangeError, ChangeResult, field};
use crate::host::OperatorHost;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};

struct RemovedItem<S: OperatorHost> {
    item: S::NodeId,
    parent: S::NodeId,
    index: usize,
    path: String,
}

/// Removal of a list of items, each remembered with its owner and position
pub struct TreeItemsRemoveChange<S: OperatorHost> {
    removed: Vec<RemovedItem<S>>,
    description: String,
}

impl<S: OperatorHost + 'static> TreeItemsRemoveChange<S> {
    pub const NAME: &'static str = "TreeItemsRemoveChange";

    /// Remove `items` in order. Items that are not attached are skipped.
    ///
    /// If any removal fails, the items already removed are put back before
    /// the error is returned.
    pub fn apply(items: &[S::NodeId], host: &mut S) -> ChangeResult<Self> {
        let mut change = Self::default();
        for &item in items {
            if let Err(err) = change.remove_item(item, host) {
                change.roll_back(host);
                return Err(err);
            }
        }

        change.description = match change.removed.as_slice() {
            [single] => format!("Remove {}", host.item_name(single.item).unwrap_or_default()),
            many => format!("Remove {} items", many.len()),
        };
        Ok(change)
    }

    fn remove_item(&mut self, item: S::NodeId, host: &mut S) -> ChangeResult<()> {
        let (Some(path), Some(parent)) = (host.item_path(item), host.parent_of(item)) else {
            tracing::warn!(?item, "TreeItemsRemoveChange: item is not in the tree");
            return Ok(());
        };
        let index = host
            .child_index(parent, item)
            .ok_or_else(|| ChangeError::Conflict(format!("{} not found under its owner", path)))?;

        let removed = detach_subtree(host, item)
            .and_then(|()| host.remove_child(parent, index).map_err(ChangeError::from));
        if let Err(err) = removed {
            if let Err(reattach) = reattach_subtree(host, item) {
                tracing::warn!(error = %reattach, %path, "TreeItemsRemoveChange: reattach failed");
            }
            return Err(err);
        }

        host.retain(item);
        self.removed.push(RemovedItem {
            item,
            parent,
            index,
            path,
        });
        Ok(())
    }

    /// Reinsert everything removed so far and drop the holds taken on it
    fn roll_back(&mut self, host: &mut S) {
        if let Err(err) = self.undo(host) {
            tracing::warn!(error = %err, "TreeItemsRemoveChange: rollback incomplete");
        }
        self.destroy(host);
    }

    pub fn items(&self) -> Vec<S::NodeId> {
        self.removed.iter().map(|removed| removed.item).collect()
    }
}

impl<S: OperatorHost> Default for TreeItemsRemoveChange<S> {
    fn default() -> Self {
        Self {
            removed: Vec::new(),
            description: "Remove items".to_string(),
        }
    }
}

/// Operators bound anywhere in the subtree, upstream before downstream
fn subtree_operators<S: OperatorHost>(host: &S, item: S::NodeId) -> Vec<S::OperatorId> {
    let mut seen = HashSet::new();
    let ops: Vec<S::OperatorId> = host
        .descendants(item)
        .into_iter()
        .flat_map(|node| host.bound_operators(node))
        .filter(|op| seen.insert(*op))
        .collect();
    dependency_order(host, ops)
}

/// Topological order of `ops` restricted to dependencies inside the set.
/// Operators caught in a cycle keep their discovery order at the end.
fn dependency_order<S: OperatorHost>(host: &S, ops: Vec<S::OperatorId>) -> Vec<S::OperatorId> {
    let members: HashSet<S::OperatorId> = ops.iter().copied().collect();
    let mut pending: HashMap<S::OperatorId, usize> = HashMap::new();
    let mut downstream: HashMap<S::OperatorId, Vec<S::OperatorId>> = HashMap::new();

    for &op in &ops {
        let upstream: Vec<_> = host
            .operator_dependencies(op)
            .into_iter()
            .filter(|dep| members.contains(dep) && *dep != op)
            .collect();
        pending.insert(op, upstream.len());
        for dep in upstream {
            downstream.entry(dep).or_default().push(op);
        }
    }

    let mut ordered = Vec::with_capacity(ops.len());
    let mut ready: Vec<S::OperatorId> = ops
        .iter()
        .copied()
        .filter(|op| pending.get(op) == Some(&0))
        .collect();
    ready.reverse();

    while let Some(op) = ready.pop() {
        ordered.push(op);
        for next in downstream.remove(&op).unwrap_or_default() {
            if let Some(count) = pending.get_mut(&next) {
                *count -= 1;
                if *count == 0 {
                    ready.push(next);
                }
            }
        }
    }

    if ordered.len() < ops.len() {
        tracing::warn!("Operator dependency cycle in removed subtree");
        let placed: HashSet<S::OperatorId> = ordered.iter().copied().collect();
        ordered.extend(ops.into_iter().filter(|op| !placed.contains(op)));
    }
    ordered
}

fn detach_subtree<S: OperatorHost>(host: &mut S, item: S::NodeId) -> ChangeResult<()> {
    for op in subtree_operators(host, item).into_iter().rev() {
        host.detach_operator(op)?;
    }
    Ok(())
}

fn reattach_subtree<S: OperatorHost>(host: &mut S, item: S::NodeId) -> ChangeResult<()> {
    for op in subtree_operators(host, item) {
        host.reattach_operator(op)?;
    }
    Ok(())
}

impl<S: OperatorHost + 'static> Change<S> for TreeItemsRemoveChange<S> {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn undo(&mut self, host: &mut S) -> ChangeResult<()> {
        for removed in self.removed.iter().rev() {
            host.insert_child(removed.parent, removed.item, removed.index)?;
            reattach_subtree(host, removed.item)?;
        }
        Ok(())
    }

    fn redo(&mut self, host: &mut S) -> ChangeResult<()> {
        for removed in &self.removed {
            super::require_child_at(host, removed.parent, removed.item, removed.index)?;
            detach_subtree(host, removed.item)?;
            host.remove_child(removed.parent, removed.index)?;
        }
        Ok(())
    }

    fn to_json(&self, _host: &S) -> ChangeResult<Value> {
        let paths: Vec<&str> = self.removed.iter().map(|removed| removed.path.as_str()).collect();
        Ok(json!({
            "name": Self::NAME,
            "itemPaths": paths,
        }))
    }

    fn from_json(&mut self, json: &Value, host: &mut S) -> ChangeResult<()> {
        let Some(paths) = field(json, "itemPaths")?.as_array() else {
            return Err(ChangeError::MalformedData("field 'itemPaths' is not an array".into()));
        };

        let mut items = Vec::with_capacity(paths.len());
        for path in paths.iter().filter_map(Value::as_str) {
            match host.resolve_item(path) {
                Some(item) => items.push(item),
                None => tracing::warn!(%path, "TreeItemsRemoveChange: item not found"),
            }
        }
        if items.is_empty() && !paths.is_empty() {
            return Err(ChangeError::UnresolvedPath(
                paths.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(", "),
            ));
        }

        *self = Self::apply(&items, host)?;
        Ok(())
    }

    fn destroy(&mut self, host: &mut S) {
        for removed in self.removed.drain(..) {
            host.release(removed.item);
        }
    }
}
