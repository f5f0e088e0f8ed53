// TreeItemAddChange - insert an item into the tree

use super::{index_field, require_child_at};
use crate::change::trait_def::{Change, ChangeError, ChangeResult, field, str_field};
use crate::host::TreeHost;
use serde_json::{Value, json};

/// Insertion of a (possibly pre-built) item under a parent
///
/// Constructed in two phases: `apply` performs the insertion and returns the
/// committed change, while `Default` + `from_json` rebuilds one from a
/// snapshot. The item is retained for as long as the change exists, so an
/// undone insertion keeps the detached item alive for a later redo.
pub struct TreeItemAddChange<S: TreeHost> {
    item: Option<S::NodeId>,
    parent: Option<S::NodeId>,
    index: usize,
    name: String,
}

impl<S: TreeHost + 'static> TreeItemAddChange<S> {
    pub const NAME: &'static str = "TreeItemAddChange";

    /// Append `item` under `parent`
    pub fn apply(item: S::NodeId, parent: S::NodeId, host: &mut S) -> ChangeResult<Self> {
        let index = host.child_count(parent);
        Self::apply_at(item, parent, index, host)
    }

    /// Insert `item` under `parent` at `index`
    pub fn apply_at(
        item: S::NodeId,
        parent: S::NodeId,
        index: usize,
        host: &mut S,
    ) -> ChangeResult<Self> {
        host.insert_child(parent, item, index)?;
        host.retain(item);
        Ok(Self {
            item: Some(item),
            parent: Some(parent),
            index,
            name: host.item_name(item).unwrap_or_default(),
        })
    }

    pub fn item(&self) -> Option<S::NodeId> {
        self.item
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn placement(&self) -> ChangeResult<(S::NodeId, S::NodeId)> {
        match (self.item, self.parent) {
            (Some(item), Some(parent)) => Ok((item, parent)),
            _ => Err(ChangeError::Uninitialized(Self::NAME.to_string())),
        }
    }
}

impl<S: TreeHost> Default for TreeItemAddChange<S> {
    fn default() -> Self {
        Self {
            item: None,
            parent: None,
            index: 0,
            name: String::new(),
        }
    }
}

impl<S: TreeHost + 'static> Change<S> for TreeItemAddChange<S> {
    fn description(&self) -> String {
        format!("Add {}", self.name)
    }

    fn undo(&mut self, host: &mut S) -> ChangeResult<()> {
        let (item, parent) = self.placement()?;
        require_child_at(host, parent, item, self.index)?;
        host.remove_child(parent, self.index)?;
        Ok(())
    }

    fn redo(&mut self, host: &mut S) -> ChangeResult<()> {
        let (item, parent) = self.placement()?;
        host.insert_child(parent, item, self.index)?;
        Ok(())
    }

    fn to_json(&self, host: &S) -> ChangeResult<Value> {
        let (item, parent) = self.placement()?;
        let parent_path = host
            .item_path(parent)
            .ok_or_else(|| ChangeError::UnresolvedPath(format!("{:?}", parent)))?;
        Ok(json!({
            "name": Self::NAME,
            "parentItemPath": parent_path,
            "treeItem": host.item_to_json(item)?,
            "treeItemIndex": self.index,
        }))
    }

    fn from_json(&mut self, json: &Value, host: &mut S) -> ChangeResult<()> {
        let parent_path = str_field(json, "parentItemPath")?;
        let Some(parent) = host.resolve_item(parent_path) else {
            tracing::warn!(path = %parent_path, "TreeItemAddChange: parent not found");
            return Err(ChangeError::UnresolvedPath(parent_path.to_string()));
        };
        let index = match json.get("treeItemIndex") {
            Some(_) => index_field(json, "treeItemIndex")?,
            None => host.child_count(parent),
        };

        let item = host.item_from_json(field(json, "treeItem")?)?;
        host.retain(item);
        if let Err(err) = host.insert_child(parent, item, index) {
            // nothing else holds the rebuilt subtree
            host.release(item);
            return Err(err.into());
        }

        self.name = host.item_name(item).unwrap_or_default();
        self.item = Some(item);
        self.parent = Some(parent);
        self.index = index;
        Ok(())
    }

    fn destroy(&mut self, host: &mut S) {
        if let Some(item) = self.item.take() {
            host.release(item);
        }
    }
}
