// TreeItemMoveChange - reparent an item

use super::{index_field, require_child_at};
use crate::change::trait_def::{Change, ChangeError, ChangeResult, str_field};
use crate::host::TreeHost;
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy)]
struct Placement<N> {
    item: N,
    old_parent: N,
    old_index: usize,
    new_parent: N,
    new_index: usize,
}

/// Move of an attached item to a new owner and position
pub struct TreeItemMoveChange<S: TreeHost> {
    placement: Option<Placement<S::NodeId>>,
    // path of the item before the move, used to find it on a remote host
    item_path: String,
    name: String,
}

impl<S: TreeHost + 'static> TreeItemMoveChange<S> {
    pub const NAME: &'static str = "TreeItemMoveChange";

    /// Move `item` to the end of `new_parent`'s children
    pub fn apply(item: S::NodeId, new_parent: S::NodeId, host: &mut S) -> ChangeResult<Self> {
        Self::apply_at(item, new_parent, None, host)
    }

    /// Move `item` under `new_parent` at `new_index` (appends when `None`)
    pub fn apply_at(
        item: S::NodeId,
        new_parent: S::NodeId,
        new_index: Option<usize>,
        host: &mut S,
    ) -> ChangeResult<Self> {
        let item_path = host
            .item_path(item)
            .ok_or_else(|| ChangeError::Conflict(format!("{:?} is not in the tree", item)))?;
        let old_parent = host
            .parent_of(item)
            .ok_or_else(|| ChangeError::Conflict(format!("{} has no owner", item_path)))?;
        let old_index = host
            .child_index(old_parent, item)
            .ok_or_else(|| ChangeError::Conflict(format!("{} not found under its owner", item_path)))?;

        host.remove_child(old_parent, old_index)?;
        let new_index = new_index.unwrap_or_else(|| host.child_count(new_parent));
        if let Err(err) = host.insert_child(new_parent, item, new_index) {
            host.insert_child(old_parent, item, old_index)?;
            return Err(err.into());
        }

        tracing::debug!(path = %item_path, new_index, "Moved tree item");
        Ok(Self {
            placement: Some(Placement {
                item,
                old_parent,
                old_index,
                new_parent,
                new_index,
            }),
            name: host.item_name(item).unwrap_or_default(),
            item_path,
        })
    }

    fn require_placement(&self) -> ChangeResult<Placement<S::NodeId>> {
        self.placement
            .ok_or_else(|| ChangeError::Uninitialized(Self::NAME.to_string()))
    }
}

impl<S: TreeHost> Default for TreeItemMoveChange<S> {
    fn default() -> Self {
        Self {
            placement: None,
            item_path: String::new(),
            name: String::new(),
        }
    }
}

impl<S: TreeHost + 'static> Change<S> for TreeItemMoveChange<S> {
    fn description(&self) -> String {
        format!("Move {}", self.name)
    }

    fn undo(&mut self, host: &mut S) -> ChangeResult<()> {
        let p = self.require_placement()?;
        require_child_at(host, p.new_parent, p.item, p.new_index)?;
        host.remove_child(p.new_parent, p.new_index)?;
        host.insert_child(p.old_parent, p.item, p.old_index)?;
        Ok(())
    }

    fn redo(&mut self, host: &mut S) -> ChangeResult<()> {
        let p = self.require_placement()?;
        require_child_at(host, p.old_parent, p.item, p.old_index)?;
        host.remove_child(p.old_parent, p.old_index)?;
        host.insert_child(p.new_parent, p.item, p.new_index)?;
        Ok(())
    }

    fn to_json(&self, host: &S) -> ChangeResult<Value> {
        let p = self.require_placement()?;
        let new_owner_path = host
            .item_path(p.new_parent)
            .ok_or_else(|| ChangeError::UnresolvedPath(format!("{:?}", p.new_parent)))?;
        Ok(json!({
            "name": Self::NAME,
            "itemPath": self.item_path,
            "newOwnerPath": new_owner_path,
            "newIndex": p.new_index,
        }))
    }

    fn from_json(&mut self, json: &Value, host: &mut S) -> ChangeResult<()> {
        let item_path = str_field(json, "itemPath")?;
        let owner_path = str_field(json, "newOwnerPath")?;
        let (Some(item), Some(new_parent)) =
            (host.resolve_item(item_path), host.resolve_item(owner_path))
        else {
            tracing::warn!(%item_path, %owner_path, "TreeItemMoveChange: path not found");
            let missing = if host.resolve_item(item_path).is_none() {
                item_path
            } else {
                owner_path
            };
            return Err(ChangeError::UnresolvedPath(missing.to_string()));
        };
        let new_index = match json.get("newIndex") {
            Some(_) => Some(index_field(json, "newIndex")?),
            None => None,
        };

        *self = Self::apply_at(item, new_parent, new_index, host)?;
        Ok(())
    }
}
