// Concrete change types for scene editing
//
// Every variant records enough to undo itself at construction time. Variants
// that insert, remove or create items retain those items on the host for as
// long as they live and release them in `destroy`.

pub mod create_geom;
pub mod hold_objects;
pub mod parameter;
pub mod selection;
pub mod tree_add;
pub mod tree_move;
pub mod tree_remove;

pub use create_geom::CreateGeomChange;
pub use hold_objects::HoldObjectsChange;
pub use parameter::ParameterValueChange;
pub use selection::SelectionChange;
pub use tree_add::TreeItemAddChange;
pub use tree_move::TreeItemMoveChange;
pub use tree_remove::TreeItemsRemoveChange;

use crate::change::registry::ChangeRegistry;
use crate::change::trait_def::{ChangeError, ChangeResult, field};
use crate::host::{GeometryHost, OperatorHost, SelectionHost, TreeHost};
use serde_json::Value;

/// Register every built-in change type under its wire name
pub fn register_standard_changes<S>(registry: &mut ChangeRegistry<S>)
where
    S: GeometryHost + OperatorHost + SelectionHost + 'static,
{
    registry.register::<ParameterValueChange<S>>(ParameterValueChange::<S>::NAME);
    registry.register::<SelectionChange<S>>(SelectionChange::<S>::NAME);
    registry.register::<TreeItemAddChange<S>>(TreeItemAddChange::<S>::NAME);
    registry.register::<TreeItemMoveChange<S>>(TreeItemMoveChange::<S>::NAME);
    registry.register::<TreeItemsRemoveChange<S>>(TreeItemsRemoveChange::<S>::NAME);
    registry.register::<HoldObjectsChange<S>>(HoldObjectsChange::<S>::NAME);
    registry.register::<CreateGeomChange<S>>(CreateGeomChange::<S>::NAME);
}

/// Read a non-negative index from serialized change data
pub(crate) fn index_field(json: &Value, key: &str) -> ChangeResult<usize> {
    field(json, key)?
        .as_u64()
        .map(|index| index as usize)
        .ok_or_else(|| ChangeError::MalformedData(format!("field '{}' is not an index", key)))
}

/// Check that `item` still sits at `index` under `parent`
pub(crate) fn require_child_at<S: TreeHost>(
    host: &S,
    parent: S::NodeId,
    item: S::NodeId,
    index: usize,
) -> ChangeResult<()> {
    match host.child_index(parent, item) {
        Some(found) if found == index => Ok(()),
        found => Err(ChangeError::Conflict(format!(
            "{:?} expected at index {} under {:?}, found {:?}",
            item, index, parent, found
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::Change;
    use crate::scene::SceneTree;
    use serde_json::json;

    #[test]
    fn test_standard_changes_registered() {
        let mut registry = ChangeRegistry::<SceneTree>::new();
        register_standard_changes(&mut registry);

        for name in [
            "ParameterValueChange",
            "SelectionChange",
            "TreeItemAddChange",
            "TreeItemMoveChange",
            "TreeItemsRemoveChange",
            "HoldObjectsChange",
            "CreateGeomChange",
        ] {
            assert!(registry.is_registered(name), "{} not registered", name);
        }
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn test_reverse_lookup_of_concrete_change() {
        let mut registry = ChangeRegistry::<SceneTree>::new();
        register_standard_changes(&mut registry);

        let mut scene = SceneTree::new();
        let a = scene.add_item(scene.root(), "a").unwrap();
        let change = SelectionChange::apply(vec![a], &mut scene);
        let boxed: Box<dyn Change<SceneTree>> = Box::new(change);
        assert_eq!(registry.get_name(boxed.as_ref()), Ok("SelectionChange"));
    }

    #[test]
    fn test_index_field() {
        let json = json!({ "i": 3, "neg": -1, "s": "x" });
        assert_eq!(index_field(&json, "i"), Ok(3));
        assert!(index_field(&json, "neg").is_err());
        assert!(index_field(&json, "s").is_err());
    }
}
