// Integration tests for hierarchy edits through the manager

use scene_history::{
    ChangeRegistry, CreateGeomChange, HoldObjectsChange, ParameterHost, SceneTree,
    TreeHost, TreeItemAddChange, TreeItemMoveChange, TreeItemsRemoveChange, UndoRedoManager,
    register_standard_changes,
};
use serde_json::{Value, json};

fn doubled(inputs: &[Value]) -> Vec<Value> {
    vec![json!(inputs[0].as_f64().unwrap_or_default() * 2.0)]
}

/// root
/// ├── rig
/// │   └── arm (Length, Tip)
/// └── target (Pos)
fn rigged_scene() -> SceneTree {
    let mut scene = SceneTree::new();
    let root = scene.root();
    let rig = scene.add_item(root, "rig").unwrap();
    let arm = scene.add_item(rig, "arm").unwrap();
    let target = scene.add_item(root, "target").unwrap();

    let pos = scene.add_parameter(target, "Pos", json!(1.0)).unwrap();
    let length = scene.add_parameter(arm, "Length", json!(0.0)).unwrap();
    let tip = scene.add_parameter(arm, "Tip", json!(0.0)).unwrap();
    scene
        .add_operator("reach", vec![pos], vec![length.clone()], doubled)
        .unwrap();
    scene
        .add_operator("tip", vec![length], vec![tip], doubled)
        .unwrap();
    scene
}

#[test]
fn remove_detaches_operators_until_undone() {
    let mut scene = rigged_scene();
    let mut manager = UndoRedoManager::new();
    let rig = scene.resolve_item("/root/rig").unwrap();
    let pos = scene.resolve_parameter("/root/target.Pos").unwrap();

    let removal = TreeItemsRemoveChange::apply(&[rig], &mut scene).unwrap();
    manager.add(removal, &mut scene);
    assert!(scene.resolve_item("/root/rig").is_none());

    scene.set_parameter_value(&pos, json!(5.0)).unwrap();
    manager.undo(&mut scene).unwrap();

    // reattached upstream first, so the chain catches up in one pass
    assert_eq!(scene.value_at("/root/rig/arm.Length"), Some(json!(10.0)));
    assert_eq!(scene.value_at("/root/rig/arm.Tip"), Some(json!(20.0)));

    manager.redo(&mut scene).unwrap();
    assert!(scene.resolve_item("/root/rig").is_none());
    assert!(scene.is_alive(rig));
}

#[test]
fn evicted_removal_disposes_subtree() {
    let mut scene = rigged_scene();
    let mut manager = UndoRedoManager::with_config(scene_history::HistoryConfig::with_max_history(1));
    let rig = scene.resolve_item("/root/rig").unwrap();
    let arm = scene.resolve_item("/root/rig/arm").unwrap();

    let removal = TreeItemsRemoveChange::apply(&[rig], &mut scene).unwrap();
    manager.add(removal, &mut scene);

    let target = scene.resolve_item("/root/target").unwrap();
    let root = scene.root();
    let moved = TreeItemMoveChange::apply_at(target, root, Some(0), &mut scene).unwrap();
    manager.add(moved, &mut scene);

    assert_eq!(manager.undo_count(), 1);
    assert!(!scene.is_alive(rig));
    assert!(!scene.is_alive(arm));
}

#[test]
fn add_move_remove_sequence_round_trips() {
    let mut scene = SceneTree::new();
    let root = scene.root();
    let group = scene.add_item(root, "group").unwrap();
    let mut manager = UndoRedoManager::new();

    let item = scene.create_item("item");
    manager.add(TreeItemAddChange::apply(item, root, &mut scene).unwrap(), &mut scene);
    manager.add(TreeItemMoveChange::apply(item, group, &mut scene).unwrap(), &mut scene);
    manager.add(TreeItemsRemoveChange::apply(&[group], &mut scene).unwrap(), &mut scene);
    assert!(scene.children(root).is_empty());

    manager.undo(&mut scene).unwrap();
    assert_eq!(scene.item_path(item).as_deref(), Some("/root/group/item"));
    manager.undo(&mut scene).unwrap();
    assert_eq!(scene.item_path(item).as_deref(), Some("/root/item"));
    manager.undo(&mut scene).unwrap();
    assert!(scene.item_path(item).is_none());
    assert_eq!(scene.children(root), vec![group]);

    for _ in 0..3 {
        manager.redo(&mut scene).unwrap();
    }
    assert!(scene.children(root).is_empty());

    // flushing releases every retained item
    manager.flush(&mut scene);
    assert!(!scene.is_alive(item));
    assert!(!scene.is_alive(group));
    assert_eq!(scene.item_count(), 1);
}

#[test]
fn cancelled_geometry_creation_leaves_nothing() {
    let mut scene = SceneTree::new();
    let root = scene.root();
    let mut manager = UndoRedoManager::new();

    let create =
        CreateGeomChange::apply("Line", "Line1", root, json!({ "tr": [0, 0, 0] }), &mut scene).unwrap();
    let item = create.item().unwrap();
    manager.add(create, &mut scene);

    // zero-length gesture is aborted
    manager.cancel(&mut scene).unwrap();
    assert!(!scene.is_alive(item));
    assert!(!manager.can_undo());
    assert!(!manager.can_redo());
}

#[test]
fn hold_objects_drag_through_manager() {
    let mut scene = rigged_scene();
    let mut manager = UndoRedoManager::new();
    let pos = scene.resolve_parameter("/root/target.Pos").unwrap();

    let hold = HoldObjectsChange::new(vec![pos.clone()], &scene).unwrap();
    manager.add(hold, &mut scene);
    for step in 1..=3 {
        manager
            .update_current(
                &json!({ "changeIds": [0], "changeValues": [step as f64] }),
                &mut scene,
            )
            .unwrap();
    }
    assert_eq!(scene.value_at("/root/rig/arm.Tip"), Some(json!(12.0)));

    manager.undo(&mut scene).unwrap();
    assert_eq!(scene.parameter_value(&pos).unwrap(), json!(1.0));
    assert_eq!(scene.value_at("/root/rig/arm.Tip"), Some(json!(4.0)));
}

#[test]
fn tree_changes_rebuild_through_registry() {
    let mut registry = ChangeRegistry::new();
    register_standard_changes(&mut registry);

    let mut local = rigged_scene();
    let mut remote = rigged_scene();

    let root = local.root();
    let item = local.create_item("extra");
    local.add_parameter(item, "Weight", json!(0.5)).unwrap();
    let add = TreeItemAddChange::apply(item, root, &mut local).unwrap();
    let rig = local.resolve_item("/root/rig").unwrap();
    let remove = TreeItemsRemoveChange::apply(&[rig], &mut local).unwrap();

    for envelope in [
        registry.serialize(&add, &local).unwrap(),
        registry.serialize(&remove, &local).unwrap(),
    ] {
        registry.deserialize(&envelope, &mut remote).unwrap();
    }

    assert_eq!(remote.value_at("/root/extra.Weight"), Some(json!(0.5)));
    assert!(remote.resolve_item("/root/rig").is_none());
}
