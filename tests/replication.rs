// Two peers kept in sync through the replication outbox and replayer

use scene_history::replication::{OutboxHandle, ReplayOutcome};
use scene_history::{
    ChangeRegistry, CreateGeomChange, ParameterHost, ParameterValueChange, RemoteReplayer,
    ReplicationMessage, ReplicationOutbox, SceneTree, SelectionChange, SelectionHost, TreeHost,
    TreeItemsRemoveChange, UndoRedoManager, register_standard_changes,
};
use serde_json::json;
use std::rc::Rc;

struct Peer {
    scene: SceneTree,
    manager: UndoRedoManager<SceneTree>,
    outbox: OutboxHandle,
    replayer: RemoteReplayer<SceneTree>,
}

impl Peer {
    fn new(registry: &Rc<ChangeRegistry<SceneTree>>) -> Self {
        let mut scene = SceneTree::new();
        let obj = scene.add_item(scene.root(), "obj").unwrap();
        scene.add_parameter(obj, "Param", json!(0)).unwrap();

        let outbox = ReplicationOutbox::new(registry.clone());
        let handle = outbox.handle();
        let mut manager = UndoRedoManager::new();
        manager.add_listener(Box::new(outbox));

        Self {
            scene,
            manager,
            replayer: RemoteReplayer::new(registry.clone()).with_outbox(handle.clone()),
            outbox: handle,
        }
    }

    /// Deliver everything this peer has queued to `other`, over the wire
    fn send_to(&self, other: &mut Peer) -> usize {
        let mut applied = 0;
        for message in self.outbox.drain() {
            let text = message.to_json_string().unwrap();
            let received = ReplicationMessage::from_json_str(&text).unwrap();
            let outcome = other
                .replayer
                .apply(&received, &mut other.manager, &mut other.scene)
                .unwrap();
            if outcome == ReplayOutcome::Applied {
                applied += 1;
            }
        }
        applied
    }
}

fn peers() -> (Peer, Peer) {
    let mut registry = ChangeRegistry::new();
    register_standard_changes(&mut registry);
    let registry = Rc::new(registry);
    (Peer::new(&registry), Peer::new(&registry))
}

#[test]
fn live_parameter_drag_is_mirrored() {
    let (mut alice, mut bob) = peers();
    let param = alice.scene.resolve_parameter("/root/obj.Param").unwrap();

    let change = ParameterValueChange::new(param, &alice.scene).unwrap();
    alice.manager.add(change, &mut alice.scene);
    for value in [3, 6, 9] {
        alice
            .manager
            .update_current(&json!({ "value": value }), &mut alice.scene)
            .unwrap();
    }

    assert_eq!(alice.send_to(&mut bob), 4);
    assert_eq!(bob.scene.value_at("/root/obj.Param"), Some(json!(9)));
    assert_eq!(bob.manager.undo_count(), 1);

    // replaying must not echo back
    assert!(bob.outbox.is_empty());
}

#[test]
fn suppressed_compound_edit_is_mirrored() {
    let (mut alice, mut bob) = peers();
    for peer in [&mut alice, &mut bob] {
        let obj = peer.scene.resolve_item("/root/obj").unwrap();
        peer.scene.add_parameter(obj, "Primary", json!(1)).unwrap();
        peer.scene.add_parameter(obj, "Linked", json!(1)).unwrap();
    }
    let primary = alice.scene.resolve_parameter("/root/obj.Primary").unwrap();
    let linked = alice.scene.resolve_parameter("/root/obj.Linked").unwrap();

    let secondary = ParameterValueChange::new(linked, &alice.scene).unwrap();
    let change = ParameterValueChange::new(primary, &alice.scene)
        .unwrap()
        .suppress_primary_change(true)
        .with_secondary_change(Box::new(secondary));
    alice.manager.add(change, &mut alice.scene);
    alice
        .manager
        .update_current(&json!({ "value": 9 }), &mut alice.scene)
        .unwrap();

    assert_eq!(alice.send_to(&mut bob), 2);
    for peer in [&alice, &bob] {
        assert_eq!(peer.scene.value_at("/root/obj.Primary"), Some(json!(1)));
        assert_eq!(peer.scene.value_at("/root/obj.Linked"), Some(json!(9)));
    }

    alice.manager.undo(&mut alice.scene).unwrap();
    alice.send_to(&mut bob);
    assert_eq!(bob.scene.value_at("/root/obj.Primary"), Some(json!(1)));
    assert_eq!(bob.scene.value_at("/root/obj.Linked"), Some(json!(1)));

    alice.manager.redo(&mut alice.scene).unwrap();
    alice.send_to(&mut bob);
    assert_eq!(bob.scene.value_at("/root/obj.Primary"), Some(json!(1)));
    assert_eq!(bob.scene.value_at("/root/obj.Linked"), Some(json!(9)));
}

#[test]
fn undo_then_redo_converges() {
    let (mut alice, mut bob) = peers();
    let root = alice.scene.root();

    let create =
        CreateGeomChange::apply("Sphere", "Ball", root, json!({ "tr": [0, 0, 0] }), &mut alice.scene)
            .unwrap();
    alice.manager.add(create, &mut alice.scene);
    alice
        .manager
        .update_current(&json!({ "Radius": 3.0 }), &mut alice.scene)
        .unwrap();
    alice.send_to(&mut bob);
    assert_eq!(bob.scene.value_at("/root/Ball.Radius"), Some(json!(3.0)));

    alice.manager.undo(&mut alice.scene).unwrap();
    alice.send_to(&mut bob);
    assert!(bob.scene.resolve_item("/root/Ball").is_none());
    assert!(!bob.manager.can_redo());

    alice.manager.redo(&mut alice.scene).unwrap();
    alice.send_to(&mut bob);
    assert_eq!(bob.scene.value_at("/root/Ball.Radius"), Some(json!(3.0)));
    assert_eq!(bob.manager.undo_count(), 1);
}

#[test]
fn edits_flow_both_ways() {
    let (mut alice, mut bob) = peers();

    let obj = alice.scene.resolve_item("/root/obj").unwrap();
    let select = SelectionChange::apply(vec![obj], &mut alice.scene);
    alice.manager.add(select, &mut alice.scene);
    alice.send_to(&mut bob);

    let bob_obj = bob.scene.resolve_item("/root/obj").unwrap();
    assert_eq!(bob.scene.selection(), vec![bob_obj]);

    let removal = TreeItemsRemoveChange::apply(&[bob_obj], &mut bob.scene).unwrap();
    bob.manager.add(removal, &mut bob.scene);
    bob.send_to(&mut alice);
    assert!(alice.scene.resolve_item("/root/obj").is_none());
    assert!(!alice.scene.is_attached(obj));
    assert!(alice.scene.is_alive(obj));
}

#[test]
fn cancel_is_announced_explicitly() {
    let (mut alice, mut bob) = peers();
    let param = alice.scene.resolve_parameter("/root/obj.Param").unwrap();

    let change = ParameterValueChange::apply(param, json!(4), &mut alice.scene).unwrap();
    alice.manager.add(change, &mut alice.scene);
    alice
        .manager
        .update_current(&json!({ "value": 4 }), &mut alice.scene)
        .unwrap();
    alice.send_to(&mut bob);
    assert_eq!(bob.scene.value_at("/root/obj.Param"), Some(json!(4)));

    alice.manager.cancel(&mut alice.scene).unwrap();
    alice.outbox.send(ReplicationMessage::Cancel);
    assert_eq!(alice.send_to(&mut bob), 1);

    assert_eq!(bob.scene.value_at("/root/obj.Param"), Some(json!(0)));
    assert!(!bob.manager.can_undo());
    assert!(!bob.manager.can_redo());
}

#[test]
fn unknown_remote_change_does_not_corrupt_history() {
    let (_, mut bob) = peers();
    let param = bob.scene.resolve_parameter("/root/obj.Param").unwrap();
    let change = ParameterValueChange::apply(param, json!(2), &mut bob.scene).unwrap();
    bob.manager.add(change, &mut bob.scene);

    let foreign = ReplicationMessage::ChangeAdded {
        change: json!({ "name": "PluginChange", "payload": 1 }),
    };
    let outcome = bob
        .replayer
        .apply(&foreign, &mut bob.manager, &mut bob.scene)
        .unwrap();
    assert_eq!(outcome, ReplayOutcome::Skipped);
    assert_eq!(bob.manager.undo_count(), 1);
    assert_eq!(bob.scene.value_at("/root/obj.Param"), Some(json!(2)));
}
