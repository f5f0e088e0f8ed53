// Walkthrough of the change stack with a mirrored remote peer
// Run with: RUST_LOG=scene_history=debug cargo run --bin history_demo [config.ron]

use scene_history::replication::{RemoteReplayer, ReplicationOutbox};
use scene_history::{
    CreateGeomChange, HistoryConfig, ParameterHost, ParameterValueChange, SceneTree,
    TreeItemsRemoveChange, UndoRedoManager, register_standard_changes,
};
use scene_history::{ChangeRegistry, TreeHost};
use ringbuf::traits::Consumer;
use serde_json::json;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

fn build_scene() -> Result<SceneTree, Box<dyn std::error::Error>> {
    let mut scene = SceneTree::new();
    let obj = scene.add_item(scene.root(), "obj")?;
    scene.add_parameter(obj, "Param", json!(0))?;
    Ok(scene)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Scene History Demo ===\n");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let config = HistoryConfig::load(&path)?;
            println!("Loaded config from {}", path);
            config
        }
        None => HistoryConfig::with_max_history(50),
    };
    println!("History limit: {:?}", config.max_history);

    let mut registry = ChangeRegistry::new();
    register_standard_changes(&mut registry);
    let registry = Rc::new(registry);

    // Local peer
    let mut local = build_scene()?;
    let mut manager = UndoRedoManager::with_config(config.clone());
    let outbox = ReplicationOutbox::new(registry.clone());
    let outgoing = outbox.handle();
    manager.add_listener(Box::new(outbox));
    let mut events = manager.event_channel();

    // Remote peer
    let mut remote = build_scene()?;
    let mut remote_manager = UndoRedoManager::with_config(config);
    let replayer = RemoteReplayer::new(registry);

    // Drag a slider: one change, many updates
    let param = local
        .resolve_parameter("/root/obj.Param")
        .ok_or("missing /root/obj.Param")?;
    let change = ParameterValueChange::new(param, &local)?;
    manager.add(change, &mut local);
    for value in [1, 2, 3, 5] {
        manager.update_current(&json!({ "value": value }), &mut local)?;
    }

    // Drag out a circle
    let root = local.root();
    let circle = CreateGeomChange::apply("Circle", "Circle1", root, json!({ "tr": [0, 0, 0] }), &mut local)?;
    manager.add(circle, &mut local);
    manager.update_current(&json!({ "Radius": 2.5 }), &mut local)?;

    // Delete the object
    let obj = local.resolve_item("/root/obj").ok_or("missing /root/obj")?;
    let removal = TreeItemsRemoveChange::apply(&[obj], &mut local)?;
    manager.add(removal, &mut local);

    println!("\nUndo stack ({}):", manager.undo_count());
    if let Some(description) = manager.undo(&mut local)? {
        println!("  Undo: {}", description);
    }
    if let Some(description) = manager.redo(&mut local)? {
        println!("  Redo: {}", description);
    }

    let messages = outgoing.drain();
    println!("\nReplicating {} messages", messages.len());
    for message in &messages {
        println!("  -> {}", message.to_json_string()?);
    }
    let applied = replayer.apply_all(&messages, &mut remote_manager, &mut remote)?;
    println!("Remote applied {} of {}", applied, messages.len());

    println!("\nLocal  Circle1.Radius = {:?}", local.value_at("/root/Circle1.Radius"));
    println!("Remote Circle1.Radius = {:?}", remote.value_at("/root/Circle1.Radius"));
    println!("Remote has /root/obj: {}", remote.resolve_item("/root/obj").is_some());
    println!("Local  has /root/obj: {}", local.resolve_item("/root/obj").is_some());

    println!("\nHistory events:");
    while let Some(event) = events.try_pop() {
        println!("  {} {}", event.kind, event.description);
    }

    manager.flush(&mut local);
    remote_manager.flush(&mut remote);
    println!("\nDone");
    Ok(())
}
