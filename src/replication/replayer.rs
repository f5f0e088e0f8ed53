// RemoteReplayer - applies messages from remote peers to local history

use crate::change::{ChangeError, ChangeRegistry, ChangeResult, UndoRedoManager};
use crate::replication::message::ReplicationMessage;
use crate::replication::outbox::OutboxHandle;
use std::rc::Rc;

/// Result of replaying one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    Applied,
    /// The message could not be matched to local state and was ignored
    Skipped,
}

/// Rebuilds remote changes through the registry and replays stack moves
///
/// A remote undo is replayed as a non-branching undo: the change is dropped
/// instead of entering the local redo stack. Missing names and paths are
/// logged and skipped. Any other error is returned.
pub struct RemoteReplayer<S> {
    registry: Rc<ChangeRegistry<S>>,
    outbox: Option<OutboxHandle>,
}

impl<S: 'static> RemoteReplayer<S> {
    pub fn new(registry: Rc<ChangeRegistry<S>>) -> Self {
        Self {
            registry,
            outbox: None,
        }
    }

    /// Pause `outbox` while replaying so remote transitions are not echoed
    pub fn with_outbox(mut self, outbox: OutboxHandle) -> Self {
        self.outbox = Some(outbox);
        self
    }

    pub fn apply(
        &self,
        message: &ReplicationMessage,
        manager: &mut UndoRedoManager<S>,
        host: &mut S,
    ) -> ChangeResult<ReplayOutcome> {
        let was_paused = self.outbox.as_ref().is_some_and(OutboxHandle::is_paused);
        if let Some(outbox) = &self.outbox {
            outbox.pause();
        }

        let result = self.replay(message, manager, host);

        if let Some(outbox) = &self.outbox {
            if !was_paused {
                outbox.resume();
            }
        }

        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) if is_lookup_failure(&err) => {
                tracing::warn!(kind = message.kind(), error = %err, "Skipping remote message");
                Ok(ReplayOutcome::Skipped)
            }
            Err(err) => Err(err),
        }
    }

    /// Replay messages in order, returning how many were applied
    pub fn apply_all<'a, I>(
        &self,
        messages: I,
        manager: &mut UndoRedoManager<S>,
        host: &mut S,
    ) -> ChangeResult<usize>
    where
        I: IntoIterator<Item = &'a ReplicationMessage>,
    {
        let mut applied = 0;
        for message in messages {
            if self.apply(message, manager, host)? == ReplayOutcome::Applied {
                applied += 1;
            }
        }
        Ok(applied)
    }

    fn replay(
        &self,
        message: &ReplicationMessage,
        manager: &mut UndoRedoManager<S>,
        host: &mut S,
    ) -> ChangeResult<ReplayOutcome> {
        let outcome = match message {
            ReplicationMessage::ChangeAdded { change } => {
                let change = self.registry.deserialize(change, host)?;
                manager.add_change(change, host);
                ReplayOutcome::Applied
            }
            ReplicationMessage::ChangeUpdated { data } => match manager.current_change_id() {
                Some(id) => {
                    manager.update_from_json(id, data, host)?;
                    ReplayOutcome::Applied
                }
                None => {
                    tracing::warn!("Remote update with no current change");
                    ReplayOutcome::Skipped
                }
            },
            ReplicationMessage::Undo => stack_outcome(manager.undo_with(false, host)?),
            ReplicationMessage::Redo => stack_outcome(manager.redo(host)?),
            ReplicationMessage::Cancel => stack_outcome(manager.cancel(host)?),
        };
        tracing::debug!(kind = message.kind(), ?outcome, "Replayed remote message");
        Ok(outcome)
    }
}

fn stack_outcome(description: Option<String>) -> ReplayOutcome {
    match description {
        Some(_) => ReplayOutcome::Applied,
        None => ReplayOutcome::Skipped,
    }
}

fn is_lookup_failure(err: &ChangeError) -> bool {
    matches!(
        err,
        ChangeError::Registry(_) | ChangeError::UnresolvedPath(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::variants::register_standard_changes;
    use crate::scene::SceneTree;
    use serde_json::json;

    fn replayer() -> RemoteReplayer<SceneTree> {
        let mut registry = ChangeRegistry::new();
        register_standard_changes(&mut registry);
        RemoteReplayer::new(Rc::new(registry))
    }

    fn scene() -> SceneTree {
        let mut scene = SceneTree::new();
        let obj = scene.add_item(scene.root(), "obj").unwrap();
        scene.add_parameter(obj, "Param", json!(0)).unwrap();
        scene
    }

    fn added(value: i64) -> ReplicationMessage {
        ReplicationMessage::ChangeAdded {
            change: json!({
                "name": "ParameterValueChange",
                "paramPath": "/root/obj.Param",
                "value": value,
            }),
        }
    }

    #[test]
    fn test_replay_add_update_undo() {
        let replayer = replayer();
        let mut manager = UndoRedoManager::new();
        let mut host = scene();

        let outcome = replayer.apply(&added(5), &mut manager, &mut host).unwrap();
        assert_eq!(outcome, ReplayOutcome::Applied);
        assert_eq!(host.value_at("/root/obj.Param"), Some(json!(5)));

        let update = ReplicationMessage::ChangeUpdated { data: json!({ "value": 8 }) };
        replayer.apply(&update, &mut manager, &mut host).unwrap();
        assert_eq!(host.value_at("/root/obj.Param"), Some(json!(8)));

        replayer
            .apply(&ReplicationMessage::Undo, &mut manager, &mut host)
            .unwrap();
        assert_eq!(host.value_at("/root/obj.Param"), Some(json!(0)));
        // remote undo does not branch local history
        assert!(!manager.can_redo());
    }

    #[test]
    fn test_unknown_name_and_path_are_skipped() {
        let replayer = replayer();
        let mut manager = UndoRedoManager::new();
        let mut host = scene();

        let unknown = ReplicationMessage::ChangeAdded {
            change: json!({ "name": "Teleport" }),
        };
        let missing_path = ReplicationMessage::ChangeAdded {
            change: json!({ "name": "ParameterValueChange", "paramPath": "/root/gone.Param" }),
        };
        for message in [unknown, missing_path] {
            assert_eq!(
                replayer.apply(&message, &mut manager, &mut host).unwrap(),
                ReplayOutcome::Skipped
            );
        }
        assert_eq!(manager.undo_count(), 0);
    }

    #[test]
    fn test_malformed_change_is_an_error() {
        let replayer = replayer();
        let mut manager = UndoRedoManager::new();
        let mut host = scene();
        let message = ReplicationMessage::ChangeAdded {
            change: json!({ "name": "ParameterValueChange" }),
        };
        assert!(matches!(
            replayer.apply(&message, &mut manager, &mut host),
            Err(ChangeError::MalformedData(_))
        ));
    }

    #[test]
    fn test_stack_messages_on_empty_history_skip() {
        let replayer = replayer();
        let mut manager = UndoRedoManager::new();
        let mut host = scene();
        let messages = [
            ReplicationMessage::Undo,
            ReplicationMessage::Redo,
            ReplicationMessage::Cancel,
            ReplicationMessage::ChangeUpdated { data: json!({}) },
        ];
        assert_eq!(
            replayer.apply_all(&messages, &mut manager, &mut host).unwrap(),
            0
        );
    }

    #[test]
    fn test_outbox_paused_during_replay() {
        let handle = OutboxHandle::default();
        let replayer = replayer().with_outbox(handle.clone());
        let mut manager = UndoRedoManager::new();
        let mut host = scene();

        replayer.apply(&added(1), &mut manager, &mut host).unwrap();
        assert!(!handle.is_paused());

        handle.pause();
        replayer.apply(&ReplicationMessage::Undo, &mut manager, &mut host).unwrap();
        assert!(handle.is_paused());
    }
}
