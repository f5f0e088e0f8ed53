// ReplicationOutbox - turns local history transitions into outgoing messages

use crate::change::{Change, ChangeId, ChangeRegistry};
use crate::messaging::listener::HistoryListener;
use crate::replication::message::ReplicationMessage;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Shared view of an outbox's queue, kept by the caller after the outbox
/// itself has been handed to a manager
#[derive(Debug, Clone, Default)]
pub struct OutboxHandle {
    queue: Rc<RefCell<VecDeque<ReplicationMessage>>>,
    paused: Rc<Cell<bool>>,
}

impl OutboxHandle {
    /// Take every queued message, oldest first
    pub fn drain(&self) -> Vec<ReplicationMessage> {
        self.queue.borrow_mut().drain(..).collect()
    }

    /// Queue a message directly. Cancellations are not observable through
    /// history events, so callers announce them here.
    pub fn send(&self, message: ReplicationMessage) {
        if self.paused.get() {
            tracing::debug!(kind = message.kind(), "Outbox paused; message dropped");
            return;
        }
        self.queue.borrow_mut().push_back(message);
    }

    /// Stop queueing, e.g. while replaying remote messages
    pub fn pause(&self) {
        self.paused.set(true);
    }

    pub fn resume(&self) {
        self.paused.set(false);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

/// History listener serializing local transitions for remote peers
pub struct ReplicationOutbox<S> {
    registry: Rc<ChangeRegistry<S>>,
    handle: OutboxHandle,
}

impl<S: 'static> ReplicationOutbox<S> {
    pub fn new(registry: Rc<ChangeRegistry<S>>) -> Self {
        Self {
            registry,
            handle: OutboxHandle::default(),
        }
    }

    pub fn handle(&self) -> OutboxHandle {
        self.handle.clone()
    }

    fn send_envelope(&self, id: ChangeId, change: &dyn Change<S>, host: &S) {
        if self.handle.is_paused() {
            return;
        }
        match self.registry.serialize(change, host) {
            Ok(envelope) => self
                .handle
                .send(ReplicationMessage::ChangeAdded { change: envelope }),
            Err(err) => {
                tracing::warn!(change = %id, error = %err, "Change not replicated");
            }
        }
    }
}

impl<S: 'static> HistoryListener<S> for ReplicationOutbox<S> {
    fn change_added(&mut self, id: ChangeId, change: &dyn Change<S>, host: &S) {
        self.send_envelope(id, change, host);
    }

    fn change_updated(&mut self, _id: ChangeId, _change: &dyn Change<S>, data: &Value, _host: &S) {
        self.handle.send(ReplicationMessage::ChangeUpdated { data: data.clone() });
    }

    fn change_undone(&mut self, _id: ChangeId, _change: &dyn Change<S>, _host: &S) {
        self.handle.send(ReplicationMessage::Undo);
    }

    // Peers drop a change when replaying its undo, so a redo travels as a
    // fresh envelope rather than as `Redo`.
    fn change_redone(&mut self, id: ChangeId, change: &dyn Change<S>, host: &S) {
        self.send_envelope(id, change, host);
    }
}
