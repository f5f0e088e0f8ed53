// UndoRedoManager - Manages undo/redo stacks and the live "current" change

use crate::change::config::HistoryConfig;
use crate::change::trait_def::{Change, ChangeError, ChangeId, ChangeResult};
use crate::messaging::channels::{HistoryEventConsumer, HistoryEventProducer, create_event_channel};
use crate::messaging::event::{HistoryEvent, HistoryEventKind};
use crate::messaging::listener::{HistoryListener, ListenerId};
use ringbuf::traits::Producer;
use serde_json::Value;
use std::collections::VecDeque;

struct Entry<S> {
    id: ChangeId,
    change: Box<dyn Change<S>>,
}

type Listeners<S> = Vec<(ListenerId, Box<dyn HistoryListener<S>>)>;

/// Central coordinator of change history
///
/// The manager maintains two stacks:
/// - Undo stack: changes that have been applied and can be undone (most recent at the back)
/// - Redo stack: changes that have been undone and can be redone (most recent at the back)
///
/// The most recently added change is "current" until another change is added
/// or an undo/cancel happens. Only the current change forwards its updates as
/// `changeUpdated` notifications.
///
/// Empty-stack `undo`/`redo`/`cancel` calls are no-ops returning `Ok(None)`,
/// so UI bindings can call them unguarded. Errors raised by a change are
/// returned unchanged.
///
/// # Memory Management
/// A change is destroyed exactly once when it leaves history for good: on
/// `flush`, when a new change invalidates the redo stack, on `cancel`, on an
/// undo that skips the redo stack, or when the history limit evicts it.
pub struct UndoRedoManager<S> {
    undo_stack: VecDeque<Entry<S>>,
    redo_stack: Vec<Entry<S>>,
    current: Option<ChangeId>,
    listeners: Listeners<S>,
    next_listener_id: u64,
    events: Option<HistoryEventProducer>,
    config: HistoryConfig,
}

impl<S: 'static> UndoRedoManager<S> {
    /// Create a manager with unbounded history
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default())
    }

    pub fn with_config(config: HistoryConfig) -> Self {
        if let Err(err) = config.validate() {
            tracing::warn!(error = %err, "Invalid history config; limits are clamped");
        }
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            current: None,
            listeners: Vec::new(),
            next_listener_id: 0,
            events: None,
            config,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Add an already applied change to history
    ///
    /// This will:
    /// 1. Detach the previous current change from update forwarding
    /// 2. Push the change onto the undo stack and make it current
    /// 3. Destroy and clear the redo stack (new timeline)
    /// 4. Evict the oldest change if the history limit is exceeded
    /// 5. Emit `changeAdded`
    pub fn add_change(&mut self, change: Box<dyn Change<S>>, host: &mut S) -> ChangeId {
        if let Some(previous) = self.current.take() {
            tracing::debug!(change = %previous, "Detaching current change");
        }

        let id = ChangeId::new();
        tracing::debug!(change = %id, description = %change.description(), "Adding change");
        self.undo_stack.push_back(Entry { id, change });
        self.current = Some(id);

        for mut entry in self.redo_stack.drain(..) {
            entry.change.destroy(host);
        }

        // the entry just added always survives eviction
        if let Some(max_history) = self.config.max_history {
            while self.undo_stack.len() > max_history.max(1) {
                if let Some(mut evicted) = self.undo_stack.pop_front() {
                    tracing::debug!(change = %evicted.id, "Evicting change beyond history limit");
                    evicted.change.destroy(host);
                }
            }
        }

        if let Some(entry) = self.undo_stack.back() {
            dispatch(
                &mut self.listeners,
                &mut self.events,
                HistoryEventKind::ChangeAdded,
                entry,
                None,
                host,
            );
        }

        id
    }

    /// Convenience wrapper around `add_change` for unboxed changes
    pub fn add<C: Change<S>>(&mut self, change: C, host: &mut S) -> ChangeId {
        self.add_change(Box::new(change), host)
    }

    /// Update a change on the undo stack
    ///
    /// The update is applied whether or not the change is current, but only
    /// the current change emits `changeUpdated`.
    pub fn update_change(&mut self, id: ChangeId, data: &Value, host: &mut S) -> ChangeResult<()> {
        self.apply_update(id, data, host, false)
    }

    /// Apply a remotely originated update to a change on the undo stack
    pub fn update_from_json(
        &mut self,
        id: ChangeId,
        data: &Value,
        host: &mut S,
    ) -> ChangeResult<()> {
        self.apply_update(id, data, host, true)
    }

    /// Update the current change, if any
    ///
    /// Returns `Ok(false)` when there is no current change.
    pub fn update_current(&mut self, data: &Value, host: &mut S) -> ChangeResult<bool> {
        match self.current {
            Some(id) => self.update_change(id, data, host).map(|_| true),
            None => {
                tracing::debug!("No current change to update");
                Ok(false)
            }
        }
    }

    fn apply_update(
        &mut self,
        id: ChangeId,
        data: &Value,
        host: &mut S,
        remote: bool,
    ) -> ChangeResult<()> {
        let entry = self
            .undo_stack
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(ChangeError::UnknownChange(id))?;

        if remote {
            entry.change.update_from_json(data, host)?;
        } else {
            entry.change.update(data, host)?;
        }

        if self.current == Some(id) {
            dispatch(
                &mut self.listeners,
                &mut self.events,
                HistoryEventKind::ChangeUpdated,
                entry,
                Some(data),
                host,
            );
        } else {
            tracing::debug!(change = %id, "Updated change is not current; not forwarded");
        }

        Ok(())
    }

    /// Undo the last change and move it to the redo stack
    ///
    /// Returns the description of the undone change, or `None` if there was
    /// nothing to undo.
    pub fn undo(&mut self, host: &mut S) -> ChangeResult<Option<String>> {
        self.undo_with(true, host)
    }

    /// Undo the last change
    ///
    /// With `push_on_redo_stack == false` the change is destroyed instead of
    /// entering redo history and no `changeUndone` is emitted. This is used to
    /// replay an undo that happened elsewhere.
    pub fn undo_with(&mut self, push_on_redo_stack: bool, host: &mut S) -> ChangeResult<Option<String>> {
        let Some(mut entry) = self.undo_stack.pop_back() else {
            return Ok(None);
        };
        let description = entry.change.description();

        if let Err(err) = entry.change.undo(host) {
            self.undo_stack.push_back(entry);
            return Err(err);
        }
        self.current = None;
        tracing::debug!(change = %entry.id, %description, "Undid change");

        if push_on_redo_stack {
            self.redo_stack.push(entry);
            if let Some(entry) = self.redo_stack.last() {
                dispatch(
                    &mut self.listeners,
                    &mut self.events,
                    HistoryEventKind::ChangeUndone,
                    entry,
                    None,
                    host,
                );
            }
        } else {
            entry.change.destroy(host);
        }

        Ok(Some(description))
    }

    /// Redo the last undone change and move it back to the undo stack
    ///
    /// Returns the description of the redone change, or `None` if there was
    /// nothing to redo.
    pub fn redo(&mut self, host: &mut S) -> ChangeResult<Option<String>> {
        let Some(mut entry) = self.redo_stack.pop() else {
            return Ok(None);
        };
        let description = entry.change.description();

        if let Err(err) = entry.change.redo(host) {
            self.redo_stack.push(entry);
            return Err(err);
        }
        tracing::debug!(change = %entry.id, %description, "Redid change");

        self.undo_stack.push_back(entry);
        if let Some(entry) = self.undo_stack.back() {
            dispatch(
                &mut self.listeners,
                &mut self.events,
                HistoryEventKind::ChangeRedone,
                entry,
                None,
                host,
            );
        }

        Ok(Some(description))
    }

    /// Abort the last change without leaving any trace in history
    ///
    /// Like `undo`, but the change never enters the redo stack and no event
    /// is emitted.
    pub fn cancel(&mut self, host: &mut S) -> ChangeResult<Option<String>> {
        let Some(mut entry) = self.undo_stack.pop_back() else {
            return Ok(None);
        };
        let description = entry.change.description();

        if let Err(err) = entry.change.undo(host) {
            self.undo_stack.push_back(entry);
            return Err(err);
        }
        self.current = None;
        tracing::debug!(change = %entry.id, %description, "Cancelled change");
        entry.change.destroy(host);

        Ok(Some(description))
    }

    /// Destroy every change in both stacks and empty them
    pub fn flush(&mut self, host: &mut S) {
        self.current = None;
        let count = self.undo_stack.len() + self.redo_stack.len();

        for mut entry in self.undo_stack.drain(..) {
            entry.change.destroy(host);
        }
        for mut entry in self.redo_stack.drain(..) {
            entry.change.destroy(host);
        }

        tracing::debug!(count, "Flushed history");
    }

    /// The change currently receiving live updates
    pub fn current_change(&self) -> Option<&dyn Change<S>> {
        let id = self.current?;
        self.get(id)
    }

    pub fn current_change_id(&self) -> Option<ChangeId> {
        self.current
    }

    /// Look up a change on either stack
    pub fn get(&self, id: ChangeId) -> Option<&dyn Change<S>> {
        self.undo_stack
            .iter()
            .chain(self.redo_stack.iter())
            .find(|entry| entry.id == id)
            .map(|entry| entry.change.as_ref())
    }

    /// Check if there are changes that can be undone
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if there are changes that can be redone
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Description of the change that would be undone
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.back().map(|entry| entry.change.description())
    }

    /// Description of the change that would be redone
    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(|entry| entry.change.description())
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Ids on the undo stack, oldest first
    pub fn undo_ids(&self) -> Vec<ChangeId> {
        self.undo_stack.iter().map(|entry| entry.id).collect()
    }

    /// Ids on the redo stack, most recently undone last
    pub fn redo_ids(&self) -> Vec<ChangeId> {
        self.redo_stack.iter().map(|entry| entry.id).collect()
    }

    pub fn add_listener(&mut self, listener: Box<dyn HistoryListener<S>>) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns false if no listener was registered under `id`
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Open the event channel, replacing any previous one
    pub fn event_channel(&mut self) -> HistoryEventConsumer {
        let (producer, consumer) = create_event_channel(self.config.event_channel_capacity.max(1));
        self.events = Some(producer);
        consumer
    }
}

impl<S: 'static> Default for UndoRedoManager<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn dispatch<S: 'static>(
    listeners: &mut Listeners<S>,
    events: &mut Option<HistoryEventProducer>,
    kind: HistoryEventKind,
    entry: &Entry<S>,
    data: Option<&Value>,
    host: &S,
) {
    let change = entry.change.as_ref();
    for (_, listener) in listeners.iter_mut() {
        match kind {
            HistoryEventKind::ChangeAdded => listener.change_added(entry.id, change, host),
            HistoryEventKind::ChangeUpdated => {
                let data = data.unwrap_or(&Value::Null);
                listener.change_updated(entry.id, change, data, host)
            }
            HistoryEventKind::ChangeUndone => listener.change_undone(entry.id, change, host),
            HistoryEventKind::ChangeRedone => listener.change_redone(entry.id, change, host),
        }
    }

    if let Some(producer) = events.as_mut() {
        let mut event = HistoryEvent::new(kind, entry.id, change.description());
        if let Some(data) = data {
            event = event.with_data(data.clone());
        }
        if producer.try_push(event).is_err() {
            tracing::warn!(%kind, "History event channel full; dropping event");
        }
    }
}
