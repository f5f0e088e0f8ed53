// Messaging - history notifications
//
// Two ways to observe a manager:
// - HistoryListener: in-process observers that need to look at the change
//   itself (e.g. replication serializing it through the registry)
// - Event channel: lock-free ring buffer of owned HistoryEvent payloads for
//   consumers such as a history panel polling once per frame

pub mod channels;
pub mod event;
pub mod listener;

pub use channels::{HistoryEventConsumer, HistoryEventProducer, create_event_channel};
pub use event::{HistoryEvent, HistoryEventKind};
pub use listener::{HistoryListener, ListenerId};
