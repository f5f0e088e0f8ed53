// Replication - mirror one manager's history onto remote peers
//
// Local side: a ReplicationOutbox listens to the manager and queues
// ReplicationMessages (changes travel as registry envelopes).
// Remote side: a RemoteReplayer rebuilds the changes against its own host and
// replays undo/redo/cancel on its own manager.

pub mod message;
pub mod outbox;
pub mod replayer;

pub use message::ReplicationMessage;
pub use outbox::{OutboxHandle, ReplicationOutbox};
pub use replayer::{RemoteReplayer, ReplayOutcome};
