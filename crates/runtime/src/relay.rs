//! In-process relay channel between participants.
//!
//! Fire-and-forget broadcast: every emitted command reaches every subscribed
//! participant, with at-least-once, unordered semantics from the consumers'
//! point of view. Only the authoritative participant acts on what it
//! receives; everyone else ignores the traffic.

use tokio::sync::broadcast;
use tracing::debug;

use rules_core::Command;

/// Shared relay endpoint. Cloning is cheap and every clone feeds the same
/// channel.
#[derive(Clone)]
pub struct RelayChannel {
    tx: broadcast::Sender<Command>,
}

impl RelayChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an intent. Nobody listening is not an error.
    pub fn emit(&self, command: Command) {
        debug!(action = command.name(), "relay emit");
        let _ = self.tx.send(command);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Command> {
        self.tx.subscribe()
    }
}

impl Default for RelayChannel {
    fn default() -> Self {
        Self::new(64)
    }
}
