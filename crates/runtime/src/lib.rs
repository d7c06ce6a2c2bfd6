//! Async orchestration around the pure rules engine.
//!
//! One [`Engine`] per participant wires the `rules-core` evaluation engine
//! to its external collaborators: the dice oracle, confirmation prompts,
//! notices, the document store, and the table-wide relay channel. The
//! single-writer authority rule lives here too: exactly one participant
//! runs as [`Role::Authority`] and is the only one that durably mutates
//! shared combat/actor state; everyone else emits intents on the relay.
//!
//! Modules are organized by responsibility:
//! - [`engine`] holds per-participant state and the presentation entry points
//! - [`activation`] is the action activation protocol
//! - [`resolve`] executes an action's resolvers (internal to the crate)
//! - [`authority`] dispatches relayed commands on the authoritative side
//! - [`combat`] tracks rounds and turn order
//! - [`oracle`], [`store`], [`relay`] are the external collaborator seams
//! - [`handle`] exposes the channel-based facade for presentation layers

pub mod activation;
pub mod authority;
pub mod combat;
pub mod engine;
pub mod error;
pub mod events;
pub mod handle;
pub mod oracle;
pub mod relay;
pub mod store;

mod resolve;

pub use activation::ActivationOutcome;
pub use combat::{Combatant, CombatTracker, TurnChange};
pub use engine::{Engine, RecordedRoll, Role};
pub use error::{Result, RuntimeError};
pub use events::EngineEvent;
pub use handle::{EngineCommand, EngineHandle};
pub use oracle::{
    AutoConfirm, CollectingNotifier, ConfirmRequest, DenyAll, DiceOracle, FlatDice, LogNotifier,
    Notice, Notifier, Prompt, RngDice, Roll, ScriptedDice,
};
pub use relay::RelayChannel;
pub use store::{DocId, DocumentStore, MemoryStore};
