//! Runtime errors.
//!
//! Gameplay rejections (no charges, hands full, ...) are *values*, not
//! errors; they travel as [`crate::oracle::Notice`] or as the domain error
//! enums from `rules-core`. The variants here cover the orchestration layer
//! itself: torn channels, unknown references, store failures.

use rules_core::ActorId;

/// Errors surfaced by the runtime orchestration layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    /// The engine worker is gone and the command channel is closed.
    #[error("engine worker unavailable")]
    WorkerUnavailable,
    /// A command referenced an actor the engine does not hold.
    #[error("unknown actor {0:?}")]
    UnknownActor(ActorId),
    /// Document store operation failed.
    #[error("store operation failed: {0}")]
    StoreError(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
