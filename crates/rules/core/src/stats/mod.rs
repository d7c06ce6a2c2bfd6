//! Stat system - abilities, combat stats, resource pools, derivation.
//!
//! # Architecture
//!
//! ```text
//! [ Abilities ]
//!      ↓
//! [ Hit Points ]
//!      ↓
//! [ Combat Stats ]
//!      ↓
//! [ Resource Pools ]
//!      ↓
//! [ Movement / Vision / Status Sync ]
//! ```
//!
//! ## Principles
//!
//! 1. **Stored vs derived**: `base` and `bonuses` are stored; `value`, `mod`
//!    and pool maximums are recomputed by [`pipeline::prepare`] on every pass
//! 2. **Fixed order**: later stages may read earlier stages' outputs within
//!    the same pass, never the reverse; circularity through formulas is
//!    resolved by this order, not by iterating to a fixpoint
//! 3. **Deterministic**: pure functions, no I/O or randomness

pub mod abilities;
pub mod combat;
pub mod pipeline;
pub mod resources;
pub mod snapshot;

pub use abilities::{Abilities, Ability, AbilityBonuses, AbilityKind};
pub use combat::{CombatStat, CombatStatKind, CombatStats, StatBonuses};
pub use pipeline::prepare;
pub use resources::{HitPoints, ResourceKind, ResourcePool, ResourcePools};
pub use snapshot::Snapshot;
