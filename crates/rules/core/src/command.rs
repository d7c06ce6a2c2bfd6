//! Single-writer protocol vocabulary.
//!
//! Non-authoritative participants never mutate shared combat/actor state
//! directly; they describe the mutation as a [`Command`] and emit it on the
//! relay channel. The authoritative participant's dispatcher is the only
//! code that turns a command into a state change.
//!
//! Delivery is at-least-once and unordered, so every command is designed to
//! converge under re-application: heals are applied once per intent
//! identity, effect application refreshes by slug, roll patches are keyed
//! on roll identity.

use crate::actor::ActorId;
use crate::effect::CustomEffect;

/// Identity of a recorded roll, for after-the-fact patching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RollId(pub u64);

/// Identity of one relayed intent.
///
/// The emitting participant scopes its own sequence counter with the acting
/// actor, so keys never collide across the table and a re-delivered intent
/// is recognizable without coordination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntentId {
    /// Actor on whose behalf the intent was emitted.
    pub source: ActorId,
    /// Emitter-local sequence number.
    pub seq: u64,
}

/// An intent addressed to the authoritative participant.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// Heal a target by a resolved amount, at most once per intent.
    Heal {
        intent: IntentId,
        target: ActorId,
        amount: i32,
    },
    /// Apply (or refresh) a custom effect on each target.
    ApplyEffect {
        targets: Vec<ActorId>,
        effect: CustomEffect,
    },
    /// Remove a custom effect by slug.
    RemoveEffect { target: ActorId, slug: String },
    /// Patch a recorded roll after a fortune point was spent on it.
    PatchRoll { roll: RollId, bonus: i32 },
    /// Resolve an opposed roll between two actors.
    OppositeRoll {
        attacker: ActorId,
        defender: ActorId,
        attacker_total: i32,
    },
}

impl Command {
    /// Dispatch name, used for relay addressing and logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Heal { .. } => "heal",
            Self::ApplyEffect { .. } => "customEffect",
            Self::RemoveEffect { .. } => "removeEffect",
            Self::PatchRoll { .. } => "patchRoll",
            Self::OppositeRoll { .. } => "oppositeRoll",
        }
    }
}
