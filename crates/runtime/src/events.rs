//! Events emitted by the engine during play.
//!
//! The presentation layer subscribes to these instead of polling state.
//! Events are descriptive, not authoritative: the engine has already
//! committed (or refused) the change by the time one is published.

use rules_core::{ActorId, Element, ItemId, RollId};

/// One observable engine happening.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// A toggleable or instantaneous action ran its resolvers successfully.
    ActionActivated {
        actor: ActorId,
        item: ItemId,
        index: usize,
    },
    /// A toggleable action was switched off.
    ActionDeactivated {
        actor: ActorId,
        item: ItemId,
        index: usize,
    },
    /// An attack roll resolved (hit or miss).
    AttackRolled {
        actor: ActorId,
        roll: RollId,
        total: i32,
        natural: i32,
        critical: bool,
        success: bool,
    },
    /// A skill check resolved.
    SkillRolled {
        actor: ActorId,
        roll: RollId,
        total: i32,
    },
    /// Damage landed on a target.
    DamageApplied {
        target: ActorId,
        amount: i32,
        element: Element,
    },
    /// Healing landed on a target.
    Healed { target: ActorId, amount: i32 },
    /// A custom effect was applied or refreshed.
    EffectApplied { target: ActorId, slug: String },
    /// A custom effect timed out and was removed.
    EffectExpired { target: ActorId, slug: String },
    /// A combatant's turn began.
    TurnStarted { actor: ActorId, round: u32 },
    /// The combat encounter ended; every effect was purged.
    CombatEnded,
    /// A recorded roll was improved with a fortune point.
    RollPatched { roll: RollId, bonus: i32 },
    /// An opposed roll was resolved by the authority.
    OppositeRollResolved {
        attacker: ActorId,
        defender: ActorId,
        attacker_total: i32,
        defender_total: i32,
    },
    /// Derived state changed outside the cases above (rest, learn, equip).
    StateChanged { actor: ActorId },
}
