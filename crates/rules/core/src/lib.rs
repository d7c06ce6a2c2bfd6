//! Deterministic ruleset evaluation shared across participants.
//!
//! `rules-core` defines the canonical rules (formulas, modifiers, actions,
//! effects, stat derivation) and exposes pure APIs that can be reused by both
//! the runtime and offline tools. All derived values flow through
//! [`stats::pipeline::prepare`], and supporting crates depend on the types
//! re-exported here.
pub mod action;
pub mod actor;
pub mod command;
pub mod config;
pub mod effect;
pub mod error;
pub mod formula;
pub mod modifier;
pub mod stats;

pub use action::{
    Action, ActionBehavior, ActionCondition, ActionKind, ActionProperties, AdditionalEffect,
    ApplyOn, DamageSpec, Element, Resolver, ResolverKind, SkillSpec, TargetScope, TargetSpec,
};
pub use actor::{
    Actor, ActorId, ActorKind, ArchetypeFamily, ArmorData, CapacityData, Charges, ConsumableData,
    EquipError, EquipmentData, EquipmentKind, Frequency, Item, ItemId, ItemKind, LearnError,
    PathData, ProfileData, ShieldData, StatusKind, Statuses, WeaponData,
};
pub use command::{Command, IntentId, RollId};
pub use config::{DifficultyDisplay, RulesConfig};
pub use effect::{ActiveEffects, CustomEffect, EffectUnit, PeriodicKind, PeriodicTick};
pub use error::{ErrorSeverity, RulesError};
pub use formula::{evaluate, evaluate_keep_dice};
pub use modifier::{
    Aggregate, ApplyScope, EnabledModifier, Modifier, ModifierTarget, ModifierValue, aggregate,
    collect_enabled,
};
pub use stats::{
    Abilities, Ability, AbilityKind, CombatStat, CombatStatKind, CombatStats, HitPoints,
    ResourceKind, ResourcePool, ResourcePools, Snapshot, prepare,
};
