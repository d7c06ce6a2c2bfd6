//! Resolver data model: the executable payload of an action.
//!
//! Resolvers are read-only at resolve time; the runtime clones them and
//! substitutes formulas into the transient copy. Execution itself lives in
//! the runtime crate, dispatched on the closed [`ResolverKind`] enum.

use strum::{Display, EnumIter};

use crate::actor::StatusKind;
use crate::modifier::ApplyScope;

/// The closed set of resolver kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResolverKind {
    /// Melee attack roll plus damage.
    Melee,
    /// Ranged attack roll plus damage.
    Ranged,
    /// Magic attack roll plus damage.
    Magical,
    /// Damage without a to-hit roll.
    Auto,
    Heal,
    Consumable,
    BuffDebuff,
}

impl ResolverKind {
    /// Kinds that put a to-hit roll on the table.
    pub const fn is_attack(&self) -> bool {
        matches!(self, Self::Melee | Self::Ranged | Self::Magical)
    }
}

/// Skill-roll half of an attack resolver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkillSpec {
    pub formula: String,
    /// Natural-roll critical threshold override; 0 means "use the stat".
    pub crit: i32,
    /// Difficulty formula, if the data fixes one.
    pub difficulty: Option<String>,
}

/// Damage half of an attack resolver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageSpec {
    pub formula: String,
}

/// Who the resolver lands on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetScope {
    #[default]
    SingleEnemy,
    AllEnemies,
    SingleAlly,
    AllAllies,
    Caster,
}

/// Target selection: scope plus how many, for the multi-target scopes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetSpec {
    pub scope: TargetScope,
    pub number: u8,
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self {
            scope: TargetScope::default(),
            number: 1,
        }
    }
}

/// When the additional effect triggers relative to the attack outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ApplyOn {
    #[default]
    Success,
    Failure,
    Always,
}

/// Damage/heal element tag carried through to effects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Element {
    #[default]
    None,
    Fire,
    Frost,
    Lightning,
    Poison,
    Radiant,
}

/// Timed effect spawned alongside the resolver's main outcome.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdditionalEffect {
    pub active: bool,
    pub apply_on: ApplyOn,
    pub statuses: Vec<StatusKind>,
    /// Duration formula, evaluated against the caster.
    pub duration: String,
    pub unit: crate::effect::EffectUnit,
    /// Periodic damage/heal formula; empty means none.
    pub formula: String,
    pub element: Element,
    /// Set when the effect carries the action's modifiers as a buff/debuff.
    pub buff: bool,
    pub scope: ApplyScope,
}

/// One executable effect of an action.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resolver {
    pub kind: ResolverKind,
    pub skill: SkillSpec,
    pub dmg: DamageSpec,
    pub target: TargetSpec,
    pub additional_effect: AdditionalEffect,
}

impl Resolver {
    pub fn new(kind: ResolverKind) -> Self {
        Self {
            kind,
            skill: SkillSpec::default(),
            dmg: DamageSpec::default(),
            target: TargetSpec::default(),
            additional_effect: AdditionalEffect::default(),
        }
    }

    pub fn with_skill(mut self, formula: impl Into<String>) -> Self {
        self.skill.formula = formula.into();
        self
    }

    pub fn with_damage(mut self, formula: impl Into<String>) -> Self {
        self.dmg.formula = formula.into();
        self
    }
}
