//! Typed, sourced stat contributions.
//!
//! A modifier is one contribution from one origin (item or effect) to one
//! target. It is immutable once created, except that `source` is rebound
//! when its owning item is cloned or re-embedded. Whether a modifier counts
//! at all is decided at collection time: action-owned modifiers follow their
//! action's enabled flag, item-level modifiers follow the item.

pub mod aggregate;

pub use aggregate::{Aggregate, EnabledModifier, aggregate, collect_enabled};

use crate::actor::ItemId;
use crate::formula;
use crate::stats::{AbilityKind, CombatStatKind, ResourceKind, Snapshot};

/// What a modifier contributes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModifierTarget {
    Ability(AbilityKind),
    /// Skill checks rolled on an ability, separate from the ability itself.
    SkillRoll(AbilityKind),
    Combat(CombatStatKind),
    Resource(ResourceKind),
    HitPoints,
    Movement,
    DarkVision,
    /// Wildcard: folds into ability and skill-roll aggregation only. Never
    /// counted for combat or resource targets, to avoid double-dipping.
    All,
}

impl ModifierTarget {
    /// Whether an `All` wildcard modifier counts when aggregating for this
    /// target.
    pub const fn accepts_wildcard(&self) -> bool {
        matches!(self, Self::Ability(_) | Self::SkillRoll(_))
    }
}

/// Coarse category of a modifier, derived from its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModifierKind {
    Ability,
    Skill,
    Combat,
    Resource,
    HitPoints,
    Movement,
    Vision,
    All,
}

/// Who an effect-carried modifier is meant for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ApplyScope {
    /// Only the owner of the granting item.
    SelfOnly,
    /// Only targets the effect lands on.
    OthersOnly,
    /// Both.
    #[default]
    All,
}

/// Literal or formula-valued contribution.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModifierValue {
    Literal(i32),
    Formula(String),
}

/// A single sourced contribution.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Modifier {
    /// Item this modifier came from; the rank anchor for its formula.
    pub source: ItemId,
    /// Free-form discriminator carried through from the data ("magic",
    /// "armor", ...); not interpreted by the engine.
    pub subtype: String,
    pub target: ModifierTarget,
    pub scope: ApplyScope,
    pub value: ModifierValue,
}

impl Modifier {
    pub fn literal(source: ItemId, target: ModifierTarget, value: i32) -> Self {
        Self {
            source,
            subtype: String::new(),
            target,
            scope: ApplyScope::default(),
            value: ModifierValue::Literal(value),
        }
    }

    pub fn formula(source: ItemId, target: ModifierTarget, formula: impl Into<String>) -> Self {
        Self {
            source,
            subtype: String::new(),
            target,
            scope: ApplyScope::default(),
            value: ModifierValue::Formula(formula.into()),
        }
    }

    pub const fn kind(&self) -> ModifierKind {
        match self.target {
            ModifierTarget::Ability(_) => ModifierKind::Ability,
            ModifierTarget::SkillRoll(_) => ModifierKind::Skill,
            ModifierTarget::Combat(_) => ModifierKind::Combat,
            ModifierTarget::Resource(_) => ModifierKind::Resource,
            ModifierTarget::HitPoints => ModifierKind::HitPoints,
            ModifierTarget::Movement => ModifierKind::Movement,
            ModifierTarget::DarkVision => ModifierKind::Vision,
            ModifierTarget::All => ModifierKind::All,
        }
    }

    /// Resolve this modifier's numeric contribution against a snapshot.
    ///
    /// Formula values anchor `@rank` on the modifier's own source.
    pub fn evaluate(&self, snapshot: &Snapshot<'_>) -> i32 {
        match &self.value {
            ModifierValue::Literal(value) => *value,
            ModifierValue::Formula(text) => {
                formula::evaluate(snapshot, text, Some(self.source))
            }
        }
    }
}
