//! Combat stats derived from abilities, level, and equipment.
//!
//! `base` is recomputed each pass from the linked ability and level; `value`
//! folds in equipment defense, modifier totals, and the stored bonus slots.
//! The critical threshold runs backwards: contributions lower it, and it
//! never drops below the configured floor.

use strum::EnumIter;

use super::abilities::AbilityKind;

/// The derived combat statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CombatStatKind {
    /// Melee attack.
    Melee,
    /// Ranged attack.
    Ranged,
    /// Magic attack.
    Magic,
    /// Turn-order score.
    Initiative,
    /// Difficulty to be hit.
    Defense,
    /// Natural-roll threshold for critical hits.
    Critical,
    /// Flat reduction applied to incoming damage.
    DamageReduction,
}

impl CombatStatKind {
    /// Ability feeding this stat's base, if any.
    pub const fn linked_ability(&self) -> Option<AbilityKind> {
        match self {
            Self::Melee => Some(AbilityKind::Strength),
            Self::Ranged => Some(AbilityKind::Agility),
            Self::Magic => Some(AbilityKind::Charisma),
            Self::Initiative => Some(AbilityKind::Agility),
            Self::Defense => Some(AbilityKind::Agility),
            Self::Critical | Self::DamageReduction => None,
        }
    }

    /// Formula shortcut token (without the leading `@`), if the stat is
    /// exposed to the DSL.
    pub const fn shortcut(&self) -> Option<&'static str> {
        match self {
            Self::Melee => Some("atc"),
            Self::Ranged => Some("atd"),
            Self::Magic => Some("atm"),
            Self::Defense => Some("def"),
            Self::Initiative => Some("init"),
            Self::Critical | Self::DamageReduction => None,
        }
    }
}

/// Stored bonus slots shared by combat stats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatBonuses {
    pub sheet: i32,
    pub effects: i32,
}

impl StatBonuses {
    pub fn total(&self) -> i32 {
        self.sheet + self.effects
    }
}

/// A single combat stat record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatStat {
    /// Derived: recomputed each pass from ability + level (+ config base).
    pub base: i32,
    pub bonuses: StatBonuses,
    /// Derived: base + equipment + bonuses + modifier total.
    pub value: i32,
}

/// All combat stat records.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatStats {
    pub melee: CombatStat,
    pub ranged: CombatStat,
    pub magic: CombatStat,
    pub initiative: CombatStat,
    pub defense: CombatStat,
    pub critical: CombatStat,
    pub damage_reduction: CombatStat,
}

impl CombatStats {
    pub fn get(&self, kind: CombatStatKind) -> &CombatStat {
        match kind {
            CombatStatKind::Melee => &self.melee,
            CombatStatKind::Ranged => &self.ranged,
            CombatStatKind::Magic => &self.magic,
            CombatStatKind::Initiative => &self.initiative,
            CombatStatKind::Defense => &self.defense,
            CombatStatKind::Critical => &self.critical,
            CombatStatKind::DamageReduction => &self.damage_reduction,
        }
    }

    pub fn get_mut(&mut self, kind: CombatStatKind) -> &mut CombatStat {
        match kind {
            CombatStatKind::Melee => &mut self.melee,
            CombatStatKind::Ranged => &mut self.ranged,
            CombatStatKind::Magic => &mut self.magic,
            CombatStatKind::Initiative => &mut self.initiative,
            CombatStatKind::Defense => &mut self.defense,
            CombatStatKind::Critical => &mut self.critical,
            CombatStatKind::DamageReduction => &mut self.damage_reduction,
        }
    }
}
