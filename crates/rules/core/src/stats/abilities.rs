//! Abilities - the six stored attributes every other stat derives from.
//!
//! `base` and the two bonus slots are stored state (user edits); `value` and
//! `modifier` are derived fields owned by the pipeline.
//!
//! Formulas:
//! - value = base + bonuses.sheet + bonuses.effects + Σmodifiers(ability)
//! - mod   = floor(value / 2) − 5, floored at −4 for value < 4

use strum::EnumIter;

/// The six abilities that define an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AbilityKind {
    /// Physical power, melee attack.
    Strength,
    /// Speed and reflexes, ranged attack, initiative, defense.
    Agility,
    /// Health and stamina, recovery.
    Constitution,
    /// Reasoning and knowledge.
    Intellect,
    /// Senses and intuition.
    Perception,
    /// Force of personality, magic attack, fortune, mana.
    Charisma,
}

impl AbilityKind {
    /// Formula shortcut token (without the leading `@`).
    pub const fn shortcut(&self) -> &'static str {
        match self {
            Self::Strength => "str",
            Self::Agility => "agi",
            Self::Constitution => "con",
            Self::Intellect => "int",
            Self::Perception => "per",
            Self::Charisma => "cha",
        }
    }
}

/// Stored bonus slots for a single ability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityBonuses {
    /// Hand-entered sheet bonus.
    pub sheet: i32,
    /// Bonus granted by long-lived effects, edited alongside the sheet.
    pub effects: i32,
}

/// A single ability record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ability {
    pub base: i32,
    pub bonuses: AbilityBonuses,
    /// Derived: recomputed each pipeline pass.
    pub value: i32,
    /// Derived: the roll modifier for this ability.
    pub modifier: i32,
}

impl Ability {
    pub fn with_base(base: i32) -> Self {
        let mut ability = Self {
            base,
            ..Self::default()
        };
        ability.recompute(0, None);
        ability
    }

    /// Recompute `value` and `modifier` from stored state plus the modifier
    /// total, optionally clamped to a ceiling (heavy armor on agility).
    pub fn recompute(&mut self, modifier_total: i32, ceiling: Option<i32>) {
        let mut value = self.base + self.bonuses.sheet + self.bonuses.effects + modifier_total;
        if let Some(cap) = ceiling {
            value = value.min(cap);
        }
        self.value = value;
        self.modifier = Self::modifier_for(value);
    }

    /// Roll modifier for an ability value.
    ///
    /// floor(value/2) − 5; everything below 4 collapses to −4.
    pub fn modifier_for(value: i32) -> i32 {
        if value < 4 { -4 } else { value / 2 - 5 }
    }
}

/// All six ability records.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Abilities {
    pub strength: Ability,
    pub agility: Ability,
    pub constitution: Ability,
    pub intellect: Ability,
    pub perception: Ability,
    pub charisma: Ability,
}

impl Abilities {
    /// All abilities at the given base value.
    pub fn uniform(base: i32) -> Self {
        Self {
            strength: Ability::with_base(base),
            agility: Ability::with_base(base),
            constitution: Ability::with_base(base),
            intellect: Ability::with_base(base),
            perception: Ability::with_base(base),
            charisma: Ability::with_base(base),
        }
    }

    pub fn get(&self, kind: AbilityKind) -> &Ability {
        match kind {
            AbilityKind::Strength => &self.strength,
            AbilityKind::Agility => &self.agility,
            AbilityKind::Constitution => &self.constitution,
            AbilityKind::Intellect => &self.intellect,
            AbilityKind::Perception => &self.perception,
            AbilityKind::Charisma => &self.charisma,
        }
    }

    pub fn get_mut(&mut self, kind: AbilityKind) -> &mut Ability {
        match kind {
            AbilityKind::Strength => &mut self.strength,
            AbilityKind::Agility => &mut self.agility,
            AbilityKind::Constitution => &mut self.constitution,
            AbilityKind::Intellect => &mut self.intellect,
            AbilityKind::Perception => &mut self.perception,
            AbilityKind::Charisma => &mut self.charisma,
        }
    }
}
