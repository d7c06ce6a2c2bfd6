//! Timed custom effects tracked per actor during combat.
//!
//! Effects are appended by resolvers (or a manual apply) and driven by the
//! combat round hooks: decrement and periodic roll at the bearer's turn
//! start, expiry at turn end, full purge when the combat goes away.
//!
//! Re-applying an effect whose slug is already present refreshes the
//! existing record's timer instead of duplicating it, which is also what
//! makes relayed apply-intents safe under at-least-once delivery.

use arrayvec::ArrayVec;

use crate::action::Element;
use crate::actor::{ItemId, StatusKind};
use crate::config::RulesConfig;
use crate::modifier::Modifier;

/// What the effect's duration counts in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectUnit {
    /// Expires after N combat rounds.
    #[default]
    Round,
    /// Lives until the combat ends.
    Combat,
}

/// Direction of the periodic formula.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PeriodicKind {
    Damage,
    Heal,
}

/// A timed status/buff/periodic-formula bundle on one actor.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CustomEffect {
    pub name: String,
    /// Item the effect came from, on the caster's side.
    pub source: ItemId,
    pub statuses: Vec<StatusKind>,
    pub unit: EffectUnit,
    /// Resolved duration in rounds at apply time.
    pub duration: i32,
    /// Combat round the effect (last) landed on.
    pub started_at: u32,
    pub remaining_turns: i32,
    pub modifiers: Vec<Modifier>,
    pub formula_kind: Option<PeriodicKind>,
    /// Periodic formula rolled at the bearer's turn start; empty means none.
    pub formula: String,
    pub element: Element,
    /// Identity for refresh-instead-of-duplicate.
    pub slug: String,
    /// Whether the bearer is also the caster (drives modifier scoping).
    pub self_applied: bool,
}

impl CustomEffect {
    /// Derive a slug from a display name (`"Burning Brand"` → `"burning-brand"`).
    pub fn slug_for(name: &str) -> String {
        name.trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Whether the per-round driver should decrement this effect.
    pub fn counts_rounds(&self) -> bool {
        matches!(self.unit, EffectUnit::Round)
    }
}

/// Work item produced by a turn-start tick: one periodic roll to perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeriodicTick {
    pub slug: String,
    pub name: String,
    pub kind: PeriodicKind,
    pub formula: String,
    pub element: Element,
}

/// The capped per-actor effect list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActiveEffects {
    effects: ArrayVec<CustomEffect, { RulesConfig::MAX_CUSTOM_EFFECTS }>,
}

impl ActiveEffects {
    pub fn iter(&self) -> impl Iterator<Item = &CustomEffect> {
        self.effects.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn get(&self, slug: &str) -> Option<&CustomEffect> {
        self.effects.iter().find(|effect| effect.slug == slug)
    }

    /// Append an effect, refreshing the timer of an existing record with the
    /// same slug instead of duplicating it. When the list is full the effect
    /// is dropped rather than evicting an older one.
    pub fn apply(&mut self, effect: CustomEffect) {
        if let Some(existing) = self
            .effects
            .iter_mut()
            .find(|candidate| candidate.slug == effect.slug)
        {
            existing.started_at = effect.started_at;
            existing.remaining_turns = effect.remaining_turns;
            return;
        }
        if !self.effects.is_full() {
            self.effects.push(effect);
        }
    }

    /// Remove one effect by slug, returning it for status cleanup.
    pub fn remove(&mut self, slug: &str) -> Option<CustomEffect> {
        let index = self.effects.iter().position(|effect| effect.slug == slug)?;
        Some(self.effects.remove(index))
    }

    /// Turn-start tick: decrement every round-counted effect and collect the
    /// periodic rolls to perform. Expiry waits for the turn-end pass.
    pub fn tick_turn_start(&mut self) -> Vec<PeriodicTick> {
        let mut ticks = Vec::new();
        for effect in &mut self.effects {
            if effect.counts_rounds() {
                effect.remaining_turns -= 1;
            }
            if !effect.formula.is_empty()
                && let Some(kind) = effect.formula_kind
            {
                ticks.push(PeriodicTick {
                    slug: effect.slug.clone(),
                    name: effect.name.clone(),
                    kind,
                    formula: effect.formula.clone(),
                    element: effect.element,
                });
            }
        }
        ticks
    }

    /// Turn-end pass: drop every effect whose timer ran out, returning the
    /// removed records so the caller can clear the statuses they applied.
    pub fn expire_turn_end(&mut self) -> Vec<CustomEffect> {
        let mut expired = Vec::new();
        let mut index = 0;
        while index < self.effects.len() {
            if self.effects[index].counts_rounds() && self.effects[index].remaining_turns <= 0 {
                expired.push(self.effects.remove(index));
            } else {
                index += 1;
            }
        }
        expired
    }

    /// Combat teardown: every effect goes, regardless of unit.
    pub fn purge(&mut self) -> Vec<CustomEffect> {
        self.effects.drain(..).collect()
    }

    /// Whether any live effect still grants the given status.
    pub fn still_grants(&self, status: StatusKind) -> bool {
        self.effects
            .iter()
            .any(|effect| effect.statuses.contains(&status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effect(slug: &str, remaining: i32) -> CustomEffect {
        CustomEffect {
            name: slug.to_string(),
            source: ItemId(1),
            statuses: vec![StatusKind::Poisoned],
            unit: EffectUnit::Round,
            duration: remaining,
            started_at: 1,
            remaining_turns: remaining,
            modifiers: Vec::new(),
            formula_kind: Some(PeriodicKind::Damage),
            formula: "1d6".to_string(),
            element: Element::Poison,
            slug: slug.to_string(),
            self_applied: false,
        }
    }

    #[test]
    fn slug_derivation() {
        assert_eq!(CustomEffect::slug_for("Burning Brand"), "burning-brand");
        assert_eq!(CustomEffect::slug_for("  Venom  "), "venom");
    }

    #[test]
    fn reapplying_refreshes_instead_of_duplicating() {
        let mut effects = ActiveEffects::default();
        effects.apply(effect("venom", 3));
        effects.apply(effect("venom", 5));
        assert_eq!(effects.len(), 1);
        assert_eq!(effects.get("venom").unwrap().remaining_turns, 5);
    }

    #[test]
    fn tick_decrements_and_collects_periodic_rolls() {
        let mut effects = ActiveEffects::default();
        effects.apply(effect("venom", 2));
        let ticks = effects.tick_turn_start();
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].formula, "1d6");
        assert_eq!(effects.get("venom").unwrap().remaining_turns, 1);
    }

    #[test]
    fn expiry_happens_at_turn_end() {
        let mut effects = ActiveEffects::default();
        effects.apply(effect("venom", 1));
        effects.tick_turn_start();
        assert_eq!(effects.len(), 1);
        let expired = effects.expire_turn_end();
        assert_eq!(expired.len(), 1);
        assert!(effects.is_empty());
    }

    #[test]
    fn combat_unit_effects_outlive_rounds_but_not_the_combat() {
        let mut venom = effect("aura", 1);
        venom.unit = EffectUnit::Combat;
        let mut effects = ActiveEffects::default();
        effects.apply(venom);
        effects.tick_turn_start();
        assert!(effects.expire_turn_end().is_empty());
        assert_eq!(effects.purge().len(), 1);
        assert!(effects.is_empty());
    }
}
