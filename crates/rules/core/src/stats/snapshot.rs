//! Read-only view of an actor for formula evaluation.
//!
//! The snapshot bundles the actor with the rules config and exposes exactly
//! what the DSL can reach: the shortcut table, rank resolution, and the
//! equipped-weapon formulas. Evaluation reads whatever the pipeline has
//! already derived at the time of the call; the fixed stage order is what
//! keeps that well-defined.

use crate::actor::{Actor, ItemId};
use crate::config::RulesConfig;

/// Borrowed evaluation view over an actor.
#[derive(Clone, Copy)]
pub struct Snapshot<'a> {
    actor: &'a Actor,
    config: &'a RulesConfig,
}

impl<'a> Snapshot<'a> {
    pub fn new(actor: &'a Actor, config: &'a RulesConfig) -> Self {
        Self { actor, config }
    }

    pub fn actor(&self) -> &'a Actor {
        self.actor
    }

    pub fn config(&self) -> &'a RulesConfig {
        self.config
    }

    pub fn level(&self) -> i32 {
        self.actor.effective_level()
    }

    /// Value behind a shortcut token (without the `@`), if recognized.
    ///
    /// Ability tokens substitute the roll modifier; combat tokens and `init`
    /// substitute the stat value; `lvl` the level; `hp` current hit points.
    pub fn shortcut(&self, token: &str) -> Option<i32> {
        let abilities = &self.actor.abilities;
        let combat = &self.actor.combat;
        let value = match token {
            "str" => abilities.strength.modifier,
            "agi" => abilities.agility.modifier,
            "con" => abilities.constitution.modifier,
            "int" => abilities.intellect.modifier,
            "per" => abilities.perception.modifier,
            "cha" => abilities.charisma.modifier,
            "atc" => combat.melee.value,
            "atd" => combat.ranged.value,
            "atm" => combat.magic.value,
            "def" => combat.defense.value,
            "init" => combat.initiative.value,
            "lvl" => self.level(),
            "hp" => self.actor.hp.value,
            _ => return None,
        };
        Some(value)
    }

    /// Progression rank anchored at the given source item.
    pub fn rank_for(&self, source: Option<ItemId>) -> Option<i32> {
        self.actor.rank_for(source?)
    }

    /// How many of the actor's paths have reached the given rank.
    pub fn paths_at_rank(&self, rank: i32) -> i32 {
        self.actor.paths_at_rank(rank)
    }

    /// Evolving die size for this actor's level band.
    pub fn evolving_die(&self) -> u32 {
        self.config.evolving_die(self.level())
    }

    /// Damage and skill formulas of the first equipped weapon's primary
    /// action, or the bare-hands fallback.
    pub fn weapon_formulas(&self) -> (String, String) {
        if let Some(weapon) = self.actor.first_equipped_weapon()
            && let Some(action) = weapon.primary_action()
            && let Some(resolver) = action.resolvers.first()
        {
            return (resolver.dmg.formula.clone(), resolver.skill.formula.clone());
        }
        (
            RulesConfig::UNARMED_DAMAGE.to_string(),
            RulesConfig::UNARMED_SKILL.to_string(),
        )
    }
}
