//! Per-actor derivation pipeline.
//!
//! Runs once whenever an actor's underlying data has been prepared or
//! mutated. Stages execute in a strict order; a later stage may read what an
//! earlier stage derived within the same pass, never the reverse. Formulas
//! read whatever the actor holds at the moment they are evaluated, which is
//! exactly how the circular stats → formulas → modifiers → stats dependency
//! stays well-defined: fixed order, no fixpoint iteration.

use strum::IntoEnumIterator;

use crate::actor::{Actor, ActorKind, ItemKind, StatusKind};
use crate::config::RulesConfig;
use crate::modifier::{ModifierTarget, aggregate, collect_enabled};
use crate::stats::{AbilityKind, CombatStatKind, ResourceKind, Snapshot};

/// Recompute every derived field on the actor.
pub fn prepare(actor: &mut Actor, config: &RulesConfig) {
    prepare_abilities(actor, config);
    prepare_hit_points(actor, config);
    prepare_combat_stats(actor, config);
    prepare_resources(actor, config);
    prepare_movement_and_vision(actor, config);
    sync_hp_statuses(actor);
}

fn modifier_total(actor: &Actor, config: &RulesConfig, target: ModifierTarget) -> i32 {
    let snapshot = Snapshot::new(actor, config);
    let enabled = collect_enabled(actor);
    aggregate(&snapshot, &enabled, target).total
}

/// Stage 1: ability values and modifiers, with the heavy-armor agility cap.
fn prepare_abilities(actor: &mut Actor, config: &RulesConfig) {
    let agility_cap = actor
        .first_equipped_armor()
        .and_then(|armor| armor.agility_cap);

    for kind in AbilityKind::iter() {
        let total = modifier_total(actor, config, ModifierTarget::Ability(kind));
        let ceiling = (kind == AbilityKind::Agility)
            .then_some(agility_cap)
            .flatten();
        actor.abilities.get_mut(kind).recompute(total, ceiling);
    }
}

/// Stage 2: maximum hit points.
///
/// Characters scale with level, archetype family, and constitution, plus any
/// prestige-path bonus per learned capacity; encounters use their flat base.
fn prepare_hit_points(actor: &mut Actor, config: &RulesConfig) {
    let total = modifier_total(actor, config, ModifierTarget::HitPoints);
    let con_mod = actor.abilities.constitution.modifier;

    let max = match actor.kind {
        ActorKind::Character => {
            let per_level = actor
                .family()
                .map(|family| family.hp_per_level())
                .unwrap_or(4);
            (per_level + con_mod) * actor.level + total + prestige_hp_bonus(actor)
        }
        ActorKind::Encounter { base_hp, .. } => base_hp + total,
    };
    actor.hp.set_max(max.max(0));
}

fn prestige_hp_bonus(actor: &Actor) -> i32 {
    actor
        .items
        .iter()
        .filter_map(|item| match &item.kind {
            ItemKind::Path(path) if path.prestige_hp_per_capacity > 0 => {
                Some(path.prestige_hp_per_capacity * actor.path_rank(item.id))
            }
            _ => None,
        })
        .sum()
}

/// Stage 3: combat stats.
///
/// The critical threshold runs backwards (contributions lower it) and is
/// floored; everything else is base + equipment + bonuses + modifiers.
fn prepare_combat_stats(actor: &mut Actor, config: &RulesConfig) {
    for kind in CombatStatKind::iter() {
        let total = modifier_total(actor, config, ModifierTarget::Combat(kind));
        let abilities = &actor.abilities;
        let level_bonus = config.level_bonus(actor.effective_level());

        let base = match kind {
            CombatStatKind::Melee => level_bonus + abilities.strength.modifier,
            CombatStatKind::Ranged => level_bonus + abilities.agility.modifier,
            CombatStatKind::Magic => level_bonus + abilities.charisma.modifier,
            CombatStatKind::Initiative => config.base_initiative + abilities.agility.value,
            CombatStatKind::Defense => config.base_defense + abilities.agility.modifier,
            CombatStatKind::Critical => config.base_critical,
            CombatStatKind::DamageReduction => 0,
        };

        let equipment = match kind {
            CombatStatKind::Defense => {
                actor
                    .first_equipped_armor()
                    .map(|armor| armor.defense)
                    .unwrap_or(0)
                    + actor
                        .first_equipped_shield()
                        .map(|shield| shield.defense)
                        .unwrap_or(0)
            }
            _ => 0,
        };

        let stat = actor.combat.get_mut(kind);
        stat.base = base;
        stat.value = match kind {
            CombatStatKind::Critical => {
                (base - stat.bonuses.total() - total).max(config.critical_floor)
            }
            _ => base + equipment + stat.bonuses.total() + total,
        };
    }
}

/// Stage 4: resource pool maximums.
///
/// Mana stays at zero until the actor knows at least one spell.
fn prepare_resources(actor: &mut Actor, config: &RulesConfig) {
    for kind in ResourceKind::iter() {
        let total = modifier_total(actor, config, ModifierTarget::Resource(kind));
        let abilities = &actor.abilities;
        let base = match kind {
            ResourceKind::Fortune => config.base_fortune + abilities.charisma.modifier,
            ResourceKind::Recovery => config.base_recovery + abilities.constitution.modifier,
            ResourceKind::Mana => {
                let spells = actor.learned_spell_count() as i32;
                if spells == 0 {
                    0
                } else {
                    let family_bonus = actor
                        .family()
                        .map(|family| family.mana_bonus())
                        .unwrap_or(0);
                    abilities.charisma.modifier + spells + family_bonus
                }
            }
        };

        let pool = actor.resources.get_mut(kind);
        pool.base = base;
        if base == 0 && kind == ResourceKind::Mana {
            pool.set_max(0);
        } else {
            pool.set_max(base + total);
        }
    }
}

/// Stage 5: movement, and the darkvision toggle read by the renderer.
fn prepare_movement_and_vision(actor: &mut Actor, config: &RulesConfig) {
    let total = modifier_total(actor, config, ModifierTarget::Movement);
    actor.movement = (config.base_movement + total).max(0);

    let dark_vision = collect_enabled(actor)
        .iter()
        .any(|entry| entry.modifier.target == ModifierTarget::DarkVision);
    actor.dark_vision = dark_vision;
}

/// Stage 6: hit-point-triggered status synchronization.
///
/// Only entries applied by this stage are ever cleared by it; a status the
/// user applied by hand stays put.
fn sync_hp_statuses(actor: &mut Actor) {
    match actor.hp.value {
        0 => {
            actor.statuses.remove_hp_linked(StatusKind::Weakened);
            actor.statuses.apply_hp_linked(StatusKind::Unconscious);
        }
        1 => {
            actor.statuses.remove_hp_linked(StatusKind::Unconscious);
            actor.statuses.apply_hp_linked(StatusKind::Weakened);
        }
        _ => {
            actor.statuses.remove_hp_linked(StatusKind::Weakened);
            actor.statuses.remove_hp_linked(StatusKind::Unconscious);
        }
    }
}
