//! Single-writer authority dispatch.
//!
//! Exactly one participant runs with [`crate::engine::Role::Authority`]; its
//! engine is the only one that turns relayed [`Command`]s into durable state
//! changes. Delivery is at-least-once and unordered, so every handler is
//! written to converge under re-application: heals are applied once per
//! intent identity, effect application refreshes by slug, roll patches are
//! keyed on roll identity.

use tracing::debug;

use rules_core::{Command, prepare};

use crate::engine::Engine;
use crate::events::EngineEvent;

impl Engine {
    /// Apply one relayed intent. Non-authoritative engines ignore traffic
    /// addressed to the table.
    pub async fn apply_command(&mut self, command: Command) {
        if !self.is_authority() {
            debug!(action = command.name(), "ignoring relayed command without authority");
            return;
        }
        debug!(action = command.name(), "authority dispatch");

        match command {
            Command::Heal {
                intent,
                target,
                amount,
            } => {
                // A re-delivered intent must not heal twice.
                if !self.applied_intents.insert(intent) {
                    debug!(?intent, "duplicate heal intent ignored");
                    return;
                }
                self.apply_heal(target, amount);
                self.persist(target).await;
            }
            Command::ApplyEffect { targets, effect } => {
                for target in targets {
                    self.commit_effect(target, effect.clone(), None);
                    self.persist(target).await;
                }
            }
            Command::RemoveEffect { target, slug } => {
                let removed = {
                    let Some(actor) = self.actors.get_mut(&target) else {
                        return;
                    };
                    let removed = actor.effects.remove(&slug);
                    if let Some(effect) = &removed {
                        for status in &effect.statuses {
                            if !actor.effects.still_grants(*status) {
                                actor.statuses.remove(*status);
                            }
                        }
                        prepare(actor, &self.config);
                    }
                    removed
                };
                if removed.is_some() {
                    self.persist(target).await;
                    self.emit(EngineEvent::EffectExpired { target, slug });
                }
            }
            Command::PatchRoll { roll, bonus } => {
                if let Some(record) = self.rolls.get_mut(&roll)
                    && record.fortune_bonus.is_none()
                {
                    record.fortune_bonus = Some(bonus);
                    record.total += bonus;
                    self.emit(EngineEvent::RollPatched { roll, bonus });
                }
            }
            Command::OppositeRoll {
                attacker,
                defender,
                attacker_total,
            } => {
                let Some(value) = self
                    .actors
                    .get(&defender)
                    .map(|actor| actor.combat.melee.value)
                else {
                    return;
                };
                let Some(roll) = self.dice.roll(&format!("1d20 + {value}")).await else {
                    return;
                };
                self.emit(EngineEvent::OppositeRollResolved {
                    attacker,
                    defender,
                    attacker_total,
                    defender_total: roll.total,
                });
            }
        }
    }
}
