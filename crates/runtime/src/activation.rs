//! Action activation protocol.
//!
//! One activation runs in three phases:
//!
//! 1. **Preconditions** - stale references no-op silently; empty ammo or
//!    charges reject with a notice; a mana shortfall asks for the mana-burn
//!    sacrifice up front (the roll happens now, the hit-point loss later).
//! 2. **Resolver batch** - every resolver of the action runs concurrently
//!    against an immutable snapshot; a dismissed roll or a failing resolver
//!    aborts the batch.
//! 3. **Commit** - only with the whole batch successful: side effects land,
//!    toggleables flip on, and charge/mana/mana-burn costs are deducted.
//!    Resource commitment always happens strictly after resolver success is
//!    known.

use futures_util::future::join_all;
use tracing::{debug, warn};

use rules_core::{
    ActionBehavior, ActionKind, ActionProperties, Actor, ActorId, Command, EquipmentKind,
    Frequency, Item, ItemId, ItemKind, RulesConfig, Snapshot, evaluate,
};

use crate::engine::Engine;
use crate::error::{Result, RuntimeError};
use crate::events::EngineEvent;
use crate::oracle::{ConfirmRequest, Notice};
use crate::resolve::{self, PendingEffect, ResolveContext};
use crate::store::DocId;

/// How an activation request ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActivationOutcome {
    Activated,
    /// A toggleable action was switched off (resolvers do not re-run).
    Deactivated,
    /// A resource precondition failed; a notice went out, nothing changed.
    Rejected(Notice),
    /// A confirmation was declined; nothing changed.
    Declined,
    /// A roll dialog was dismissed or a resolver reported failure; nothing
    /// was committed.
    Cancelled,
    /// Stale reference or non-activable action; silent no-op.
    Ignored,
}

impl ActivationOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Activated | Self::Deactivated)
    }
}

impl Engine {
    /// Activate (or toggle off) an item's action.
    pub async fn activate_action(
        &mut self,
        actor_id: ActorId,
        item_id: ItemId,
        index: usize,
        shift: bool,
    ) -> Result<ActivationOutcome> {
        let Some(actor) = self.actors.get(&actor_id) else {
            return Err(RuntimeError::UnknownActor(actor_id));
        };
        // Items can be deleted concurrently by another participant; a stale
        // reference is tolerated, not an error.
        let Some(item) = actor.item(item_id) else {
            debug!(actor = actor_id.0, item = item_id.0, "activation of a deleted item");
            return Ok(ActivationOutcome::Ignored);
        };
        let Some(action) = item.actions.get(index) else {
            debug!(actor = actor_id.0, item = item_id.0, index, "activation of a missing action");
            return Ok(ActivationOutcome::Ignored);
        };

        match action.behavior() {
            // Permanent actions follow their item; there is no user step.
            ActionBehavior::Permanent => return Ok(ActivationOutcome::Ignored),
            ActionBehavior::Toggleable if action.is_enabled() => {
                return Ok(self.deactivate(actor_id, item_id, index).await);
            }
            _ => {}
        }

        // Resource preconditions. Nothing is deducted here.
        if let ItemKind::Equipment(equipment) = &item.kind
            && let EquipmentKind::Weapon(weapon) = &equipment.kind
            && weapon.ammo.is_some_and(|ammo| ammo.is_empty())
        {
            let notice = Notice::NoAmmunition {
                item: item.name.clone(),
            };
            self.notifier.notify(notice.clone());
            return Ok(ActivationOutcome::Rejected(notice));
        }
        if let Some(capacity) = item.as_capacity()
            && capacity.frequency != Frequency::AtWill
            && capacity.charges.is_some_and(|charges| charges.is_empty())
        {
            let notice = Notice::NoCharges {
                item: item.name.clone(),
            };
            self.notifier.notify(notice.clone());
            return Ok(ActivationOutcome::Rejected(notice));
        }

        // Mana shortfall: opt-in sacrifice, rolled now, committed later.
        let mut mana_cost = mana_cost(actor, item, action, shift, &self.config);
        let mut burn_loss = 0;
        let available = actor.resources.mana.value;
        if mana_cost > available {
            let shortfall = mana_cost - available;
            self.notifier.notify(Notice::NotEnoughMana { missing: shortfall });
            if !self
                .prompt
                .confirm(ConfirmRequest::ManaBurn { shortfall })
                .await
            {
                return Ok(ActivationOutcome::Declined);
            }
            let die = actor
                .family()
                .map(|family| family.recovery_die())
                .unwrap_or(8);
            let Some(roll) = self.dice.roll(&format!("{shortfall}d{die}")).await else {
                return Ok(ActivationOutcome::Declined);
            };
            burn_loss = roll.total.max(0);
            mana_cost = available;
        }

        // Resolver batch: concurrent, order-independent, no shared mutable
        // state. Effects become visible only at commit.
        let behavior = action.behavior();
        let action_snapshot = action.clone();
        let spend_ammo = matches!(
            &item.kind,
            ItemKind::Equipment(equipment)
                if matches!(&equipment.kind, EquipmentKind::Weapon(weapon) if weapon.ammo.is_some())
        );
        let spend_charge = item
            .as_capacity()
            .is_some_and(|capacity| capacity.charges.is_some() && capacity.frequency != Frequency::AtWill);
        let target_defense = self
            .selection
            .first()
            .and_then(|id| self.actors.get(id))
            .map(|target| target.combat.defense.value);
        let context = ResolveContext {
            actor,
            item,
            config: &self.config,
            dice: &*self.dice,
            selection: &self.selection,
            target_defense,
            round: self.combat.as_ref().map(|tracker| tracker.round()),
        };
        let runs = join_all(
            action_snapshot
                .resolvers
                .iter()
                .map(|resolver| resolve::resolve(&context, &action_snapshot, resolver)),
        )
        .await;

        // Success: every resolver true; an empty batch has nothing to block.
        let mut outcomes = Vec::with_capacity(runs.len());
        for run in runs {
            let Some(outcome) = run else {
                return Ok(ActivationOutcome::Cancelled);
            };
            if !outcome.success {
                return Ok(ActivationOutcome::Cancelled);
            }
            outcomes.push(outcome);
        }

        // ---- commit ----
        for outcome in &outcomes {
            if let Some(report) = outcome.attack {
                let roll = self.record_roll(report.total);
                self.emit(EngineEvent::AttackRolled {
                    actor: actor_id,
                    roll,
                    total: report.total,
                    natural: report.natural,
                    critical: report.critical,
                    success: report.hit,
                });
            }
            for effect in &outcome.effects {
                self.apply_pending(actor_id, item_id, effect.clone()).await;
            }
        }

        if behavior == ActionBehavior::Toggleable
            && let Some(action) = self
                .actors
                .get_mut(&actor_id)
                .and_then(|actor| actor.item_mut(item_id))
                .and_then(|item| item.actions.get_mut(index))
        {
            action.set_enabled(true);
        }

        if let Some(actor) = self.actors.get_mut(&actor_id) {
            if spend_ammo {
                spend_weapon_ammo(actor, item_id);
            }
            if spend_charge
                && let Some(capacity) = actor.item_mut(item_id).and_then(Item::as_capacity_mut)
                && let Some(charges) = capacity.charges.as_mut()
            {
                let _ = charges.spend();
            }
            if mana_cost > 0 {
                let _ = actor.resources.mana.spend(mana_cost);
            }
            if burn_loss > 0 {
                actor.hp.damage(burn_loss);
            }
        }

        self.prepare_actor(actor_id);
        self.persist(actor_id).await;
        self.emit(EngineEvent::ActionActivated {
            actor: actor_id,
            item: item_id,
            index,
        });
        Ok(ActivationOutcome::Activated)
    }

    /// Toggle a running action off. Resolvers never re-run on the way out.
    async fn deactivate(&mut self, actor_id: ActorId, item_id: ItemId, index: usize) -> ActivationOutcome {
        if let Some(action) = self
            .actors
            .get_mut(&actor_id)
            .and_then(|actor| actor.item_mut(item_id))
            .and_then(|item| item.actions.get_mut(index))
        {
            action.set_enabled(false);
        }
        self.prepare_actor(actor_id);
        self.persist(actor_id).await;
        self.emit(EngineEvent::ActionDeactivated {
            actor: actor_id,
            item: item_id,
            index,
        });
        ActivationOutcome::Deactivated
    }

    /// Apply one committed resolver effect, locally or via the relay.
    async fn apply_pending(&mut self, caster: ActorId, item_id: ItemId, effect: PendingEffect) {
        match effect {
            PendingEffect::Damage {
                target,
                amount,
                element,
            } => {
                if self.is_authority() || target == caster {
                    self.apply_damage(target, amount, element);
                    self.persist(target).await;
                } else {
                    // Damage on someone else's sheet is the authority's to
                    // apply from its own view of the same activation.
                    debug!(target = target.0, amount, "damage left to the authority");
                }
            }
            PendingEffect::Heal { target, amount } => {
                if self.is_authority() || target == caster {
                    self.apply_heal(target, amount);
                    self.persist(target).await;
                } else {
                    let intent = self.next_intent(caster);
                    self.relay.emit(Command::Heal {
                        intent,
                        target,
                        amount,
                    });
                }
            }
            PendingEffect::ApplyEffect { target, effect } => {
                if self.is_authority() || target == caster {
                    self.commit_effect(target, effect, Some(caster));
                    self.persist(target).await;
                } else {
                    self.relay.emit(Command::ApplyEffect {
                        targets: vec![target],
                        effect,
                    });
                }
            }
            PendingEffect::Consume => self.consume_item(caster, item_id).await,
        }
    }

    /// Spend one use of a consumable, deleting the item when the last use
    /// goes and the data says so.
    async fn consume_item(&mut self, actor_id: ActorId, item_id: ItemId) {
        let destroyed = {
            let Some(actor) = self.actors.get_mut(&actor_id) else {
                return;
            };
            let Some(item) = actor.item_mut(item_id) else {
                return;
            };
            let ItemKind::Equipment(equipment) = &mut item.kind else {
                return;
            };
            let EquipmentKind::Consumable(consumable) = &mut equipment.kind else {
                return;
            };
            consumable.quantity = consumable.quantity.saturating_sub(1);
            let destroyed = consumable.quantity == 0 && consumable.destroy_on_empty;
            if destroyed {
                actor.delete_item(item_id);
            }
            destroyed
        };
        if destroyed
            && let Err(error) = self
                .store
                .delete_embedded(&DocId::actor(actor_id), "Item", vec![item_id.0.to_string()])
                .await
        {
            warn!(%error, actor = actor_id.0, "failed to mirror consumable deletion");
        }
    }
}

fn spend_weapon_ammo(actor: &mut Actor, item_id: ItemId) {
    if let Some(item) = actor.item_mut(item_id)
        && let ItemKind::Equipment(equipment) = &mut item.kind
        && let EquipmentKind::Weapon(weapon) = &mut equipment.kind
        && let Some(ammo) = weapon.ammo.as_mut()
    {
        let _ = ammo.spend();
    }
}

/// Computed mana cost of activating this action.
///
/// Only spell capacities cost mana; the concentration shift-modifier on an
/// attack action shaves the fixed discount off.
fn mana_cost(
    actor: &Actor,
    item: &Item,
    action: &rules_core::Action,
    shift: bool,
    config: &RulesConfig,
) -> i32 {
    if action.properties.contains(ActionProperties::NO_MANA_COST) {
        return 0;
    }
    let Some(capacity) = item.as_capacity() else {
        return 0;
    };
    if !capacity.spell || capacity.mana_cost.is_empty() {
        return 0;
    }
    let snapshot = Snapshot::new(actor, config);
    let mut cost = evaluate(&snapshot, &capacity.mana_cost, Some(item.id));
    if shift && action.kind == ActionKind::Attack {
        cost -= RulesConfig::CONCENTRATION_DISCOUNT;
    }
    cost.max(0)
}
