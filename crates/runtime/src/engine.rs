//! Per-participant engine state.
//!
//! Each participant of a table runs one [`Engine`] around its own copy of
//! the actors. The engine owns every entry point the presentation layer may
//! call, reruns the derivation pipeline after each committed mutation, and
//! mirrors committed state into the document store. Whether a mutation of
//! *shared* state is applied locally or relayed to the authority is decided
//! by [`Role`]; see the activation and authority modules.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use rules_core::{
    AbilityKind, Actor, ActorId, CombatStatKind, Command, CustomEffect, Element, EquipError,
    Frequency, IntentId, Item, ItemId, LearnError, ModifierTarget, PeriodicKind, RollId,
    RulesConfig, Snapshot, aggregate, collect_enabled, evaluate_keep_dice, prepare,
};

use crate::combat::{CombatTracker, TurnChange};
use crate::error::{Result, RuntimeError};
use crate::events::EngineEvent;
use crate::oracle::{
    AutoConfirm, ConfirmRequest, DiceOracle, LogNotifier, Notice, Notifier, Prompt, RngDice, Roll,
};
use crate::relay::RelayChannel;
use crate::store::{DocId, DocumentStore, MemoryStore};

/// Which participant this engine belongs to.
///
/// Exactly one participant per table runs with [`Role::Authority`]; it is
/// the only engine that durably mutates shared combat/actor state. Everyone
/// else submits intents over the relay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Authority,
    Player,
}

/// A roll the engine has recorded, patchable once with a fortune point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordedRoll {
    pub total: i32,
    /// Set once the roll was improved; re-applying the same patch is a no-op.
    pub fortune_bonus: Option<i32>,
}

/// One participant's rules engine.
pub struct Engine {
    pub(crate) role: Role,
    pub(crate) config: RulesConfig,
    pub(crate) actors: HashMap<ActorId, Actor>,
    pub(crate) combat: Option<CombatTracker>,
    /// The user's current target selection, in selection order.
    pub(crate) selection: Vec<ActorId>,
    pub(crate) rolls: HashMap<RollId, RecordedRoll>,
    pub(crate) next_roll: u64,
    /// Emitter-local sequence for relayed intents.
    pub(crate) next_intent_seq: u64,
    /// Intents this (authoritative) engine has already applied.
    pub(crate) applied_intents: HashSet<IntentId>,
    pub(crate) dice: Arc<dyn DiceOracle>,
    pub(crate) prompt: Arc<dyn Prompt>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) relay: RelayChannel,
    pub(crate) events: broadcast::Sender<EngineEvent>,
}

impl Engine {
    pub fn new(role: Role, config: RulesConfig) -> Self {
        let (events, _) = broadcast::channel(128);
        Self {
            role,
            config,
            actors: HashMap::new(),
            combat: None,
            selection: Vec::new(),
            rolls: HashMap::new(),
            next_roll: 1,
            next_intent_seq: 0,
            applied_intents: HashSet::new(),
            dice: Arc::new(RngDice),
            prompt: Arc::new(AutoConfirm),
            notifier: Arc::new(LogNotifier),
            store: Arc::new(MemoryStore::new()),
            relay: RelayChannel::default(),
            events,
        }
    }

    pub fn with_dice(mut self, dice: Arc<dyn DiceOracle>) -> Self {
        self.dice = dice;
        self
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn Prompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = store;
        self
    }

    /// Join a table: every participant shares one relay.
    pub fn with_relay(mut self, relay: RelayChannel) -> Self {
        self.relay = relay;
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_authority(&self) -> bool {
        self.role == Role::Authority
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    pub fn relay(&self) -> &RelayChannel {
        &self.relay
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn combat(&self) -> Option<&CombatTracker> {
        self.combat.as_ref()
    }

    pub fn recorded_roll(&self, id: RollId) -> Option<&RecordedRoll> {
        self.rolls.get(&id)
    }

    /// Register an actor: derive everything, then open at full health and
    /// full pools.
    pub fn add_actor(&mut self, mut actor: Actor) {
        prepare(&mut actor, &self.config);
        actor.refill_all();
        self.actors.insert(actor.id, actor);
    }

    /// Replace the user's target selection.
    pub fn set_targets(&mut self, targets: Vec<ActorId>) {
        self.selection = targets;
    }

    /// The actions a sheet currently shows: visible flag plus every
    /// attached condition, as `(item, action index)` pairs.
    pub fn visible_actions(&self, id: ActorId) -> Vec<(ItemId, usize)> {
        let Some(actor) = self.actors.get(&id) else {
            return Vec::new();
        };
        actor
            .items
            .iter()
            .flat_map(|item| {
                item.actions
                    .iter()
                    .enumerate()
                    .filter(|(_, action)| action.is_visible(actor, item))
                    .map(|(index, _)| (item.id, index))
            })
            .collect()
    }

    pub(crate) fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn prepare_actor(&mut self, id: ActorId) {
        if let Some(actor) = self.actors.get_mut(&id) {
            prepare(actor, &self.config);
        }
    }

    /// Mirror the actor's committed state into the document store.
    pub(crate) async fn persist(&self, id: ActorId) {
        let Some(actor) = self.actors.get(&id) else {
            return;
        };
        match serde_json::to_value(actor) {
            Ok(value) => {
                if let Err(error) = self.store.update(&DocId::actor(id), value).await {
                    warn!(%error, actor = id.0, "failed to persist actor");
                }
            }
            Err(error) => warn!(%error, actor = id.0, "failed to serialize actor"),
        }
    }

    /// Fresh identity for a relayed intent emitted on behalf of an actor.
    pub(crate) fn next_intent(&mut self, source: ActorId) -> IntentId {
        self.next_intent_seq += 1;
        IntentId {
            source,
            seq: self.next_intent_seq,
        }
    }

    pub(crate) fn record_roll(&mut self, total: i32) -> RollId {
        let id = RollId(self.next_roll);
        self.next_roll += 1;
        self.rolls.insert(
            id,
            RecordedRoll {
                total,
                fortune_bonus: None,
            },
        );
        id
    }

    // ========================================================================
    // Item management
    // ========================================================================

    /// Embed an item onto an actor, mirroring the record into the store.
    pub async fn embed_item(
        &mut self,
        actor_id: ActorId,
        item: Item,
    ) -> Result<std::result::Result<ItemId, EquipError>> {
        let actor = self
            .actors
            .get_mut(&actor_id)
            .ok_or(RuntimeError::UnknownActor(actor_id))?;
        let id = match actor.embed_item(item) {
            Ok(id) => id,
            Err(error) => return Ok(Err(error)),
        };
        prepare(actor, &self.config);

        let record = self
            .actors
            .get(&actor_id)
            .and_then(|actor| actor.item(id))
            .map(|item| {
                serde_json::json!({
                    "id": id.0.to_string(),
                    "data": serde_json::to_value(item).unwrap_or_default(),
                })
            });
        if let Some(record) = record
            && let Err(error) = self
                .store
                .create_embedded(&DocId::actor(actor_id), "Item", vec![record])
                .await
        {
            warn!(%error, actor = actor_id.0, "failed to mirror embedded item");
        }
        self.persist(actor_id).await;
        self.emit(EngineEvent::StateChanged { actor: actor_id });
        Ok(Ok(id))
    }

    /// Remove an item and everything it owns. Deleting something already
    /// gone is a no-op.
    pub async fn delete_item(&mut self, actor_id: ActorId, item_id: ItemId) -> Result<()> {
        let actor = self
            .actors
            .get_mut(&actor_id)
            .ok_or(RuntimeError::UnknownActor(actor_id))?;
        actor.delete_item(item_id);
        prepare(actor, &self.config);
        if let Err(error) = self
            .store
            .delete_embedded(&DocId::actor(actor_id), "Item", vec![item_id.0.to_string()])
            .await
        {
            warn!(%error, actor = actor_id.0, "failed to mirror item deletion");
        }
        self.persist(actor_id).await;
        self.emit(EngineEvent::StateChanged { actor: actor_id });
        Ok(())
    }

    // ========================================================================
    // Presentation entry points: progression and equipment
    // ========================================================================

    /// Toggle a capacity's learned flag. The inner result carries the
    /// user-facing rejection, the outer one orchestration failures.
    pub async fn toggle_capacity_learned(
        &mut self,
        actor_id: ActorId,
        item_id: ItemId,
    ) -> Result<std::result::Result<bool, LearnError>> {
        let actor = self
            .actors
            .get_mut(&actor_id)
            .ok_or(RuntimeError::UnknownActor(actor_id))?;
        let result = actor.toggle_capacity_learned(item_id);
        if result.is_ok() {
            prepare(actor, &self.config);
            self.persist(actor_id).await;
            self.emit(EngineEvent::StateChanged { actor: actor_id });
        }
        Ok(result)
    }

    /// Toggle a piece of equipment.
    pub async fn toggle_equipment_equipped(
        &mut self,
        actor_id: ActorId,
        item_id: ItemId,
    ) -> Result<std::result::Result<bool, EquipError>> {
        let actor = self
            .actors
            .get_mut(&actor_id)
            .ok_or(RuntimeError::UnknownActor(actor_id))?;
        let result = actor.toggle_equipment_equipped(item_id);
        if result.is_ok() {
            prepare(actor, &self.config);
            self.persist(actor_id).await;
            self.emit(EngineEvent::StateChanged { actor: actor_id });
        }
        Ok(result)
    }

    // ========================================================================
    // Presentation entry points: loose rolls
    // ========================================================================

    /// Skill check on an ability: d20 + ability modifier + skill-roll
    /// modifiers (wildcards included). `None` when the dialog is dismissed.
    pub async fn roll_skill(
        &mut self,
        actor_id: ActorId,
        ability: AbilityKind,
    ) -> Result<Option<Roll>> {
        let actor = self
            .actors
            .get(&actor_id)
            .ok_or(RuntimeError::UnknownActor(actor_id))?;
        let snapshot = Snapshot::new(actor, &self.config);
        let enabled = collect_enabled(actor);
        let bonus = aggregate(&snapshot, &enabled, ModifierTarget::SkillRoll(ability)).total;
        let modifier = actor.abilities.get(ability).modifier;

        let Some(roll) = self.dice.roll(&format!("1d20 + {}", modifier + bonus)).await else {
            return Ok(None);
        };
        let id = self.record_roll(roll.total);
        self.emit(EngineEvent::SkillRolled {
            actor: actor_id,
            roll: id,
            total: roll.total,
        });
        Ok(Some(roll))
    }

    /// Free-standing attack check on a combat stat, outside any action.
    pub async fn roll_attack(
        &mut self,
        actor_id: ActorId,
        stat: CombatStatKind,
    ) -> Result<Option<Roll>> {
        let actor = self
            .actors
            .get(&actor_id)
            .ok_or(RuntimeError::UnknownActor(actor_id))?;
        let value = actor.combat.get(stat).value;
        let threshold = actor.combat.critical.value;

        let Some(roll) = self.dice.roll(&format!("1d20 + {value}")).await else {
            return Ok(None);
        };
        let id = self.record_roll(roll.total);
        self.emit(EngineEvent::AttackRolled {
            actor: actor_id,
            roll: id,
            total: roll.total,
            natural: roll.natural,
            critical: roll.natural >= threshold,
            success: true,
        });
        Ok(Some(roll))
    }

    /// Spend a fortune point to improve a recorded roll by the fixed bonus.
    /// The patch itself is the authority's to apply.
    pub async fn spend_fortune(&mut self, actor_id: ActorId, roll: RollId) -> Result<bool> {
        let actor = self
            .actors
            .get_mut(&actor_id)
            .ok_or(RuntimeError::UnknownActor(actor_id))?;
        if !actor.resources.fortune.spend(1) {
            self.notifier.notify(Notice::NoFortunePoints);
            return Ok(false);
        }
        self.persist(actor_id).await;

        let command = Command::PatchRoll {
            roll,
            bonus: RulesConfig::FORTUNE_ROLL_BONUS,
        };
        if self.is_authority() {
            self.apply_command(command).await;
        } else {
            self.relay.emit(command);
        }
        Ok(true)
    }

    // ========================================================================
    // Presentation entry points: rest
    // ========================================================================

    /// Spend one recovery point to heal a recovery die + constitution
    /// modifier + level. Confirmation-gated; nothing is spent on decline or
    /// dismissal.
    pub async fn spend_recovery_die(&mut self, actor_id: ActorId) -> Result<bool> {
        let actor = self
            .actors
            .get(&actor_id)
            .ok_or(RuntimeError::UnknownActor(actor_id))?;
        if actor.resources.recovery.is_empty() {
            self.notifier.notify(Notice::NoRecoveryPoints);
            return Ok(false);
        }
        let die = actor
            .family()
            .map(|family| family.recovery_die())
            .unwrap_or(8);
        let con = actor.abilities.constitution.modifier;
        let level = actor.effective_level();

        if !self.prompt.confirm(ConfirmRequest::SpendRecoveryDie).await {
            return Ok(false);
        }
        let Some(roll) = self.dice.roll(&format!("1d{die}")).await else {
            return Ok(false);
        };

        let actor = self
            .actors
            .get_mut(&actor_id)
            .ok_or(RuntimeError::UnknownActor(actor_id))?;
        if !actor.resources.recovery.spend(1) {
            return Ok(false);
        }
        let healed = actor.hp.heal((roll.total + con + level).max(1));
        prepare(actor, &self.config);
        self.persist(actor_id).await;
        self.emit(EngineEvent::Healed {
            target: actor_id,
            amount: healed,
        });
        self.emit(EngineEvent::StateChanged { actor: actor_id });
        Ok(true)
    }

    /// Full rest: hit points, recovery, and limited-use capacities come
    /// back; the mana refill is its own confirmation, declining it keeps
    /// the rest of the rest.
    pub async fn full_rest(&mut self, actor_id: ActorId) -> Result<()> {
        let wants_mana = {
            let actor = self
                .actors
                .get(&actor_id)
                .ok_or(RuntimeError::UnknownActor(actor_id))?;
            actor.resources.mana.max > 0 && actor.resources.mana.value < actor.resources.mana.max
        };
        let refill_mana =
            wants_mana && self.prompt.confirm(ConfirmRequest::RefillMana).await;

        let actor = self
            .actors
            .get_mut(&actor_id)
            .ok_or(RuntimeError::UnknownActor(actor_id))?;
        actor.hp.value = actor.hp.max;
        actor.resources.recovery.refill();
        if refill_mana {
            actor.resources.mana.refill();
        }
        refill_charges(actor, true);
        prepare(actor, &self.config);
        self.persist(actor_id).await;
        self.emit(EngineEvent::StateChanged { actor: actor_id });
        Ok(())
    }

    // ========================================================================
    // Combat round driver
    // ========================================================================

    /// Open an encounter with the given participants, ordered by their
    /// derived initiative (descending, stable on ties).
    pub fn start_combat(&mut self, participants: &[ActorId]) {
        let entries: Vec<(ActorId, i32)> = participants
            .iter()
            .filter_map(|id| {
                self.actors
                    .get(id)
                    .map(|actor| (*id, actor.combat.initiative.value))
            })
            .collect();
        self.combat = Some(CombatTracker::new(entries));
    }

    /// Advance to the next turn, running the end-of-turn expiry for the
    /// combatant who just finished and the start-of-turn tick for the one
    /// beginning.
    pub async fn next_turn(&mut self) -> Option<TurnChange> {
        let change = self.combat.as_mut()?.advance()?;
        if let Some(ended) = change.ended {
            self.on_turn_end(ended).await;
        }
        self.on_turn_start(change.started, change.round).await;
        Some(change)
    }

    /// Tear the encounter down: every effect on every combatant goes, and
    /// per-combat capacities recover their charges.
    pub async fn end_combat(&mut self) {
        let Some(tracker) = self.combat.take() else {
            return;
        };
        for combatant in tracker.combatants().to_vec() {
            self.purge_combat_state(combatant.actor, true).await;
        }
        self.emit(EngineEvent::CombatEnded);
    }

    /// A combatant leaves mid-encounter; their effects go with them.
    pub async fn leave_combat(&mut self, actor_id: ActorId) {
        let Some(tracker) = self.combat.as_mut() else {
            return;
        };
        if !tracker.contains(actor_id) {
            return;
        }
        tracker.remove(actor_id);
        self.purge_combat_state(actor_id, false).await;
    }

    async fn on_turn_start(&mut self, id: ActorId, round: u32) {
        self.emit(EngineEvent::TurnStarted { actor: id, round });
        let ticks = {
            let Some(actor) = self.actors.get_mut(&id) else {
                return;
            };
            actor.effects.tick_turn_start()
        };

        for tick in ticks {
            let formula = {
                let Some(actor) = self.actors.get(&id) else {
                    return;
                };
                let snapshot = Snapshot::new(actor, &self.config);
                evaluate_keep_dice(&snapshot, &tick.formula, None)
            };
            // Periodic rolls have no dialog to dismiss; a failed roll just
            // skips this round's tick.
            let Some(roll) = self.dice.roll(&formula).await else {
                debug!(slug = %tick.slug, "periodic formula did not roll");
                continue;
            };
            let amount = roll.total.max(0);
            let Some(actor) = self.actors.get_mut(&id) else {
                return;
            };
            match tick.kind {
                PeriodicKind::Damage => {
                    let lost = actor.hp.damage(amount);
                    self.emit(EngineEvent::DamageApplied {
                        target: id,
                        amount: lost,
                        element: tick.element,
                    });
                }
                PeriodicKind::Heal => {
                    let gained = actor.hp.heal(amount);
                    self.emit(EngineEvent::Healed {
                        target: id,
                        amount: gained,
                    });
                }
            }
        }
        self.prepare_actor(id);
        self.persist(id).await;
    }

    async fn on_turn_end(&mut self, id: ActorId) {
        let expired = {
            let Some(actor) = self.actors.get_mut(&id) else {
                return;
            };
            actor.effects.expire_turn_end()
        };
        if expired.is_empty() {
            return;
        }
        if let Some(actor) = self.actors.get_mut(&id) {
            for effect in &expired {
                clear_granted_statuses(actor, effect);
            }
            prepare(actor, &self.config);
        }
        self.persist(id).await;
        for effect in expired {
            self.emit(EngineEvent::EffectExpired {
                target: id,
                slug: effect.slug,
            });
        }
    }

    async fn purge_combat_state(&mut self, id: ActorId, refill_per_combat: bool) {
        let purged = {
            let Some(actor) = self.actors.get_mut(&id) else {
                return;
            };
            let purged = actor.effects.purge();
            for effect in &purged {
                clear_granted_statuses(actor, effect);
            }
            if refill_per_combat {
                refill_charges(actor, false);
            }
            prepare(actor, &self.config);
            purged
        };
        self.persist(id).await;
        for effect in purged {
            self.emit(EngineEvent::EffectExpired {
                target: id,
                slug: effect.slug,
            });
        }
    }

    // ========================================================================
    // Damage and healing
    // ========================================================================

    /// Land damage on a target, after damage reduction. Also the authority's
    /// manual apply path for rolled damage it chooses to commit.
    pub fn apply_damage(&mut self, target: ActorId, amount: i32, element: Element) {
        let Some(actor) = self.actors.get_mut(&target) else {
            return;
        };
        let reduced = (amount - actor.combat.damage_reduction.value).max(0);
        let lost = actor.hp.damage(reduced);
        prepare(actor, &self.config);
        self.emit(EngineEvent::DamageApplied {
            target,
            amount: lost,
            element,
        });
    }

    /// Land healing on a target, clamped to the maximum. Relayed heals are
    /// deduplicated by intent identity before they reach this.
    pub fn apply_heal(&mut self, target: ActorId, amount: i32) {
        let Some(actor) = self.actors.get_mut(&target) else {
            return;
        };
        let gained = actor.hp.heal(amount.max(0));
        prepare(actor, &self.config);
        self.emit(EngineEvent::Healed {
            target,
            amount: gained,
        });
    }

    /// Land (or refresh) a custom effect on a target. `caster` is known for
    /// locally-resolved applications; relayed ones arrive anonymous and are
    /// never self-applications.
    pub(crate) fn commit_effect(
        &mut self,
        target: ActorId,
        mut effect: CustomEffect,
        caster: Option<ActorId>,
    ) {
        let Some(actor) = self.actors.get_mut(&target) else {
            return;
        };
        effect.self_applied = caster == Some(target);
        let slug = effect.slug.clone();
        for status in &effect.statuses {
            actor.statuses.apply(*status);
        }
        actor.effects.apply(effect);
        prepare(actor, &self.config);
        self.emit(EngineEvent::EffectApplied { target, slug });
    }
}

/// Refill capacity charges by frequency: per-combat always, daily only on a
/// full rest.
fn refill_charges(actor: &mut Actor, include_daily: bool) {
    for item in &mut actor.items {
        if let Some(capacity) = item.as_capacity_mut()
            && let Some(charges) = capacity.charges.as_mut()
        {
            let refill = match capacity.frequency {
                Frequency::PerCombat => true,
                Frequency::Daily => include_daily,
                Frequency::AtWill => false,
            };
            if refill {
                charges.current = charges.max;
            }
        }
    }
}

/// Clear the statuses a removed effect granted, unless another live effect
/// still grants them.
fn clear_granted_statuses(actor: &mut Actor, effect: &CustomEffect) {
    for status in &effect.statuses {
        if !actor.effects.still_grants(*status) {
            actor.statuses.remove(*status);
        }
    }
}
