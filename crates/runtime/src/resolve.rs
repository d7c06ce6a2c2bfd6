//! Resolver execution.
//!
//! One activation clones its action's resolvers and runs them as a batch;
//! each resolver reads a shared immutable [`ResolveContext`] and returns the
//! side effects it *wants* as [`PendingEffect`] values. Nothing is applied
//! here: the activation protocol commits the batch only once every resolver
//! has succeeded, which is also what keeps resolvers order-independent.
//!
//! A dismissed roll dialog surfaces as `None` and aborts the whole batch
//! with nothing committed.

use rules_core::{
    Action, Actor, ActorId, ApplyOn, CustomEffect, Element, Item, PeriodicKind, Resolver,
    ResolverKind, RulesConfig, Snapshot, TargetScope, TargetSpec, evaluate, evaluate_keep_dice,
};

use crate::oracle::DiceOracle;

/// Immutable view shared by every resolver of one activation batch.
pub(crate) struct ResolveContext<'a> {
    pub actor: &'a Actor,
    pub item: &'a Item,
    pub config: &'a RulesConfig,
    pub dice: &'a dyn DiceOracle,
    /// The user's current target selection, in selection order.
    pub selection: &'a [ActorId],
    /// Defense of the first selected target, for rolls without a fixed
    /// difficulty.
    pub target_defense: Option<i32>,
    /// Current combat round; `None` outside combat (no effects can spawn).
    pub round: Option<u32>,
}

/// A state change a resolver wants committed.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum PendingEffect {
    Damage {
        target: ActorId,
        amount: i32,
        element: Element,
    },
    Heal {
        target: ActorId,
        amount: i32,
    },
    ApplyEffect {
        target: ActorId,
        effect: CustomEffect,
    },
    /// Spend one use of the owning consumable.
    Consume,
}

/// To-hit outcome reported back for roll recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct AttackReport {
    pub total: i32,
    pub natural: i32,
    pub critical: bool,
    pub hit: bool,
}

/// What one resolver produced.
#[derive(Debug)]
pub(crate) struct ResolverOutcome {
    pub success: bool,
    pub attack: Option<AttackReport>,
    pub effects: Vec<PendingEffect>,
}

impl ResolverOutcome {
    fn ran() -> Self {
        Self {
            success: true,
            attack: None,
            effects: Vec::new(),
        }
    }

    /// A resolver that had nothing meaningful to do reports failure, which
    /// keeps a misconfigured toggle from switching on.
    fn noop() -> Self {
        Self {
            success: false,
            attack: None,
            effects: Vec::new(),
        }
    }
}

/// Run one resolver. `None` means a roll dialog was dismissed.
pub(crate) async fn resolve(
    context: &ResolveContext<'_>,
    action: &Action,
    resolver: &Resolver,
) -> Option<ResolverOutcome> {
    match resolver.kind {
        ResolverKind::Melee | ResolverKind::Ranged | ResolverKind::Magical => {
            resolve_attack(context, action, resolver).await
        }
        ResolverKind::Auto => resolve_auto(context, action, resolver).await,
        ResolverKind::Heal => resolve_heal(context, resolver).await,
        ResolverKind::Consumable => {
            let mut outcome = ResolverOutcome::ran();
            outcome.effects.push(PendingEffect::Consume);
            Some(outcome)
        }
        ResolverKind::BuffDebuff => Some(resolve_buff(context, action, resolver)),
    }
}

async fn resolve_attack(
    context: &ResolveContext<'_>,
    action: &Action,
    resolver: &Resolver,
) -> Option<ResolverOutcome> {
    let snapshot = Snapshot::new(context.actor, context.config);
    let skill = if resolver.skill.formula.is_empty() {
        attack_stat(context.actor, resolver.kind).to_string()
    } else {
        evaluate_keep_dice(&snapshot, &resolver.skill.formula, Some(context.item.id))
    };

    let roll = context.dice.roll(&format!("1d20 + {skill}")).await?;
    let threshold = if resolver.skill.crit > 0 {
        resolver.skill.crit
    } else {
        context.actor.combat.critical.value
    };
    let critical = roll.natural >= threshold;
    let difficulty = resolver
        .skill
        .difficulty
        .as_ref()
        .map(|formula| evaluate(&snapshot, formula, Some(context.item.id)))
        .or(context.target_defense);
    let hit = critical || difficulty.is_none_or(|value| roll.total >= value);

    let mut outcome = ResolverOutcome::ran();
    outcome.attack = Some(AttackReport {
        total: roll.total,
        natural: roll.natural,
        critical,
        hit,
    });

    let targets = acquire_targets(context, &resolver.target);
    if hit {
        push_damage(context, resolver, critical, &targets, &mut outcome).await?;
    }
    push_additional_effect(context, action, resolver, hit, &targets, &mut outcome);
    Some(outcome)
}

/// Auto damage: no to-hit roll, the damage always lands.
async fn resolve_auto(
    context: &ResolveContext<'_>,
    action: &Action,
    resolver: &Resolver,
) -> Option<ResolverOutcome> {
    let mut outcome = ResolverOutcome::ran();
    let targets = acquire_targets(context, &resolver.target);
    push_damage(context, resolver, false, &targets, &mut outcome).await?;
    push_additional_effect(context, action, resolver, true, &targets, &mut outcome);
    Some(outcome)
}

async fn resolve_heal(
    context: &ResolveContext<'_>,
    resolver: &Resolver,
) -> Option<ResolverOutcome> {
    let mut outcome = ResolverOutcome::ran();
    if resolver.dmg.formula.is_empty() {
        return Some(outcome);
    }
    let snapshot = Snapshot::new(context.actor, context.config);
    let formula = evaluate_keep_dice(&snapshot, &resolver.dmg.formula, Some(context.item.id));
    let roll = context.dice.roll(&formula).await?;

    for target in acquire_allies(context, &resolver.target) {
        outcome.effects.push(PendingEffect::Heal {
            target,
            amount: roll.total.max(0),
        });
    }
    Some(outcome)
}

/// Buff/debuff: only meaningful when the action carries modifiers and the
/// additional effect explicitly asks for them; requires an active combat to
/// host the spawned effect.
fn resolve_buff(
    context: &ResolveContext<'_>,
    action: &Action,
    resolver: &Resolver,
) -> ResolverOutcome {
    let extra = &resolver.additional_effect;
    if !extra.active || !extra.buff || action.modifiers.is_empty() || context.round.is_none() {
        return ResolverOutcome::noop();
    }
    let mut outcome = ResolverOutcome::ran();
    for target in acquire_allies(context, &resolver.target) {
        outcome.effects.push(PendingEffect::ApplyEffect {
            target,
            effect: build_effect(context, action, resolver),
        });
    }
    outcome
}

async fn push_damage(
    context: &ResolveContext<'_>,
    resolver: &Resolver,
    critical: bool,
    targets: &[ActorId],
    outcome: &mut ResolverOutcome,
) -> Option<()> {
    if resolver.dmg.formula.is_empty() {
        return Some(());
    }
    let snapshot = Snapshot::new(context.actor, context.config);
    let formula = evaluate_keep_dice(&snapshot, &resolver.dmg.formula, Some(context.item.id));
    let roll = context.dice.roll(&formula).await?;
    let amount = if critical { roll.total * 2 } else { roll.total };
    for target in targets {
        outcome.effects.push(PendingEffect::Damage {
            target: *target,
            amount: amount.max(0),
            element: resolver.additional_effect.element,
        });
    }
    Some(())
}

fn push_additional_effect(
    context: &ResolveContext<'_>,
    action: &Action,
    resolver: &Resolver,
    hit: bool,
    targets: &[ActorId],
    outcome: &mut ResolverOutcome,
) {
    let extra = &resolver.additional_effect;
    let triggered = match extra.apply_on {
        ApplyOn::Success => hit,
        ApplyOn::Failure => !hit,
        ApplyOn::Always => true,
    };
    // Effects need a combat to live in; outside one the main outcome still
    // stands, only the rider is skipped.
    if !extra.active || !triggered || context.round.is_none() {
        return;
    }
    for target in targets {
        outcome.effects.push(PendingEffect::ApplyEffect {
            target: *target,
            effect: build_effect(context, action, resolver),
        });
    }
}

/// Assemble the timed effect a resolver spawns. `self_applied` is stamped at
/// commit time, per target.
fn build_effect(
    context: &ResolveContext<'_>,
    action: &Action,
    resolver: &Resolver,
) -> CustomEffect {
    let extra = &resolver.additional_effect;
    let snapshot = Snapshot::new(context.actor, context.config);
    let duration = evaluate(&snapshot, &extra.duration, Some(context.item.id)).max(1);
    let modifiers = if extra.buff {
        action
            .modifiers
            .iter()
            .cloned()
            .map(|mut modifier| {
                modifier.scope = extra.scope;
                modifier
            })
            .collect()
    } else {
        Vec::new()
    };
    let formula_kind = (!extra.formula.is_empty()).then(|| match resolver.kind {
        ResolverKind::Heal => PeriodicKind::Heal,
        _ => PeriodicKind::Damage,
    });

    CustomEffect {
        name: context.item.name.clone(),
        source: context.item.id,
        statuses: extra.statuses.clone(),
        unit: extra.unit,
        duration,
        started_at: context.round.unwrap_or(1),
        remaining_turns: duration,
        modifiers,
        formula_kind,
        formula: extra.formula.clone(),
        element: extra.element,
        slug: CustomEffect::slug_for(&context.item.name),
        self_applied: false,
    }
}

fn attack_stat(actor: &Actor, kind: ResolverKind) -> i32 {
    match kind {
        ResolverKind::Ranged => actor.combat.ranged.value,
        ResolverKind::Magical => actor.combat.magic.value,
        _ => actor.combat.melee.value,
    }
}

/// Targets for hostile scopes: the current selection, clipped.
fn acquire_targets(context: &ResolveContext<'_>, spec: &TargetSpec) -> Vec<ActorId> {
    match spec.scope {
        TargetScope::Caster => vec![context.actor.id],
        TargetScope::SingleEnemy | TargetScope::SingleAlly => {
            context.selection.first().copied().into_iter().collect()
        }
        TargetScope::AllEnemies | TargetScope::AllAllies => context
            .selection
            .iter()
            .copied()
            .take(spec.number.max(1) as usize)
            .collect(),
    }
}

/// Targets for friendly scopes: like [`acquire_targets`] but an empty
/// selection falls back to the caster instead of fizzling.
fn acquire_allies(context: &ResolveContext<'_>, spec: &TargetSpec) -> Vec<ActorId> {
    let targets = acquire_targets(context, spec);
    if targets.is_empty()
        && matches!(
            spec.scope,
            TargetScope::SingleAlly | TargetScope::AllAllies
        )
    {
        return vec![context.actor.id];
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use rules_core::{ActionKind, AdditionalEffect, ItemId, ItemKind, Modifier, ModifierTarget};

    use crate::oracle::{FlatDice, ScriptedDice};

    fn caster() -> Actor {
        let mut actor = Actor::character(ActorId(1), "Caster", 3);
        rules_core::prepare(&mut actor, &RulesConfig::new());
        actor
    }

    fn sword(actor: &mut Actor) -> ItemId {
        actor
            .embed_item(Item::new(ItemId(0), "Sword", ItemKind::Feature))
            .unwrap()
    }

    fn context<'a>(
        actor: &'a Actor,
        item: &'a Item,
        config: &'a RulesConfig,
        dice: &'a dyn DiceOracle,
        selection: &'a [ActorId],
    ) -> ResolveContext<'a> {
        ResolveContext {
            actor,
            item,
            config,
            dice,
            selection,
            target_defense: Some(12),
            round: Some(1),
        }
    }

    #[tokio::test]
    async fn dismissed_attack_roll_aborts_with_nothing() {
        let mut actor = caster();
        let item_id = sword(&mut actor);
        let config = RulesConfig::new();
        let dice = ScriptedDice::new([None]);
        let item = actor.item(item_id).unwrap();
        let action = Action::new(item_id, 0, ActionKind::Attack);
        let resolver = Resolver::new(ResolverKind::Melee).with_damage("1d8");
        let selection = [ActorId(2)];

        let outcome = resolve(
            &context(&actor, item, &config, &dice, &selection),
            &action,
            &resolver,
        )
        .await;
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn hit_produces_damage_against_the_selection() {
        let mut actor = caster();
        let item_id = sword(&mut actor);
        let config = RulesConfig::new();
        // Melee value is 3 (level bonus) at this level; 9 + 3 meets the
        // defense of 12.
        let dice = FlatDice(9);
        let item = actor.item(item_id).unwrap();
        let action = Action::new(item_id, 0, ActionKind::Attack);
        let resolver = Resolver::new(ResolverKind::Melee)
            .with_skill("@atc")
            .with_damage("1d8");
        let selection = [ActorId(2)];

        let outcome = resolve(
            &context(&actor, item, &config, &dice, &selection),
            &action,
            &resolver,
        )
        .await
        .unwrap();
        assert!(outcome.success);
        let report = outcome.attack.unwrap();
        assert!(report.hit);
        assert_eq!(
            outcome.effects,
            vec![PendingEffect::Damage {
                target: ActorId(2),
                amount: 9,
                element: Element::None,
            }]
        );
    }

    #[tokio::test]
    async fn miss_skips_damage_but_still_succeeds() {
        let mut actor = caster();
        let item_id = sword(&mut actor);
        let config = RulesConfig::new();
        // Total 1d20(=2) + melee; far below the defense of 12 and the
        // critical threshold.
        let dice = FlatDice(2);
        let item = actor.item(item_id).unwrap();
        let action = Action::new(item_id, 0, ActionKind::Attack);
        let resolver = Resolver::new(ResolverKind::Melee)
            .with_skill("0")
            .with_damage("1d8");
        let selection = [ActorId(2)];

        let outcome = resolve(
            &context(&actor, item, &config, &dice, &selection),
            &action,
            &resolver,
        )
        .await
        .unwrap();
        assert!(outcome.success);
        assert!(!outcome.attack.unwrap().hit);
        assert!(outcome.effects.is_empty());
    }

    #[tokio::test]
    async fn critical_doubles_damage() {
        let mut actor = caster();
        let item_id = sword(&mut actor);
        let config = RulesConfig::new();
        let dice = FlatDice(20);
        let item = actor.item(item_id).unwrap();
        let action = Action::new(item_id, 0, ActionKind::Attack);
        let resolver = Resolver::new(ResolverKind::Melee)
            .with_skill("0")
            .with_damage("1d8");
        let selection = [ActorId(2)];

        let outcome = resolve(
            &context(&actor, item, &config, &dice, &selection),
            &action,
            &resolver,
        )
        .await
        .unwrap();
        let report = outcome.attack.unwrap();
        assert!(report.critical);
        assert_eq!(
            outcome.effects,
            vec![PendingEffect::Damage {
                target: ActorId(2),
                amount: 40,
                element: Element::None,
            }]
        );
    }

    #[tokio::test]
    async fn buff_without_modifiers_is_a_failing_noop() {
        let mut actor = caster();
        let item_id = sword(&mut actor);
        let config = RulesConfig::new();
        let dice = FlatDice(1);
        let item = actor.item(item_id).unwrap();
        let action = Action::new(item_id, 0, ActionKind::Buff);
        let mut resolver = Resolver::new(ResolverKind::BuffDebuff);
        resolver.additional_effect.active = true;
        resolver.additional_effect.buff = true;

        let outcome = resolve(
            &context(&actor, item, &config, &dice, &[]),
            &action,
            &resolver,
        )
        .await
        .unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn buff_spawns_an_effect_carrying_the_action_modifiers() {
        let mut actor = caster();
        let item_id = sword(&mut actor);
        let config = RulesConfig::new();
        let dice = FlatDice(1);
        let item = actor.item(item_id).unwrap();
        let mut action = Action::new(item_id, 0, ActionKind::Buff);
        action.modifiers.push(Modifier::literal(
            item_id,
            ModifierTarget::Ability(rules_core::AbilityKind::Strength),
            2,
        ));
        let mut resolver = Resolver::new(ResolverKind::BuffDebuff);
        resolver.target.scope = TargetScope::Caster;
        resolver.additional_effect = AdditionalEffect {
            active: true,
            buff: true,
            duration: "3".into(),
            ..AdditionalEffect::default()
        };

        let outcome = resolve(
            &context(&actor, item, &config, &dice, &[]),
            &action,
            &resolver,
        )
        .await
        .unwrap();
        assert!(outcome.success);
        let [PendingEffect::ApplyEffect { target, effect }] = &outcome.effects[..] else {
            panic!("expected one effect");
        };
        assert_eq!(*target, ActorId(1));
        assert_eq!(effect.remaining_turns, 3);
        assert_eq!(effect.modifiers.len(), 1);
        assert_eq!(effect.slug, "sword");
    }
}
