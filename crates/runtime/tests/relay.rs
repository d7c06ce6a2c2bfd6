//! Single-writer authority over the relay channel.
//!
//! Non-authoritative participants never mutate shared state directly; they
//! emit intents, and the authoritative handler converges even when the
//! channel delivers a message more than once.

use std::sync::Arc;

use rules_core::{
    Action, ActionKind, ActionProperties, Actor, ActorId, CombatStatKind, Command, CustomEffect,
    EffectUnit, Element, Item, ItemId, ItemKind, PeriodicKind, Resolver, ResolverKind,
    RulesConfig, StatusKind, TargetScope,
};
use runtime::{Engine, EngineEvent, FlatDice, RelayChannel, Role};

const HEALER: ActorId = ActorId(1);
const TROLL: ActorId = ActorId(7);

fn character(id: ActorId, name: &str) -> Actor {
    Actor::character(id, name, 3)
}

fn venom(duration: i32) -> CustomEffect {
    CustomEffect {
        name: "Venom".to_string(),
        source: ItemId(1),
        statuses: vec![StatusKind::Poisoned],
        unit: EffectUnit::Round,
        duration,
        started_at: 1,
        remaining_turns: duration,
        modifiers: Vec::new(),
        formula_kind: Some(PeriodicKind::Damage),
        formula: "2".to_string(),
        element: Element::Poison,
        slug: "venom".to_string(),
        self_applied: false,
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn relayed_heal_applies_exactly_once_under_double_delivery() {
    init_tracing();
    let relay = RelayChannel::new(16);
    let mut authority = Engine::new(Role::Authority, RulesConfig::new())
        .with_relay(relay.clone())
        .with_dice(Arc::new(FlatDice(5)));
    let mut player = Engine::new(Role::Player, RulesConfig::new())
        .with_relay(relay.clone())
        .with_dice(Arc::new(FlatDice(5)));

    authority.add_actor(Actor::encounter(TROLL, "Troll", 30, 3));
    // Well below max, so a double-applied heal would be visible.
    authority.apply_damage(TROLL, 20, Element::None);
    let wounded = authority.actor(TROLL).unwrap().hp.value;
    assert_eq!(wounded, 10);

    // The player only holds their own character; the troll lives on the
    // authority's side.
    let mut healer = character(HEALER, "Lyra");
    let mut chant = Item::new(ItemId(0), "Soothing Chant", ItemKind::Feature);
    let mut action = Action::new(ItemId(0), 0, ActionKind::Utility);
    action.properties |= ActionProperties::ACTIVABLE;
    let mut resolver = Resolver::new(ResolverKind::Heal).with_damage("10");
    resolver.target.scope = TargetScope::SingleAlly;
    action.resolvers = vec![resolver];
    chant.actions.push(action);
    let chant_id = healer.embed_item(chant).unwrap();
    player.add_actor(healer);
    player.set_targets(vec![TROLL]);

    let mut inbox = relay.subscribe();
    let outcome = player.activate_action(HEALER, chant_id, 0, false).await.unwrap();
    assert!(outcome.is_committed());

    let command = inbox.recv().await.unwrap();
    assert_eq!(command.name(), "heal");

    // At-least-once delivery: the authority sees the same intent twice but
    // applies it once, keyed on the intent identity.
    authority.apply_command(command.clone()).await;
    assert_eq!(authority.actor(TROLL).unwrap().hp.value, wounded + 10);
    authority.apply_command(command).await;
    assert_eq!(authority.actor(TROLL).unwrap().hp.value, wounded + 10);
}

#[tokio::test]
async fn relayed_effect_refreshes_by_slug_instead_of_duplicating() {
    let mut authority = Engine::new(Role::Authority, RulesConfig::new());
    authority.add_actor(Actor::encounter(TROLL, "Troll", 30, 3));

    let command = Command::ApplyEffect {
        targets: vec![TROLL],
        effect: venom(3),
    };
    authority.apply_command(command.clone()).await;
    authority.apply_command(command).await;

    let troll = authority.actor(TROLL).unwrap();
    assert_eq!(troll.effects.len(), 1);
    assert_eq!(troll.effects.get("venom").unwrap().remaining_turns, 3);
    assert!(troll.statuses.has(StatusKind::Poisoned));
}

#[tokio::test]
async fn non_authoritative_engines_ignore_relayed_commands() {
    let mut player = Engine::new(Role::Player, RulesConfig::new());
    player.add_actor(Actor::encounter(TROLL, "Troll", 30, 3));

    player
        .apply_command(Command::ApplyEffect {
            targets: vec![TROLL],
            effect: venom(3),
        })
        .await;
    assert!(player.actor(TROLL).unwrap().effects.is_empty());
}

#[tokio::test]
async fn remove_effect_clears_statuses_it_granted() {
    let mut authority = Engine::new(Role::Authority, RulesConfig::new());
    authority.add_actor(Actor::encounter(TROLL, "Troll", 30, 3));
    authority
        .apply_command(Command::ApplyEffect {
            targets: vec![TROLL],
            effect: venom(3),
        })
        .await;

    authority
        .apply_command(Command::RemoveEffect {
            target: TROLL,
            slug: "venom".to_string(),
        })
        .await;
    let troll = authority.actor(TROLL).unwrap();
    assert!(troll.effects.is_empty());
    assert!(!troll.statuses.has(StatusKind::Poisoned));
}

#[tokio::test]
async fn roll_patch_applies_exactly_once() {
    let mut authority = Engine::new(Role::Authority, RulesConfig::new())
        .with_dice(Arc::new(FlatDice(10)));
    authority.add_actor(character(HEALER, "Lyra"));

    authority
        .roll_attack(HEALER, CombatStatKind::Melee)
        .await
        .unwrap()
        .unwrap();
    let roll = rules_core::RollId(1);
    let before = authority.recorded_roll(roll).unwrap().total;

    let command = Command::PatchRoll { roll, bonus: 10 };
    authority.apply_command(command.clone()).await;
    authority.apply_command(command).await;

    let record = authority.recorded_roll(roll).unwrap();
    assert_eq!(record.total, before + 10);
    assert_eq!(record.fortune_bonus, Some(10));
}

#[tokio::test]
async fn spending_fortune_drains_the_pool_and_patches_the_roll() {
    let mut authority = Engine::new(Role::Authority, RulesConfig::new())
        .with_dice(Arc::new(FlatDice(10)));
    authority.add_actor(character(HEALER, "Lyra"));
    authority
        .roll_skill(HEALER, rules_core::AbilityKind::Agility)
        .await
        .unwrap()
        .unwrap();
    let roll = rules_core::RollId(1);
    let fortune_before = authority.actor(HEALER).unwrap().resources.fortune.value;
    let total_before = authority.recorded_roll(roll).unwrap().total;

    assert!(authority.spend_fortune(HEALER, roll).await.unwrap());
    assert_eq!(
        authority.actor(HEALER).unwrap().resources.fortune.value,
        fortune_before - 1
    );
    assert_eq!(authority.recorded_roll(roll).unwrap().total, total_before + 10);
}

#[tokio::test]
async fn opposite_roll_is_resolved_by_the_authority() {
    let mut authority = Engine::new(Role::Authority, RulesConfig::new())
        .with_dice(Arc::new(FlatDice(10)));
    authority.add_actor(character(HEALER, "Lyra"));
    authority.add_actor(Actor::encounter(TROLL, "Troll", 30, 3));
    let mut events = authority.subscribe();

    authority
        .apply_command(Command::OppositeRoll {
            attacker: HEALER,
            defender: TROLL,
            attacker_total: 17,
        })
        .await;

    let event = events.recv().await.unwrap();
    let EngineEvent::OppositeRollResolved {
        attacker,
        defender,
        attacker_total,
        defender_total,
    } = event
    else {
        panic!("expected an opposite-roll event, got {event:?}");
    };
    assert_eq!(attacker, HEALER);
    assert_eq!(defender, TROLL);
    assert_eq!(attacker_total, 17);
    // d20 (loaded to 10) + the troll's melee value.
    let melee = authority.actor(TROLL).unwrap().combat.melee.value;
    assert_eq!(defender_total, 10 + melee);
}
