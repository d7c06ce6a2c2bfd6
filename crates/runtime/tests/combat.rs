//! Combat round driver: initiative order, effect ticks, expiry, teardown.

use std::sync::Arc;

use rules_core::{
    Actor, ActorId, CapacityData, Charges, Command, CustomEffect, EffectUnit, Element, Frequency,
    Item, ItemId, ItemKind, PeriodicKind, RulesConfig, StatusKind,
};
use runtime::{Engine, EngineHandle, FlatDice, Role};

const HERO: ActorId = ActorId(1);
const TROLL: ActorId = ActorId(7);

fn burning(duration: i32, unit: EffectUnit) -> CustomEffect {
    CustomEffect {
        name: "Burning Brand".to_string(),
        source: ItemId(1),
        statuses: vec![StatusKind::Burning],
        unit,
        duration,
        started_at: 1,
        remaining_turns: duration,
        modifiers: Vec::new(),
        formula_kind: Some(PeriodicKind::Damage),
        formula: "3".to_string(),
        element: Element::Fire,
        slug: "burning-brand".to_string(),
        self_applied: false,
    }
}

#[tokio::test]
async fn combatants_are_ordered_by_initiative() {
    let mut engine = Engine::new(Role::Authority, RulesConfig::new());
    let mut quick = Actor::character(HERO, "Quick", 2);
    quick.abilities.agility.base = 16;
    let mut slow = Actor::character(ActorId(2), "Slow", 2);
    slow.abilities.agility.base = 8;
    engine.add_actor(quick);
    engine.add_actor(slow);
    engine.add_actor(Actor::encounter(TROLL, "Troll", 30, 3));

    engine.start_combat(&[ActorId(2), TROLL, HERO]);
    let order: Vec<ActorId> = engine
        .combat()
        .unwrap()
        .combatants()
        .iter()
        .map(|c| c.actor)
        .collect();
    // Initiative uses the agility value: 16 beats the troll's 10 beats 8.
    assert_eq!(order, vec![HERO, TROLL, ActorId(2)]);
}

#[tokio::test]
async fn periodic_damage_ticks_each_round_and_expires() {
    let mut engine =
        Engine::new(Role::Authority, RulesConfig::new()).with_dice(Arc::new(FlatDice(1)));
    engine.add_actor(Actor::encounter(TROLL, "Troll", 30, 3));
    engine.start_combat(&[TROLL]);
    engine
        .apply_command(Command::ApplyEffect {
            targets: vec![TROLL],
            effect: burning(2, EffectUnit::Round),
        })
        .await;

    // Round 1: tick burns for 3, timer 2 -> 1.
    engine.next_turn().await.unwrap();
    let troll = engine.actor(TROLL).unwrap();
    assert_eq!(troll.hp.value, 27);
    assert_eq!(troll.effects.get("burning-brand").unwrap().remaining_turns, 1);

    // Round 2: the turn-end pass runs first (timer still 1, no expiry),
    // then the new turn ticks it to 0 and burns again.
    engine.next_turn().await.unwrap();
    let troll = engine.actor(TROLL).unwrap();
    assert_eq!(troll.hp.value, 24);
    assert_eq!(troll.effects.get("burning-brand").unwrap().remaining_turns, 0);
    assert!(troll.statuses.has(StatusKind::Burning));

    // Round 3: the expired effect is removed at turn end, its status with it.
    engine.next_turn().await.unwrap();
    let troll = engine.actor(TROLL).unwrap();
    assert!(troll.effects.get("burning-brand").is_none());
    assert!(!troll.statuses.has(StatusKind::Burning));
}

#[tokio::test]
async fn combat_end_purges_effects_and_refills_per_combat_charges() {
    let mut engine =
        Engine::new(Role::Authority, RulesConfig::new()).with_dice(Arc::new(FlatDice(1)));
    let mut hero = Actor::character(HERO, "Bran", 3);
    let trick_id = hero
        .embed_item(Item::new(
            ItemId(0),
            "War Cry",
            ItemKind::Capacity(CapacityData {
                learned: true,
                frequency: Frequency::PerCombat,
                charges: Some(Charges { current: 0, max: 1 }),
                ..CapacityData::default()
            }),
        ))
        .unwrap();
    engine.add_actor(hero);
    engine.start_combat(&[HERO]);
    engine
        .apply_command(Command::ApplyEffect {
            targets: vec![HERO],
            effect: burning(99, EffectUnit::Combat),
        })
        .await;
    assert_eq!(engine.actor(HERO).unwrap().effects.len(), 1);

    engine.end_combat().await;
    let hero = engine.actor(HERO).unwrap();
    assert!(hero.effects.is_empty());
    assert!(!hero.statuses.has(StatusKind::Burning));
    assert_eq!(
        hero.item(trick_id).unwrap().as_capacity().unwrap().charges.unwrap().current,
        1
    );
    assert!(engine.combat().is_none());
}

#[tokio::test]
async fn a_leaving_combatant_takes_its_effects_along() {
    let mut engine = Engine::new(Role::Authority, RulesConfig::new());
    engine.add_actor(Actor::encounter(TROLL, "Troll", 30, 3));
    engine.add_actor(Actor::character(HERO, "Bran", 3));
    engine.start_combat(&[HERO, TROLL]);
    engine
        .apply_command(Command::ApplyEffect {
            targets: vec![TROLL],
            effect: burning(5, EffectUnit::Round),
        })
        .await;

    engine.leave_combat(TROLL).await;
    assert!(engine.actor(TROLL).unwrap().effects.is_empty());
    assert!(!engine.combat().unwrap().contains(TROLL));
}

#[tokio::test]
async fn handle_drives_the_engine_over_channels() {
    let mut engine =
        Engine::new(Role::Authority, RulesConfig::new()).with_dice(Arc::new(FlatDice(4)));
    let mut hero = Actor::character(HERO, "Bran", 3);
    hero.abilities.agility.base = 14;
    engine.add_actor(hero);
    let handle = EngineHandle::spawn(engine);

    let roll = handle
        .roll_skill(HERO, rules_core::AbilityKind::Agility)
        .await
        .unwrap()
        .expect("loaded dice never dismiss");
    // d20 loaded to 4 plus the agility modifier of 2.
    assert_eq!(roll.total, 6);

    handle.start_combat(vec![HERO]).await.unwrap();
    let change = handle.next_turn().await.unwrap().unwrap();
    assert_eq!(change.started, HERO);

    let hero = handle.query_actor(HERO).await.unwrap().unwrap();
    assert_eq!(hero.hp.value, hero.hp.max);
}
