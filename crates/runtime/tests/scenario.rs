//! End-to-end scenario over the shipped content: catalogs through the
//! factory, into an authoritative engine, through a couple of rounds.

use std::path::Path;
use std::sync::Arc;

use rules_core::{ActorId, StatusKind};
use runtime::{ActivationOutcome, Engine, FlatDice, Role};
use rules_content::{ContentFactory, build_character, build_encounter};

const BRAN: ActorId = ActorId(1);
const LYRA: ActorId = ActorId(2);
const TROLL: ActorId = ActorId(9);

fn shipped() -> ContentFactory {
    ContentFactory::new(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../rules/content/data"),
    )
}

fn table() -> Engine {
    let factory = shipped();
    let config = factory.load_config().unwrap();
    let profiles = factory.load_profiles().unwrap();
    let equipment = factory.load_equipment().unwrap();
    let characters = factory.load_characters().unwrap();
    let encounters = factory.load_encounters().unwrap();

    let bran = characters.iter().find(|c| c.profile == "Warrior").unwrap();
    let lyra = characters.iter().find(|c| c.profile == "Mage").unwrap();
    let troll = encounters.iter().find(|e| e.name == "Cave Troll").unwrap();

    let mut engine = Engine::new(Role::Authority, config.clone()).with_dice(Arc::new(FlatDice(10)));
    engine.add_actor(build_character(BRAN, bran, &profiles, &equipment, &config).unwrap());
    engine.add_actor(build_character(LYRA, lyra, &profiles, &equipment, &config).unwrap());
    engine.add_actor(build_encounter(TROLL, troll, &config).unwrap());
    engine
}

fn item_named(engine: &Engine, actor: ActorId, name: &str) -> rules_core::ItemId {
    engine
        .actor(actor)
        .unwrap()
        .items
        .iter()
        .find(|item| item.name == name)
        .unwrap()
        .id
}

#[tokio::test]
async fn a_sword_swing_lands_on_the_troll() {
    let mut engine = table();
    engine.set_targets(vec![TROLL]);
    engine.start_combat(&[BRAN, LYRA, TROLL]);

    let sword = item_named(&engine, BRAN, "Longsword");
    let outcome = engine.activate_action(BRAN, sword, 0, false).await.unwrap();
    assert_eq!(outcome, ActivationOutcome::Activated);

    // Loaded d20 of 10 + melee 8 beats the troll's defense of 9; damage is
    // a loaded d8 of 10 plus the strength modifier of 3.
    let troll = engine.actor(TROLL).unwrap();
    assert_eq!(troll.hp.value, troll.hp.max - 13);
}

#[tokio::test]
async fn firebolt_spends_mana_and_sets_the_troll_burning() {
    let mut engine = table();
    engine.set_targets(vec![TROLL]);
    engine.start_combat(&[BRAN, LYRA, TROLL]);
    let mana_before = engine.actor(LYRA).unwrap().resources.mana.value;

    let firebolt = item_named(&engine, LYRA, "Firebolt");
    let outcome = engine.activate_action(LYRA, firebolt, 0, false).await.unwrap();
    assert_eq!(outcome, ActivationOutcome::Activated);

    assert_eq!(engine.actor(LYRA).unwrap().resources.mana.value, mana_before - 1);
    let troll = engine.actor(TROLL).unwrap();
    assert!(troll.effects.get("firebolt").is_some());
    assert!(troll.statuses.has(StatusKind::Burning));
    assert!(troll.hp.value < troll.hp.max);
}

#[tokio::test]
async fn the_burning_effect_ticks_and_expires_over_rounds() {
    let mut engine = table();
    engine.set_targets(vec![TROLL]);
    engine.start_combat(&[TROLL]);

    let firebolt = item_named(&engine, LYRA, "Firebolt");
    engine.activate_action(LYRA, firebolt, 0, false).await.unwrap();
    let after_hit = engine.actor(TROLL).unwrap().hp.value;

    // Two rounds of burning (duration "2"), then the effect expires.
    engine.next_turn().await.unwrap();
    engine.next_turn().await.unwrap();
    engine.next_turn().await.unwrap();
    let troll = engine.actor(TROLL).unwrap();
    assert!(troll.effects.get("firebolt").is_none());
    assert!(!troll.statuses.has(StatusKind::Burning));
    // Each tick burns a loaded d4 of 10.
    assert_eq!(troll.hp.value, after_hit - 20);
}

#[tokio::test]
async fn the_draught_heals_and_eventually_runs_dry() {
    let mut engine = table();
    let draught = item_named(&engine, BRAN, "Healing Draught");
    engine.apply_damage(BRAN, 20, rules_core::Element::None);
    let wounded = engine.actor(BRAN).unwrap().hp.value;

    let outcome = engine.activate_action(BRAN, draught, 0, false).await.unwrap();
    assert_eq!(outcome, ActivationOutcome::Activated);
    // Loaded d8 of 10 plus 2.
    assert_eq!(engine.actor(BRAN).unwrap().hp.value, wounded + 12);

    engine.activate_action(BRAN, draught, 0, false).await.unwrap();
    engine.activate_action(BRAN, draught, 0, false).await.unwrap();
    assert!(engine.actor(BRAN).unwrap().item(draught).is_none());
}
