//! Content factory for assembling actors from data files.

use std::path::{Path, PathBuf};

use rules_core::{
    Actor, ActorId, Item, ItemId, ItemKind, PathData, ProfileData, RulesConfig, prepare,
};

use crate::formats::{CharacterSpec, EncounterDef, EquipmentDef, ProfileDef};
use crate::loaders::{ActorLoader, ConfigLoader, EquipmentLoader, LoadResult, ProfileLoader};

/// Content factory that loads all ruleset content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// ├── equipment.ron
/// ├── profiles.ron
/// ├── encounters.ron
/// └── characters.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load the rules configuration from `config.toml`.
    pub fn load_config(&self) -> LoadResult<RulesConfig> {
        ConfigLoader::load(&self.data_dir.join("config.toml"))
    }

    /// Load the equipment catalog from `equipment.ron`.
    pub fn load_equipment(&self) -> LoadResult<Vec<EquipmentDef>> {
        EquipmentLoader::load(&self.data_dir.join("equipment.ron"))
    }

    /// Load the profile catalog from `profiles.ron`.
    pub fn load_profiles(&self) -> LoadResult<Vec<ProfileDef>> {
        ProfileLoader::load(&self.data_dir.join("profiles.ron"))
    }

    /// Load the encounter catalog from `encounters.ron`.
    pub fn load_encounters(&self) -> LoadResult<Vec<EncounterDef>> {
        ActorLoader::load_encounters(&self.data_dir.join("encounters.ron"))
    }

    /// Load the pre-built character sheets from `characters.ron`.
    pub fn load_characters(&self) -> LoadResult<Vec<CharacterSpec>> {
        ActorLoader::load_characters(&self.data_dir.join("characters.ron"))
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Assemble a character actor from a sheet spec and the catalogs.
///
/// Profile, paths, and capacities embed in progression order; the first
/// `learned.count` capacities of each path come pre-learned. The actor
/// leaves here fully derived and at full pools.
pub fn build_character(
    id: ActorId,
    spec: &CharacterSpec,
    profiles: &[ProfileDef],
    equipment: &[EquipmentDef],
    config: &RulesConfig,
) -> LoadResult<Actor> {
    let mut actor = Actor::character(id, spec.name.clone(), spec.level);
    spec.abilities.apply(&mut actor);

    let profile = profiles
        .iter()
        .find(|profile| profile.name == spec.profile)
        .ok_or_else(|| anyhow::anyhow!("Unknown profile '{}'", spec.profile))?;

    let mut path_ids = Vec::new();
    for path_def in &profile.paths {
        let path_id = actor
            .embed_item(Item::new(
                ItemId(0),
                path_def.name.clone(),
                ItemKind::Path(PathData {
                    capacities: Vec::new(),
                    prestige_hp_per_capacity: path_def.prestige_hp_per_capacity,
                }),
            ))
            .map_err(|e| anyhow::anyhow!("Failed to embed path '{}': {e}", path_def.name))?;

        let learned = spec
            .learned
            .iter()
            .find(|entry| entry.path == path_def.name)
            .map(|entry| entry.count)
            .unwrap_or(0);
        let mut capacity_ids = Vec::new();
        for (position, capacity_def) in path_def.capacities.iter().enumerate() {
            let mut item = capacity_def.build(Some(path_id));
            if position < learned
                && let Some(capacity) = item.as_capacity_mut()
            {
                capacity.learned = true;
            }
            let capacity_id = actor
                .embed_item(item)
                .map_err(|e| anyhow::anyhow!("Failed to embed capacity '{}': {e}", capacity_def.name))?;
            capacity_ids.push(capacity_id);
        }
        if let Some(ItemKind::Path(path)) = actor.item_mut(path_id).map(|item| &mut item.kind) {
            path.capacities = capacity_ids;
        }
        path_ids.push(path_id);
    }

    actor
        .embed_item(Item::new(
            ItemId(0),
            profile.name.clone(),
            ItemKind::Profile(ProfileData {
                family: profile.family,
                paths: path_ids,
            }),
        ))
        .map_err(|e| anyhow::anyhow!("Failed to embed profile '{}': {e}", profile.name))?;

    for reference in &spec.equipment {
        let def = equipment
            .iter()
            .find(|def| def.name == reference.name)
            .ok_or_else(|| anyhow::anyhow!("Unknown equipment '{}'", reference.name))?;
        actor
            .embed_item(def.build(reference.equipped))
            .map_err(|e| anyhow::anyhow!("Failed to embed equipment '{}': {e}", reference.name))?;
    }

    prepare(&mut actor, config);
    actor.refill_all();
    Ok(actor)
}

/// Assemble a non-player encounter from its catalog entry.
pub fn build_encounter(
    id: ActorId,
    def: &EncounterDef,
    config: &RulesConfig,
) -> LoadResult<Actor> {
    let mut actor = Actor::encounter(id, def.name.clone(), def.hp, def.challenge);
    if let Some(abilities) = &def.abilities {
        abilities.apply(&mut actor);
    }
    for attack in &def.attacks {
        let mut item = Item::new(ItemId(0), attack.name.clone(), ItemKind::Attack);
        item.modifiers = attack
            .modifiers
            .iter()
            .map(|modifier| modifier.build(ItemId(0)))
            .collect();
        item.actions = attack
            .actions
            .iter()
            .enumerate()
            .map(|(indice, action)| action.build(ItemId(0), indice))
            .collect();
        actor
            .embed_item(item)
            .map_err(|e| anyhow::anyhow!("Failed to embed attack '{}': {e}", attack.name))?;
    }
    prepare(&mut actor, config);
    actor.refill_all();
    Ok(actor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipped() -> ContentFactory {
        ContentFactory::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("data"))
    }

    #[test]
    fn shipped_data_loads() {
        let factory = shipped();
        factory.load_config().unwrap();
        assert!(!factory.load_equipment().unwrap().is_empty());
        assert!(!factory.load_profiles().unwrap().is_empty());
        assert!(!factory.load_encounters().unwrap().is_empty());
        assert!(!factory.load_characters().unwrap().is_empty());
    }

    #[test]
    fn shipped_warrior_derives_as_expected() {
        let factory = shipped();
        let config = factory.load_config().unwrap();
        let profiles = factory.load_profiles().unwrap();
        let equipment = factory.load_equipment().unwrap();
        let characters = factory.load_characters().unwrap();
        let bran = characters
            .iter()
            .find(|spec| spec.profile == "Warrior")
            .unwrap();

        let actor = build_character(ActorId(1), bran, &profiles, &equipment, &config).unwrap();
        // Warrior, level 5, con 14: (5 + 2) per level.
        assert_eq!(actor.hp.max, 35);
        assert_eq!(actor.hp.value, actor.hp.max);
        // 10 base + 1 agility mod + 4 chainmail + 2 shield + 1 Iron Skin.
        assert_eq!(actor.combat.defense.value, 18);
        // Level bonus 5 + strength mod 3.
        assert_eq!(actor.combat.melee.value, 8);
        // No learned spell: no mana.
        assert_eq!(actor.resources.mana.max, 0);
        assert!(actor.first_equipped_weapon().is_some());
    }

    #[test]
    fn shipped_mage_gets_a_mana_pool() {
        let factory = shipped();
        let config = factory.load_config().unwrap();
        let profiles = factory.load_profiles().unwrap();
        let equipment = factory.load_equipment().unwrap();
        let characters = factory.load_characters().unwrap();
        let lyra = characters
            .iter()
            .find(|spec| spec.profile == "Mage")
            .unwrap();

        let actor = build_character(ActorId(2), lyra, &profiles, &equipment, &config).unwrap();
        // Charisma mod 3 + two learned spells + mage family bonus 4.
        assert_eq!(actor.resources.mana.max, 9);
        assert_eq!(actor.learned_spell_count(), 2);
    }

    #[test]
    fn shipped_encounters_build() {
        let factory = shipped();
        let config = factory.load_config().unwrap();
        let encounters = factory.load_encounters().unwrap();
        let troll = encounters
            .iter()
            .find(|def| def.name == "Cave Troll")
            .unwrap();

        let actor = build_encounter(ActorId(9), troll, &config).unwrap();
        assert_eq!(actor.hp.max, 46);
        assert!(actor.items.iter().any(|item| matches!(item.kind, ItemKind::Attack)));
    }

    #[test]
    fn unknown_profile_is_a_load_error() {
        let factory = shipped();
        let config = factory.load_config().unwrap();
        let profiles = factory.load_profiles().unwrap();
        let equipment = factory.load_equipment().unwrap();
        let mut spec = factory.load_characters().unwrap()[0].clone();
        spec.profile = "Jester".to_string();

        assert!(build_character(ActorId(1), &spec, &profiles, &equipment, &config).is_err());
    }
}
