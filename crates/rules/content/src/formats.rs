//! Serde formats for the RON catalogs.
//!
//! These mirror the `rules-core` item types but stay name-based and
//! defaulted so data files remain short to author. Every `build` method
//! produces a core record with a placeholder item id; embedding onto an
//! actor rebinds the ids.

use serde::{Deserialize, Serialize};

use rules_core::{
    Action, ActionKind, ActionProperties, Actor, AdditionalEffect, ApplyOn, ApplyScope, ArmorData,
    ArchetypeFamily, CapacityData, Charges, ConsumableData, DamageSpec, EffectUnit, Element,
    EquipmentData, EquipmentKind, Frequency, Item, ItemId, ItemKind, Modifier, ModifierTarget,
    ModifierValue, Resolver, ResolverKind, ShieldData, SkillSpec, StatusKind, TargetScope,
    TargetSpec, WeaponData,
};

fn default_true() -> bool {
    true
}

fn default_ability() -> i32 {
    10
}

fn default_number() -> u8 {
    1
}

/// One sourced contribution, name-free: the source is the item the modifier
/// ends up embedded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierDef {
    pub target: ModifierTarget,
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub scope: ApplyScope,
    pub value: ModifierValueDef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModifierValueDef {
    Literal(i32),
    Formula(String),
}

impl ModifierDef {
    pub fn build(&self, source: ItemId) -> Modifier {
        Modifier {
            source,
            subtype: self.subtype.clone(),
            target: self.target,
            scope: self.scope,
            value: match &self.value {
                ModifierValueDef::Literal(value) => ModifierValue::Literal(*value),
                ModifierValueDef::Formula(formula) => ModifierValue::Formula(formula.clone()),
            },
        }
    }
}

/// Target selection of a resolver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TargetDef {
    #[serde(default)]
    pub scope: TargetScope,
    #[serde(default = "default_number")]
    pub number: u8,
}

impl Default for TargetDef {
    fn default() -> Self {
        Self {
            scope: TargetScope::default(),
            number: 1,
        }
    }
}

/// The timed effect a resolver spawns alongside its main outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectDef {
    #[serde(default)]
    pub apply_on: ApplyOn,
    #[serde(default)]
    pub statuses: Vec<StatusKind>,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub unit: EffectUnit,
    #[serde(default)]
    pub formula: String,
    #[serde(default)]
    pub element: Element,
    #[serde(default)]
    pub buff: bool,
    #[serde(default)]
    pub scope: ApplyScope,
}

impl EffectDef {
    pub fn build(&self) -> AdditionalEffect {
        AdditionalEffect {
            active: true,
            apply_on: self.apply_on,
            statuses: self.statuses.clone(),
            duration: self.duration.clone(),
            unit: self.unit,
            formula: self.formula.clone(),
            element: self.element,
            buff: self.buff,
            scope: self.scope,
        }
    }
}

/// One executable effect of an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverDef {
    pub kind: ResolverKind,
    #[serde(default)]
    pub skill: String,
    #[serde(default)]
    pub crit: i32,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub dmg: String,
    #[serde(default)]
    pub target: TargetDef,
    #[serde(default)]
    pub effect: Option<EffectDef>,
}

impl ResolverDef {
    pub fn build(&self) -> Resolver {
        let mut resolver = Resolver::new(self.kind);
        resolver.skill = SkillSpec {
            formula: self.skill.clone(),
            crit: self.crit,
            difficulty: self.difficulty.clone(),
        };
        resolver.dmg = DamageSpec {
            formula: self.dmg.clone(),
        };
        resolver.target = TargetSpec {
            scope: self.target.scope,
            number: self.target.number,
        };
        if let Some(effect) = &self.effect {
            resolver.additional_effect = effect.build();
        }
        resolver
    }
}

/// One effect unit owned by an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDef {
    pub kind: ActionKind,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub activable: bool,
    #[serde(default)]
    pub temporary: bool,
    #[serde(default)]
    pub no_mana_cost: bool,
    #[serde(default)]
    pub modifiers: Vec<ModifierDef>,
    #[serde(default)]
    pub resolvers: Vec<ResolverDef>,
}

impl ActionDef {
    pub fn build(&self, source: ItemId, indice: usize) -> Action {
        let mut action = Action::new(source, indice, self.kind);
        action.properties.set(ActionProperties::VISIBLE, self.visible);
        action
            .properties
            .set(ActionProperties::ACTIVABLE, self.activable);
        action
            .properties
            .set(ActionProperties::TEMPORARY, self.temporary);
        action
            .properties
            .set(ActionProperties::NO_MANA_COST, self.no_mana_cost);
        action.modifiers = self
            .modifiers
            .iter()
            .map(|modifier| modifier.build(source))
            .collect();
        action.resolvers = self.resolvers.iter().map(ResolverDef::build).collect();
        action
    }
}

/// Structural half of an equipment definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EquipmentKindDef {
    Weapon { hands: u8, ammo: Option<i32> },
    Armor { defense: i32, agility_cap: Option<i32> },
    Shield { defense: i32 },
    Consumable { quantity: u16, destroy_on_empty: bool },
    Misc,
}

/// One catalog entry of equipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentDef {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub kind: EquipmentKindDef,
    #[serde(default)]
    pub modifiers: Vec<ModifierDef>,
    #[serde(default)]
    pub actions: Vec<ActionDef>,
}

impl EquipmentDef {
    pub fn build(&self, equipped: bool) -> Item {
        let kind = match &self.kind {
            EquipmentKindDef::Weapon { hands, ammo } => EquipmentKind::Weapon(WeaponData {
                hands: *hands,
                ammo: ammo.map(Charges::full),
            }),
            EquipmentKindDef::Armor {
                defense,
                agility_cap,
            } => EquipmentKind::Armor(ArmorData {
                defense: *defense,
                agility_cap: *agility_cap,
            }),
            EquipmentKindDef::Shield { defense } => EquipmentKind::Shield(ShieldData {
                defense: *defense,
            }),
            EquipmentKindDef::Consumable {
                quantity,
                destroy_on_empty,
            } => EquipmentKind::Consumable(ConsumableData {
                quantity: *quantity,
                destroy_on_empty: *destroy_on_empty,
            }),
            EquipmentKindDef::Misc => EquipmentKind::Misc,
        };
        self.assemble(ItemKind::Equipment(EquipmentData { equipped, kind }))
    }

    fn assemble(&self, kind: ItemKind) -> Item {
        let mut item = Item::new(ItemId(0), self.name.clone(), kind);
        item.tags = self.tags.clone();
        item.modifiers = self
            .modifiers
            .iter()
            .map(|modifier| modifier.build(ItemId(0)))
            .collect();
        item.actions = self
            .actions
            .iter()
            .enumerate()
            .map(|(indice, action)| action.build(ItemId(0), indice))
            .collect();
        item
    }
}

/// One learnable capacity inside a path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityDef {
    pub name: String,
    #[serde(default)]
    pub spell: bool,
    #[serde(default)]
    pub mana_cost: String,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub charges: Option<i32>,
    #[serde(default)]
    pub modifiers: Vec<ModifierDef>,
    #[serde(default)]
    pub actions: Vec<ActionDef>,
}

impl CapacityDef {
    pub fn build(&self, path: Option<ItemId>) -> Item {
        let mut item = Item::new(
            ItemId(0),
            self.name.clone(),
            ItemKind::Capacity(CapacityData {
                learned: false,
                spell: self.spell,
                mana_cost: self.mana_cost.clone(),
                frequency: self.frequency,
                charges: self.charges.map(Charges::full),
                path,
                parent: None,
                rank: 0,
            }),
        );
        item.modifiers = self
            .modifiers
            .iter()
            .map(|modifier| modifier.build(ItemId(0)))
            .collect();
        item.actions = self
            .actions
            .iter()
            .enumerate()
            .map(|(indice, action)| action.build(ItemId(0), indice))
            .collect();
        item
    }
}

/// An ordered progression of capacities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathDef {
    pub name: String,
    #[serde(default)]
    pub prestige_hp_per_capacity: i32,
    pub capacities: Vec<CapacityDef>,
}

/// A character profile with its paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDef {
    pub name: String,
    pub family: ArchetypeFamily,
    pub paths: Vec<PathDef>,
}

/// Ability bases of a sheet; omitted abilities sit at the baseline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AbilitiesDef {
    #[serde(default = "default_ability")]
    pub strength: i32,
    #[serde(default = "default_ability")]
    pub agility: i32,
    #[serde(default = "default_ability")]
    pub constitution: i32,
    #[serde(default = "default_ability")]
    pub intellect: i32,
    #[serde(default = "default_ability")]
    pub perception: i32,
    #[serde(default = "default_ability")]
    pub charisma: i32,
}

impl AbilitiesDef {
    pub fn apply(&self, actor: &mut Actor) {
        actor.abilities.strength.base = self.strength;
        actor.abilities.agility.base = self.agility;
        actor.abilities.constitution.base = self.constitution;
        actor.abilities.intellect.base = self.intellect;
        actor.abilities.perception.base = self.perception;
        actor.abilities.charisma.base = self.charisma;
    }
}

/// An encounter's natural attack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackDef {
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<ModifierDef>,
    pub actions: Vec<ActionDef>,
}

/// One catalog entry of a non-player encounter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterDef {
    pub name: String,
    pub hp: i32,
    pub challenge: i32,
    #[serde(default)]
    pub abilities: Option<AbilitiesDef>,
    #[serde(default)]
    pub attacks: Vec<AttackDef>,
}

/// Which equipment a character sheet carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentRef {
    pub name: String,
    #[serde(default)]
    pub equipped: bool,
}

/// How far a sheet has progressed down one path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedSpec {
    pub path: String,
    pub count: usize,
}

/// A pre-built character sheet, resolved against the catalogs by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterSpec {
    pub name: String,
    pub level: i32,
    pub profile: String,
    pub abilities: AbilitiesDef,
    #[serde(default)]
    pub equipment: Vec<EquipmentRef>,
    #[serde(default)]
    pub learned: Vec<LearnedSpec>,
}
