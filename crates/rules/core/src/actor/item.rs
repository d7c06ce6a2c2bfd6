//! Item types owned by an actor.
//!
//! Items are embedded records: features, profiles, paths, capacities,
//! equipment, and encounter attacks. Items own their action lists; action
//! indices are stable positions into those lists.

use crate::action::Action;
use crate::modifier::Modifier;

/// Reference to an embedded item on an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemId(pub u32);

/// A consumable charge counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Charges {
    pub current: i32,
    pub max: i32,
}

impl Charges {
    pub fn full(max: i32) -> Self {
        Self { current: max, max }
    }

    pub fn is_empty(&self) -> bool {
        self.current <= 0
    }

    /// Spend one charge; returns false (and changes nothing) when empty.
    #[must_use]
    pub fn spend(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.current -= 1;
        true
    }
}

/// How often a capacity's uses come back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Frequency {
    /// No usage limit.
    #[default]
    AtWill,
    /// Charges refill when a combat ends.
    PerCombat,
    /// Charges refill on a full rest.
    Daily,
}

/// Archetype family of a character profile.
///
/// Drives hit points per level, the recovery die, and the mana bonus. The
/// balance numbers are data: the content crate can override them, these are
/// the shipped defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArchetypeFamily {
    Warrior,
    Agile,
    Mystic,
    Mage,
}

impl ArchetypeFamily {
    pub const fn hp_per_level(&self) -> i32 {
        match self {
            Self::Warrior => 5,
            Self::Agile | Self::Mystic => 4,
            Self::Mage => 3,
        }
    }

    /// Die size rolled when spending a recovery point.
    pub const fn recovery_die(&self) -> u32 {
        match self {
            Self::Warrior => 10,
            Self::Agile | Self::Mystic => 8,
            Self::Mage => 6,
        }
    }

    pub const fn mana_bonus(&self) -> i32 {
        match self {
            Self::Warrior | Self::Agile => 0,
            Self::Mystic => 2,
            Self::Mage => 4,
        }
    }
}

/// Profile payload: the character's archetype and its progression paths.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProfileData {
    pub family: ArchetypeFamily,
    /// Paths granted by this profile, by embedded item id.
    pub paths: Vec<ItemId>,
}

/// Path payload: an ordered progression of capacities.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathData {
    /// Ordered capacity item ids; position is the capacity's rank slot.
    pub capacities: Vec<ItemId>,
    /// Prestige paths grant bonus hit points per learned capacity.
    pub prestige_hp_per_capacity: i32,
}

/// Capacity payload: a learnable special ability.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CapacityData {
    pub learned: bool,
    /// Spell capacities draw on mana.
    pub spell: bool,
    /// Mana cost formula; empty means free.
    pub mana_cost: String,
    pub frequency: Frequency,
    /// Present for charge-limited capacities.
    pub charges: Option<Charges>,
    /// Path this capacity belongs to, if any.
    pub path: Option<ItemId>,
    /// Linked parent capacity for rank resolution, if any.
    pub parent: Option<ItemId>,
    /// Own rank, used only when path-less and unlinked.
    pub rank: i32,
}

impl Default for CapacityData {
    fn default() -> Self {
        Self {
            learned: false,
            spell: false,
            mana_cost: String::new(),
            frequency: Frequency::AtWill,
            charges: None,
            path: None,
            parent: None,
            rank: 0,
        }
    }
}

/// Weapon payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeaponData {
    /// Hands needed to wield (1 or 2).
    pub hands: u8,
    /// Ammunition for reloadable weapons; `None` means no reload tracking.
    pub ammo: Option<Charges>,
}

/// Armor payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmorData {
    pub defense: i32,
    /// Heavy armor caps the wearer's agility value.
    pub agility_cap: Option<i32>,
}

/// Shield payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShieldData {
    pub defense: i32,
}

/// Consumable payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsumableData {
    pub quantity: u16,
    /// Delete the item when the last use is consumed.
    pub destroy_on_empty: bool,
}

/// What kind of equipment an item is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EquipmentKind {
    Weapon(WeaponData),
    Armor(ArmorData),
    Shield(ShieldData),
    Consumable(ConsumableData),
    Misc,
}

impl EquipmentKind {
    /// Hands occupied while equipped.
    pub const fn hands(&self) -> u8 {
        match self {
            Self::Weapon(weapon) => weapon.hands,
            Self::Shield(_) => 1,
            Self::Armor(_) | Self::Consumable(_) | Self::Misc => 0,
        }
    }
}

/// Equipment payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EquipmentData {
    pub equipped: bool,
    pub kind: EquipmentKind,
}

/// The closed set of item kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemKind {
    /// Innate trait; its modifiers are always on.
    Feature,
    Profile(ProfileData),
    Path(PathData),
    Capacity(CapacityData),
    Equipment(EquipmentData),
    /// Encounter natural attack carrying its own actions.
    Attack,
}

/// An embedded item.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub tags: Vec<String>,
    pub kind: ItemKind,
    /// Item-level modifiers; enabled whenever the item itself is active.
    pub modifiers: Vec<Modifier>,
    /// Actions owned by this item; indices are stable positions.
    pub actions: Vec<Action>,
}

impl Item {
    pub fn new(id: ItemId, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id,
            name: name.into(),
            tags: Vec::new(),
            kind,
            modifiers: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Whether the item currently contributes modifiers and actions:
    /// capacities must be learned, equipment must be equipped, everything
    /// else is active while it exists.
    pub fn is_active(&self) -> bool {
        match &self.kind {
            ItemKind::Capacity(capacity) => capacity.learned,
            ItemKind::Equipment(equipment) => equipment.equipped,
            ItemKind::Feature | ItemKind::Profile(_) | ItemKind::Path(_) | ItemKind::Attack => true,
        }
    }

    pub fn as_capacity(&self) -> Option<&CapacityData> {
        match &self.kind {
            ItemKind::Capacity(capacity) => Some(capacity),
            _ => None,
        }
    }

    pub fn as_capacity_mut(&mut self) -> Option<&mut CapacityData> {
        match &mut self.kind {
            ItemKind::Capacity(capacity) => Some(capacity),
            _ => None,
        }
    }

    pub fn as_equipment(&self) -> Option<&EquipmentData> {
        match &self.kind {
            ItemKind::Equipment(equipment) => Some(equipment),
            _ => None,
        }
    }

    pub fn as_equipped_weapon(&self) -> Option<&WeaponData> {
        match &self.kind {
            ItemKind::Equipment(EquipmentData {
                equipped: true,
                kind: EquipmentKind::Weapon(weapon),
            }) => Some(weapon),
            _ => None,
        }
    }

    /// The action driving this item's main use (position 0).
    pub fn primary_action(&self) -> Option<&Action> {
        self.actions.first()
    }

    /// Re-point the item and everything it owns at a new embedded id.
    ///
    /// Used when an item is cloned or re-embedded onto another actor.
    pub fn rebind(&mut self, id: ItemId) {
        self.id = id;
        for modifier in &mut self.modifiers {
            modifier.source = id;
        }
        for action in &mut self.actions {
            action.source = id;
            for modifier in &mut action.modifiers {
                modifier.source = id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charges_spend_stops_at_zero() {
        let mut charges = Charges::full(1);
        assert!(charges.spend());
        assert!(!charges.spend());
        assert_eq!(charges.current, 0);
    }

    #[test]
    fn capacity_item_active_only_when_learned() {
        let mut item = Item::new(
            ItemId(1),
            "Hidden strike",
            ItemKind::Capacity(CapacityData::default()),
        );
        assert!(!item.is_active());
        item.as_capacity_mut().unwrap().learned = true;
        assert!(item.is_active());
    }

    #[test]
    fn rebind_repoints_owned_records() {
        use crate::modifier::{Modifier, ModifierTarget};
        use crate::stats::AbilityKind;

        let mut item = Item::new(ItemId(1), "Ring", ItemKind::Feature);
        item.modifiers.push(Modifier::literal(
            ItemId(1),
            ModifierTarget::Ability(AbilityKind::Strength),
            1,
        ));
        item.rebind(ItemId(9));
        assert_eq!(item.id, ItemId(9));
        assert_eq!(item.modifiers[0].source, ItemId(9));
    }
}
