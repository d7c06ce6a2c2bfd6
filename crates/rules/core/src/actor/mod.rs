//! Actor state: the sheet-level record the pipeline derives from.
//!
//! Actors come in two concrete shapes selected once at construction:
//! characters (leveled, profile-driven) and encounters (flat hit points,
//! challenge rating). Everything downstream matches on [`ActorKind`] instead
//! of re-inspecting type strings.

pub mod item;

pub use item::{
    ArchetypeFamily, ArmorData, CapacityData, Charges, ConsumableData, EquipmentData,
    EquipmentKind, Frequency, Item, ItemId, ItemKind, PathData, ProfileData, ShieldData,
    WeaponData,
};

use crate::effect::ActiveEffects;
use crate::error::{ErrorSeverity, RulesError};
use crate::stats::{Abilities, CombatStats, HitPoints, ResourcePools};

/// Reference to an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorId(pub u32);

/// Concrete actor shape, selected once at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActorKind {
    /// A player character: hit points scale with level and family.
    Character,
    /// A non-player encounter: flat base hit points, challenge rating.
    Encounter { base_hp: i32, challenge: i32 },
}

/// Conditions currently shown on an actor.
///
/// Entries applied by the hit-point sync stage are flagged so the pipeline
/// never clears a status a user applied by hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StatusKind {
    Weakened,
    Unconscious,
    Stunned,
    Slowed,
    Poisoned,
    Burning,
    Blinded,
    Paralyzed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct StatusEntry {
    kind: StatusKind,
    /// Set when the hit-point sync stage applied this entry.
    hp_linked: bool,
}

/// Status set with hp-sync bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Statuses {
    entries: Vec<StatusEntry>,
}

impl Statuses {
    pub fn has(&self, kind: StatusKind) -> bool {
        self.entries.iter().any(|entry| entry.kind == kind)
    }

    /// Apply a status by hand (or from an effect). No-op if present.
    pub fn apply(&mut self, kind: StatusKind) {
        if !self.has(kind) {
            self.entries.push(StatusEntry {
                kind,
                hp_linked: false,
            });
        }
    }

    /// Apply a status on behalf of the hit-point sync stage.
    pub fn apply_hp_linked(&mut self, kind: StatusKind) {
        if !self.has(kind) {
            self.entries.push(StatusEntry {
                kind,
                hp_linked: true,
            });
        }
    }

    /// Remove a status regardless of origin.
    pub fn remove(&mut self, kind: StatusKind) {
        self.entries.retain(|entry| entry.kind != kind);
    }

    /// Remove a status only if the hit-point sync stage applied it.
    pub fn remove_hp_linked(&mut self, kind: StatusKind) {
        self.entries
            .retain(|entry| !(entry.kind == kind && entry.hp_linked));
    }
}

/// Rejections for learn/unlearn requests.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LearnError {
    #[error("item not found")]
    UnknownItem,
    #[error("item is not a capacity")]
    NotACapacity,
    #[error("level {required} required")]
    LevelTooLow { required: i32 },
    #[error("earlier capacities in the path are not learned")]
    PrerequisiteMissing,
    #[error("a later capacity in the path is still learned")]
    LaterCapacityLearned,
}

impl RulesError for LearnError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownItem | Self::NotACapacity => ErrorSeverity::Validation,
            Self::LevelTooLow { .. } | Self::PrerequisiteMissing | Self::LaterCapacityLearned => {
                ErrorSeverity::Recoverable
            }
        }
    }
}

/// Rejections for equip/embed requests.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EquipError {
    #[error("item not found")]
    UnknownItem,
    #[error("item is not equipment")]
    NotEquipment,
    #[error("hands already full")]
    HandsFull,
    #[error("profile slot already occupied")]
    ProfileSlotOccupied,
}

impl RulesError for EquipError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownItem | Self::NotEquipment => ErrorSeverity::Validation,
            Self::HandsFull | Self::ProfileSlotOccupied => ErrorSeverity::Recoverable,
        }
    }
}

/// One participant-controlled creature and everything embedded on it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub kind: ActorKind,
    pub level: i32,
    pub abilities: Abilities,
    pub combat: CombatStats,
    pub hp: HitPoints,
    pub resources: ResourcePools,
    /// Derived: movement in meters.
    pub movement: i32,
    /// Derived: darkvision rendering toggle (external collaborator reads it).
    pub dark_vision: bool,
    pub items: Vec<Item>,
    pub effects: ActiveEffects,
    pub statuses: Statuses,
    next_item_id: u32,
}

impl Actor {
    /// Build a player character.
    pub fn character(id: ActorId, name: impl Into<String>, level: i32) -> Self {
        Self::new(id, name, ActorKind::Character, level)
    }

    /// Build a non-player encounter.
    pub fn encounter(id: ActorId, name: impl Into<String>, base_hp: i32, challenge: i32) -> Self {
        Self::new(id, name, ActorKind::Encounter { base_hp, challenge }, challenge)
    }

    fn new(id: ActorId, name: impl Into<String>, kind: ActorKind, level: i32) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            level,
            abilities: Abilities::uniform(10),
            combat: CombatStats::default(),
            hp: HitPoints::default(),
            resources: ResourcePools::default(),
            movement: 0,
            dark_vision: false,
            items: Vec::new(),
            effects: ActiveEffects::default(),
            statuses: Statuses::default(),
            next_item_id: 1,
        }
    }

    /// Refill hit points and every pool to their maxima. Used right after
    /// creation and by the full-rest operation.
    pub fn refill_all(&mut self) {
        self.hp.value = self.hp.max;
        self.resources.fortune.refill();
        self.resources.mana.refill();
        self.resources.recovery.refill();
    }

    /// Level for formula purposes: character level or challenge rating.
    pub fn effective_level(&self) -> i32 {
        match self.kind {
            ActorKind::Character => self.level,
            ActorKind::Encounter { challenge, .. } => challenge,
        }
    }

    // ========================================================================
    // Item access
    // ========================================================================

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Embed an item, assigning it a fresh id and rebinding its records.
    ///
    /// A second profile is rejected; everything else embeds freely.
    pub fn embed_item(&mut self, mut item: Item) -> Result<ItemId, EquipError> {
        if matches!(item.kind, ItemKind::Profile(_)) && self.profile().is_some() {
            return Err(EquipError::ProfileSlotOccupied);
        }
        let id = ItemId(self.next_item_id);
        self.next_item_id += 1;
        item.rebind(id);
        self.items.push(item);
        Ok(id)
    }

    /// Remove an item and every record it owns.
    pub fn delete_item(&mut self, id: ItemId) {
        self.items.retain(|item| item.id != id);
    }

    /// The actor's profile item, if any.
    pub fn profile(&self) -> Option<(&Item, &ProfileData)> {
        self.items.iter().find_map(|item| match &item.kind {
            ItemKind::Profile(profile) => Some((item, profile)),
            _ => None,
        })
    }

    /// Archetype family from the profile.
    pub fn family(&self) -> Option<ArchetypeFamily> {
        self.profile().map(|(_, profile)| profile.family)
    }

    /// First equipped weapon, in embedding order.
    pub fn first_equipped_weapon(&self) -> Option<&Item> {
        self.items
            .iter()
            .find(|item| item.as_equipped_weapon().is_some())
    }

    /// First equipped armor, in embedding order.
    pub fn first_equipped_armor(&self) -> Option<&ArmorData> {
        self.items.iter().find_map(|item| match &item.kind {
            ItemKind::Equipment(EquipmentData {
                equipped: true,
                kind: EquipmentKind::Armor(armor),
            }) => Some(armor),
            _ => None,
        })
    }

    /// First equipped shield, in embedding order.
    pub fn first_equipped_shield(&self) -> Option<&ShieldData> {
        self.items.iter().find_map(|item| match &item.kind {
            ItemKind::Equipment(EquipmentData {
                equipped: true,
                kind: EquipmentKind::Shield(shield),
            }) => Some(shield),
            _ => None,
        })
    }

    /// Count of learned spell capacities.
    pub fn learned_spell_count(&self) -> usize {
        self.items
            .iter()
            .filter_map(Item::as_capacity)
            .filter(|capacity| capacity.learned && capacity.spell)
            .count()
    }

    // ========================================================================
    // Rank resolution
    // ========================================================================

    /// A path's rank: the number of its capacities currently learned.
    pub fn path_rank(&self, path_id: ItemId) -> i32 {
        let Some(ItemKind::Path(path)) = self.item(path_id).map(|item| &item.kind) else {
            return 0;
        };
        path.capacities
            .iter()
            .filter_map(|id| self.item(*id))
            .filter_map(Item::as_capacity)
            .filter(|capacity| capacity.learned)
            .count() as i32
    }

    /// Progression rank anchored at an item: the path's rank for a capacity
    /// in a path, the parent's rank for a linked child, the capacity's own
    /// rank when path-less, a path's rank for the path itself.
    pub fn rank_for(&self, source: ItemId) -> Option<i32> {
        let item = self.item(source)?;
        match &item.kind {
            ItemKind::Path(_) => Some(self.path_rank(source)),
            ItemKind::Capacity(capacity) => {
                if let Some(path) = capacity.path {
                    Some(self.path_rank(path))
                } else if let Some(parent) = capacity.parent {
                    self.rank_for(parent)
                } else {
                    Some(capacity.rank)
                }
            }
            _ => None,
        }
    }

    /// How many of the actor's paths have reached the given rank.
    pub fn paths_at_rank(&self, rank: i32) -> i32 {
        self.items
            .iter()
            .filter(|item| matches!(item.kind, ItemKind::Path(_)))
            .filter(|item| self.path_rank(item.id) >= rank)
            .count() as i32
    }

    // ========================================================================
    // Presentation entry points
    // ========================================================================

    /// Toggle a capacity's learned flag, enforcing progression order.
    ///
    /// Learning capacity at position `p` (1-based) in its path requires every
    /// earlier capacity learned and `level ≥ 2p − 1`. The one tolerated hole:
    /// a level-1 Mage may learn position 2 with position 1 unlearned, its
    /// level gate waived along with the prerequisite.
    /// Unlearning requires no later capacity still learned.
    pub fn toggle_capacity_learned(&mut self, id: ItemId) -> Result<bool, LearnError> {
        let item = self.item(id).ok_or(LearnError::UnknownItem)?;
        let capacity = item.as_capacity().ok_or(LearnError::NotACapacity)?;
        let learned = capacity.learned;

        if let Some(path_id) = capacity.path {
            let position = self.capacity_position(path_id, id);
            if let Some(position) = position {
                if learned {
                    self.check_no_later_learned(path_id, position)?;
                } else {
                    self.check_learnable(path_id, position)?;
                }
            }
        } else if !learned && capacity.rank > 0 {
            let required = 2 * capacity.rank - 1;
            if self.level < required {
                return Err(LearnError::LevelTooLow { required });
            }
        }

        let capacity = self
            .item_mut(id)
            .and_then(Item::as_capacity_mut)
            .ok_or(LearnError::UnknownItem)?;
        capacity.learned = !learned;
        Ok(!learned)
    }

    /// 1-based position of a capacity in its path's ordered list.
    fn capacity_position(&self, path_id: ItemId, capacity_id: ItemId) -> Option<usize> {
        let ItemKind::Path(path) = &self.item(path_id)?.kind else {
            return None;
        };
        path.capacities
            .iter()
            .position(|id| *id == capacity_id)
            .map(|index| index + 1)
    }

    fn check_learnable(&self, path_id: ItemId, position: usize) -> Result<(), LearnError> {
        // Creation-time exception: a level-1 Mage may take position 2,
        // waiving the level gate and the unlearned position 1 alike.
        let mage_creation_exception =
            self.level == 1 && self.family() == Some(ArchetypeFamily::Mage) && position == 2;

        let required = 2 * position as i32 - 1;
        if self.level < required && !mage_creation_exception {
            return Err(LearnError::LevelTooLow { required });
        }

        let ItemKind::Path(path) = &self.item(path_id).ok_or(LearnError::UnknownItem)?.kind else {
            return Err(LearnError::UnknownItem);
        };
        for earlier in &path.capacities[..position - 1] {
            let learned = self
                .item(*earlier)
                .and_then(Item::as_capacity)
                .is_some_and(|capacity| capacity.learned);
            if !learned && !mage_creation_exception {
                return Err(LearnError::PrerequisiteMissing);
            }
        }
        Ok(())
    }

    fn check_no_later_learned(&self, path_id: ItemId, position: usize) -> Result<(), LearnError> {
        let ItemKind::Path(path) = &self.item(path_id).ok_or(LearnError::UnknownItem)?.kind else {
            return Err(LearnError::UnknownItem);
        };
        for later in &path.capacities[position..] {
            let learned = self
                .item(*later)
                .and_then(Item::as_capacity)
                .is_some_and(|capacity| capacity.learned);
            if learned {
                return Err(LearnError::LaterCapacityLearned);
            }
        }
        Ok(())
    }

    /// Toggle a piece of equipment, enforcing the two-hand budget.
    pub fn toggle_equipment_equipped(&mut self, id: ItemId) -> Result<bool, EquipError> {
        let item = self.item(id).ok_or(EquipError::UnknownItem)?;
        let equipment = item.as_equipment().ok_or(EquipError::NotEquipment)?;
        let equipped = equipment.equipped;
        let needed = equipment.kind.hands();

        if !equipped && needed > 0 && self.hands_in_use() + needed > 2 {
            return Err(EquipError::HandsFull);
        }

        let ItemKind::Equipment(equipment) = &mut self
            .item_mut(id)
            .ok_or(EquipError::UnknownItem)?
            .kind
        else {
            return Err(EquipError::NotEquipment);
        };
        equipment.equipped = !equipped;
        Ok(!equipped)
    }

    fn hands_in_use(&self) -> u8 {
        self.items
            .iter()
            .filter_map(Item::as_equipment)
            .filter(|equipment| equipment.equipped)
            .map(|equipment| equipment.kind.hands())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capacity(path: Option<ItemId>) -> Item {
        Item::new(
            ItemId(0),
            "capacity",
            ItemKind::Capacity(CapacityData {
                path,
                ..CapacityData::default()
            }),
        )
    }

    fn actor_with_path(level: i32, capacity_count: usize) -> (Actor, ItemId, Vec<ItemId>) {
        let mut actor = Actor::character(ActorId(1), "Tester", level);
        let path_id = actor
            .embed_item(Item::new(
                ItemId(0),
                "Path of Blades",
                ItemKind::Path(PathData {
                    capacities: Vec::new(),
                    prestige_hp_per_capacity: 0,
                }),
            ))
            .unwrap();
        let mut ids = Vec::new();
        for _ in 0..capacity_count {
            ids.push(actor.embed_item(capacity(Some(path_id))).unwrap());
        }
        let ItemKind::Path(path) = &mut actor.item_mut(path_id).unwrap().kind else {
            unreachable!()
        };
        path.capacities = ids.clone();
        (actor, path_id, ids)
    }

    #[test]
    fn learning_in_order_raises_rank() {
        let (mut actor, path_id, ids) = actor_with_path(5, 3);
        assert_eq!(actor.path_rank(path_id), 0);
        assert!(actor.toggle_capacity_learned(ids[0]).unwrap());
        assert!(actor.toggle_capacity_learned(ids[1]).unwrap());
        assert_eq!(actor.path_rank(path_id), 2);
    }

    #[test]
    fn learning_out_of_order_is_rejected() {
        let (mut actor, _, ids) = actor_with_path(5, 3);
        assert_eq!(
            actor.toggle_capacity_learned(ids[1]),
            Err(LearnError::PrerequisiteMissing)
        );
    }

    #[test]
    fn learning_gated_by_level() {
        let (mut actor, _, ids) = actor_with_path(1, 3);
        actor.toggle_capacity_learned(ids[0]).unwrap();
        assert_eq!(
            actor.toggle_capacity_learned(ids[1]),
            Err(LearnError::LevelTooLow { required: 3 })
        );
    }

    #[test]
    fn mage_creation_exception_allows_rank_two() {
        let (mut actor, _, ids) = actor_with_path(3, 3);
        actor.level = 1;
        actor
            .embed_item(Item::new(
                ItemId(0),
                "Mage",
                ItemKind::Profile(ProfileData {
                    family: ArchetypeFamily::Mage,
                    paths: Vec::new(),
                }),
            ))
            .unwrap();
        assert!(actor.toggle_capacity_learned(ids[1]).unwrap());
    }

    #[test]
    fn mage_exception_stops_at_position_two() {
        let (mut actor, _, ids) = actor_with_path(3, 3);
        actor.level = 1;
        actor
            .embed_item(Item::new(
                ItemId(0),
                "Mage",
                ItemKind::Profile(ProfileData {
                    family: ArchetypeFamily::Mage,
                    paths: Vec::new(),
                }),
            ))
            .unwrap();
        assert_eq!(
            actor.toggle_capacity_learned(ids[2]),
            Err(LearnError::LevelTooLow { required: 5 })
        );
    }

    #[test]
    fn unlearning_below_a_learned_capacity_is_rejected() {
        let (mut actor, _, ids) = actor_with_path(5, 3);
        actor.toggle_capacity_learned(ids[0]).unwrap();
        actor.toggle_capacity_learned(ids[1]).unwrap();
        assert_eq!(
            actor.toggle_capacity_learned(ids[0]),
            Err(LearnError::LaterCapacityLearned)
        );
    }

    #[test]
    fn second_profile_is_rejected() {
        let mut actor = Actor::character(ActorId(1), "Tester", 1);
        let profile = |name: &str| {
            Item::new(
                ItemId(0),
                name,
                ItemKind::Profile(ProfileData {
                    family: ArchetypeFamily::Warrior,
                    paths: Vec::new(),
                }),
            )
        };
        actor.embed_item(profile("Warrior")).unwrap();
        assert_eq!(
            actor.embed_item(profile("Mage")),
            Err(EquipError::ProfileSlotOccupied)
        );
    }

    #[test]
    fn hands_budget_is_enforced() {
        let mut actor = Actor::character(ActorId(1), "Tester", 1);
        let weapon = |name: &str, hands: u8| {
            Item::new(
                ItemId(0),
                name,
                ItemKind::Equipment(EquipmentData {
                    equipped: false,
                    kind: EquipmentKind::Weapon(WeaponData { hands, ammo: None }),
                }),
            )
        };
        let sword = actor.embed_item(weapon("Sword", 1)).unwrap();
        let shield = actor
            .embed_item(Item::new(
                ItemId(0),
                "Shield",
                ItemKind::Equipment(EquipmentData {
                    equipped: false,
                    kind: EquipmentKind::Shield(ShieldData { defense: 1 }),
                }),
            ))
            .unwrap();
        let greataxe = actor.embed_item(weapon("Greataxe", 2)).unwrap();

        assert!(actor.toggle_equipment_equipped(sword).unwrap());
        assert!(actor.toggle_equipment_equipped(shield).unwrap());
        assert_eq!(
            actor.toggle_equipment_equipped(greataxe),
            Err(EquipError::HandsFull)
        );
        // Free a hand and retry.
        assert!(!actor.toggle_equipment_equipped(shield).unwrap());
        assert_eq!(
            actor.toggle_equipment_equipped(greataxe),
            Err(EquipError::HandsFull)
        );
        assert!(!actor.toggle_equipment_equipped(sword).unwrap());
        assert!(actor.toggle_equipment_equipped(greataxe).unwrap());
    }
}
