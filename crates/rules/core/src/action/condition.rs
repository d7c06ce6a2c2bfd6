//! Named predicates gating an action's visibility.

use crate::actor::{Actor, Item, ItemId};

/// A predicate over the (actor, owning item) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionCondition {
    /// The owning item is equipped.
    IsEquipped,
    /// The owning item is a learned capacity.
    IsLearned,
    /// The owning item is still embedded on the actor.
    IsOwned,
    /// The owning item carries the given tag.
    HasTag(String),
    /// Another item's action is currently enabled.
    LinkedActionActive { item: ItemId, index: usize },
}

impl ActionCondition {
    pub fn check(&self, actor: &Actor, item: &Item) -> bool {
        match self {
            Self::IsEquipped => item
                .as_equipment()
                .is_some_and(|equipment| equipment.equipped),
            Self::IsLearned => item.as_capacity().is_some_and(|capacity| capacity.learned),
            Self::IsOwned => actor.item(item.id).is_some(),
            Self::HasTag(tag) => item.tags.iter().any(|candidate| candidate == tag),
            Self::LinkedActionActive { item, index } => actor
                .item(*item)
                .and_then(|linked| linked.actions.get(*index))
                .is_some_and(|action| action.effectively_enabled()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, ActionKind, ActionProperties};
    use crate::actor::{ActorId, EquipmentData, EquipmentKind, ItemKind, WeaponData};

    #[test]
    fn equipped_condition_tracks_the_flag() {
        let mut actor = Actor::character(ActorId(1), "Tester", 1);
        let id = actor
            .embed_item(Item::new(
                ItemId(0),
                "Bow",
                ItemKind::Equipment(EquipmentData {
                    equipped: false,
                    kind: EquipmentKind::Weapon(WeaponData {
                        hands: 2,
                        ammo: None,
                    }),
                }),
            ))
            .unwrap();

        let condition = ActionCondition::IsEquipped;
        assert!(!condition.check(&actor, actor.item(id).unwrap()));
        actor.toggle_equipment_equipped(id).unwrap();
        assert!(condition.check(&actor, actor.item(id).unwrap()));
    }

    #[test]
    fn linked_action_condition_follows_the_linked_flag() {
        let mut actor = Actor::character(ActorId(1), "Tester", 1);
        let mut stance = Item::new(ItemId(0), "Stance", ItemKind::Feature);
        let mut toggle = Action::new(ItemId(0), 0, ActionKind::Buff);
        toggle.properties |= ActionProperties::ACTIVABLE | ActionProperties::TEMPORARY;
        stance.actions.push(toggle);
        let stance_id = actor.embed_item(stance).unwrap();

        let strike = Item::new(ItemId(0), "Strike", ItemKind::Feature);
        let strike_id = actor.embed_item(strike).unwrap();

        let condition = ActionCondition::LinkedActionActive {
            item: stance_id,
            index: 0,
        };
        assert!(!condition.check(&actor, actor.item(strike_id).unwrap()));
        actor.item_mut(stance_id).unwrap().actions[0].set_enabled(true);
        assert!(condition.check(&actor, actor.item(strike_id).unwrap()));
    }
}
