//! Actions: the effect units owned by items.
//!
//! An action stores four orthogonal flags for compatibility with external
//! data, but behaves as one of three classes derived from them:
//!
//! - **Permanent** (`activable` off): enablement mirrors the owning item's
//!   own learned/equipped state, no user activation step;
//! - **Toggleable** (`activable` + `temporary`): user-driven on/off, resolvers
//!   run on the way on only;
//! - **Instantaneous** (`activable`, not `temporary`): each activation is a
//!   fresh one-shot and `enabled` is never persisted.

pub mod condition;
pub mod resolver;

pub use condition::ActionCondition;
pub use resolver::{
    AdditionalEffect, ApplyOn, DamageSpec, Element, Resolver, ResolverKind, SkillSpec, TargetScope,
    TargetSpec,
};

use bitflags::bitflags;

use crate::actor::ItemId;
use crate::modifier::Modifier;

bitflags! {
    /// The stored four-flag property word (plus the mana-cost exemption).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ActionProperties: u8 {
        const VISIBLE = 1;
        const ACTIVABLE = 1 << 1;
        const ENABLED = 1 << 2;
        const TEMPORARY = 1 << 3;
        const NO_MANA_COST = 1 << 4;
    }
}

/// Broad category used for cost and concentration rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionKind {
    Attack,
    Spell,
    Buff,
    Consume,
    Utility,
}

/// The three behavioral classes the four flags reduce to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionBehavior {
    Permanent,
    Toggleable,
    Instantaneous,
}

/// One effect unit owned by an item.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Action {
    /// Owning item.
    pub source: ItemId,
    /// Stable position in the owning item's action list.
    pub indice: usize,
    pub kind: ActionKind,
    pub properties: ActionProperties,
    pub conditions: Vec<ActionCondition>,
    pub modifiers: Vec<Modifier>,
    pub resolvers: Vec<Resolver>,
}

impl Action {
    pub fn new(source: ItemId, indice: usize, kind: ActionKind) -> Self {
        Self {
            source,
            indice,
            kind,
            properties: ActionProperties::VISIBLE,
            conditions: Vec::new(),
            modifiers: Vec::new(),
            resolvers: Vec::new(),
        }
    }

    pub fn behavior(&self) -> ActionBehavior {
        if !self.properties.contains(ActionProperties::ACTIVABLE) {
            ActionBehavior::Permanent
        } else if self.properties.contains(ActionProperties::TEMPORARY) {
            ActionBehavior::Toggleable
        } else {
            ActionBehavior::Instantaneous
        }
    }

    /// Raw stored flag.
    pub fn is_enabled(&self) -> bool {
        self.properties.contains(ActionProperties::ENABLED)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.properties.set(ActionProperties::ENABLED, enabled);
    }

    /// Whether this action's modifiers currently count, assuming the owning
    /// item is active. Permanent actions auto-enable with their item.
    pub fn effectively_enabled(&self) -> bool {
        matches!(self.behavior(), ActionBehavior::Permanent) || self.is_enabled()
    }

    /// Whether the action shows up at all: the visible flag plus every
    /// attached condition.
    pub fn is_visible(&self, actor: &crate::actor::Actor, item: &crate::actor::Item) -> bool {
        self.properties.contains(ActionProperties::VISIBLE)
            && self
                .conditions
                .iter()
                .all(|condition| condition.check(actor, item))
    }
}
