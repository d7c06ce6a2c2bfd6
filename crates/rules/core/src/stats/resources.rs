//! Resource pools - fortune, mana, recovery - and hit points.
//!
//! `max` is derived each pass; `value` (current) is stored state, mutated
//! only by consumption, recovery, and explicit rest operations. Invariant:
//! `0 ≤ value ≤ max`, enforced by clamping on every pass.

use strum::EnumIter;

/// The three spendable pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResourceKind {
    /// Luck points spent to improve a recorded roll.
    Fortune,
    /// Spell fuel; zero for actors without a learned spell.
    Mana,
    /// Recovery points spent to heal between fights.
    Recovery,
}

/// A spendable pool with a derived maximum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourcePool {
    /// Stored base before the linked ability contribution.
    pub base: i32,
    /// Current points. Never auto-reset outside explicit rest operations.
    pub value: i32,
    /// Derived: recomputed each pass.
    pub max: i32,
}

impl ResourcePool {
    /// Set a freshly derived maximum and clamp the current value into range.
    pub fn set_max(&mut self, max: i32) {
        self.max = max.max(0);
        self.value = self.value.clamp(0, self.max);
    }

    /// Spend points; returns false (and changes nothing) if short.
    #[must_use]
    pub fn spend(&mut self, amount: i32) -> bool {
        if amount > self.value {
            return false;
        }
        self.value -= amount;
        true
    }

    /// Restore points up to the maximum.
    pub fn restore(&mut self, amount: i32) {
        self.value = (self.value + amount).clamp(0, self.max);
    }

    /// Refill to the maximum.
    pub fn refill(&mut self) {
        self.value = self.max;
    }

    pub fn is_empty(&self) -> bool {
        self.value <= 0
    }
}

/// The three pools together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourcePools {
    pub fortune: ResourcePool,
    pub mana: ResourcePool,
    pub recovery: ResourcePool,
}

impl ResourcePools {
    pub fn get(&self, kind: ResourceKind) -> &ResourcePool {
        match kind {
            ResourceKind::Fortune => &self.fortune,
            ResourceKind::Mana => &self.mana,
            ResourceKind::Recovery => &self.recovery,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut ResourcePool {
        match kind {
            ResourceKind::Fortune => &mut self.fortune,
            ResourceKind::Mana => &mut self.mana,
            ResourceKind::Recovery => &mut self.recovery,
        }
    }
}

/// Hit points. Current value is stored; max is derived each pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitPoints {
    pub value: i32,
    pub max: i32,
}

impl HitPoints {
    pub fn at_max(max: i32) -> Self {
        Self { value: max, max }
    }

    /// Set a freshly derived maximum and clamp the current value into range.
    pub fn set_max(&mut self, max: i32) {
        self.max = max.max(0);
        self.value = self.value.clamp(0, self.max);
    }

    /// Apply damage, floored at zero. Returns the points actually lost.
    pub fn damage(&mut self, amount: i32) -> i32 {
        let lost = amount.clamp(0, self.value);
        self.value -= lost;
        lost
    }

    /// Apply healing, capped at max. Returns the points actually gained.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let gained = amount.clamp(0, self.max - self.value);
        self.value += gained;
        gained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_spend_refuses_overdraft() {
        let mut pool = ResourcePool {
            base: 0,
            value: 2,
            max: 5,
        };
        assert!(pool.spend(2));
        assert_eq!(pool.value, 0);
        assert!(!pool.spend(1));
        assert_eq!(pool.value, 0);
    }

    #[test]
    fn set_max_clamps_current() {
        let mut pool = ResourcePool {
            base: 0,
            value: 8,
            max: 8,
        };
        pool.set_max(5);
        assert_eq!(pool.value, 5);
    }

    #[test]
    fn heal_is_idempotent_at_max() {
        let mut hp = HitPoints::at_max(20);
        hp.damage(6);
        assert_eq!(hp.heal(10), 6);
        assert_eq!(hp.value, 20);
        assert_eq!(hp.heal(10), 0);
        assert_eq!(hp.value, 20);
    }
}
