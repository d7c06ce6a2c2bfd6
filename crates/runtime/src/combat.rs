//! Combat round tracking.
//!
//! The tracker owns turn order and the round counter; the engine drives it
//! and runs the effect hooks (`on_turn_start` / `on_turn_end` /
//! `on_combat_end`) around each change. Combatants are ordered by derived
//! initiative, descending, stable on ties.

use rules_core::ActorId;

/// One participant in the encounter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Combatant {
    pub actor: ActorId,
    pub initiative: i32,
}

/// What one call to [`CombatTracker::advance`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnChange {
    /// Combatant whose turn just ended, absent on the opening turn.
    pub ended: Option<ActorId>,
    /// Combatant whose turn begins now.
    pub started: ActorId,
    /// Round the new turn belongs to.
    pub round: u32,
}

/// Round/turn state for one encounter.
#[derive(Clone, Debug)]
pub struct CombatTracker {
    combatants: Vec<Combatant>,
    round: u32,
    turn: Option<usize>,
}

impl CombatTracker {
    /// Build an encounter from (actor, initiative) pairs. Sorting is stable,
    /// so ties keep their insertion order.
    pub fn new(entries: impl IntoIterator<Item = (ActorId, i32)>) -> Self {
        let mut combatants: Vec<Combatant> = entries
            .into_iter()
            .map(|(actor, initiative)| Combatant { actor, initiative })
            .collect();
        combatants.sort_by(|a, b| b.initiative.cmp(&a.initiative));
        Self {
            combatants,
            round: 1,
            turn: None,
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    /// Whose turn it currently is, if the encounter has begun.
    pub fn current(&self) -> Option<ActorId> {
        Some(self.combatants.get(self.turn?)?.actor)
    }

    pub fn contains(&self, actor: ActorId) -> bool {
        self.combatants.iter().any(|c| c.actor == actor)
    }

    /// Move to the next turn, wrapping into a new round at the top of the
    /// order. `None` when the encounter has no combatants.
    pub fn advance(&mut self) -> Option<TurnChange> {
        if self.combatants.is_empty() {
            return None;
        }
        let change = match self.turn {
            None => {
                self.turn = Some(0);
                TurnChange {
                    ended: None,
                    started: self.combatants[0].actor,
                    round: self.round,
                }
            }
            Some(current) => {
                let ended = self.combatants[current].actor;
                let next = (current + 1) % self.combatants.len();
                if next == 0 {
                    self.round += 1;
                }
                self.turn = Some(next);
                TurnChange {
                    ended: Some(ended),
                    started: self.combatants[next].actor,
                    round: self.round,
                }
            }
        };
        Some(change)
    }

    /// Drop a combatant, keeping the current-turn pointer on the same
    /// combatant where possible.
    pub fn remove(&mut self, actor: ActorId) {
        let Some(index) = self.combatants.iter().position(|c| c.actor == actor) else {
            return;
        };
        self.combatants.remove(index);
        if self.combatants.is_empty() {
            self.turn = None;
        } else if let Some(current) = self.turn {
            if index < current {
                self.turn = Some(current - 1);
            } else if current >= self.combatants.len() {
                self.turn = Some(0);
            }
        }
    }
}
