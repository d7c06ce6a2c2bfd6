//! External collaborator traits: dice, confirmations, user notices.
//!
//! The rules engine never rolls dice or opens a dialog itself; it asks these
//! oracles and treats the answers as opaque. A dismissed roll dialog is
//! `None`, a declined confirmation is `false`, and both abort cleanly with
//! nothing committed.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::Rng;

use rules_core::formula::evaluate_arithmetic;

/// Result of one dice roll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Roll {
    pub total: i32,
    /// First die of the first dice term; 0 for dice-free formulas. Attack
    /// rolls read this for critical/fumble checks.
    pub natural: i32,
    /// Per-die breakdown, in rolled order.
    pub dice: Vec<i32>,
}

/// The roll primitive.
///
/// Takes a fully substituted formula (`"1d8 + 2"`); `None` models the user
/// dismissing the roll dialog.
#[async_trait]
pub trait DiceOracle: Send + Sync {
    async fn roll(&self, formula: &str) -> Option<Roll>;
}

/// User-facing rejection notices. Localization is data, out of scope; these
/// carry just enough for the presentation layer to pick a string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    NoAmmunition { item: String },
    NoCharges { item: String },
    NotEnoughMana { missing: i32 },
    NoFortunePoints,
    NoRecoveryPoints,
}

/// Warning delivery. Fire-and-forget; never blocks gameplay.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// A confirmation the user can decline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmRequest {
    /// Sacrifice hit points to cover a mana shortfall.
    ManaBurn { shortfall: i32 },
    /// Refill mana as part of a full rest.
    RefillMana,
    /// Spend a recovery point to heal.
    SpendRecoveryDie,
}

#[async_trait]
pub trait Prompt: Send + Sync {
    async fn confirm(&self, request: ConfirmRequest) -> bool;
}

// ============================================================================
// Implementations
// ============================================================================

/// Production dice: every die term rolled with the thread RNG.
pub struct RngDice;

#[async_trait]
impl DiceOracle for RngDice {
    async fn roll(&self, formula: &str) -> Option<Roll> {
        let mut rng = rand::thread_rng();
        roll_terms(formula, |size| rng.gen_range(1..=size as i32))
    }
}

/// Loaded dice: every die lands on the same face. Deterministic tests.
pub struct FlatDice(pub i32);

#[async_trait]
impl DiceOracle for FlatDice {
    async fn roll(&self, formula: &str) -> Option<Roll> {
        roll_terms(formula, |_| self.0)
    }
}

/// Scripted dice: replays a queue of prepared results, then keeps answering
/// `None` (a dismissed dialog) once the script runs out.
pub struct ScriptedDice {
    script: Mutex<VecDeque<Option<Roll>>>,
}

impl ScriptedDice {
    pub fn new(results: impl IntoIterator<Item = Option<Roll>>) -> Self {
        Self {
            script: Mutex::new(results.into_iter().collect()),
        }
    }

    /// A single prepared result with no breakdown.
    pub fn flat(total: i32, natural: i32) -> Option<Roll> {
        Some(Roll {
            total,
            natural,
            dice: vec![natural],
        })
    }
}

#[async_trait]
impl DiceOracle for ScriptedDice {
    async fn roll(&self, _formula: &str) -> Option<Roll> {
        self.script.lock().expect("script poisoned").pop_front()?
    }
}

/// Accepts every confirmation.
pub struct AutoConfirm;

#[async_trait]
impl Prompt for AutoConfirm {
    async fn confirm(&self, _request: ConfirmRequest) -> bool {
        true
    }
}

/// Declines every confirmation.
pub struct DenyAll;

#[async_trait]
impl Prompt for DenyAll {
    async fn confirm(&self, _request: ConfirmRequest) -> bool {
        false
    }
}

/// Routes notices to the log; the headless default.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        tracing::warn!(?notice, "user notice");
    }
}

/// Collects notices for assertion in tests (and for headless runs).
#[derive(Default)]
pub struct CollectingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl CollectingNotifier {
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut self.notices.lock().expect("notices poisoned"))
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().expect("notices poisoned").push(notice);
    }
}

/// Roll every `NdS` term in the formula with the supplied die function, then
/// collapse the remaining arithmetic. Returns `None` for formulas outside
/// the grammar, mirroring the soft-failure policy of the evaluator.
fn roll_terms(formula: &str, mut die: impl FnMut(u32) -> i32) -> Option<Roll> {
    let bytes = formula.as_bytes();
    let mut flattened = String::with_capacity(formula.len());
    let mut dice = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let count_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let is_dice = bytes.get(i) == Some(&b'd')
            && bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit());
        if is_dice {
            let count: u32 = formula[count_start..i].parse().unwrap_or(1).max(1);
            i += 1;
            let size_start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let size: u32 = formula[size_start..i].parse().ok()?;
            let mut sum = 0;
            for _ in 0..count {
                let face = die(size.max(1));
                dice.push(face);
                sum += face;
            }
            flattened.push_str(&sum.to_string());
        } else {
            if count_start < i {
                flattened.push_str(&formula[count_start..i]);
            }
            if i < bytes.len() {
                flattened.push(bytes[i] as char);
                i += 1;
            }
        }
    }

    let total = evaluate_arithmetic(&flattened)? as i32;
    Some(Roll {
        total,
        natural: dice.first().copied().unwrap_or(0),
        dice,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flat_dice_roll_terms_and_arithmetic() {
        let roll = FlatDice(3).roll("2d6 + 4").await.unwrap();
        assert_eq!(roll.total, 10);
        assert_eq!(roll.natural, 3);
        assert_eq!(roll.dice, vec![3, 3]);
    }

    #[tokio::test]
    async fn dice_free_formulas_still_evaluate() {
        let roll = FlatDice(1).roll("2 + 3").await.unwrap();
        assert_eq!(roll.total, 5);
        assert_eq!(roll.natural, 0);
        assert!(roll.dice.is_empty());
    }

    #[tokio::test]
    async fn garbage_formula_rolls_nothing() {
        assert_eq!(FlatDice(1).roll("banana").await, None);
    }

    #[tokio::test]
    async fn rng_dice_stay_in_range() {
        for _ in 0..50 {
            let roll = RngDice.roll("1d20").await.unwrap();
            assert!((1..=20).contains(&roll.total));
            assert_eq!(roll.total, roll.natural);
        }
    }

    #[tokio::test]
    async fn scripted_dice_replay_then_dismiss() {
        let dice = ScriptedDice::new([ScriptedDice::flat(18, 18), None]);
        assert_eq!(dice.roll("1d20").await.unwrap().total, 18);
        assert_eq!(dice.roll("1d20").await, None);
        assert_eq!(dice.roll("1d20").await, None);
    }
}
