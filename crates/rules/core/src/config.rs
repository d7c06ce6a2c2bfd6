/// Ruleset configuration constants and tunable parameters.
///
/// Every number the derivation pipeline or the activation protocol treats as
/// a rule constant lives here and is threaded explicitly into the code that
/// needs it. Recognized options are enumerated as fields; there is no
/// open-ended settings lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RulesConfig {
    /// Flat base added to the defense stat before ability and equipment.
    pub base_defense: i32,

    /// Flat base added to the initiative stat before the agility value.
    pub base_initiative: i32,

    /// Natural-roll threshold a critical starts from, before bonuses.
    pub base_critical: i32,

    /// Hard floor for the critical threshold regardless of bonus size.
    pub critical_floor: i32,

    /// Base fortune points before the charisma modifier.
    pub base_fortune: i32,

    /// Base recovery points before the constitution modifier.
    pub base_recovery: i32,

    /// Base movement in meters, before modifiers.
    pub base_movement: i32,

    /// Cap applied to the level-derived bonus on attack stats.
    pub level_bonus_cap: i32,

    /// Whether attack and damage are rolled as one combined request.
    pub combo_roll: bool,

    /// Who gets to see a resolver's difficulty value.
    pub difficulty_display: DifficultyDisplay,
}

/// Difficulty-display policy for attack and skill rolls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DifficultyDisplay {
    /// Never shown.
    Hidden,
    /// Shown to the authoritative participant only.
    #[default]
    AuthorityOnly,
    /// Shown to everyone.
    All,
}

impl RulesConfig {
    // ===== compile-time constants used as type parameters =====
    /// Maximum live custom effects tracked per actor.
    pub const MAX_CUSTOM_EFFECTS: usize = 16;

    // ===== rule constants =====
    /// Die-size ladder for evolving dice, indexed by level band.
    pub const EVOLVING_DICE: [u32; 5] = [4, 6, 8, 10, 12];
    /// Levels per evolving-dice band.
    pub const EVOLVING_BAND_WIDTH: i32 = 4;
    /// Damage formula used when no weapon is equipped.
    pub const UNARMED_DAMAGE: &'static str = "1d3";
    /// Skill formula used when no weapon is equipped.
    pub const UNARMED_SKILL: &'static str = "@atc";
    /// Mana discount when casting an attack spell with concentration.
    pub const CONCENTRATION_DISCOUNT: i32 = 2;
    /// Bonus applied to a recorded roll when a fortune point is spent.
    pub const FORTUNE_ROLL_BONUS: i32 = 10;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_BASE_DEFENSE: i32 = 10;
    pub const DEFAULT_BASE_CRITICAL: i32 = 20;
    pub const DEFAULT_CRITICAL_FLOOR: i32 = 16;
    pub const DEFAULT_BASE_FORTUNE: i32 = 2;
    pub const DEFAULT_BASE_RECOVERY: i32 = 5;
    pub const DEFAULT_BASE_MOVEMENT: i32 = 10;
    pub const DEFAULT_LEVEL_BONUS_CAP: i32 = 10;

    pub fn new() -> Self {
        Self {
            base_defense: Self::DEFAULT_BASE_DEFENSE,
            base_initiative: 0,
            base_critical: Self::DEFAULT_BASE_CRITICAL,
            critical_floor: Self::DEFAULT_CRITICAL_FLOOR,
            base_fortune: Self::DEFAULT_BASE_FORTUNE,
            base_recovery: Self::DEFAULT_BASE_RECOVERY,
            base_movement: Self::DEFAULT_BASE_MOVEMENT,
            level_bonus_cap: Self::DEFAULT_LEVEL_BONUS_CAP,
            combo_roll: false,
            difficulty_display: DifficultyDisplay::default(),
        }
    }

    /// Level-derived bonus applied to attack stats, capped.
    pub fn level_bonus(&self, level: i32) -> i32 {
        level.min(self.level_bonus_cap)
    }

    /// Evolving die size for a character level or challenge rating.
    ///
    /// Five bands of [`Self::EVOLVING_BAND_WIDTH`] levels each; everything
    /// past the last band stays on the largest die.
    pub fn evolving_die(&self, level: i32) -> u32 {
        let band = ((level - 1).max(0) / Self::EVOLVING_BAND_WIDTH) as usize;
        Self::EVOLVING_DICE[band.min(Self::EVOLVING_DICE.len() - 1)]
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evolving_die_bands() {
        let config = RulesConfig::new();
        assert_eq!(config.evolving_die(1), 4);
        assert_eq!(config.evolving_die(4), 4);
        assert_eq!(config.evolving_die(5), 6);
        assert_eq!(config.evolving_die(12), 8);
        assert_eq!(config.evolving_die(17), 12);
        assert_eq!(config.evolving_die(40), 12);
    }

    #[test]
    fn level_bonus_caps() {
        let config = RulesConfig::new();
        assert_eq!(config.level_bonus(3), 3);
        assert_eq!(config.level_bonus(10), 10);
        assert_eq!(config.level_bonus(14), 10);
    }
}
