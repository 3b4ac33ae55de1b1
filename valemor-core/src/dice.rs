//! Dice rolling.
//!
//! Every roll takes the RNG explicitly so combats and tests can run on a
//! seeded generator.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a d20 is rolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RollType {
    #[default]
    Normal,
    /// Roll twice, keep the higher die.
    Advantage,
    /// Roll twice, keep the lower die.
    #[serde(alias = "desadvantage")]
    Disadvantage,
}

impl fmt::Display for RollType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RollType::Normal => "normal",
            RollType::Advantage => "advantage",
            RollType::Disadvantage => "disadvantage",
        };
        write!(f, "{name}")
    }
}

/// Result of a d20 roll as reported to the narrative agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct D20Outcome {
    pub result_with_modifier: i32,
    pub raw_result: i32,
    pub crit: bool,
    pub crit_fail: bool,
}

/// Roll a single d20.
pub fn d20<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    rng.gen_range(1..=20)
}

/// Pick the kept die from a pair according to the roll type.
pub fn keep_die(roll_type: RollType, first: i32, second: i32) -> i32 {
    match roll_type {
        RollType::Normal => first,
        RollType::Advantage => first.max(second),
        RollType::Disadvantage => first.min(second),
    }
}

/// Roll a d20 with a modifier, rolling twice for advantage or disadvantage.
pub fn roll_d20<R: Rng + ?Sized>(modifier: i32, roll_type: RollType, rng: &mut R) -> D20Outcome {
    let first = d20(rng);
    let raw = match roll_type {
        RollType::Normal => first,
        _ => {
            let second = d20(rng);
            tracing::debug!(first, second, %roll_type, "rolled d20 pair");
            keep_die(roll_type, first, second)
        }
    };

    D20Outcome {
        result_with_modifier: raw + modifier,
        raw_result: raw,
        crit: raw == 20,
        crit_fail: raw == 1,
    }
}

/// Roll 4d6 and drop the lowest die.
pub fn roll_4d6_drop_lowest<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    let mut rolls: Vec<i32> = (0..4).map(|_| rng.gen_range(1..=6)).collect();
    rolls.sort_unstable_by(|a, b| b.cmp(a));
    rolls.iter().take(3).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_d20_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let roll = d20(&mut rng);
            assert!((1..=20).contains(&roll));
        }
    }

    #[test]
    fn test_keep_die() {
        assert_eq!(keep_die(RollType::Advantage, 4, 17), 17);
        assert_eq!(keep_die(RollType::Disadvantage, 4, 17), 4);
        assert_eq!(keep_die(RollType::Normal, 4, 17), 4);
    }

    #[test]
    fn test_advantage_never_below_single_roll() {
        // Same seed: the first die of the advantage pair is the normal roll.
        for seed in 0..200 {
            let normal = roll_d20(0, RollType::Normal, &mut StdRng::seed_from_u64(seed));
            let adv = roll_d20(0, RollType::Advantage, &mut StdRng::seed_from_u64(seed));
            let dis = roll_d20(0, RollType::Disadvantage, &mut StdRng::seed_from_u64(seed));
            assert!(adv.raw_result >= normal.raw_result);
            assert!(dis.raw_result <= normal.raw_result);
        }
    }

    #[test]
    fn test_roll_d20_flags() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let outcome = roll_d20(3, RollType::Normal, &mut rng);
            assert_eq!(outcome.result_with_modifier, outcome.raw_result + 3);
            assert_eq!(outcome.crit, outcome.raw_result == 20);
            assert_eq!(outcome.crit_fail, outcome.raw_result == 1);
        }
    }

    #[test]
    fn test_roll_type_accepts_legacy_spelling() {
        let parsed: RollType = serde_json::from_str("\"desadvantage\"").unwrap();
        assert_eq!(parsed, RollType::Disadvantage);
    }

    #[test]
    fn test_4d6_drop_lowest_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let score = roll_4d6_drop_lowest(&mut rng);
            assert!((3..=18).contains(&score));
        }
    }
}
