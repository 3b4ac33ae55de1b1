//! Attribute scores and the D20 modifier table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Convert a raw attribute score into its modifier.
///
/// Uses floor division so low scores round toward negative infinity:
/// 3 gives -4, 9 gives -1, 10 and 11 give 0.
pub fn modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

/// The six core attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Attribute {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Attribute::Strength => "STR",
            Attribute::Dexterity => "DEX",
            Attribute::Constitution => "CON",
            Attribute::Intelligence => "INT",
            Attribute::Wisdom => "WIS",
            Attribute::Charisma => "CHA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Strength => "Strength",
            Attribute::Dexterity => "Dexterity",
            Attribute::Constitution => "Constitution",
            Attribute::Intelligence => "Intelligence",
            Attribute::Wisdom => "Wisdom",
            Attribute::Charisma => "Charisma",
        }
    }

    pub fn all() -> [Attribute; 6] {
        [
            Attribute::Strength,
            Attribute::Dexterity,
            Attribute::Constitution,
            Attribute::Intelligence,
            Attribute::Wisdom,
            Attribute::Charisma,
        ]
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// Attribute scores container. Unset scores default to 10.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeScores {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl AttributeScores {
    pub fn new(str: i32, dex: i32, con: i32, int: i32, wis: i32, cha: i32) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    /// Build from a partial list, filling the rest with 10.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Attribute, i32)>) -> Self {
        let mut scores = Self::default();
        for (attribute, value) in pairs {
            scores.set(attribute, value);
        }
        scores
    }

    pub fn get(&self, attribute: Attribute) -> i32 {
        match attribute {
            Attribute::Strength => self.strength,
            Attribute::Dexterity => self.dexterity,
            Attribute::Constitution => self.constitution,
            Attribute::Intelligence => self.intelligence,
            Attribute::Wisdom => self.wisdom,
            Attribute::Charisma => self.charisma,
        }
    }

    pub fn set(&mut self, attribute: Attribute, value: i32) {
        match attribute {
            Attribute::Strength => self.strength = value,
            Attribute::Dexterity => self.dexterity = value,
            Attribute::Constitution => self.constitution = value,
            Attribute::Intelligence => self.intelligence = value,
            Attribute::Wisdom => self.wisdom = value,
            Attribute::Charisma => self.charisma = value,
        }
    }

    pub fn add(&mut self, attribute: Attribute, bonus: i32) {
        self.set(attribute, self.get(attribute) + bonus);
    }

    pub fn modifier(&self, attribute: Attribute) -> i32 {
        modifier(self.get(attribute))
    }
}

impl Default for AttributeScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

// ============================================================================
// Expertises
// ============================================================================

/// Trained skills a character can pick at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expertise {
    Acrobatics,
    AnimalHandling,
    Arcana,
    Athletics,
    Deception,
    History,
    Insight,
    Intimidation,
    Investigation,
    Medicine,
    Nature,
    Perception,
    Performance,
    Persuasion,
    Religion,
    SleightOfHand,
    Stealth,
    Survival,
}

impl Expertise {
    /// The attribute rolled for this expertise.
    pub fn attribute(&self) -> Attribute {
        match self {
            Expertise::Athletics | Expertise::Intimidation => Attribute::Strength,
            Expertise::Acrobatics | Expertise::SleightOfHand | Expertise::Stealth => {
                Attribute::Dexterity
            }
            Expertise::Arcana
            | Expertise::History
            | Expertise::Investigation
            | Expertise::Nature
            | Expertise::Religion => Attribute::Intelligence,
            Expertise::AnimalHandling
            | Expertise::Insight
            | Expertise::Medicine
            | Expertise::Perception
            | Expertise::Survival => Attribute::Wisdom,
            Expertise::Deception | Expertise::Performance | Expertise::Persuasion => {
                Attribute::Charisma
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Expertise::Acrobatics => "Acrobatics",
            Expertise::AnimalHandling => "Animal Handling",
            Expertise::Arcana => "Arcana",
            Expertise::Athletics => "Athletics",
            Expertise::Deception => "Deception",
            Expertise::History => "History",
            Expertise::Insight => "Insight",
            Expertise::Intimidation => "Intimidation",
            Expertise::Investigation => "Investigation",
            Expertise::Medicine => "Medicine",
            Expertise::Nature => "Nature",
            Expertise::Perception => "Perception",
            Expertise::Performance => "Performance",
            Expertise::Persuasion => "Persuasion",
            Expertise::Religion => "Religion",
            Expertise::SleightOfHand => "Sleight of Hand",
            Expertise::Stealth => "Stealth",
            Expertise::Survival => "Survival",
        }
    }
}

impl fmt::Display for Expertise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_floors_negative_scores() {
        assert_eq!(modifier(3), -4);
        assert_eq!(modifier(1), -5);
        assert_eq!(modifier(9), -1);
        assert_eq!(modifier(8), -1);
    }

    #[test]
    fn test_modifier_positive_scores() {
        assert_eq!(modifier(10), 0);
        assert_eq!(modifier(11), 0);
        assert_eq!(modifier(12), 1);
        assert_eq!(modifier(20), 5);
    }

    #[test]
    fn test_modifier_matches_floor_formula() {
        for score in -10..=40 {
            let expected = ((score - 10) as f64 / 2.0).floor() as i32;
            assert_eq!(modifier(score), expected, "score {score}");
        }
    }

    #[test]
    fn test_from_pairs_fills_missing() {
        let scores = AttributeScores::from_pairs([(Attribute::Strength, 16)]);
        assert_eq!(scores.get(Attribute::Strength), 16);
        assert_eq!(scores.get(Attribute::Wisdom), 10);
        assert_eq!(scores.modifier(Attribute::Strength), 3);
    }

    #[test]
    fn test_expertise_attribute() {
        assert_eq!(Expertise::Stealth.attribute(), Attribute::Dexterity);
        assert_eq!(Expertise::Intimidation.attribute(), Attribute::Strength);
        assert_eq!(Expertise::Survival.attribute(), Attribute::Wisdom);
    }
}
