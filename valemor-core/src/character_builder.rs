//! Character creation.
//!
//! Six scores are rolled with 4d6-drop-lowest and then assigned one by one to
//! attributes. Racial bonuses are applied when the character is built.

use crate::attributes::{Attribute, AttributeScores, Expertise};
use crate::dice::roll_4d6_drop_lowest;
use crate::player::{CharacterClass, Player, Race};
use crate::skills::SkillKind;
use rand::Rng;
use std::collections::BTreeMap;
use thiserror::Error;

pub const MAX_REROLLS: u32 = 3;
pub const EXPERTISE_COUNT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Character name is required")]
    MissingName,

    #[error("Race selection is required")]
    MissingRace,

    #[error("Class selection is required")]
    MissingClass,

    #[error("{0} is already assigned")]
    AttributeAlreadyAssigned(Attribute),

    #[error("Roll #{0} is already assigned")]
    RollAlreadyUsed(usize),

    #[error("There is no roll #{0}")]
    InvalidRoll(usize),

    #[error("All six attributes must be assigned")]
    MissingAttributes,

    #[error("Expected {expected} expertises, got {got}")]
    InvalidExpertiseCount { expected: usize, got: usize },

    #[error("No rerolls left")]
    NoRerollsLeft,

    #[error("Skill {0} is not available for this class")]
    SkillNotAvailable(SkillKind),
}

#[derive(Debug, Clone)]
pub struct CharacterBuilder {
    name: Option<String>,
    race: Option<Race>,
    class: Option<CharacterClass>,
    rolls: [i32; 6],
    /// Attribute -> index into `rolls`.
    assignments: BTreeMap<Attribute, usize>,
    rerolls_left: u32,
    expertises: Vec<Expertise>,
    skills: Option<Vec<SkillKind>>,
}

impl CharacterBuilder {
    /// Start a new character with a fresh set of rolls.
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::with_rolls(roll_scores(rng))
    }

    /// Start from known rolls.
    pub fn with_rolls(rolls: [i32; 6]) -> Self {
        Self {
            name: None,
            race: None,
            class: None,
            rolls,
            assignments: BTreeMap::new(),
            rerolls_left: MAX_REROLLS,
            expertises: Vec::new(),
            skills: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn race(mut self, race: Race) -> Self {
        self.race = Some(race);
        self
    }

    pub fn class(mut self, class: CharacterClass) -> Self {
        self.class = Some(class);
        self
    }

    pub fn expertises(mut self, expertises: Vec<Expertise>) -> Self {
        self.expertises = expertises;
        self
    }

    /// Pick starting skills instead of taking every eligible one.
    pub fn skills(mut self, skills: Vec<SkillKind>) -> Self {
        self.skills = Some(skills);
        self
    }

    pub fn rolls(&self) -> [i32; 6] {
        self.rolls
    }

    pub fn rerolls_left(&self) -> u32 {
        self.rerolls_left
    }

    /// Roll all six scores again. Clears every assignment.
    pub fn reroll<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), BuildError> {
        if self.rerolls_left == 0 {
            return Err(BuildError::NoRerollsLeft);
        }
        self.rerolls_left -= 1;
        self.rolls = roll_scores(rng);
        self.assignments.clear();
        Ok(())
    }

    /// Assign one rolled score to an attribute.
    pub fn assign(&mut self, roll_index: usize, attribute: Attribute) -> Result<(), BuildError> {
        if roll_index >= self.rolls.len() {
            return Err(BuildError::InvalidRoll(roll_index));
        }
        if self.assignments.contains_key(&attribute) {
            return Err(BuildError::AttributeAlreadyAssigned(attribute));
        }
        if self.assignments.values().any(|&index| index == roll_index) {
            return Err(BuildError::RollAlreadyUsed(roll_index));
        }
        self.assignments.insert(attribute, roll_index);
        Ok(())
    }

    /// Undo an assignment so the attribute can take another roll.
    pub fn unassign(&mut self, attribute: Attribute) {
        self.assignments.remove(&attribute);
    }

    pub fn build(self) -> Result<Player, BuildError> {
        let name = self.name.ok_or(BuildError::MissingName)?;
        let race = self.race.ok_or(BuildError::MissingRace)?;
        let class = self.class.ok_or(BuildError::MissingClass)?;

        if self.assignments.len() != Attribute::all().len() {
            return Err(BuildError::MissingAttributes);
        }
        if self.expertises.len() != EXPERTISE_COUNT {
            return Err(BuildError::InvalidExpertiseCount {
                expected: EXPERTISE_COUNT,
                got: self.expertises.len(),
            });
        }

        let eligible = SkillKind::starting_for(class);
        let skills = match self.skills {
            Some(chosen) => {
                if let Some(skill) = chosen.iter().find(|skill| !eligible.contains(skill)) {
                    return Err(BuildError::SkillNotAvailable(*skill));
                }
                chosen
            }
            None => eligible,
        };

        let mut scores = AttributeScores::from_pairs(
            self.assignments
                .iter()
                .map(|(attribute, &index)| (*attribute, self.rolls[index])),
        );
        race.apply_bonuses(&mut scores);

        let mut player = Player::new(name, class, race, scores, skills);
        player.expertises = self.expertises;
        Ok(player)
    }
}

fn roll_scores<R: Rng + ?Sized>(rng: &mut R) -> [i32; 6] {
    let mut rolls = [0; 6];
    for roll in &mut rolls {
        *roll = roll_4d6_drop_lowest(rng);
    }
    rolls
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn assigned() -> CharacterBuilder {
        let mut builder = CharacterBuilder::with_rolls([15, 14, 13, 12, 10, 8])
            .name("Lia")
            .race(Race::Dwarf)
            .class(CharacterClass::Cleric)
            .expertises(vec![
                Expertise::Medicine,
                Expertise::Religion,
                Expertise::Insight,
                Expertise::History,
            ]);
        for (index, attribute) in [
            Attribute::Wisdom,
            Attribute::Constitution,
            Attribute::Strength,
            Attribute::Dexterity,
            Attribute::Intelligence,
            Attribute::Charisma,
        ]
        .into_iter()
        .enumerate()
        {
            builder.assign(index, attribute).unwrap();
        }
        builder
    }

    #[test]
    fn test_build_applies_race_and_class() {
        let player = assigned().build().unwrap();
        assert_eq!(player.entity.attributes.wisdom, 16);
        assert_eq!(player.entity.attributes.constitution, 16);
        assert_eq!(player.entity.attributes.strength, 14);
        // Cleric 80 + CON modifier 3 * 10
        assert_eq!(player.entity.max_health, 110);
        assert!(player.knows(SkillKind::HealingWord));
        assert_eq!(player.expertises.len(), 4);
    }

    #[test]
    fn test_assigning_an_attribute_twice_fails() {
        let mut builder = CharacterBuilder::with_rolls([15, 14, 13, 12, 10, 8]);
        builder.assign(0, Attribute::Strength).unwrap();
        assert_eq!(
            builder.assign(1, Attribute::Strength),
            Err(BuildError::AttributeAlreadyAssigned(Attribute::Strength))
        );
        assert_eq!(
            builder.assign(0, Attribute::Dexterity),
            Err(BuildError::RollAlreadyUsed(0))
        );
    }

    #[test]
    fn test_rerolls_are_limited() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut builder = CharacterBuilder::new(&mut rng);
        builder.assign(0, Attribute::Strength).unwrap();
        for _ in 0..MAX_REROLLS {
            builder.reroll(&mut rng).unwrap();
        }
        assert_eq!(builder.reroll(&mut rng), Err(BuildError::NoRerollsLeft));
        // Rerolling cleared the assignment.
        assert!(builder.assign(0, Attribute::Strength).is_ok());
    }

    #[test]
    fn test_missing_expertises() {
        let builder = assigned().expertises(vec![Expertise::Arcana]);
        assert_eq!(
            builder.build().unwrap_err(),
            BuildError::InvalidExpertiseCount { expected: 4, got: 1 }
        );
    }

    #[test]
    fn test_skill_must_be_eligible() {
        let builder = assigned().skills(vec![SkillKind::FireBolt]);
        assert_eq!(
            builder.build().unwrap_err(),
            BuildError::SkillNotAvailable(SkillKind::FireBolt)
        );
    }
}
