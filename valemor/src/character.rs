//! Character setup from the command line.

use crate::HeroArgs;
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use valemor_core::{Attribute, CharacterBuilder, CharacterClass, Expertise, Player};

/// The sample warrior, or a freshly rolled character when a class is given.
pub fn create(args: &HeroArgs, seed: Option<u64>) -> Result<Player> {
    let Some(class) = args.class else {
        return Ok(Player::sample(args.name.clone()));
    };

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut builder = CharacterBuilder::new(&mut rng)
        .name(args.name.clone())
        .race(args.race)
        .class(class)
        .expertises(expertises_for(class));

    // Best roll to the class's main attribute, then down the list.
    let mut order: Vec<usize> = (0..6).collect();
    let rolls = builder.rolls();
    order.sort_by(|a, b| rolls[*b].cmp(&rolls[*a]));
    for (roll_index, attribute) in order.into_iter().zip(priorities(class)) {
        builder.assign(roll_index, attribute)?;
    }

    let player = builder
        .build()
        .with_context(|| format!("building {} the {}", args.name, class))?;
    tracing::info!(
        name = %player.name(),
        class = %player.class,
        race = %player.race,
        health = player.entity.max_health,
        "character rolled"
    );
    Ok(player)
}

fn priorities(class: CharacterClass) -> [Attribute; 6] {
    use Attribute::*;
    match class {
        CharacterClass::Warrior | CharacterClass::Barbarian | CharacterClass::Paladin => {
            [Strength, Constitution, Dexterity, Wisdom, Charisma, Intelligence]
        }
        CharacterClass::Rogue | CharacterClass::Monk => {
            [Dexterity, Constitution, Wisdom, Strength, Intelligence, Charisma]
        }
        CharacterClass::Mage => [Intelligence, Constitution, Dexterity, Wisdom, Charisma, Strength],
        CharacterClass::Cleric | CharacterClass::Druid => {
            [Wisdom, Constitution, Strength, Dexterity, Charisma, Intelligence]
        }
        CharacterClass::Bard => [Charisma, Dexterity, Constitution, Wisdom, Intelligence, Strength],
    }
}

fn expertises_for(class: CharacterClass) -> Vec<Expertise> {
    use Expertise::*;
    match class {
        CharacterClass::Warrior | CharacterClass::Barbarian => {
            vec![Athletics, Intimidation, Perception, Survival]
        }
        CharacterClass::Paladin => vec![Athletics, Religion, Insight, Persuasion],
        CharacterClass::Rogue => vec![Stealth, SleightOfHand, Acrobatics, Deception],
        CharacterClass::Monk => vec![Acrobatics, Stealth, Insight, Athletics],
        CharacterClass::Mage => vec![Arcana, History, Investigation, Insight],
        CharacterClass::Cleric => vec![Religion, Medicine, Insight, History],
        CharacterClass::Druid => vec![Nature, AnimalHandling, Survival, Medicine],
        CharacterClass::Bard => vec![Performance, Persuasion, Deception, Insight],
    }
}
