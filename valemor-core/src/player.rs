//! The player character.
//!
//! A `Player` is an [`Entity`] plus everything that outlives a single
//! combat: progression, purse, mana, inventory and learned skills.

use crate::attributes::{Attribute, AttributeScores, Expertise};
use crate::entity::{DamageType, Entity, Role};
use crate::items::ItemKind;
use crate::skills::SkillKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Total XP needed to reach each level, starting at level 1.
pub const XP_THRESHOLDS: [u32; 10] = [0, 300, 900, 2700, 6500, 14000, 23000, 34000, 48000, 64000];

pub const STARTING_MANA: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterClass {
    Warrior,
    Paladin,
    Rogue,
    Mage,
    Cleric,
    Druid,
    Bard,
    Monk,
    Barbarian,
}

impl CharacterClass {
    pub fn all() -> [CharacterClass; 9] {
        [
            CharacterClass::Warrior,
            CharacterClass::Paladin,
            CharacterClass::Rogue,
            CharacterClass::Mage,
            CharacterClass::Cleric,
            CharacterClass::Druid,
            CharacterClass::Bard,
            CharacterClass::Monk,
            CharacterClass::Barbarian,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            CharacterClass::Warrior => "Warrior",
            CharacterClass::Paladin => "Paladin",
            CharacterClass::Rogue => "Rogue",
            CharacterClass::Mage => "Mage",
            CharacterClass::Cleric => "Cleric",
            CharacterClass::Druid => "Druid",
            CharacterClass::Bard => "Bard",
            CharacterClass::Monk => "Monk",
            CharacterClass::Barbarian => "Barbarian",
        }
    }

    pub fn base_life(&self) -> i32 {
        match self {
            CharacterClass::Warrior | CharacterClass::Paladin => 100,
            CharacterClass::Mage => 60,
            CharacterClass::Barbarian => 120,
            CharacterClass::Rogue
            | CharacterClass::Cleric
            | CharacterClass::Druid
            | CharacterClass::Bard
            | CharacterClass::Monk => 80,
        }
    }

    /// Starting maximum health for a character with this constitution score.
    pub fn initial_life(&self, constitution: i32) -> i32 {
        self.base_life() + crate::attributes::modifier(constitution) * 10
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Race {
    Human,
    Elf,
    Dwarf,
}

impl Race {
    pub fn all() -> [Race; 3] {
        [Race::Human, Race::Elf, Race::Dwarf]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Race::Human => "Human",
            Race::Elf => "Elf",
            Race::Dwarf => "Dwarf",
        }
    }

    pub fn bonuses(&self) -> Vec<(Attribute, i32)> {
        match self {
            Race::Human => Attribute::all().into_iter().map(|a| (a, 1)).collect(),
            Race::Elf => vec![
                (Attribute::Strength, -1),
                (Attribute::Dexterity, 2),
                (Attribute::Constitution, -1),
                (Attribute::Intelligence, 1),
                (Attribute::Wisdom, 1),
                (Attribute::Charisma, 2),
            ],
            Race::Dwarf => vec![
                (Attribute::Strength, 1),
                (Attribute::Constitution, 2),
                (Attribute::Wisdom, 1),
            ],
        }
    }

    pub fn apply_bonuses(&self, scores: &mut AttributeScores) {
        for (attribute, bonus) in self.bonuses() {
            scores.add(attribute, bonus);
        }
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Player
// ============================================================================

#[derive(Debug, Clone)]
pub struct Player {
    pub entity: Entity,
    pub gold: u32,
    pub xp: u32,
    pub level: u32,
    pub mana: i32,
    pub max_mana: i32,
    pub inventory: BTreeMap<ItemKind, u32>,
    pub skills: Vec<SkillKind>,
    pub expertises: Vec<Expertise>,
    pub race: Race,
    pub class: CharacterClass,
}

impl Player {
    /// Create a level-one character. `attributes` already include racial bonuses.
    pub fn new(
        name: impl Into<String>,
        class: CharacterClass,
        race: Race,
        attributes: AttributeScores,
        skills: Vec<SkillKind>,
    ) -> Self {
        let entity = Entity::new(name, class.initial_life(attributes.constitution))
            .with_dodge(attributes.dexterity)
            .with_base_damage(5)
            .with_damage_type(DamageType::Slashing)
            .with_role(Role::Player)
            .with_attributes(attributes);

        Self {
            entity,
            gold: 0,
            xp: 0,
            level: 1,
            mana: STARTING_MANA,
            max_mana: STARTING_MANA,
            inventory: BTreeMap::new(),
            skills,
            expertises: Vec::new(),
            race,
            class,
        }
    }

    /// A ready-to-play human warrior with a couple of consumables.
    pub fn sample(name: impl Into<String>) -> Self {
        let class = CharacterClass::Warrior;
        let mut player = Self::new(
            name,
            class,
            Race::Human,
            AttributeScores::new(16, 14, 15, 9, 12, 11),
            SkillKind::starting_for(class),
        );
        player.expertises = vec![Expertise::Athletics, Expertise::Perception];
        player.add_item(ItemKind::SmallHealingPotion, 2);
        player.add_item(ItemKind::SmallBomb, 1);
        player
    }

    pub fn name(&self) -> &str {
        &self.entity.name
    }

    pub fn knows(&self, skill: SkillKind) -> bool {
        self.skills.contains(&skill)
    }

    /// Add XP and level up as thresholds are crossed. Returns levels gained.
    pub fn give_xp(&mut self, xp: u32) -> u32 {
        self.xp = self.xp.saturating_add(xp);
        let mut gained = 0;
        while let Some(&needed) = XP_THRESHOLDS.get(self.level as usize) {
            if self.xp < needed {
                break;
            }
            self.level += 1;
            self.max_mana += 2;
            self.entity.max_health += 5;
            gained += 1;
        }
        if gained > 0 {
            tracing::info!(player = %self.entity.name, level = self.level, "level up");
        }
        gained
    }

    pub fn give_gold(&mut self, gold: u32) {
        self.gold = self.gold.saturating_add(gold);
    }

    /// Remove gold, never going below zero.
    pub fn take_gold(&mut self, gold: u32) {
        self.gold = self.gold.saturating_sub(gold);
    }

    pub fn rest(&mut self) {
        self.entity.health = self.entity.max_health as f64;
        self.mana = self.max_mana;
    }

    pub fn add_item(&mut self, item: ItemKind, quantity: u32) {
        if quantity == 0 {
            return;
        }
        *self.inventory.entry(item).or_insert(0) += quantity;
    }

    pub fn item_count(&self, item: ItemKind) -> u32 {
        self.inventory.get(&item).copied().unwrap_or(0)
    }

    /// Consume one unit. Returns false when none is held.
    pub fn remove_item(&mut self, item: ItemKind) -> bool {
        match self.inventory.get_mut(&item) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.inventory.remove(&item);
                true
            }
            None => false,
        }
    }

    /// One field of the sheet, for the `/status` command.
    pub fn status_field(&self, field: &str) -> Option<String> {
        let value = match field.trim().to_lowercase().as_str() {
            "health" | "life" | "hp" => format!("{:.1}/{}", self.entity.health, self.entity.max_health),
            "mana" => format!("{}/{}", self.mana, self.max_mana),
            "gold" => self.gold.to_string(),
            "xp" => self.xp.to_string(),
            "level" => self.level.to_string(),
            "class" => self.class.to_string(),
            "race" => self.race.to_string(),
            "armor" => self.entity.armor.to_string(),
            "dodge" => self.entity.dodge.to_string(),
            other => {
                let attribute = Attribute::all()
                    .into_iter()
                    .find(|a| a.name().eq_ignore_ascii_case(other) || a.abbreviation().eq_ignore_ascii_case(other))?;
                self.entity.attributes.get(attribute).to_string()
            }
        };
        Some(value)
    }

    /// Character sheet handed to the narrative agent.
    pub fn to_markdown(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("# Player Character: {}", self.entity.name));
        lines.push(String::new());

        lines.push("## Character Info".to_string());
        lines.push(format!("- **Class:** {} (lvl {})", self.class, self.level));
        lines.push(format!("- **Race:** {}", self.race));

        lines.push("## Character Status".to_string());
        lines.push(format!(
            "- **Life:** ({:.1}/{})",
            self.entity.health, self.entity.max_health
        ));
        lines.push(format!("- **Mana:** ({}/{})", self.mana, self.max_mana));
        lines.push(format!("- **Armor:** {}", self.entity.armor));
        lines.push(format!("- **Dodge:** {}", self.entity.dodge));
        lines.push(format!("- **Gold:** {}", self.gold));
        lines.push(format!("- **XP:** {}", self.xp));

        lines.push("## Attributes".to_string());
        for attribute in Attribute::all() {
            lines.push(format!(
                "- **{}:** {}",
                attribute.name(),
                self.entity.attributes.get(attribute)
            ));
        }
        lines.push(String::new());

        if !self.expertises.is_empty() {
            let names: Vec<&str> = self.expertises.iter().map(|e| e.name()).collect();
            lines.push("## Expertises".to_string());
            lines.push(names.join(", "));
            lines.push(String::new());
        }

        lines.push("## Skills".to_string());
        for skill in &self.skills {
            let Some(def) = skill.definition() else {
                continue;
            };
            let classes: Vec<&str> = def.classes.iter().map(|c| c.name()).collect();
            lines.push(format!("### {}", def.name));
            lines.push(format!("- **Required Level:** {}", def.min_level));
            lines.push(format!("- **Available to Classes:** {}", classes.join(", ")));
            lines.push(format!("- **Description:** {}", def.description));
        }

        if !self.inventory.is_empty() {
            lines.push("## Inventory".to_string());
            for (item, count) in &self.inventory {
                lines.push(format!("- {item} x{count}"));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_life_uses_constitution() {
        assert_eq!(CharacterClass::Warrior.initial_life(10), 100);
        assert_eq!(CharacterClass::Barbarian.initial_life(14), 140);
        assert_eq!(CharacterClass::Mage.initial_life(8), 50);
    }

    #[test]
    fn test_new_player_stats() {
        let player = Player::sample("Thorin");
        assert_eq!(player.entity.max_health, 120);
        assert_eq!(player.entity.dodge, 14);
        assert_eq!(player.entity.base_damage, 5);
        assert_eq!(player.mana, 10);
        assert_eq!(player.level, 1);
        assert_eq!(player.entity.role, Role::Player);
    }

    #[test]
    fn test_take_gold_clamps() {
        let mut player = Player::sample("Thorin");
        player.give_gold(10);
        player.take_gold(25);
        assert_eq!(player.gold, 0);
    }

    #[test]
    fn test_give_xp_levels_up() {
        let mut player = Player::sample("Thorin");
        assert_eq!(player.give_xp(299), 0);
        assert_eq!(player.give_xp(1), 1);
        assert_eq!(player.level, 2);
        assert_eq!(player.give_xp(5000), 2);
        assert_eq!(player.level, 4);
        assert_eq!(player.max_mana, 16);
    }

    #[test]
    fn test_rest_restores_everything() {
        let mut player = Player::sample("Thorin");
        player.entity.health = 3.0;
        player.mana = 0;
        player.rest();
        assert_eq!(player.entity.health, 120.0);
        assert_eq!(player.mana, 10);
    }

    #[test]
    fn test_inventory_counts() {
        let mut player = Player::sample("Thorin");
        assert_eq!(player.item_count(ItemKind::SmallHealingPotion), 2);
        assert!(player.remove_item(ItemKind::SmallHealingPotion));
        assert!(player.remove_item(ItemKind::SmallHealingPotion));
        assert!(!player.remove_item(ItemKind::SmallHealingPotion));
        assert!(!player.inventory.contains_key(&ItemKind::SmallHealingPotion));
    }

    #[test]
    fn test_race_bonuses() {
        let mut scores = AttributeScores::default();
        Race::Elf.apply_bonuses(&mut scores);
        assert_eq!(scores.dexterity, 12);
        assert_eq!(scores.strength, 9);
    }

    #[test]
    fn test_markdown_sheet() {
        let sheet = Player::sample("Thorin").to_markdown();
        assert!(sheet.starts_with("# Player Character: Thorin"));
        assert!(sheet.contains("- **Class:** Warrior (lvl 1)"));
        assert!(sheet.contains("### Accurate Attack"));
        assert!(sheet.contains("Small Healing Potion x2"));
    }

    #[test]
    fn test_status_field() {
        let player = Player::sample("Thorin");
        assert_eq!(player.status_field("gold").as_deref(), Some("0"));
        assert_eq!(player.status_field("STR").as_deref(), Some("16"));
        assert_eq!(player.status_field("luck"), None);
    }
}
