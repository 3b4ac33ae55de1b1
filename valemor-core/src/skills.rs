//! Skill records.
//!
//! A skill is data: who may learn it, what it costs, how it targets and what
//! it does. Resolution lives in the combat engine, which validates every
//! requirement before touching any state.

use crate::effects::EffectKind;
use crate::entity::DamageType;
use crate::player::CharacterClass;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    AccurateAttack,
    RecklessAttack,
    FireBolt,
    Ignite,
    HealingWord,
    Thunderwave,
    ShieldOfFaith,
    Bless,
    StunningStrike,
    DeathWard,
}

impl SkillKind {
    pub fn all() -> [SkillKind; 10] {
        [
            SkillKind::AccurateAttack,
            SkillKind::RecklessAttack,
            SkillKind::FireBolt,
            SkillKind::Ignite,
            SkillKind::HealingWord,
            SkillKind::Thunderwave,
            SkillKind::ShieldOfFaith,
            SkillKind::Bless,
            SkillKind::StunningStrike,
            SkillKind::DeathWard,
        ]
    }

    pub fn definition(&self) -> Option<&'static SkillDef> {
        SKILLS.get(self)
    }

    /// Level-one skills a new character of this class starts with.
    pub fn starting_for(class: CharacterClass) -> Vec<SkillKind> {
        SkillKind::all()
            .into_iter()
            .filter(|kind| {
                kind.definition()
                    .is_some_and(|def| def.min_level <= 1 && def.classes.contains(&class))
            })
            .collect()
    }
}

impl fmt::Display for SkillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.definition() {
            Some(def) => write!(f, "{}", def.name),
            None => write!(f, "{self:?}"),
        }
    }
}

/// Who a skill or item can be aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Targeting {
    SelfOnly,
    Single,
    Area,
}

/// What a skill does once its requirements are met.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkillEffect {
    ApplyToSelf { effect: EffectKind, duration: i32 },
    /// A spell attack roll against one target.
    SpellAttack { damage: i32, damage_type: DamageType },
    Heal(i32),
    /// Unrolled damage to every enemy still in the fight, reduced by armor.
    AreaDamage { damage: f64, damage_type: DamageType },
    Inflict { effect: EffectKind, duration: i32 },
}

#[derive(Debug, Clone)]
pub struct SkillDef {
    pub kind: SkillKind,
    pub name: &'static str,
    pub description: &'static str,
    /// Mana cost.
    pub cost: i32,
    pub min_level: u32,
    pub classes: Vec<CharacterClass>,
    pub targeting: Targeting,
    pub consumes_turn: bool,
    pub effect: SkillEffect,
}

lazy_static::lazy_static! {
    static ref SKILLS: HashMap<SkillKind, SkillDef> = {
        use CharacterClass::*;

        let defs = vec![
            SkillDef {
                kind: SkillKind::AccurateAttack,
                name: "Accurate Attack",
                description: "Take aim; your next attacks roll with advantage",
                cost: 0,
                min_level: 1,
                classes: vec![Rogue, Warrior],
                targeting: Targeting::SelfOnly,
                consumes_turn: true,
                effect: SkillEffect::ApplyToSelf { effect: EffectKind::Aiming, duration: 2 },
            },
            SkillDef {
                kind: SkillKind::RecklessAttack,
                name: "Reckless Attack",
                description: "Attack with advantage this turn, but enemies gain advantage against you",
                cost: 0,
                min_level: 1,
                classes: vec![Barbarian, Warrior],
                targeting: Targeting::SelfOnly,
                consumes_turn: false,
                effect: SkillEffect::ApplyToSelf { effect: EffectKind::Reckless, duration: 1 },
            },
            SkillDef {
                kind: SkillKind::FireBolt,
                name: "Fire Bolt",
                description: "Hurl a mote of fire at one enemy",
                cost: 3,
                min_level: 1,
                classes: vec![Mage],
                targeting: Targeting::Single,
                consumes_turn: true,
                effect: SkillEffect::SpellAttack { damage: 8, damage_type: DamageType::Fire },
            },
            SkillDef {
                kind: SkillKind::Ignite,
                name: "Ignite",
                description: "Set one enemy ablaze for three turns",
                cost: 2,
                min_level: 1,
                classes: vec![Mage, Druid],
                targeting: Targeting::Single,
                consumes_turn: true,
                effect: SkillEffect::Inflict { effect: EffectKind::Burning, duration: 3 },
            },
            SkillDef {
                kind: SkillKind::HealingWord,
                name: "Healing Word",
                description: "A quick prayer that restores 15 health",
                cost: 2,
                min_level: 1,
                classes: vec![Cleric, Druid, Bard, Paladin],
                targeting: Targeting::SelfOnly,
                consumes_turn: false,
                effect: SkillEffect::Heal(15),
            },
            SkillDef {
                kind: SkillKind::Thunderwave,
                name: "Thunderwave",
                description: "A wave of force that strikes every enemy",
                cost: 5,
                min_level: 2,
                classes: vec![Mage, Druid, Bard],
                targeting: Targeting::Area,
                consumes_turn: true,
                effect: SkillEffect::AreaDamage { damage: 8.0, damage_type: DamageType::Magical },
            },
            SkillDef {
                kind: SkillKind::ShieldOfFaith,
                name: "Shield of Faith",
                description: "A shimmering field halves incoming damage for three turns",
                cost: 2,
                min_level: 1,
                classes: vec![Paladin, Cleric],
                targeting: Targeting::SelfOnly,
                consumes_turn: true,
                effect: SkillEffect::ApplyToSelf { effect: EffectKind::Shielded, duration: 3 },
            },
            SkillDef {
                kind: SkillKind::Bless,
                name: "Bless",
                description: "Shake off every affliction and strike truer",
                cost: 2,
                min_level: 1,
                classes: vec![Cleric, Paladin, Monk],
                targeting: Targeting::SelfOnly,
                consumes_turn: true,
                effect: SkillEffect::ApplyToSelf { effect: EffectKind::Blessed, duration: 3 },
            },
            SkillDef {
                kind: SkillKind::StunningStrike,
                name: "Stunning Strike",
                description: "A precise blow that stuns one enemy",
                cost: 3,
                min_level: 2,
                classes: vec![Monk],
                targeting: Targeting::Single,
                consumes_turn: true,
                effect: SkillEffect::Inflict { effect: EffectKind::Stunned, duration: 1 },
            },
            SkillDef {
                kind: SkillKind::DeathWard,
                name: "Death Ward",
                description: "The next killing blow leaves you standing",
                cost: 6,
                min_level: 3,
                classes: vec![Cleric, Paladin],
                targeting: Targeting::SelfOnly,
                consumes_turn: true,
                effect: SkillEffect::ApplyToSelf { effect: EffectKind::DeathWard, duration: 10 },
            },
        ];

        defs.into_iter().map(|def| (def.kind, def)).collect()
    };
}
