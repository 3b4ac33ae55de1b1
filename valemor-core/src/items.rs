//! Consumable items.

use crate::entity::DamageType;
use crate::skills::Targeting;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    SmallHealingPotion,
    HealingPotion,
    SmallBomb,
    Bomb,
}

impl ItemKind {
    pub fn all() -> [ItemKind; 4] {
        [
            ItemKind::SmallHealingPotion,
            ItemKind::HealingPotion,
            ItemKind::SmallBomb,
            ItemKind::Bomb,
        ]
    }

    pub fn definition(&self) -> Option<&'static ItemDef> {
        ITEMS.get(self)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.definition() {
            Some(def) => write!(f, "{}", def.name),
            None => write!(f, "{self:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemEffect {
    /// Restore the user's health.
    Heal(i32),
    /// Damage every target, ignoring armor.
    Damage { amount: f64, damage_type: DamageType },
}

#[derive(Debug, Clone)]
pub struct ItemDef {
    pub kind: ItemKind,
    pub name: &'static str,
    pub description: &'static str,
    /// Price in gold.
    pub value: u32,
    pub targeting: Targeting,
    pub consumes_turn: bool,
    pub effect: ItemEffect,
}

lazy_static::lazy_static! {
    static ref ITEMS: HashMap<ItemKind, ItemDef> = {
        let potion = |kind, name, potency, value| ItemDef {
            kind,
            name,
            description: "Drink to recover health",
            value,
            targeting: Targeting::SelfOnly,
            consumes_turn: false,
            effect: ItemEffect::Heal(potency),
        };
        let bomb = |kind, name, potency, value| ItemDef {
            kind,
            name,
            description: "Throw to damage every enemy",
            value,
            targeting: Targeting::Area,
            consumes_turn: true,
            effect: ItemEffect::Damage { amount: potency, damage_type: DamageType::Fire },
        };

        [
            potion(ItemKind::SmallHealingPotion, "Small Healing Potion", 20, 25),
            potion(ItemKind::HealingPotion, "Healing Potion", 50, 50),
            bomb(ItemKind::SmallBomb, "Small Bomb", 5.0, 25),
            bomb(ItemKind::Bomb, "Bomb", 10.0, 50),
        ]
        .into_iter()
        .map(|def| (def.kind, def))
        .collect()
    };
}
