//! Enemy templates.
//!
//! Templates are built once and never handed out mutably. Every encounter
//! gets its own copy through [`EnemyKind::spawn`].

use crate::attributes::{Attribute, AttributeScores};
use crate::entity::{Category, DamageType, DeathBehavior, Entity, EntityId, Role, TurnBehavior};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    Skeleton,
    Zombie,
    Goblin,
    Wolf,
}

impl EnemyKind {
    pub fn all() -> [EnemyKind; 4] {
        [
            EnemyKind::Skeleton,
            EnemyKind::Zombie,
            EnemyKind::Goblin,
            EnemyKind::Wolf,
        ]
    }

    /// Identifier used on the wire and in combat reports.
    pub fn id(&self) -> &'static str {
        match self {
            EnemyKind::Skeleton => "skeleton",
            EnemyKind::Zombie => "zombie",
            EnemyKind::Goblin => "goblin",
            EnemyKind::Wolf => "wolf",
        }
    }

    /// A fresh combat-local copy of this enemy with its own id.
    pub fn spawn(&self) -> Entity {
        let mut entity = ENEMIES
            .get(self)
            .cloned()
            .unwrap_or_else(|| build_template(*self));
        entity.id = EntityId::new();
        entity
    }
}

impl fmt::Display for EnemyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

fn build_template(kind: EnemyKind) -> Entity {
    let monster = |name: &str, health: i32| {
        Entity::new(name, health).with_role(Role::Monster(kind))
    };

    match kind {
        EnemyKind::Skeleton => monster("Skeleton", 10)
            .with_armor(0.0)
            .with_dodge(10)
            .with_base_damage(10)
            .with_category(Category::Undead)
            .with_multiplier(DamageType::Bludgeoning, 1.5)
            .with_multiplier(DamageType::Piercing, 0.5),
        EnemyKind::Zombie => monster("Zombie", 22)
            .with_armor(10.0)
            .with_dodge(8)
            .with_base_damage(6)
            .with_attributes(AttributeScores::from_pairs([
                (Attribute::Strength, 13),
                (Attribute::Dexterity, 6),
                (Attribute::Constitution, 16),
            ]))
            .with_category(Category::Undead)
            .with_multiplier(DamageType::Sacred, 2.0)
            .with_death(DeathBehavior::undead(5)),
        EnemyKind::Goblin => monster("Goblin", 7)
            .with_armor(5.0)
            .with_dodge(13)
            .with_base_damage(4)
            .with_attributes(AttributeScores::from_pairs([
                (Attribute::Strength, 8),
                (Attribute::Dexterity, 14),
            ]))
            .with_damage_type(DamageType::Slashing)
            .with_behavior(TurnBehavior::Skittish { flee_below: 0.5 }),
        EnemyKind::Wolf => monster("Wolf", 11)
            .with_dodge(12)
            .with_base_damage(5)
            .with_attributes(AttributeScores::from_pairs([
                (Attribute::Strength, 12),
                (Attribute::Dexterity, 15),
            ]))
            .with_category(Category::Beast)
            .with_damage_type(DamageType::Piercing),
    }
}

lazy_static::lazy_static! {
    static ref ENEMIES: HashMap<EnemyKind, Entity> = EnemyKind::all()
        .into_iter()
        .map(|kind| (kind, build_template(kind)))
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton_stats() {
        let skeleton = EnemyKind::Skeleton.spawn();
        assert_eq!(skeleton.max_health, 10);
        assert_eq!(skeleton.health, 10.0);
        assert_eq!(skeleton.armor, 0.0);
        assert_eq!(skeleton.dodge, 10);
        assert_eq!(skeleton.base_damage, 10);
        assert_eq!(skeleton.role, Role::Monster(EnemyKind::Skeleton));
    }

    #[test]
    fn test_spawn_gives_independent_copies() {
        let mut first = EnemyKind::Goblin.spawn();
        let second = EnemyKind::Goblin.spawn();
        assert_ne!(first.id, second.id);

        first.health = -3.0;
        assert_eq!(EnemyKind::Goblin.spawn().health, 7.0);
    }

    #[test]
    fn test_enemy_kind_wire_names() {
        let kinds: Vec<EnemyKind> = serde_json::from_str(r#"["skeleton", "zombie"]"#).unwrap();
        assert_eq!(kinds, vec![EnemyKind::Skeleton, EnemyKind::Zombie]);
        assert_eq!(EnemyKind::Wolf.to_string(), "wolf");
    }

    #[test]
    fn test_zombie_can_rise() {
        let zombie = EnemyKind::Zombie.spawn();
        assert!(matches!(zombie.death, DeathBehavior::Undead { max_revivals: 1, .. }));
    }
}
