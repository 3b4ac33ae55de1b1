//! Player actions.
//!
//! Every action validates everything first and returns an [`ActionError`]
//! without touching state when a requirement is not met. Any successful
//! action other than fleeing cancels a prepared escape.

use super::{Combat, CombatPhase, Combatant};
use crate::effects::EffectKind;
use crate::entity::{AttackMode, AttackOutcome, EntityId};
use crate::items::{ItemEffect, ItemKind};
use crate::player::{CharacterClass, Player};
use crate::skills::{SkillEffect, SkillKind, Targeting};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("It is not your turn")]
    NotPlayerTurn,

    #[error("The combat is over")]
    CombatOver,

    #[error("Unknown skill: {0:?}")]
    UnknownSkill(SkillKind),

    #[error("You have not learned {0}")]
    SkillNotKnown(SkillKind),

    #[error("{skill} requires level {required} (you are level {level})")]
    LevelTooLow {
        skill: SkillKind,
        required: u32,
        level: u32,
    },

    #[error("{class} cannot use {skill}")]
    ClassNotEligible {
        skill: SkillKind,
        class: CharacterClass,
    },

    #[error("Not enough mana: need {required}, have {available}")]
    InsufficientMana { required: i32, available: i32 },

    #[error("Unknown item: {0:?}")]
    UnknownItem(ItemKind),

    #[error("You have no {0}")]
    MissingItem(ItemKind),

    #[error("This action needs a target")]
    MissingTarget,

    #[error("Invalid target: {0}")]
    InvalidTarget(EntityId),

    #[error("{0:?} is already active and does not stack")]
    AlreadyActive(EffectKind),

    #[error("There is no escape from this fight")]
    NotFleeable,
}

/// What a successful action did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionOutcome {
    /// Control passed to the next combatant.
    pub turn_ended: bool,
    /// The roll, for actions that attack.
    pub attack: Option<AttackOutcome>,
}

impl ActionOutcome {
    fn new(turn_ended: bool) -> Self {
        Self {
            turn_ended,
            attack: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FleeOutcome {
    /// First step: the turn is spent getting ready.
    Preparing,
    /// The combat ended with the player gone.
    Fled,
}

impl Combat {
    fn ensure_player_turn(&self) -> Result<(), ActionError> {
        if self.phase != CombatPhase::Running {
            return Err(ActionError::CombatOver);
        }
        if !self.is_player_turn {
            return Err(ActionError::NotPlayerTurn);
        }
        Ok(())
    }

    /// Index of an enemy that can still be targeted.
    fn target_index(&self, target: EntityId) -> Result<usize, ActionError> {
        self.enemies
            .iter()
            .position(|enemy| enemy.id == target && enemy.is_active())
            .ok_or(ActionError::InvalidTarget(target))
    }

    fn active_enemy_indices(&self) -> Vec<usize> {
        self.enemies
            .iter()
            .enumerate()
            .filter(|(_, enemy)| enemy.is_active())
            .map(|(index, _)| index)
            .collect()
    }

    /// Melee attack against one enemy. Always ends the turn.
    pub fn player_attack(
        &mut self,
        player: &Player,
        target: EntityId,
    ) -> Result<ActionOutcome, ActionError> {
        self.ensure_player_turn()?;
        let index = self.target_index(target)?;
        self.flee_prepared = false;

        let defender = &self.enemies[index];
        let outcome = player
            .entity
            .attack(defender, AttackMode::Melee, &mut self.rng);
        let name = defender.name.clone();

        self.say(Self::roll_text(&outcome));
        if outcome.passed && outcome.damage > 0.0 {
            self.queue_damage(
                Combatant::Enemy(index),
                Some(Combatant::Player),
                outcome.damage,
                player.entity.damage_type,
                format!("You deal {:.1} damage to {name}", outcome.damage),
            );
        }

        self.end_player_turn();
        Ok(ActionOutcome {
            turn_ended: true,
            attack: Some(outcome),
        })
    }

    /// Use a learned skill. Mana is spent only when every check passes.
    pub fn use_skill(
        &mut self,
        player: &mut Player,
        skill: SkillKind,
        target: Option<EntityId>,
    ) -> Result<ActionOutcome, ActionError> {
        self.ensure_player_turn()?;
        let def = skill.definition().ok_or(ActionError::UnknownSkill(skill))?;

        if !player.knows(skill) {
            return Err(ActionError::SkillNotKnown(skill));
        }
        if player.level < def.min_level {
            return Err(ActionError::LevelTooLow {
                skill,
                required: def.min_level,
                level: player.level,
            });
        }
        if !def.classes.contains(&player.class) {
            return Err(ActionError::ClassNotEligible {
                skill,
                class: player.class,
            });
        }
        if player.mana < def.cost {
            return Err(ActionError::InsufficientMana {
                required: def.cost,
                available: player.mana,
            });
        }

        let target_index = match def.targeting {
            Targeting::Single => Some(self.target_index(target.ok_or(ActionError::MissingTarget)?)?),
            Targeting::SelfOnly | Targeting::Area => None,
        };

        match def.effect {
            SkillEffect::ApplyToSelf { effect, .. } => {
                if blocked_by(effect, player.entity.has_effect(effect)) {
                    return Err(ActionError::AlreadyActive(effect));
                }
            }
            SkillEffect::Inflict { effect, .. } => {
                let present = target_index
                    .and_then(|index| self.enemies.get(index))
                    .is_some_and(|enemy| enemy.has_effect(effect));
                if blocked_by(effect, present) {
                    return Err(ActionError::AlreadyActive(effect));
                }
            }
            _ => {}
        }

        self.flee_prepared = false;
        player.mana -= def.cost;
        self.say(format!("You use {}", def.name));
        tracing::debug!(skill = %def.name, mana = player.mana, "skill used");

        let mut attack = None;
        match def.effect {
            SkillEffect::ApplyToSelf { effect, duration } => {
                player.entity.apply_effect(effect, duration);
            }
            SkillEffect::Heal(amount) => {
                player.entity.heal(amount);
                self.say(format!("You recover {amount} health"));
            }
            SkillEffect::SpellAttack {
                damage,
                damage_type,
            } => {
                if let Some(index) = target_index {
                    let defender = &self.enemies[index];
                    let outcome = player.entity.attack(
                        defender,
                        AttackMode::Spell {
                            damage,
                            damage_type,
                        },
                        &mut self.rng,
                    );
                    let name = defender.name.clone();
                    self.say(Self::roll_text(&outcome));
                    if outcome.passed && outcome.damage > 0.0 {
                        self.queue_damage(
                            Combatant::Enemy(index),
                            Some(Combatant::Player),
                            outcome.damage,
                            damage_type,
                            format!("{} deals {:.1} damage to {name}", def.name, outcome.damage),
                        );
                    }
                    attack = Some(outcome);
                }
            }
            SkillEffect::AreaDamage {
                damage,
                damage_type,
            } => {
                for index in self.active_enemy_indices() {
                    let enemy = &self.enemies[index];
                    let amount = enemy.calculate_damage(damage);
                    let text = format!("{} deals {amount:.1} damage to {}", def.name, enemy.name);
                    self.queue_damage(
                        Combatant::Enemy(index),
                        Some(Combatant::Player),
                        amount,
                        damage_type,
                        text,
                    );
                }
            }
            SkillEffect::Inflict { effect, duration } => {
                if let Some(enemy) = target_index.and_then(|index| self.enemies.get_mut(index)) {
                    enemy.apply_effect(effect, duration);
                    let text = format!("{} is now {}", enemy.name, effect.template().name);
                    self.say(text);
                }
            }
        }

        if def.consumes_turn {
            self.end_player_turn();
        }
        Ok(ActionOutcome {
            turn_ended: def.consumes_turn,
            attack,
        })
    }

    /// Use one unit of an item from the inventory.
    pub fn use_item(
        &mut self,
        player: &mut Player,
        item: ItemKind,
        target: Option<EntityId>,
    ) -> Result<ActionOutcome, ActionError> {
        self.ensure_player_turn()?;
        let def = item.definition().ok_or(ActionError::UnknownItem(item))?;
        if player.item_count(item) == 0 {
            return Err(ActionError::MissingItem(item));
        }

        let targets = match def.targeting {
            Targeting::SelfOnly => Vec::new(),
            Targeting::Single => {
                vec![self.target_index(target.ok_or(ActionError::MissingTarget)?)?]
            }
            Targeting::Area => self.active_enemy_indices(),
        };

        self.flee_prepared = false;
        player.remove_item(item);
        self.say(format!("You use {}", def.name));

        match def.effect {
            ItemEffect::Heal(amount) => {
                player.entity.heal(amount);
                self.say(format!("You recover {amount} health"));
            }
            ItemEffect::Damage {
                amount,
                damage_type,
            } => {
                for index in targets {
                    let Some(enemy) = self.enemies.get_mut(index) else {
                        continue;
                    };
                    let report = enemy.apply_damage(
                        Some(Combatant::Player),
                        amount,
                        damage_type,
                        &mut self.rng,
                    );
                    let text = format!("{} takes {:.1} damage", enemy.name, report.applied);
                    let survival = Self::survival_text(&enemy.name, &report);
                    self.say(text);
                    if let Some(survival) = survival {
                        self.say(survival);
                    }
                }
            }
        }

        if def.consumes_turn {
            self.end_player_turn();
        }
        Ok(ActionOutcome::new(def.consumes_turn))
    }

    /// Try to run. The first call spends the turn preparing; a second call in
    /// a row ends the combat.
    pub fn flee_player(&mut self) -> Result<FleeOutcome, ActionError> {
        self.ensure_player_turn()?;
        if !self.fleeable {
            return Err(ActionError::NotFleeable);
        }

        if self.flee_prepared {
            self.finalize(false, true);
            self.log.push("You fled!".to_string());
            return Ok(FleeOutcome::Fled);
        }

        self.flee_prepared = true;
        self.say("You are preparing to flee");
        self.end_player_turn();
        Ok(FleeOutcome::Preparing)
    }
}

/// A non-stackable effect that is already present cannot be applied again.
fn blocked_by(effect: EffectKind, present: bool) -> bool {
    present && !effect.template().stackable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::CombatConfig;
    use crate::entity::{DeathBehavior, Entity, Role, TurnBehavior};
    use crate::monsters::EnemyKind;
    use std::time::Instant;

    fn player_turn(kinds: &[EnemyKind], fleeable: bool, player: &mut Player) -> Combat {
        let mut combat = Combat::new(
            kinds,
            fleeable,
            &player.entity,
            CombatConfig::instant().with_seed(3),
        );
        combat.current_turn = combat
            .turn_order
            .iter()
            .position(|c| *c == Combatant::Player)
            .unwrap_or(0);
        combat.update_at(Instant::now(), player);
        assert!(combat.is_player_turn());
        combat
    }

    #[test]
    fn test_attack_requires_player_turn() {
        let mut player = Player::sample("Thorin");
        let mut combat = player_turn(&[EnemyKind::Skeleton], false, &mut player);
        let target = combat.enemies()[0].id;
        combat.player_attack(&player, target).unwrap();
        assert_eq!(
            combat.player_attack(&player, target),
            Err(ActionError::NotPlayerTurn)
        );
    }

    #[test]
    fn test_attack_unknown_target() {
        let mut player = Player::sample("Thorin");
        let mut combat = player_turn(&[EnemyKind::Skeleton], false, &mut player);
        let bogus = EntityId::new();
        assert_eq!(
            combat.player_attack(&player, bogus),
            Err(ActionError::InvalidTarget(bogus))
        );
        assert!(combat.is_player_turn());
    }

    #[test]
    fn test_skill_validation_mutates_nothing() {
        let mut player = Player::sample("Thorin");
        let mut combat = player_turn(&[EnemyKind::Skeleton], false, &mut player);

        assert_eq!(
            combat.use_skill(&mut player, SkillKind::FireBolt, None),
            Err(ActionError::SkillNotKnown(SkillKind::FireBolt))
        );

        player.skills.push(SkillKind::FireBolt);
        assert_eq!(
            combat.use_skill(&mut player, SkillKind::FireBolt, None),
            Err(ActionError::ClassNotEligible {
                skill: SkillKind::FireBolt,
                class: CharacterClass::Warrior,
            })
        );

        player.class = CharacterClass::Mage;
        player.mana = 1;
        assert_eq!(
            combat.use_skill(&mut player, SkillKind::FireBolt, None),
            Err(ActionError::InsufficientMana {
                required: 3,
                available: 1,
            })
        );
        assert_eq!(player.mana, 1);
        assert!(combat.is_player_turn());
        assert_eq!(combat.queued_actions(), 0);
    }

    #[test]
    fn test_level_requirement() {
        let mut player = Player::sample("Thorin");
        player.class = CharacterClass::Mage;
        player.skills.push(SkillKind::Thunderwave);
        let mut combat = player_turn(&[EnemyKind::Skeleton], false, &mut player);
        assert_eq!(
            combat.use_skill(&mut player, SkillKind::Thunderwave, None),
            Err(ActionError::LevelTooLow {
                skill: SkillKind::Thunderwave,
                required: 2,
                level: 1,
            })
        );
    }

    #[test]
    fn test_reckless_attack_keeps_turn() {
        let mut player = Player::sample("Thorin");
        let mut combat = player_turn(&[EnemyKind::Skeleton], false, &mut player);
        let outcome = combat
            .use_skill(&mut player, SkillKind::RecklessAttack, None)
            .unwrap();
        assert!(!outcome.turn_ended);
        assert!(combat.is_player_turn());
        assert!(player.entity.has_effect(EffectKind::Reckless));
    }

    #[test]
    fn test_accurate_attack_ends_turn() {
        let mut player = Player::sample("Thorin");
        let mut combat = player_turn(&[EnemyKind::Skeleton], false, &mut player);
        let outcome = combat
            .use_skill(&mut player, SkillKind::AccurateAttack, None)
            .unwrap();
        assert!(outcome.turn_ended);
        assert!(!combat.is_player_turn());
        assert!(player.entity.has_effect(EffectKind::Aiming));
    }

    #[test]
    fn test_potion_heals_and_keeps_turn() {
        let mut player = Player::sample("Thorin");
        player.entity.health = 50.0;
        let mut combat = player_turn(&[EnemyKind::Skeleton], false, &mut player);
        let outcome = combat
            .use_item(&mut player, ItemKind::SmallHealingPotion, None)
            .unwrap();
        assert!(!outcome.turn_ended);
        assert_eq!(player.entity.health, 70.0);
        assert_eq!(player.item_count(ItemKind::SmallHealingPotion), 1);
    }

    #[test]
    fn test_missing_item() {
        let mut player = Player::sample("Thorin");
        let mut combat = player_turn(&[EnemyKind::Skeleton], false, &mut player);
        assert_eq!(
            combat.use_item(&mut player, ItemKind::Bomb, None),
            Err(ActionError::MissingItem(ItemKind::Bomb))
        );
    }

    #[test]
    fn test_bomb_hits_every_enemy() {
        let mut player = Player::sample("Thorin");
        let mut combat = player_turn(&[EnemyKind::Skeleton, EnemyKind::Wolf], false, &mut player);
        let outcome = combat
            .use_item(&mut player, ItemKind::SmallBomb, None)
            .unwrap();
        assert!(outcome.turn_ended);
        assert_eq!(combat.enemies()[0].health, 5.0);
        assert_eq!(combat.enemies()[1].health, 6.0);
        assert_eq!(player.item_count(ItemKind::SmallBomb), 0);
    }

    #[test]
    fn test_bomb_narrates_undead_revival() {
        let mut player = Player::sample("Thorin");
        let zombie = Entity::new("Zombie", 1)
            .with_role(Role::Monster(EnemyKind::Zombie))
            .with_behavior(TurnBehavior::Passive)
            .with_death(DeathBehavior::undead(-100));
        let mut combat = Combat::from_entities(
            vec![zombie],
            false,
            &player.entity,
            CombatConfig::instant().with_seed(3),
        );
        combat.current_turn = combat
            .turn_order
            .iter()
            .position(|c| *c == Combatant::Player)
            .unwrap_or(0);
        let now = Instant::now();
        combat.update_at(now, &mut player);
        assert!(combat.is_player_turn());

        combat
            .use_item(&mut player, ItemKind::SmallBomb, None)
            .unwrap();
        for _ in 0..10 {
            combat.update_at(now, &mut player);
        }
        assert!(!combat.enemies()[0].dead());
        assert!(combat.log().iter().any(|line| line == "Zombie rises again!"));
    }

    #[test]
    fn test_flee_requires_fleeable() {
        let mut player = Player::sample("Thorin");
        let mut combat = player_turn(&[EnemyKind::Skeleton], false, &mut player);
        assert_eq!(combat.flee_player(), Err(ActionError::NotFleeable));
        assert!(!combat.flee_prepared());
    }

    #[test]
    fn test_first_flee_prepares() {
        let mut player = Player::sample("Thorin");
        let mut combat = player_turn(&[EnemyKind::Skeleton], true, &mut player);
        assert_eq!(combat.flee_player(), Ok(FleeOutcome::Preparing));
        assert!(combat.flee_prepared());
        assert!(!combat.is_over());
        assert!(!combat.is_player_turn());
    }
}
