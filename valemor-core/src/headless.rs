//! Headless combat driver.
//!
//! Runs a combat to completion without a UI: a virtual clock advances the
//! timed narration and an [`Autopilot`] plays the player's turns. Useful for
//! balancing, simulations and end-to-end tests.
//!
//! # Example
//!
//! ```ignore
//! use valemor_core::{EnemyKind, HeadlessCombat, HeadlessConfig, Player};
//!
//! let player = Player::sample("Thorin");
//! let mut run = HeadlessCombat::new(player, &[EnemyKind::Skeleton], true, HeadlessConfig::default());
//! let result = run.run()?;
//! println!("victory: {}", result.victory());
//! ```

use crate::combat::{ActionError, Combat, CombatConfig, CombatResult};
use crate::entity::EntityId;
use crate::items::ItemKind;
use crate::monsters::EnemyKind;
use crate::player::Player;
use crate::skills::SkillKind;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeadlessError {
    #[error("Combat did not finish within {0} ticks")]
    Stalled(usize),

    #[error("Autopilot action failed: {0}")]
    Action(#[from] ActionError),
}

/// How the player's turns are played.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Autopilot {
    /// Attack the first enemy still standing.
    #[default]
    Attack,
    /// Heal below the given health fraction, attack otherwise.
    CautiousHealer { heal_below: f64 },
    /// Run away when possible.
    Coward,
}


/// One player move chosen by the autopilot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Attack(EntityId),
    Skill(SkillKind, Option<EntityId>),
    Item(ItemKind),
    Flee,
}

impl Autopilot {
    /// Pick the next move. `None` when there is nobody left to attack.
    pub fn decide(&self, combat: &Combat, player: &Player) -> Option<Decision> {
        let target = combat.active_enemies().next().map(|enemy| enemy.id);

        match *self {
            Autopilot::Attack => target.map(Decision::Attack),
            Autopilot::CautiousHealer { heal_below } => {
                if player.entity.health_fraction() < heal_below {
                    if let Some(item) = [ItemKind::HealingPotion, ItemKind::SmallHealingPotion]
                        .into_iter()
                        .find(|item| player.item_count(*item) > 0)
                    {
                        return Some(Decision::Item(item));
                    }
                    let healing_word = SkillKind::HealingWord;
                    let affordable = healing_word
                        .definition()
                        .is_some_and(|def| def.cost <= player.mana);
                    if player.knows(healing_word) && affordable {
                        return Some(Decision::Skill(healing_word, None));
                    }
                }
                target.map(Decision::Attack)
            }
            Autopilot::Coward if combat.fleeable() => Some(Decision::Flee),
            Autopilot::Coward => target.map(Decision::Attack),
        }
    }
}

/// Configuration for a headless run.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Virtual time added per tick.
    pub tick: Duration,
    /// Give up after this many ticks.
    pub max_ticks: usize,
    pub autopilot: Autopilot,
    pub combat: CombatConfig,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            max_ticks: 100_000,
            autopilot: Autopilot::default(),
            combat: CombatConfig::default(),
        }
    }
}

impl HeadlessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_max_ticks(mut self, max_ticks: usize) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    pub fn with_autopilot(mut self, autopilot: Autopilot) -> Self {
        self.autopilot = autopilot;
        self
    }

    pub fn with_combat_config(mut self, combat: CombatConfig) -> Self {
        self.combat = combat;
        self
    }
}

/// A combat played on a virtual clock.
#[derive(Debug)]
pub struct HeadlessCombat {
    combat: Combat,
    player: Player,
    clock: Instant,
    ticks: usize,
    decisions: Vec<Decision>,
    config: HeadlessConfig,
}

impl HeadlessCombat {
    pub fn new(player: Player, enemies: &[EnemyKind], fleeable: bool, config: HeadlessConfig) -> Self {
        let combat = Combat::new(enemies, fleeable, &player.entity, config.combat.clone());
        Self::from_combat(combat, player, config)
    }

    pub fn from_combat(combat: Combat, player: Player, config: HeadlessConfig) -> Self {
        Self {
            combat,
            player,
            clock: Instant::now(),
            ticks: 0,
            decisions: Vec::new(),
            config,
        }
    }

    pub fn combat(&self) -> &Combat {
        &self.combat
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn into_player(self) -> Player {
        self.player
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Every move the autopilot made, in order.
    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    /// Advance one tick, acting for the player when it is their turn and the
    /// narration has caught up. Returns the result once the combat is over.
    pub fn step(&mut self) -> Result<Option<CombatResult>, HeadlessError> {
        if self.combat.is_player_turn() && self.combat.is_idle() {
            if let Some(decision) = self.config.autopilot.decide(&self.combat, &self.player) {
                self.act(decision)?;
            }
        }

        self.clock += self.config.tick;
        self.ticks += 1;
        self.combat.update_at(self.clock, &mut self.player);
        Ok(self.combat.take_finished())
    }

    /// Play until the combat ends.
    pub fn run(&mut self) -> Result<CombatResult, HeadlessError> {
        while self.ticks < self.config.max_ticks {
            if let Some(result) = self.step()? {
                tracing::info!(
                    ticks = self.ticks,
                    victory = result.victory(),
                    "headless combat finished"
                );
                return Ok(result);
            }
        }
        Err(HeadlessError::Stalled(self.ticks))
    }

    fn act(&mut self, decision: Decision) -> Result<(), HeadlessError> {
        tracing::debug!(?decision, "autopilot");
        match decision {
            Decision::Attack(target) => {
                self.combat.player_attack(&self.player, target)?;
            }
            Decision::Skill(skill, target) => {
                self.combat.use_skill(&mut self.player, skill, target)?;
            }
            Decision::Item(item) => {
                self.combat.use_item(&mut self.player, item, None)?;
            }
            Decision::Flee => {
                self.combat.flee_player()?;
            }
        }
        self.decisions.push(decision);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(autopilot: Autopilot) -> HeadlessConfig {
        HeadlessConfig::new()
            .with_autopilot(autopilot)
            .with_combat_config(CombatConfig::instant().with_seed(11))
    }

    #[test]
    fn test_default_config_attacks() {
        assert_eq!(HeadlessConfig::new().autopilot, Autopilot::Attack);
    }

    #[test]
    fn test_attack_autopilot_finishes() {
        let player = Player::sample("Thorin");
        let mut run = HeadlessCombat::new(player, &[EnemyKind::Skeleton], true, config(Autopilot::Attack));
        let result = run.run().unwrap();
        assert!(result.victory() || run.player().entity.dead());
        assert!(!run.decisions().is_empty());
        assert!(run
            .decisions()
            .iter()
            .all(|decision| matches!(decision, Decision::Attack(_))));
    }

    #[test]
    fn test_coward_flees_in_two_turns() {
        let player = Player::sample("Thorin");
        let mut run = HeadlessCombat::new(player, &[EnemyKind::Wolf], true, config(Autopilot::Coward));
        let result = run.run().unwrap();
        // Unless the wolf got lucky first.
        if !run.player().entity.dead() {
            assert!(result.player_fled());
            assert!(!result.victory());
            assert_eq!(run.decisions(), &[Decision::Flee, Decision::Flee]);
        }
    }

    #[test]
    fn test_coward_fights_when_cornered() {
        let mut player = Player::sample("Thorin");
        player.inventory.clear();
        let run = HeadlessCombat::new(player, &[EnemyKind::Wolf], false, config(Autopilot::Coward));
        let decision = Autopilot::Coward.decide(run.combat(), run.player());
        assert!(matches!(decision, Some(Decision::Attack(_))));
    }

    #[test]
    fn test_healer_drinks_when_low() {
        let mut player = Player::sample("Thorin");
        player.entity.health = 10.0;
        let run = HeadlessCombat::new(
            player,
            &[EnemyKind::Zombie],
            true,
            config(Autopilot::CautiousHealer { heal_below: 0.5 }),
        );
        let decision = run.config.autopilot.decide(run.combat(), run.player());
        assert_eq!(decision, Some(Decision::Item(ItemKind::SmallHealingPotion)));
    }

    #[test]
    fn test_stalls_when_budget_runs_out() {
        let player = Player::sample("Thorin");
        let mut run = HeadlessCombat::new(
            player,
            &[EnemyKind::Zombie, EnemyKind::Zombie],
            false,
            config(Autopilot::Attack).with_max_ticks(2),
        );
        assert!(matches!(run.run(), Err(HeadlessError::Stalled(2))));
    }
}
