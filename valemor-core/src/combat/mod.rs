//! The combat engine.
//!
//! A `Combat` is a tick-driven state machine. The host calls
//! [`Combat::update_at`] once per frame; each call does at most one of:
//!
//! 1. finish the executing [`TimedAction`] once its delay has run out,
//! 2. start the next queued action,
//! 3. resolve the active turn.
//!
//! Turns only advance when nothing is queued or executing, so every line of
//! narration stays on screen for at least its delay. Enemy turns resolve
//! synchronously and may queue narrated damage; the player's turn waits for
//! one of the actions in [`actions`].
//!
//! The player is owned by the session and passed in on every call. The
//! combat owns its enemies, which are fresh copies of the registry templates.

pub mod actions;
pub mod timed;

pub use actions::{ActionError, ActionOutcome, FleeOutcome};
pub use timed::{DeferredEffect, TimedAction};

use crate::entity::{
    AttackMode, AttackOutcome, DamageReport, DamageType, Entity, EntityId, Role, TurnBehavior,
    TurnStart,
};
use crate::monsters::EnemyKind;
use crate::player::Player;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// A participant in the turn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combatant {
    Player,
    /// Index into the combat's enemy list.
    Enemy(usize),
}

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatPhase {
    /// Turns are being taken.
    Running,
    /// The end was detected; the terminal action is draining.
    Resolving,
    /// A result has been produced.
    Ended,
}

/// Timing and randomness for a combat.
#[derive(Debug, Clone)]
pub struct CombatConfig {
    /// How long each line of narration stays up.
    pub text_delay: Duration,
    /// Delay of the "Victory!" / "Defeat!" action.
    pub end_delay: Duration,
    /// Seed for reproducible combats. Entropy when unset.
    pub seed: Option<u64>,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            text_delay: Duration::from_secs(3),
            end_delay: Duration::from_secs(3),
            seed: None,
        }
    }
}

impl CombatConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// No delays at all. Every queued action resolves on the tick after it starts.
    pub fn instant() -> Self {
        Self {
            text_delay: Duration::ZERO,
            end_delay: Duration::ZERO,
            seed: None,
        }
    }

    pub fn with_text_delay(mut self, delay: Duration) -> Self {
        self.text_delay = delay;
        self
    }

    pub fn with_end_delay(mut self, delay: Duration) -> Self {
        self.end_delay = delay;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// How a combat ended. Produced once per combat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatResult {
    victory: bool,
    player_fled: bool,
    kills: u32,
    enemies_fled: Vec<EnemyKind>,
    enemies: Vec<EnemyKind>,
}

impl CombatResult {
    pub fn victory(&self) -> bool {
        self.victory
    }

    pub fn player_fled(&self) -> bool {
        self.player_fled
    }

    /// Enemies that died.
    pub fn kills(&self) -> u32 {
        self.kills
    }

    pub fn enemies_fled(&self) -> &[EnemyKind] {
        &self.enemies_fled
    }

    /// Every enemy in the encounter.
    pub fn enemies(&self) -> &[EnemyKind] {
        &self.enemies
    }
}

/// One fight between the player and a group of enemies.
#[derive(Debug)]
pub struct Combat {
    config: CombatConfig,
    rng: StdRng,
    enemies: Vec<Entity>,
    turn_order: Vec<Combatant>,
    current_turn: usize,
    queue: VecDeque<TimedAction>,
    current: Option<TimedAction>,
    phase: CombatPhase,
    is_player_turn: bool,
    /// Effect decay already ran for the current player turn.
    player_turn_started: bool,
    fleeable: bool,
    flee_prepared: bool,
    log: Vec<String>,
    result: Option<CombatResult>,
    /// Copy of `result` not yet collected by the narrative bridge.
    unreported: Option<CombatResult>,
}

impl Combat {
    /// Start a combat against fresh copies of the given enemy templates.
    pub fn new(kinds: &[EnemyKind], fleeable: bool, player: &Entity, config: CombatConfig) -> Self {
        let enemies = kinds.iter().map(|kind| kind.spawn()).collect();
        Self::from_entities(enemies, fleeable, player, config)
    }

    /// Start a combat against already-built enemies. Initiative is rolled here,
    /// once.
    pub fn from_entities(
        enemies: Vec<Entity>,
        fleeable: bool,
        player: &Entity,
        config: CombatConfig,
    ) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut rolls = vec![(player.initiative(&mut rng), Combatant::Player)];
        for (index, enemy) in enemies.iter().enumerate() {
            rolls.push((enemy.initiative(&mut rng), Combatant::Enemy(index)));
        }
        // Stable: ties keep the player first, then encounter order.
        rolls.sort_by(|a, b| b.0.cmp(&a.0));
        tracing::debug!(?rolls, "initiative");
        let turn_order = rolls.into_iter().map(|(_, who)| who).collect();

        tracing::info!(
            enemies = enemies.len(),
            fleeable,
            "combat started"
        );

        Self {
            config,
            rng,
            enemies,
            turn_order,
            current_turn: 0,
            queue: VecDeque::new(),
            current: None,
            phase: CombatPhase::Running,
            is_player_turn: false,
            player_turn_started: false,
            fleeable,
            flee_prepared: false,
            log: Vec::new(),
            result: None,
            unreported: None,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn enemies(&self) -> &[Entity] {
        &self.enemies
    }

    pub fn enemy(&self, id: EntityId) -> Option<&Entity> {
        self.enemies.iter().find(|enemy| enemy.id == id)
    }

    /// Enemies still in the fight.
    pub fn active_enemies(&self) -> impl Iterator<Item = &Entity> {
        self.enemies.iter().filter(|enemy| enemy.is_active())
    }

    pub fn turn_order(&self) -> &[Combatant] {
        &self.turn_order
    }

    pub fn current_turn(&self) -> usize {
        self.current_turn
    }

    pub fn active_combatant(&self) -> Option<Combatant> {
        self.turn_order.get(self.current_turn).copied()
    }

    pub fn phase(&self) -> CombatPhase {
        self.phase
    }

    /// Still taking turns.
    pub fn is_running(&self) -> bool {
        self.phase == CombatPhase::Running
    }

    pub fn is_over(&self) -> bool {
        self.phase == CombatPhase::Ended
    }

    pub fn is_player_turn(&self) -> bool {
        self.is_player_turn
    }

    pub fn fleeable(&self) -> bool {
        self.fleeable
    }

    pub fn flee_prepared(&self) -> bool {
        self.flee_prepared
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Number of actions waiting behind the executing one.
    pub fn queued_actions(&self) -> usize {
        self.queue.len()
    }

    pub fn current_action(&self) -> Option<&TimedAction> {
        self.current.as_ref()
    }

    /// Nothing executing and nothing queued.
    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.queue.is_empty()
    }

    pub fn result(&self) -> Option<&CombatResult> {
        self.result.as_ref()
    }

    /// Hand the result to the narrative bridge. Returns it exactly once.
    pub fn take_finished(&mut self) -> Option<CombatResult> {
        self.unreported.take()
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    // ========================================================================
    // Tick
    // ========================================================================

    pub fn update(&mut self, player: &mut Player) {
        self.update_at(Instant::now(), player);
    }

    /// Advance the state machine by one tick.
    pub fn update_at(&mut self, now: Instant, player: &mut Player) {
        if self.phase == CombatPhase::Ended {
            return;
        }

        self.check_end(&player.entity);

        if let Some(action) = &self.current {
            if action.is_ready(now) {
                if let Some(action) = self.current.take() {
                    if let Some(effect) = action.effect {
                        self.run_deferred(effect, player);
                    }
                    if let Some(text) = action.text {
                        self.log.push(text);
                    }
                }
            }
            return;
        }

        if let Some(mut next) = self.queue.pop_front() {
            next.start(now);
            self.current = Some(next);
            return;
        }

        if self.phase == CombatPhase::Running {
            self.process_turn(player);
        }
    }

    /// Detect victory or defeat and queue the terminal action.
    ///
    /// Only acts while running, so calling it again after the end was found
    /// queues nothing. Returns true when it queued the terminal action.
    pub fn check_end(&mut self, player: &Entity) -> bool {
        if self.phase != CombatPhase::Running {
            return false;
        }

        let (text, victory) = if self.enemies.iter().all(|enemy| !enemy.is_active()) {
            ("Victory!", true)
        } else if player.dead() {
            ("Defeat!", false)
        } else {
            return false;
        };

        self.phase = CombatPhase::Resolving;
        self.is_player_turn = false;
        self.queue.push_back(
            TimedAction::text(text, self.config.end_delay)
                .with_effect(DeferredEffect::Finish { victory }),
        );
        true
    }

    /// End the combat and store its result. Does nothing if already ended.
    pub fn finalize(&mut self, victory: bool, player_fled: bool) {
        if self.result.is_some() {
            return;
        }

        self.queue.clear();
        self.current = None;
        self.phase = CombatPhase::Ended;
        self.is_player_turn = false;

        let result = CombatResult {
            victory,
            player_fled,
            kills: self.enemies.iter().filter(|enemy| enemy.dead()).count() as u32,
            enemies_fled: enemy_kinds(self.enemies.iter().filter(|enemy| enemy.fled)),
            enemies: enemy_kinds(self.enemies.iter()),
        };

        tracing::info!(
            victory,
            player_fled,
            kills = result.kills,
            "combat finished"
        );
        self.unreported = Some(result.clone());
        self.result = Some(result);
    }

    // ========================================================================
    // Turns
    // ========================================================================

    fn process_turn(&mut self, player: &mut Player) {
        let Some(active) = self.active_combatant() else {
            return;
        };

        match active {
            Combatant::Player => {
                if !self.player_turn_started {
                    self.player_turn_started = true;
                    let start = player.entity.start_turn(&mut self.rng);
                    self.narrate_turn_start(&player.entity.name, &start);
                    if start.skipped {
                        if !player.entity.dead() {
                            self.say(format!("{} is stunned", player.entity.name));
                        }
                        self.end_player_turn();
                        return;
                    }
                }
                self.is_player_turn = true;
            }
            Combatant::Enemy(index) => {
                self.is_player_turn = false;
                if self.enemies.get(index).is_some_and(|enemy| enemy.is_active()) {
                    self.enemy_turn(index, player);
                }
                self.advance_turn();
            }
        }
    }

    fn enemy_turn(&mut self, index: usize, player: &Player) {
        let Some(enemy) = self.enemies.get_mut(index) else {
            return;
        };
        let name = enemy.name.clone();

        let start = enemy.start_turn(&mut self.rng);
        let dead = enemy.dead();
        let health_fraction = enemy.health_fraction();
        let behavior = enemy.behavior;
        self.narrate_turn_start(&name, &start);
        if dead {
            self.say(format!("{name} falls"));
            return;
        }
        if start.skipped {
            self.say(format!("{name} is stunned"));
            return;
        }

        match behavior {
            TurnBehavior::Passive => {
                self.say(format!("{name} hesitates"));
                return;
            }
            TurnBehavior::Skittish { flee_below } if health_fraction < flee_below => {
                if let Some(enemy) = self.enemies.get_mut(index) {
                    enemy.fled = true;
                }
                tracing::debug!(enemy = %name, "enemy fled");
                self.say(format!("{name} flees!"));
                return;
            }
            _ => {}
        }

        self.say(format!("{name} is attacking {}", player.name()));
        let Some(enemy) = self.enemies.get(index) else {
            return;
        };
        let damage_type = enemy.damage_type;
        let outcome = enemy.attack(&player.entity, AttackMode::Melee, &mut self.rng);
        if outcome.critical {
            self.say(format!("{name} rolled a critical!"));
        } else {
            self.say(format!("{name} rolled {}", outcome.result));
        }
        if outcome.passed && outcome.damage > 0.0 {
            self.queue_damage(
                Combatant::Player,
                Some(Combatant::Enemy(index)),
                outcome.damage,
                damage_type,
                format!("{name} deals {:.1} damage to {}", outcome.damage, player.name()),
            );
        }
    }

    fn narrate_turn_start(&mut self, name: &str, start: &TurnStart) {
        if start.damage_taken > 0.0 {
            self.say(format!("{name} takes {:.1} damage", start.damage_taken));
        }
        if start.healed > 0 {
            self.say(format!("{name} recovers {} health", start.healed));
        }
    }

    fn end_player_turn(&mut self) {
        self.is_player_turn = false;
        self.player_turn_started = false;
        self.advance_turn();
    }

    fn advance_turn(&mut self) {
        if self.turn_order.is_empty() {
            return;
        }
        self.current_turn = (self.current_turn + 1) % self.turn_order.len();
    }

    // ========================================================================
    // Queue
    // ========================================================================

    /// Queue a line of narration.
    fn say(&mut self, text: impl Into<String>) {
        self.queue
            .push_back(TimedAction::text(text, self.config.text_delay));
    }

    fn queue_damage(
        &mut self,
        target: Combatant,
        source: Option<Combatant>,
        amount: f64,
        damage_type: DamageType,
        text: String,
    ) {
        self.queue.push_back(
            TimedAction::text(text, self.config.text_delay).with_effect(DeferredEffect::Damage {
                target,
                source,
                amount,
                damage_type,
            }),
        );
    }

    fn run_deferred(&mut self, effect: DeferredEffect, player: &mut Player) {
        match effect {
            DeferredEffect::Damage {
                target,
                source,
                amount,
                damage_type,
            } => {
                let entity = match target {
                    Combatant::Player => Some(&mut player.entity),
                    Combatant::Enemy(index) => self.enemies.get_mut(index),
                };
                let Some(entity) = entity else {
                    return;
                };
                let report = entity.apply_damage(source, amount, damage_type, &mut self.rng);
                if let Some(text) = Self::survival_text(&entity.name, &report) {
                    self.log.push(text);
                }
            }
            DeferredEffect::Finish { victory } => self.finalize(victory, false),
        }
    }

    /// Narration for damage that should have been fatal but was not.
    fn survival_text(name: &str, report: &DamageReport) -> Option<String> {
        if report.revived {
            Some(format!("{name} rises again!"))
        } else if report.death_prevented {
            Some(format!("{name} refuses to fall!"))
        } else {
            None
        }
    }

    fn roll_text(outcome: &AttackOutcome) -> String {
        if outcome.critical {
            "You rolled a critical!".to_string()
        } else if outcome.passed {
            format!("You rolled {} (success!)", outcome.result)
        } else {
            format!("You rolled {} (miss!)", outcome.result)
        }
    }
}

fn enemy_kinds<'a>(enemies: impl Iterator<Item = &'a Entity>) -> Vec<EnemyKind> {
    enemies
        .filter_map(|enemy| match enemy.role {
            Role::Monster(kind) => Some(kind),
            Role::Player => None,
        })
        .collect()
}
