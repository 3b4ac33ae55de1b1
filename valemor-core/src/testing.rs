//! Testing utilities.
//!
//! This module provides tools for integration testing:
//! - `ScriptedNarrator` for deterministic sessions without a language model
//! - `CombatHarness` for driving a combat on a virtual clock
//! - Enemy builders with predictable rolls

use crate::combat::{Combat, CombatConfig, CombatResult};
use crate::entity::{Entity, EntityId, Role, TurnBehavior};
use crate::monsters::EnemyKind;
use crate::narrative::{AgentEvent, AgentSetup, NarrativeAgent, NarrativeError};
use crate::player::Player;
use crate::tools::ToolCall;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A scripted reply from the narrator.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedReply {
    /// Narration, streamed word by word.
    pub text: String,
    /// Tool calls, emitted before the text.
    pub tool_calls: Vec<ToolCall>,
    /// Fail the reply with this message instead of finishing it.
    pub error: Option<String>,
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
            error: None,
        }
    }

    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            tool_calls: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// A narrator that plays back scripted replies in order.
///
/// Every message it receives is recorded; grab [`inputs`](Self::inputs)
/// before handing the narrator to a session to inspect them afterwards.
#[derive(Debug, Clone)]
pub struct ScriptedNarrator {
    replies: VecDeque<ScriptedReply>,
    inputs: Arc<Mutex<Vec<String>>>,
    setup: Arc<Mutex<Option<AgentSetup>>>,
}

impl Default for ScriptedNarrator {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ScriptedNarrator {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: replies.into(),
            inputs: Arc::new(Mutex::new(Vec::new())),
            setup: Arc::new(Mutex::new(None)),
        }
    }

    pub fn queue_reply(&mut self, reply: ScriptedReply) {
        self.replies.push_back(reply);
    }

    /// Shared log of received messages.
    pub fn inputs(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.inputs)
    }

    /// Shared slot holding the setup passed to `configure`.
    pub fn setup(&self) -> Arc<Mutex<Option<AgentSetup>>> {
        Arc::clone(&self.setup)
    }
}

impl NarrativeAgent for ScriptedNarrator {
    fn configure(&mut self, setup: &AgentSetup) {
        if let Ok(mut slot) = self.setup.lock() {
            *slot = Some(setup.clone());
        }
    }

    fn respond(
        &mut self,
        input: &str,
        emit: &mut dyn FnMut(AgentEvent),
    ) -> Result<(), NarrativeError> {
        if let Ok(mut inputs) = self.inputs.lock() {
            inputs.push(input.to_string());
        }

        let reply = self
            .replies
            .pop_front()
            .unwrap_or_else(|| ScriptedReply::text("The story continues."));

        for call in reply.tool_calls {
            emit(AgentEvent::ToolCall(call));
        }
        for word in reply.text.split_inclusive(' ') {
            emit(AgentEvent::Token(word.to_string()));
        }
        match reply.error {
            Some(message) => Err(NarrativeError::Agent(message)),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Predictable enemies
// ============================================================================

/// An enemy that never dodges and never fights back. Reported as a skeleton.
pub fn punching_bag(name: impl Into<String>, max_health: i32) -> Entity {
    Entity::new(name, max_health)
        .with_role(Role::Monster(EnemyKind::Skeleton))
        .with_dodge(0)
        .with_base_damage(0)
        .with_behavior(TurnBehavior::Passive)
}

/// An enemy that only a natural 20 can hit. Reported as a skeleton.
pub fn untouchable(name: impl Into<String>, max_health: i32) -> Entity {
    Entity::new(name, max_health)
        .with_role(Role::Monster(EnemyKind::Skeleton))
        .with_dodge(100)
        .with_base_damage(0)
        .with_behavior(TurnBehavior::Passive)
}

// ============================================================================
// Combat harness
// ============================================================================

/// Drives a combat with a virtual clock.
#[derive(Debug)]
pub struct CombatHarness {
    pub combat: Combat,
    pub player: Player,
    clock: Instant,
    step: Duration,
}

impl CombatHarness {
    /// Instant narration, seeded rolls, sample player.
    pub fn new(enemies: Vec<Entity>, fleeable: bool) -> Self {
        Self::with_player(Player::sample("Test Hero"), enemies, fleeable)
    }

    pub fn with_player(player: Player, enemies: Vec<Entity>, fleeable: bool) -> Self {
        let config = CombatConfig::instant().with_seed(7);
        Self::with_config(player, enemies, fleeable, config)
    }

    pub fn with_config(
        player: Player,
        enemies: Vec<Entity>,
        fleeable: bool,
        config: CombatConfig,
    ) -> Self {
        let step = config.text_delay.max(config.end_delay);
        let combat = Combat::from_entities(enemies, fleeable, &player.entity, config);
        Self {
            combat,
            player,
            clock: Instant::now(),
            step,
        }
    }

    pub fn now(&self) -> Instant {
        self.clock
    }

    /// Run one tick at the current virtual time.
    pub fn tick(&mut self) {
        self.combat.update_at(self.clock, &mut self.player);
    }

    /// Move the clock forward by `duration` and tick.
    pub fn advance(&mut self, duration: Duration) {
        self.clock += duration;
        self.tick();
    }

    /// Tick, letting every queued action expire, until the player can act.
    /// Returns false if the combat ended or `max_ticks` ran out first.
    pub fn run_until_player_turn(&mut self, max_ticks: usize) -> bool {
        for _ in 0..max_ticks {
            if self.combat.is_player_turn() && self.combat.is_idle() {
                return true;
            }
            if self.combat.is_over() {
                return false;
            }
            self.advance(self.step);
        }
        false
    }

    /// Tick until the combat has a result.
    pub fn run_until_finished(&mut self, max_ticks: usize) -> Option<CombatResult> {
        for _ in 0..max_ticks {
            if let Some(result) = self.combat.take_finished() {
                return Some(result);
            }
            self.advance(self.step);
        }
        self.combat.take_finished()
    }

    /// Id of the enemy at `index` in encounter order.
    pub fn enemy_id(&self, index: usize) -> Option<EntityId> {
        self.combat.enemies().get(index).map(|enemy| enemy.id)
    }
}
