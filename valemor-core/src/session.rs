//! Game session management.
//!
//! A `GameSession` ties together the player, the current scene, the narrative
//! worker and any combat in progress. Everything runs on the caller's thread
//! except the agent itself; drive the session by calling
//! [`update`](GameSession::update) once per frame.

use crate::combat::{ActionError, ActionOutcome, Combat, CombatConfig, FleeOutcome};
use crate::entity::EntityId;
use crate::items::ItemKind;
use crate::narrative::{
    AgentSetup, CombatReport, NarrativeAgent, NarrativeError, NarrativeEvent, NarrativeStream,
};
use crate::player::Player;
use crate::skills::SkillKind;
use crate::tools::{ToolCall, ToolError, ToolOutput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::time::Instant;
use thiserror::Error;

/// Errors that can occur during a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Narrative error: {0}")]
    Narrative(#[from] NarrativeError),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Chat input is closed until the pending combat is confirmed or finished")]
    InputLocked,

    #[error("No combat is waiting for confirmation")]
    NoCombatPending,

    #[error("Not in combat")]
    NotInCombat,
}

/// The framing of an adventure: how the narrator behaves and how the story opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub system_prompt: String,
    pub opening: String,
}

impl Scenario {
    pub fn new(system_prompt: impl Into<String>, opening: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            opening: opening.into(),
        }
    }

    /// Rainy night at the gates of Valemor.
    pub fn valemor() -> Self {
        Self::new(
            "You are the game master of a dark fantasy tabletop RPG. Narrate in second \
             person, keep scenes short and let the player decide what to do. Use the \
             tools for every roll, reward, punishment, heal and rest. When a fight \
             breaks out, call initialize_combat and stop narrating until you receive \
             an event:combat_ended message, then describe the aftermath.",
            "A thin, steady rain turns the dirt road into dark mud. The smell of wet \
             wood and old smoke announces the small village ahead. You stand before \
             the gates of Valemor, a place known for two things: people vanish here, \
             and nobody asks questions. The chapel bell rings once. It is not a call \
             to prayer. In the middle of the square a stone well has been covered \
             with fresh planks, still damp. What do you do?",
        )
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::valemor()
    }
}

/// Configuration for creating a new game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name for the sample character, used when no player is given.
    pub player_name: String,

    /// A character made with the builder. Takes precedence over `player_name`.
    pub player: Option<Player>,

    pub scenario: Scenario,

    /// Timing for every combat started in this session.
    pub combat: CombatConfig,

    /// Seed for tool rolls and combat seeds.
    pub seed: Option<u64>,
}

impl SessionConfig {
    pub fn new(player_name: impl Into<String>) -> Self {
        Self {
            player_name: player_name.into(),
            player: None,
            scenario: Scenario::default(),
            combat: CombatConfig::default(),
            seed: None,
        }
    }

    pub fn with_player(mut self, player: Player) -> Self {
        self.player = Some(player);
        self
    }

    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = scenario;
        self
    }

    pub fn with_combat_config(mut self, combat: CombatConfig) -> Self {
        self.combat = combat;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Where the player currently is.
#[derive(Debug)]
pub enum Scene {
    /// Free conversation with the narrator.
    Exploration,
    /// A combat was set up by the narrator; the player has to enter it.
    AwaitingCombatConfirm(Box<Combat>),
    InCombat(Box<Combat>),
}

impl Scene {
    pub fn combat(&self) -> Option<&Combat> {
        match self {
            Scene::Exploration => None,
            Scene::AwaitingCombatConfirm(combat) | Scene::InCombat(combat) => Some(combat),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Narrator,
    Player,
    System,
}

/// One block of the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
}

/// A tool call made by the narrator and what it returned.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRecord {
    pub call: ToolCall,
    pub result: Result<String, ToolError>,
}

/// A running game.
pub struct GameSession {
    player: Player,
    scene: Scene,
    narrator: NarrativeStream,
    transcript: Vec<TranscriptEntry>,
    tool_log: Vec<ToolRecord>,
    /// Reports of finished combats the narrator has not accepted yet, oldest first.
    pending_reports: VecDeque<CombatReport>,
    combat_config: CombatConfig,
    rng: StdRng,
}

impl GameSession {
    /// Start a session. The agent is configured and moved to its worker thread.
    pub fn new<A: NarrativeAgent>(config: SessionConfig, mut agent: A) -> Result<Self, SessionError> {
        let player = config
            .player
            .unwrap_or_else(|| Player::sample(config.player_name));

        agent.configure(&AgentSetup {
            system_prompt: config.scenario.system_prompt.clone(),
            opening: config.scenario.opening.clone(),
            player_sheet: player.to_markdown(),
            tools: ToolCall::definitions(),
        });
        let narrator = NarrativeStream::spawn(agent)?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        tracing::info!(player = %player.name(), "session started");

        Ok(Self {
            player,
            scene: Scene::Exploration,
            narrator,
            transcript: vec![TranscriptEntry {
                speaker: Speaker::Narrator,
                text: config.scenario.opening,
            }],
            tool_log: Vec::new(),
            pending_reports: VecDeque::new(),
            combat_config: config.combat,
            rng,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The pending or running combat, if any.
    pub fn combat(&self) -> Option<&Combat> {
        self.scene.combat()
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn tool_log(&self) -> &[ToolRecord] {
        &self.tool_log
    }

    pub fn is_generating(&self) -> bool {
        self.narrator.is_generating()
    }

    /// The next report waiting for the narrator.
    pub fn pending_report(&self) -> Option<&CombatReport> {
        self.pending_reports.front()
    }

    pub fn pending_reports(&self) -> usize {
        self.pending_reports.len()
    }

    /// Nothing left to stream, resolve or report.
    pub fn is_idle(&self) -> bool {
        !self.narrator.is_generating()
            && self.pending_reports.is_empty()
            && !matches!(self.scene, Scene::InCombat(_))
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Handle a line typed by the player.
    ///
    /// Lines starting with `/` are local commands and never reach the narrator.
    pub fn submit_input(&mut self, text: &str) -> Result<(), SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        if let Some(command) = text.strip_prefix('/') {
            self.run_command(command);
            return Ok(());
        }
        if !matches!(self.scene, Scene::Exploration) {
            return Err(SessionError::InputLocked);
        }

        self.narrator.submit(text)?;
        self.push(Speaker::Player, text);
        self.push(Speaker::Narrator, "");
        Ok(())
    }

    fn run_command(&mut self, command: &str) {
        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let reply = match name {
            "player" => self.player.to_markdown(),
            "status" => match parts.next() {
                Some(field) => match self.player.status_field(field) {
                    Some(value) => format!("{field}={value}"),
                    None => format!("Unknown status field: {field}"),
                },
                None => "Usage: /status <field>".to_string(),
            },
            other => format!("Unknown command: {other}"),
        };
        self.push(Speaker::System, reply);
    }

    /// Enter the combat the narrator set up.
    pub fn confirm_combat(&mut self) -> Result<(), SessionError> {
        match std::mem::replace(&mut self.scene, Scene::Exploration) {
            Scene::AwaitingCombatConfirm(combat) => {
                self.scene = Scene::InCombat(combat);
                Ok(())
            }
            other => {
                self.scene = other;
                Err(SessionError::NoCombatPending)
            }
        }
    }

    // ========================================================================
    // Combat actions
    // ========================================================================

    fn running_combat(&mut self) -> Result<&mut Combat, SessionError> {
        match &mut self.scene {
            Scene::InCombat(combat) => Ok(combat),
            _ => Err(SessionError::NotInCombat),
        }
    }

    pub fn attack(&mut self, target: EntityId) -> Result<ActionOutcome, SessionError> {
        let Scene::InCombat(combat) = &mut self.scene else {
            return Err(SessionError::NotInCombat);
        };
        Ok(combat.player_attack(&self.player, target)?)
    }

    pub fn use_skill(
        &mut self,
        skill: SkillKind,
        target: Option<EntityId>,
    ) -> Result<ActionOutcome, SessionError> {
        let Scene::InCombat(combat) = &mut self.scene else {
            return Err(SessionError::NotInCombat);
        };
        Ok(combat.use_skill(&mut self.player, skill, target)?)
    }

    pub fn use_item(
        &mut self,
        item: ItemKind,
        target: Option<EntityId>,
    ) -> Result<ActionOutcome, SessionError> {
        let Scene::InCombat(combat) = &mut self.scene else {
            return Err(SessionError::NotInCombat);
        };
        Ok(combat.use_item(&mut self.player, item, target)?)
    }

    pub fn flee(&mut self) -> Result<FleeOutcome, SessionError> {
        Ok(self.running_combat()?.flee_player()?)
    }

    // ========================================================================
    // Tools
    // ========================================================================

    /// Execute a tool call against this session.
    pub fn apply_tool(&mut self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        if matches!(call, ToolCall::InitializeCombat(_))
            && !matches!(self.scene, Scene::Exploration)
        {
            return Err(ToolError::CombatInProgress);
        }

        let output = call.execute(&mut self.player, &mut self.rng)?;
        if let ToolOutput::StartCombat { enemies, fleeable } = &output {
            let mut config = self.combat_config.clone();
            if config.seed.is_some() {
                config.seed = Some(self.rng.gen());
            }
            let combat = Combat::new(enemies, *fleeable, &self.player.entity, config);
            self.scene = Scene::AwaitingCombatConfirm(Box::new(combat));
        }
        Ok(output)
    }

    // ========================================================================
    // Tick
    // ========================================================================

    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    /// Advance the session by one tick.
    pub fn update_at(&mut self, now: Instant) {
        if let Some(event) = self.narrator.poll() {
            self.handle_narrative(event);
        }

        if let Scene::InCombat(combat) = &mut self.scene {
            combat.update_at(now, &mut self.player);
            if let Some(result) = combat.take_finished() {
                tracing::info!(
                    victory = result.victory(),
                    fled = result.player_fled(),
                    "combat finished"
                );
                self.pending_reports.push_back(CombatReport::from(&result));
                self.scene = Scene::Exploration;
            }
        }

        self.deliver_report();
    }

    fn handle_narrative(&mut self, event: NarrativeEvent) {
        match event {
            NarrativeEvent::Token(token) => self.append_narration(&token),
            NarrativeEvent::ToolCall(call) => {
                let result = self
                    .apply_tool(&call)
                    .map(|output| output.content());
                if let Err(err) = &result {
                    tracing::warn!(tool = call.name(), error = %err, "tool call rejected");
                }
                self.tool_log.push(ToolRecord { call, result });
            }
            NarrativeEvent::Complete => {}
            NarrativeEvent::Failed(text) => self.append_narration(&text),
        }
    }

    /// Submit the combat report once the narrator is free.
    fn deliver_report(&mut self) {
        let Some(report) = self.pending_reports.front() else {
            return;
        };
        if self.narrator.is_generating() {
            return;
        }
        match self.narrator.submit(report.to_string()) {
            Ok(()) => {
                self.pending_reports.pop_front();
                self.push(Speaker::Narrator, "");
            }
            Err(NarrativeError::Busy) => {}
            Err(err) => {
                tracing::warn!(error = %err, "combat report dropped");
                self.pending_reports.pop_front();
                self.push(Speaker::System, format!("[Error: {err}]"));
            }
        }
    }

    fn append_narration(&mut self, text: &str) {
        match self.transcript.last_mut() {
            Some(entry) if entry.speaker == Speaker::Narrator => entry.text.push_str(text),
            _ => self.push(Speaker::Narrator, text),
        }
    }

    fn push(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.transcript.push(TranscriptEntry {
            speaker,
            text: text.into(),
        });
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("player", &self.player.name())
            .field("scene", &self.scene)
            .field("narrator", &self.narrator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedNarrator, ScriptedReply};
    use crate::tools::{InitializeCombat, RewardPlayer};
    use crate::EnemyKind;
    use std::time::Duration;

    fn session(narrator: ScriptedNarrator) -> GameSession {
        let config = SessionConfig::new("Thorin")
            .with_combat_config(CombatConfig::instant().with_seed(3))
            .with_seed(5);
        GameSession::new(config, narrator).unwrap()
    }

    fn settle(session: &mut GameSession) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while session.is_generating() && Instant::now() < deadline {
            session.update();
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_opening_is_first_entry() {
        let session = session(ScriptedNarrator::default());
        assert_eq!(session.transcript()[0].speaker, Speaker::Narrator);
        assert!(session.transcript()[0].text.contains("Valemor"));
    }

    #[test]
    fn test_slash_commands_stay_local() {
        let mut session = session(ScriptedNarrator::default());
        session.submit_input("/status gold").unwrap();
        session.submit_input("/status luck").unwrap();
        session.submit_input("/dance").unwrap();
        session.submit_input("/player").unwrap();

        let system: Vec<_> = session
            .transcript()
            .iter()
            .filter(|entry| entry.speaker == Speaker::System)
            .map(|entry| entry.text.as_str())
            .collect();
        assert_eq!(system[0], "gold=0");
        assert_eq!(system[1], "Unknown status field: luck");
        assert_eq!(system[2], "Unknown command: dance");
        assert!(system[3].starts_with("# Player Character: Thorin"));
        assert!(!session.is_generating());
    }

    #[test]
    fn test_reply_streams_into_transcript() {
        let narrator = ScriptedNarrator::new(vec![ScriptedReply::text("The well creaks.")]);
        let mut session = session(narrator);
        session.submit_input("I open the well").unwrap();
        assert!(matches!(
            session.submit_input("again"),
            Err(SessionError::Narrative(NarrativeError::Busy))
        ));
        settle(&mut session);

        let last = session.transcript().last().unwrap();
        assert_eq!(last.speaker, Speaker::Narrator);
        assert_eq!(last.text, "The well creaks.");
    }

    #[test]
    fn test_tool_calls_run_on_session() {
        let narrator = ScriptedNarrator::new(vec![ScriptedReply::text("Take this.")
            .with_tool_call(ToolCall::RewardPlayer(RewardPlayer { gold: 12, xp: 0 }))]);
        let mut session = session(narrator);
        session.submit_input("I help the old man").unwrap();
        settle(&mut session);

        assert_eq!(session.player().gold, 12);
        assert_eq!(session.tool_log().len(), 1);
        assert!(session.tool_log()[0].result.is_ok());
    }

    #[test]
    fn test_combat_needs_confirmation_and_locks_input() {
        let mut session = session(ScriptedNarrator::default());
        assert!(matches!(session.confirm_combat(), Err(SessionError::NoCombatPending)));

        let call = ToolCall::InitializeCombat(InitializeCombat {
            enemies: vec![EnemyKind::Skeleton],
            fleeable: true,
        });
        session.apply_tool(&call).unwrap();
        assert!(matches!(session.scene(), Scene::AwaitingCombatConfirm(_)));
        assert!(matches!(session.submit_input("hello"), Err(SessionError::InputLocked)));
        assert_eq!(session.apply_tool(&call), Err(ToolError::CombatInProgress));

        session.confirm_combat().unwrap();
        assert!(matches!(session.scene(), Scene::InCombat(_)));
        assert!(session.combat().is_some());
    }

    #[test]
    fn test_actions_outside_combat_fail() {
        let mut session = session(ScriptedNarrator::default());
        assert!(matches!(session.flee(), Err(SessionError::NotInCombat)));
        assert!(matches!(
            session.use_item(ItemKind::SmallHealingPotion, None),
            Err(SessionError::NotInCombat)
        ));
    }
}
