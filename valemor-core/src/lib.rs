//! Valemor game core: a turn-based combat engine with an LLM narrative bridge.
//!
//! This crate provides:
//! - D20-style attribute, dice and attack arithmetic
//! - Status effects with tagged hook variants and turn-based decay
//! - A tick-driven combat state machine with a timed narration queue
//! - Skill and item resolvers validated at the call boundary
//! - The tool-call contract and streaming worker used by the narrative agent
//!
//! # Quick Start
//!
//! ```ignore
//! use std::time::Instant;
//! use valemor_core::{GameSession, SessionConfig, ScriptedNarrator};
//!
//! let config = SessionConfig::new("Thorin");
//! let mut session = GameSession::new(config, ScriptedNarrator::default())?;
//!
//! session.submit_input("I walk to the well")?;
//! loop {
//!     session.update_at(Instant::now());
//!     // render session.transcript(), session.combat(), ...
//! }
//! ```

// The derive macro names items through `::valemor_core`, including from inside this crate.
extern crate self as valemor_core;

pub mod attributes;
pub mod character_builder;
pub mod combat;
pub mod dice;
pub mod effects;
pub mod entity;
pub mod headless;
pub mod items;
pub mod monsters;
pub mod narrative;
pub mod player;
pub mod session;
pub mod skills;
pub mod testing;
pub mod tools;

// Re-export for convenience
pub use valemor_macros::Tool;

// Primary public API
pub use attributes::{modifier, Attribute, AttributeScores, Expertise};
pub use character_builder::{BuildError, CharacterBuilder};
pub use combat::{
    ActionError, ActionOutcome, Combat, CombatConfig, CombatResult, Combatant, FleeOutcome,
};
pub use dice::{D20Outcome, RollType};
pub use effects::{Effect, EffectKind};
pub use entity::{AttackMode, AttackOutcome, DamageType, Entity, EntityId};
pub use headless::{Autopilot, Decision, HeadlessCombat, HeadlessConfig, HeadlessError};
pub use items::ItemKind;
pub use monsters::EnemyKind;
pub use narrative::{
    AgentEvent, AgentSetup, CombatReport, NarrativeAgent, NarrativeError, NarrativeEvent,
    NarrativeStream,
};
pub use player::{CharacterClass, Player, Race};
pub use session::{GameSession, Scenario, Scene, SessionConfig, SessionError, Speaker};
pub use skills::SkillKind;
pub use testing::{CombatHarness, ScriptedNarrator, ScriptedReply};
pub use tools::{ToolCall, ToolError, ToolOutput};
