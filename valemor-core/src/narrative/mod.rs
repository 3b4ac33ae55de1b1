//! The bridge between the game and the narrative agent.
//!
//! The agent runs on a background worker thread and streams its reply back as
//! tokens and tool calls. The foreground drains at most one message per tick,
//! so game state never leaves the thread that owns it.

mod report;
mod worker;

pub use report::CombatReport;
pub use worker::{NarrativeStream, WorkerRequest, WorkerResponse};

use crate::tools::{ToolCall, ToolDefinition};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarrativeError {
    #[error("The narrator is still generating a reply")]
    Busy,

    #[error("The narrative worker has stopped")]
    Disconnected,

    #[error("Failed to start the narrative worker: {0}")]
    Spawn(String),

    #[error("Agent error: {0}")]
    Agent(String),
}

/// Something the agent emits while answering.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Token(String),
    ToolCall(ToolCall),
}

/// Everything an agent needs before the first message.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSetup {
    pub system_prompt: String,
    /// Opening narration already shown to the player.
    pub opening: String,
    /// Player sheet in markdown, seeded into the conversation history.
    pub player_sheet: String,
    pub tools: Vec<ToolDefinition>,
}

/// A conversational agent that narrates the game.
///
/// Implementations keep their own conversation memory. `respond` is called on
/// the worker thread, once per submitted message, and may block.
pub trait NarrativeAgent: Send + 'static {
    /// Called once, before the agent moves to the worker thread.
    fn configure(&mut self, _setup: &AgentSetup) {}

    /// Answer one message, streaming tokens and tool calls through `emit`.
    fn respond(
        &mut self,
        input: &str,
        emit: &mut dyn FnMut(AgentEvent),
    ) -> Result<(), NarrativeError>;
}

impl<A: NarrativeAgent + ?Sized> NarrativeAgent for Box<A> {
    fn configure(&mut self, setup: &AgentSetup) {
        (**self).configure(setup);
    }

    fn respond(
        &mut self,
        input: &str,
        emit: &mut dyn FnMut(AgentEvent),
    ) -> Result<(), NarrativeError> {
        (**self).respond(input, emit)
    }
}

/// What the foreground sees after draining one worker message.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrativeEvent {
    Token(String),
    ToolCall(ToolCall),
    /// The reply finished normally.
    Complete,
    /// The reply failed. Carries the in-band text shown to the player.
    Failed(String),
}

impl NarrativeEvent {
    /// True for the last event of a reply.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NarrativeEvent::Complete | NarrativeEvent::Failed(_))
    }
}
