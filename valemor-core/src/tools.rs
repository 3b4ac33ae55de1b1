//! Tools the narrative agent can call.
//!
//! Each tool is a plain input struct deriving [`Tool`](valemor_macros::Tool),
//! which supplies its name, description and JSON schema. Incoming calls are
//! parsed into the [`ToolCall`] enum and executed against the player on the
//! foreground thread.

use crate::attributes::Attribute;
use crate::dice::{roll_d20, D20Outcome, RollType};
use crate::entity::DamageType;
use crate::monsters::EnemyKind;
use crate::player::Player;
use crate::Tool;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// What the agent sees for each tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// JSON schema for a domain type used as a tool field.
pub trait ToolSchema {
    fn schema() -> Value;
}

fn string_enum<I, T>(values: I) -> Value
where
    I: IntoIterator<Item = T>,
    T: Serialize,
{
    let values: Vec<Value> = values
        .into_iter()
        .filter_map(|value| serde_json::to_value(value).ok())
        .collect();
    json!({"type": "string", "enum": values})
}

impl ToolSchema for EnemyKind {
    fn schema() -> Value {
        string_enum(EnemyKind::all())
    }
}

impl ToolSchema for RollType {
    fn schema() -> Value {
        string_enum([RollType::Normal, RollType::Advantage, RollType::Disadvantage])
    }
}

impl ToolSchema for Attribute {
    fn schema() -> Value {
        string_enum(Attribute::all())
    }
}

// ============================================================================
// Tool inputs
// ============================================================================

/// Start a combat against the given enemies. The player is asked to confirm before it begins.
#[derive(Tool, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeCombat {
    /// Enemies taking part, one entry per creature
    pub enemies: Vec<EnemyKind>,
    /// Whether the player may run away
    #[serde(default = "default_fleeable")]
    #[tool(optional)]
    pub fleeable: bool,
}

fn default_fleeable() -> bool {
    true
}

/// Roll a D20
#[derive(Tool, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollD20 {
    /// Flat modifier added to the die
    #[serde(default)]
    pub modifier: i32,
    /// normal, advantage or disadvantage
    #[serde(default)]
    pub roll_type: RollType,
}

/// Roll a pure attribute test for the player
#[derive(Tool, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAttributeTest {
    /// Attribute whose modifier is added to the roll
    pub character_attribute: Attribute,
    #[serde(default)]
    pub roll_type: RollType,
}

/// Reward the player with gold or xp (or both). POSITIVE VALUES ONLY
#[derive(Tool, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPlayer {
    #[serde(default)]
    pub gold: i64,
    #[serde(default)]
    pub xp: i64,
}

/// Punish the player with gold loss or damage. POSITIVE VALUES ONLY
#[derive(Tool, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunishPlayer {
    /// Amount of gold to lose
    #[serde(default)]
    pub gold_loss: i64,
    /// Amount of damage, reduced by armor
    #[serde(default)]
    pub damage: i64,
}

/// Heal the player. POSITIVE VALUE ONLY
#[derive(Tool, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealPlayer {
    /// Cure amount
    pub heal: i64,
}

/// Run this tool every time the player takes a long rest
#[derive(Tool, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRest {}

// ============================================================================
// Calls and results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid input for {tool}: {reason}")]
    InvalidInput { tool: String, reason: String },

    #[error("{tool}: positive values only!")]
    NegativeValue { tool: &'static str },

    #[error("initialize_combat needs at least one enemy")]
    NoEnemies,

    #[error("A combat is already pending or in progress")]
    CombatInProgress,
}

/// A parsed tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "input", rename_all = "snake_case")]
pub enum ToolCall {
    InitializeCombat(InitializeCombat),
    RollD20(RollD20),
    PlayerAttributeTest(PlayerAttributeTest),
    RewardPlayer(RewardPlayer),
    PunishPlayer(PunishPlayer),
    HealPlayer(HealPlayer),
    PlayerRest(PlayerRest),
}

/// What executing a tool produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// The session should stage this combat and ask the player to confirm.
    StartCombat {
        enemies: Vec<EnemyKind>,
        fleeable: bool,
    },
    Roll(D20Outcome),
    /// The player sheet after the change.
    PlayerUpdated(String),
    Rested,
}

impl ToolOutput {
    /// Content reported back for this call.
    pub fn content(&self) -> String {
        match self {
            ToolOutput::StartCombat { .. } => "event:combat_started".to_string(),
            ToolOutput::Roll(outcome) => json!(outcome).to_string(),
            ToolOutput::PlayerUpdated(sheet) => json!({ "updated_player": sheet }).to_string(),
            ToolOutput::Rested => "The player is fully rested.".to_string(),
        }
    }
}

impl ToolCall {
    /// Every tool definition, in the order they are offered to the agent.
    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            PlayerAttributeTest::as_tool(),
            RollD20::as_tool(),
            InitializeCombat::as_tool(),
            RewardPlayer::as_tool(),
            PunishPlayer::as_tool(),
            HealPlayer::as_tool(),
            PlayerRest::as_tool(),
        ]
    }

    /// Parse a call from its tool name and JSON input.
    pub fn parse(name: &str, input: Value) -> Result<Self, ToolError> {
        if !Self::definitions().iter().any(|tool| tool.name == name) {
            return Err(ToolError::UnknownTool(name.to_string()));
        }
        // A bare null means "no arguments".
        let input = if input.is_null() { json!({}) } else { input };
        serde_json::from_value(json!({ "name": name, "input": input })).map_err(|err| {
            ToolError::InvalidInput {
                tool: name.to_string(),
                reason: err.to_string(),
            }
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::InitializeCombat(_) => InitializeCombat::tool_name(),
            ToolCall::RollD20(_) => RollD20::tool_name(),
            ToolCall::PlayerAttributeTest(_) => PlayerAttributeTest::tool_name(),
            ToolCall::RewardPlayer(_) => RewardPlayer::tool_name(),
            ToolCall::PunishPlayer(_) => PunishPlayer::tool_name(),
            ToolCall::HealPlayer(_) => HealPlayer::tool_name(),
            ToolCall::PlayerRest(_) => PlayerRest::tool_name(),
        }
    }

    /// Run the call against the player.
    ///
    /// Validation happens before any mutation, so an error leaves the player
    /// untouched. `initialize_combat` only describes the combat; building it
    /// is up to the caller.
    pub fn execute<R: Rng + ?Sized>(
        &self,
        player: &mut Player,
        rng: &mut R,
    ) -> Result<ToolOutput, ToolError> {
        tracing::debug!(tool = self.name(), "executing tool call");
        match self {
            ToolCall::InitializeCombat(input) => {
                if input.enemies.is_empty() {
                    return Err(ToolError::NoEnemies);
                }
                Ok(ToolOutput::StartCombat {
                    enemies: input.enemies.clone(),
                    fleeable: input.fleeable,
                })
            }
            ToolCall::RollD20(input) => {
                tracing::debug!(modifier = input.modifier, "rolling d20 for agent");
                Ok(ToolOutput::Roll(roll_d20(input.modifier, input.roll_type, rng)))
            }
            ToolCall::PlayerAttributeTest(input) => {
                Ok(ToolOutput::Roll(player.entity.attribute_test(
                    input.character_attribute,
                    input.roll_type,
                    rng,
                )))
            }
            ToolCall::RewardPlayer(input) => {
                let gold = non_negative(input.gold, "reward_player")?;
                let xp = non_negative(input.xp, "reward_player")?;
                player.give_gold(gold);
                player.give_xp(xp);
                Ok(ToolOutput::PlayerUpdated(player.to_markdown()))
            }
            ToolCall::PunishPlayer(input) => {
                let gold_loss = non_negative(input.gold_loss, "punish_player")?;
                let damage = non_negative(input.damage, "punish_player")?;
                player.take_gold(gold_loss);
                if damage > 0 {
                    let reduced = player.entity.calculate_damage(damage as f64);
                    player
                        .entity
                        .apply_damage(None, reduced, DamageType::True, rng);
                }
                Ok(ToolOutput::PlayerUpdated(player.to_markdown()))
            }
            ToolCall::HealPlayer(input) => {
                let heal = non_negative(input.heal, "heal_player")?;
                player.entity.heal(i32::try_from(heal).unwrap_or(i32::MAX));
                Ok(ToolOutput::PlayerUpdated(player.to_markdown()))
            }
            ToolCall::PlayerRest(_) => {
                player.rest();
                Ok(ToolOutput::Rested)
            }
        }
    }
}

fn non_negative(value: i64, tool: &'static str) -> Result<u32, ToolError> {
    if value < 0 {
        return Err(ToolError::NegativeValue { tool });
    }
    Ok(u32::try_from(value).unwrap_or(u32::MAX))
}
