//! A short scripted adventure played through a full game session.
//!
//! The narrator is scripted, but everything else is live: tool calls,
//! combat confirmation, the fight itself and the combat report.

use anyhow::{Context, Result};
use std::thread;
use std::time::{Duration, Instant};
use valemor_core::session::Speaker;
use valemor_core::tools::{InitializeCombat, RewardPlayer};
use valemor_core::{
    Autopilot, CombatConfig, Decision, EnemyKind, GameSession, Player, Scene, ScriptedNarrator,
    ScriptedReply, SessionConfig, ToolCall,
};

const PATIENCE: Duration = Duration::from_secs(10);

fn script() -> Vec<ScriptedReply> {
    vec![
        ScriptedReply::text(
            "You lift the first plank. Cold air rises from the well, and with it the \
             clatter of bones. A skeleton hauls itself over the rim.",
        )
        .with_tool_call(ToolCall::InitializeCombat(InitializeCombat {
            enemies: vec![EnemyKind::Skeleton],
            fleeable: true,
        })),
        ScriptedReply::text(
            "The bones settle into the mud. Among them lies a purse stamped with \
             the chapel's seal.",
        )
        .with_tool_call(ToolCall::RewardPlayer(RewardPlayer { gold: 15, xp: 120 })),
    ]
}

pub fn run(player: Player, seed: Option<u64>) -> Result<()> {
    let mut config = SessionConfig::new(player.name())
        .with_player(player)
        .with_combat_config(CombatConfig::new().with_text_delay(Duration::from_millis(150)));
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    let mut session = GameSession::new(config, ScriptedNarrator::new(script()))?;
    let mut printed = 0;

    session.submit_input("/status health")?;
    session.submit_input("I pry the planks off the well")?;

    let deadline = Instant::now() + PATIENCE * 6;
    let mut seen_log = 0;
    while Instant::now() < deadline {
        session.update_at(Instant::now());

        if matches!(session.scene(), Scene::AwaitingCombatConfirm(_)) && !session.is_generating() {
            println!("\n[Enter combat]");
            session.confirm_combat()?;
        }

        if let Some(combat) = session.combat() {
            for line in &combat.log()[seen_log..] {
                println!("  * {line}");
            }
            seen_log = combat.log().len();

            if combat.is_player_turn() && combat.is_idle() {
                let decision = Autopilot::CautiousHealer { heal_below: 0.4 }
                    .decide(combat, session.player())
                    .context("no target left")?;
                play(&mut session, decision)?;
            }
        } else {
            seen_log = 0;
        }

        printed = print_finished(&session, printed);
        if session.is_idle() && session.tool_log().len() >= 2 {
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    print_finished(&session, printed);

    println!();
    println!("{}", session.player().to_markdown());
    Ok(())
}

fn play(session: &mut GameSession, decision: Decision) -> Result<()> {
    match decision {
        Decision::Attack(target) => {
            session.attack(target)?;
        }
        Decision::Skill(skill, target) => {
            session.use_skill(skill, target)?;
        }
        Decision::Item(item) => {
            session.use_item(item, None)?;
        }
        Decision::Flee => {
            session.flee()?;
        }
    }
    Ok(())
}

/// Print transcript entries that can no longer change. Returns how many are out.
fn print_finished(session: &GameSession, printed: usize) -> usize {
    let transcript = session.transcript();
    // The last narrator entry may still be streaming.
    let settled = if session.is_generating() {
        transcript.len().saturating_sub(1)
    } else {
        transcript.len()
    };
    for entry in transcript.iter().take(settled).skip(printed) {
        let speaker = match entry.speaker {
            Speaker::Narrator => "Narrator",
            Speaker::Player => session.player().name(),
            Speaker::System => "System",
        };
        println!("\n{speaker}:\n{}", entry.text);
    }
    settled.max(printed)
}
