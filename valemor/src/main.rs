//! Valemor command-line runner.
//!
//! Plays combats and short scripted sessions without a UI:
//!
//! ```bash
//! cargo run -p valemor -- skirmish --enemies skeleton,goblin --runs 20 --autopilot healer
//! cargo run -p valemor -- story --name Mira
//! ```
//!
//! Every flag can also come from a `VALEMOR_*` environment variable or a
//! `.env` file.

mod character;
mod skirmish;
mod story;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use valemor_core::{CharacterClass, EnemyKind, Race};

#[derive(Debug, Parser)]
#[command(name = "valemor", version, about = "Headless runner for the Valemor RPG")]
struct Cli {
    #[command(flatten)]
    hero: HeroArgs,

    /// Seed for reproducible runs
    #[arg(long, global = true, env = "VALEMOR_SEED")]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct HeroArgs {
    /// Character name
    #[arg(long, global = true, env = "VALEMOR_NAME", default_value = "Thorin")]
    name: String,

    /// Roll a fresh character of this class instead of the sample warrior
    #[arg(long, global = true, env = "VALEMOR_CLASS", value_parser = parse_class)]
    class: Option<CharacterClass>,

    #[arg(long, global = true, env = "VALEMOR_RACE", value_parser = parse_race, default_value = "human")]
    race: Race,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fight the same encounter several times and summarize the outcomes
    Skirmish(SkirmishArgs),
    /// Play a short scripted adventure through a full game session
    Story,
}

#[derive(Debug, Args)]
struct SkirmishArgs {
    /// Comma-separated enemy list
    #[arg(
        long,
        env = "VALEMOR_ENEMIES",
        value_delimiter = ',',
        value_parser = parse_enemy,
        default_value = "skeleton"
    )]
    enemies: Vec<EnemyKind>,

    /// Number of combats to play
    #[arg(long, env = "VALEMOR_RUNS", default_value_t = 1)]
    runs: usize,

    #[arg(long, env = "VALEMOR_AUTOPILOT", value_enum, default_value_t = Pilot::Attack)]
    autopilot: Pilot,

    /// Forbid running away
    #[arg(long)]
    no_flee: bool,

    /// Print the combat log of every run
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Pilot {
    Attack,
    Healer,
    Coward,
}

fn parse_class(value: &str) -> Result<CharacterClass, String> {
    CharacterClass::all()
        .into_iter()
        .find(|class| class.name().eq_ignore_ascii_case(value))
        .ok_or_else(|| format!("unknown class '{value}'"))
}

fn parse_race(value: &str) -> Result<Race, String> {
    Race::all()
        .into_iter()
        .find(|race| race.name().eq_ignore_ascii_case(value))
        .ok_or_else(|| format!("unknown race '{value}'"))
}

fn parse_enemy(value: &str) -> Result<EnemyKind, String> {
    EnemyKind::all()
        .into_iter()
        .find(|kind| kind.id().eq_ignore_ascii_case(value.trim()))
        .ok_or_else(|| format!("unknown enemy '{value}'"))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "valemor=info,valemor_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let player = character::create(&cli.hero, cli.seed)?;

    match cli.command {
        Command::Skirmish(args) => skirmish::run(player, &args, cli.seed),
        Command::Story => story::run(player, cli.seed),
    }
}
