//! Repeated headless combats with a summary at the end.

use crate::{Pilot, SkirmishArgs};
use anyhow::Result;
use valemor_core::{Autopilot, CombatConfig, HeadlessCombat, HeadlessConfig, Player};

impl From<Pilot> for Autopilot {
    fn from(pilot: Pilot) -> Self {
        match pilot {
            Pilot::Attack => Autopilot::Attack,
            Pilot::Healer => Autopilot::CautiousHealer { heal_below: 0.4 },
            Pilot::Coward => Autopilot::Coward,
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    victories: usize,
    defeats: usize,
    escapes: usize,
    kills: u32,
    enemies_fled: usize,
}

pub fn run(player: Player, args: &SkirmishArgs, seed: Option<u64>) -> Result<()> {
    let enemies: Vec<String> = args.enemies.iter().map(|kind| kind.to_string()).collect();
    println!("=== Valemor Skirmish ===");
    println!(
        "{} ({} {}) vs {}",
        player.name(),
        player.race,
        player.class,
        enemies.join(", ")
    );
    println!();

    let mut tally = Tally::default();
    for run in 0..args.runs {
        let mut combat = CombatConfig::instant();
        if let Some(seed) = seed {
            combat = combat.with_seed(seed.wrapping_add(run as u64));
        }
        let config = HeadlessConfig::new()
            .with_autopilot(args.autopilot.into())
            .with_combat_config(combat);

        let mut headless = HeadlessCombat::new(player.clone(), &args.enemies, !args.no_flee, config);
        let result = headless.run()?;

        if args.verbose {
            for line in headless.combat().log() {
                println!("  {line}");
            }
        }

        let outcome = if result.victory() {
            tally.victories += 1;
            "victory"
        } else if result.player_fled() {
            tally.escapes += 1;
            "fled"
        } else {
            tally.defeats += 1;
            "defeat"
        };
        tally.kills += result.kills();
        tally.enemies_fled += result.enemies_fled().len();

        let hero = headless.player();
        println!(
            "Run {:>3}: {:<8} HP {:>6.1}/{:<4} kills {} ({} ticks)",
            run + 1,
            outcome,
            hero.entity.health.max(0.0),
            hero.entity.max_health,
            result.kills(),
            headless.ticks()
        );
    }

    println!();
    println!(
        "Victories: {}  Defeats: {}  Escapes: {}  Kills: {}  Enemies fled: {}",
        tally.victories, tally.defeats, tally.escapes, tally.kills, tally.enemies_fled
    );
    Ok(())
}
