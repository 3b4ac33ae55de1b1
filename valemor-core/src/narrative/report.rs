//! Combat results as the narrative agent reads them.

use crate::combat::CombatResult;
use crate::monsters::EnemyKind;
use std::fmt;

/// The message submitted to the agent when a combat ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombatReport {
    pub victory: bool,
    pub player_fled: bool,
    pub enemies_fled: Vec<EnemyKind>,
    pub kills: u32,
    pub enemies: Vec<EnemyKind>,
}

impl From<&CombatResult> for CombatReport {
    fn from(result: &CombatResult) -> Self {
        Self {
            victory: result.victory(),
            player_fled: result.player_fled(),
            enemies_fled: result.enemies_fled().to_vec(),
            kills: result.kills(),
            enemies: result.enemies().to_vec(),
        }
    }
}

fn list(kinds: &[EnemyKind]) -> String {
    if kinds.is_empty() {
        return "none".to_string();
    }
    kinds
        .iter()
        .map(|kind| kind.id())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for CombatReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "event:combat_ended")?;
        writeln!(f, "Victory:{}", self.victory)?;
        writeln!(f, "Player Fled:{}", self.player_fled)?;
        writeln!(f, "Enemies Fled:{}", list(&self.enemies_fled))?;
        writeln!(f, "Player Kills:{}", self.kills)?;
        write!(f, "Total Enemies:{}", list(&self.enemies))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_format() {
        let report = CombatReport {
            victory: true,
            player_fled: false,
            enemies_fled: vec![EnemyKind::Goblin],
            kills: 1,
            enemies: vec![EnemyKind::Skeleton, EnemyKind::Goblin],
        };
        assert_eq!(
            report.to_string(),
            "event:combat_ended\n\
             Victory:true\n\
             Player Fled:false\n\
             Enemies Fled:goblin\n\
             Player Kills:1\n\
             Total Enemies:skeleton, goblin"
        );
    }

    #[test]
    fn test_no_fled_enemies_reads_none() {
        let report = CombatReport {
            victory: false,
            player_fled: true,
            enemies_fled: vec![],
            kills: 0,
            enemies: vec![EnemyKind::Wolf],
        };
        assert!(report.to_string().contains("Enemies Fled:none\n"));
    }
}
