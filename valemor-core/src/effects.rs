//! Status effects.
//!
//! An effect is plain data: a name, a duration in turns, two flags and a set
//! of optional hooks. Each hook is a tagged variant evaluated by the entity
//! at a fixed site (attacking, being attacked, taking damage, starting a
//! turn, dying, being applied). Templates live in an immutable registry and
//! are copied into an entity's effect list when applied.

use crate::dice::d20;
use crate::entity::DamageType;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Outcome of folding one hook over a running value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HookResult<T> {
    /// Keep going with this (possibly replaced) value.
    Continue(T),
    /// Stop the fold; the triggering event does not happen.
    Cancel,
}

/// Modifies an attack roll, either the attacker's own roll (on-attack) or a
/// roll made against the effect's owner (on-attacked).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RollHook {
    /// Roll another d20 with the attacker's modifier and keep the higher result.
    Advantage,
    /// Roll another d20 with the attacker's modifier and keep the lower result.
    Disadvantage,
    /// Flat bonus (or penalty) to the result.
    Bonus(i32),
    /// The attack does not happen.
    Cancel,
}

impl RollHook {
    pub fn apply<R: Rng + ?Sized>(
        &self,
        result: i32,
        attack_modifier: i32,
        rng: &mut R,
    ) -> HookResult<i32> {
        match self {
            RollHook::Advantage => {
                let reroll = d20(rng) + attack_modifier;
                tracing::debug!(result, reroll, "advantage reroll");
                HookResult::Continue(result.max(reroll))
            }
            RollHook::Disadvantage => {
                let reroll = d20(rng) + attack_modifier;
                tracing::debug!(result, reroll, "disadvantage reroll");
                HookResult::Continue(result.min(reroll))
            }
            RollHook::Bonus(bonus) => HookResult::Continue(result + bonus),
            RollHook::Cancel => HookResult::Cancel,
        }
    }
}

/// Modifies damage the effect's owner is about to take.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DamageHook {
    /// Multiply incoming damage.
    Scale(f64),
    /// Subtract a flat amount, never below zero.
    Absorb(f64),
    /// Ignore the damage entirely.
    Immune,
}

impl DamageHook {
    pub fn apply(&self, damage: f64) -> HookResult<f64> {
        match self {
            DamageHook::Scale(factor) => HookResult::Continue(damage * factor),
            DamageHook::Absorb(amount) => HookResult::Continue((damage - amount).max(0.0)),
            DamageHook::Immune => HookResult::Cancel,
        }
    }
}

/// Runs when the effect's owner starts a turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TurnHook {
    /// The owner loses this turn.
    SkipTurn,
    /// The owner takes damage without a source.
    Damage { amount: f64, damage_type: DamageType },
    /// The owner recovers health.
    Heal(i32),
}

/// Runs when the effect's owner would die.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathHook {
    /// The owner survives at 1 health; the effect is used up.
    Prevent,
}

/// Runs once when the effect is first applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyHook {
    /// Strip every negative effect from the owner.
    ClearNegativeEffects,
}

/// Identifier of an effect template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Aiming,
    Reckless,
    Stunned,
    Shielded,
    DeathWard,
    Burning,
    Blessed,
}

impl EffectKind {
    pub fn all() -> [EffectKind; 7] {
        [
            EffectKind::Aiming,
            EffectKind::Reckless,
            EffectKind::Stunned,
            EffectKind::Shielded,
            EffectKind::DeathWard,
            EffectKind::Burning,
            EffectKind::Blessed,
        ]
    }

    /// A fresh copy of this effect's template.
    pub fn template(&self) -> Effect {
        EFFECTS
            .get(self)
            .cloned()
            .unwrap_or_else(|| Effect::new(*self, "Unknown", "", true))
    }
}

/// An effect instance, as stored on an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub kind: EffectKind,
    pub name: String,
    pub description: String,
    /// Turns remaining.
    pub duration: i32,
    pub positive: bool,
    pub stackable: bool,
    pub on_apply: Option<ApplyHook>,
    pub on_attack: Option<RollHook>,
    pub on_attacked: Option<RollHook>,
    pub on_damaged: Option<DamageHook>,
    pub on_new_turn: Option<TurnHook>,
    pub on_die: Option<DeathHook>,
}

impl Effect {
    pub fn new(
        kind: EffectKind,
        name: impl Into<String>,
        description: impl Into<String>,
        positive: bool,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            duration: 1,
            positive,
            stackable: true,
            on_apply: None,
            on_attack: None,
            on_attacked: None,
            on_damaged: None,
            on_new_turn: None,
            on_die: None,
        }
    }

    pub fn non_stackable(mut self) -> Self {
        self.stackable = false;
        self
    }

    pub fn with_on_apply(mut self, hook: ApplyHook) -> Self {
        self.on_apply = Some(hook);
        self
    }

    pub fn with_on_attack(mut self, hook: RollHook) -> Self {
        self.on_attack = Some(hook);
        self
    }

    pub fn with_on_attacked(mut self, hook: RollHook) -> Self {
        self.on_attacked = Some(hook);
        self
    }

    pub fn with_on_damaged(mut self, hook: DamageHook) -> Self {
        self.on_damaged = Some(hook);
        self
    }

    pub fn with_on_new_turn(mut self, hook: TurnHook) -> Self {
        self.on_new_turn = Some(hook);
        self
    }

    pub fn with_on_die(mut self, hook: DeathHook) -> Self {
        self.on_die = Some(hook);
        self
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.duration)
    }
}

lazy_static::lazy_static! {
    /// Effect templates, keyed by kind. Never handed out by reference to an entity.
    static ref EFFECTS: HashMap<EffectKind, Effect> = {
        let mut effects = HashMap::new();
        effects.insert(
            EffectKind::Aiming,
            Effect::new(EffectKind::Aiming, "Aiming", "Attacks are rolled with advantage", true)
                .with_on_attack(RollHook::Advantage),
        );
        effects.insert(
            EffectKind::Reckless,
            Effect::new(
                EffectKind::Reckless,
                "Reckless",
                "Attacks with advantage, but attacks against you have advantage too",
                false,
            )
            .with_on_attack(RollHook::Advantage)
            .with_on_attacked(RollHook::Advantage),
        );
        effects.insert(
            EffectKind::Stunned,
            Effect::new(EffectKind::Stunned, "Stunned", "Loses the next turn", false)
                .non_stackable()
                .with_on_new_turn(TurnHook::SkipTurn),
        );
        effects.insert(
            EffectKind::Shielded,
            Effect::new(EffectKind::Shielded, "Shielded", "Incoming damage is halved", true)
                .with_on_damaged(DamageHook::Scale(0.5)),
        );
        effects.insert(
            EffectKind::DeathWard,
            Effect::new(EffectKind::DeathWard, "Death Ward", "Survives one killing blow", true)
                .non_stackable()
                .with_on_die(DeathHook::Prevent),
        );
        effects.insert(
            EffectKind::Burning,
            Effect::new(EffectKind::Burning, "Burning", "Takes fire damage every turn", false)
                .with_on_new_turn(TurnHook::Damage {
                    amount: 3.0,
                    damage_type: DamageType::Fire,
                }),
        );
        effects.insert(
            EffectKind::Blessed,
            Effect::new(EffectKind::Blessed, "Blessed", "Cleansed, and +2 to attack rolls", true)
                .non_stackable()
                .with_on_apply(ApplyHook::ClearNegativeEffects)
                .with_on_attack(RollHook::Bonus(2)),
        );
        effects
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_every_kind_has_a_template() {
        for kind in EffectKind::all() {
            let effect = kind.template();
            assert_eq!(effect.kind, kind);
            assert_ne!(effect.name, "Unknown");
        }
    }

    #[test]
    fn test_templates_are_copies() {
        let mut first = EffectKind::Aiming.template();
        first.duration = 99;
        assert_eq!(EffectKind::Aiming.template().duration, 1);
    }

    #[test]
    fn test_roll_hooks() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            match RollHook::Advantage.apply(12, 0, &mut rng) {
                HookResult::Continue(v) => assert!(v >= 12),
                HookResult::Cancel => panic!("advantage never cancels"),
            }
            match RollHook::Disadvantage.apply(12, 0, &mut rng) {
                HookResult::Continue(v) => assert!(v <= 12),
                HookResult::Cancel => panic!("disadvantage never cancels"),
            }
        }
        assert_eq!(RollHook::Bonus(2).apply(10, 0, &mut rng), HookResult::Continue(12));
        assert_eq!(RollHook::Cancel.apply(10, 0, &mut rng), HookResult::Cancel);
    }

    #[test]
    fn test_damage_hooks() {
        assert_eq!(DamageHook::Scale(0.5).apply(10.0), HookResult::Continue(5.0));
        assert_eq!(DamageHook::Absorb(4.0).apply(3.0), HookResult::Continue(0.0));
        assert_eq!(DamageHook::Immune.apply(3.0), HookResult::Cancel);
    }

    #[test]
    fn test_stunned_is_not_stackable() {
        assert!(!EffectKind::Stunned.template().stackable);
        assert!(EffectKind::Aiming.template().stackable);
    }
}
