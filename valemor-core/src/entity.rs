//! Combat participants.
//!
//! `Entity` holds the stats shared by the player and every monster. What
//! differs between them is expressed by composition: a [`Role`] tag, a
//! [`TurnBehavior`] deciding what a monster does on its turn, and a
//! [`DeathBehavior`] deciding what happens when health drops to zero.

use crate::attributes::{modifier, Attribute, AttributeScores};
use crate::combat::Combatant;
use crate::dice::{d20, roll_d20, D20Outcome, RollType};
use crate::effects::{ApplyHook, DeathHook, EffectKind, Effect, HookResult, TurnHook};
use crate::monsters::EnemyKind;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Stable identifier used by UI events to name a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Fire,
    Cold,
    Electric,
    Poison,
    Corrosive,
    Slashing,
    Bludgeoning,
    Piercing,
    Magical,
    Psychic,
    Sacred,
    Profane,
    True,
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DamageType::Fire => "fire",
            DamageType::Cold => "cold",
            DamageType::Electric => "electric",
            DamageType::Poison => "poison",
            DamageType::Corrosive => "corrosive",
            DamageType::Slashing => "slashing",
            DamageType::Bludgeoning => "bludgeoning",
            DamageType::Piercing => "piercing",
            DamageType::Magical => "magical",
            DamageType::Psychic => "psychic",
            DamageType::Sacred => "sacred",
            DamageType::Profane => "profane",
            DamageType::True => "true",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Humanoid,
    Undead,
    Beast,
}

/// Who this entity is in the fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player,
    Monster(EnemyKind),
}

/// What a monster does when its turn comes up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TurnBehavior {
    /// Never acts.
    Passive,
    /// Attacks the player every turn.
    Aggressive,
    /// Attacks until its health fraction drops below `flee_below`, then runs.
    Skittish { flee_below: f64 },
}

/// What happens when health reaches zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeathBehavior {
    /// Dies.
    Mortal,
    /// Rolls `d20 + CON` against `dc + damage` to get back up at 1 health,
    /// at most `max_revivals` times.
    Undead {
        dc: i32,
        max_revivals: u32,
        revivals: u32,
    },
}

impl DeathBehavior {
    pub fn undead(dc: i32) -> Self {
        DeathBehavior::Undead {
            dc,
            max_revivals: 1,
            revivals: 0,
        }
    }
}

/// How an attack is made.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttackMode {
    /// DEX to hit, `base_damage + STR` on a hit.
    Melee,
    /// INT to hit, `damage + INT` on a hit.
    Spell { damage: i32, damage_type: DamageType },
}

impl AttackMode {
    pub fn damage_type(&self, melee: DamageType) -> DamageType {
        match self {
            AttackMode::Melee => melee,
            AttackMode::Spell { damage_type, .. } => *damage_type,
        }
    }
}

/// Result of an attack roll. Damage is already reduced by the defender's armor
/// but has not been applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackOutcome {
    pub passed: bool,
    pub result: i32,
    pub damage: f64,
    pub critical: bool,
}

impl AttackOutcome {
    fn cancelled() -> Self {
        Self {
            passed: false,
            result: 0,
            damage: 0.0,
            critical: false,
        }
    }
}

/// What `die` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathOutcome {
    AlreadyDead,
    Died,
    /// An effect kept the entity standing at 1 health.
    Prevented,
    /// The undead check succeeded.
    Revived,
}

/// Summary of one `apply_damage` call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DamageReport {
    pub applied: f64,
    pub cancelled: bool,
    pub killed: bool,
    pub revived: bool,
    pub death_prevented: bool,
}

/// Summary of effect decay at the start of a turn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TurnStart {
    pub skipped: bool,
    pub damage_taken: f64,
    pub healed: i32,
    pub expired: Vec<String>,
}

/// A combat participant.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    /// Current health. Goes negative on overkill.
    pub health: f64,
    pub max_health: i32,
    pub armor: f64,
    /// Attack results at or above this hit.
    pub dodge: i32,
    pub base_damage: i32,
    pub crit_multiplier: i32,
    pub attributes: AttributeScores,
    /// Active effects in application order.
    pub effects: Vec<Effect>,
    pub damage_multipliers: HashMap<DamageType, f64>,
    /// Damage type of melee attacks.
    pub damage_type: DamageType,
    pub category: Category,
    pub role: Role,
    pub behavior: TurnBehavior,
    pub death: DeathBehavior,
    dead: bool,
    /// Left the fight (enemies only).
    pub fled: bool,
}

impl Entity {
    pub fn new(name: impl Into<String>, max_health: i32) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            health: max_health as f64,
            max_health,
            armor: 0.0,
            dodge: 10,
            base_damage: 1,
            crit_multiplier: 2,
            attributes: AttributeScores::default(),
            effects: Vec::new(),
            damage_multipliers: HashMap::new(),
            damage_type: DamageType::Bludgeoning,
            category: Category::Humanoid,
            role: Role::Player,
            behavior: TurnBehavior::Aggressive,
            death: DeathBehavior::Mortal,
            dead: false,
            fled: false,
        }
    }

    pub fn with_armor(mut self, armor: f64) -> Self {
        self.armor = armor;
        self
    }

    pub fn with_dodge(mut self, dodge: i32) -> Self {
        self.dodge = dodge;
        self
    }

    pub fn with_base_damage(mut self, base_damage: i32) -> Self {
        self.base_damage = base_damage;
        self
    }

    pub fn with_attributes(mut self, attributes: AttributeScores) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_damage_type(mut self, damage_type: DamageType) -> Self {
        self.damage_type = damage_type;
        self
    }

    pub fn with_multiplier(mut self, damage_type: DamageType, multiplier: f64) -> Self {
        self.damage_multipliers.insert(damage_type, multiplier);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_behavior(mut self, behavior: TurnBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_death(mut self, death: DeathBehavior) -> Self {
        self.death = death;
        self
    }

    pub fn dead(&self) -> bool {
        self.dead
    }

    /// Still in the fight: alive and not fled.
    pub fn is_active(&self) -> bool {
        !self.dead && !self.fled
    }

    pub fn health_fraction(&self) -> f64 {
        if self.max_health <= 0 {
            return 0.0;
        }
        self.health / self.max_health as f64
    }

    pub fn has_effect(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|effect| effect.kind == kind)
    }

    pub fn damage_multiplier(&self, damage_type: DamageType) -> f64 {
        self.damage_multipliers
            .get(&damage_type)
            .copied()
            .unwrap_or(1.0)
    }

    // ========================================================================
    // Rolls
    // ========================================================================

    pub fn attack_modifier(&self, mode: &AttackMode) -> i32 {
        match mode {
            AttackMode::Melee => self.attributes.modifier(Attribute::Dexterity),
            AttackMode::Spell { .. } => self.attributes.modifier(Attribute::Intelligence),
        }
    }

    pub fn initiative<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        d20(rng) + modifier(self.dodge)
    }

    pub fn attribute_test<R: Rng + ?Sized>(
        &self,
        attribute: Attribute,
        roll_type: RollType,
        rng: &mut R,
    ) -> D20Outcome {
        roll_d20(self.attributes.modifier(attribute), roll_type, rng)
    }

    // ========================================================================
    // Attacks
    // ========================================================================

    pub fn attack<R: Rng + ?Sized>(
        &self,
        defender: &Entity,
        mode: AttackMode,
        rng: &mut R,
    ) -> AttackOutcome {
        let roll = d20(rng);
        self.attack_with_roll(defender, mode, roll, rng)
    }

    /// Resolve an attack from a d20 already rolled.
    ///
    /// The attacker's on-attack hooks and then the defender's on-attacked hooks
    /// are folded over `roll + modifier`. A natural result of exactly 20 hits
    /// regardless of dodge and multiplies damage.
    pub fn attack_with_roll<R: Rng + ?Sized>(
        &self,
        defender: &Entity,
        mode: AttackMode,
        roll: i32,
        rng: &mut R,
    ) -> AttackOutcome {
        let attack_modifier = self.attack_modifier(&mode);
        let mut result = roll + attack_modifier;

        for effect in &self.effects {
            let Some(hook) = effect.on_attack else {
                continue;
            };
            match hook.apply(result, attack_modifier, rng) {
                HookResult::Continue(value) => result = value,
                HookResult::Cancel => {
                    tracing::debug!(attacker = %self.name, effect = %effect.name, "attack cancelled");
                    return AttackOutcome::cancelled();
                }
            }
        }

        let passed = hits(result, defender.dodge);
        tracing::debug!(attacker = %self.name, result, passed, "attack rolled");

        for effect in &defender.effects {
            let Some(hook) = effect.on_attacked else {
                continue;
            };
            match hook.apply(result, attack_modifier, rng) {
                HookResult::Continue(value) => result = value,
                HookResult::Cancel => return AttackOutcome::cancelled(),
            }
        }

        let passed = hits(result, defender.dodge);
        if !passed {
            return AttackOutcome {
                passed,
                result,
                damage: 0.0,
                critical: false,
            };
        }

        let critical = result == 20;
        let base = match mode {
            AttackMode::Melee => {
                self.base_damage + self.attributes.modifier(Attribute::Strength)
            }
            AttackMode::Spell { damage, .. } => {
                damage + self.attributes.modifier(Attribute::Intelligence)
            }
        };
        let multiplier = if critical { self.crit_multiplier } else { 1 };
        let damage = defender.calculate_damage((base.max(0) * multiplier) as f64);

        AttackOutcome {
            passed,
            result,
            damage,
            critical,
        }
    }

    /// Armor reduction with diminishing returns. Not rounded.
    pub fn calculate_damage(&self, raw: f64) -> f64 {
        raw * 100.0 / (100.0 + self.armor)
    }

    // ========================================================================
    // Damage, death and healing
    // ========================================================================

    /// Apply damage to this entity.
    ///
    /// On-damaged hooks only run when there is a `source`; damage over time
    /// and other sourceless damage bypasses them.
    pub fn apply_damage<R: Rng + ?Sized>(
        &mut self,
        source: Option<Combatant>,
        raw: f64,
        damage_type: DamageType,
        rng: &mut R,
    ) -> DamageReport {
        let mut damage = raw * self.damage_multiplier(damage_type);

        if source.is_some() {
            for effect in &self.effects {
                let Some(hook) = effect.on_damaged else {
                    continue;
                };
                match hook.apply(damage) {
                    HookResult::Continue(value) => damage = value,
                    HookResult::Cancel => {
                        return DamageReport {
                            cancelled: true,
                            ..DamageReport::default()
                        }
                    }
                }
            }
        }

        self.health -= damage;
        tracing::debug!(entity = %self.name, damage, health = self.health, %damage_type, "damage applied");

        let mut report = DamageReport {
            applied: damage,
            ..DamageReport::default()
        };
        if self.health <= 0.0 {
            match self.die(damage, rng) {
                DeathOutcome::Died => report.killed = true,
                DeathOutcome::Revived => report.revived = true,
                DeathOutcome::Prevented => report.death_prevented = true,
                DeathOutcome::AlreadyDead => {}
            }
        }
        report
    }

    /// Kill this entity, unless an effect or its death behavior intervenes.
    ///
    /// Death is monotonic: calling this on a dead entity does nothing.
    pub fn die<R: Rng + ?Sized>(&mut self, damage: f64, rng: &mut R) -> DeathOutcome {
        if self.dead {
            return DeathOutcome::AlreadyDead;
        }

        if let Some(index) = self
            .effects
            .iter()
            .position(|effect| effect.on_die == Some(DeathHook::Prevent))
        {
            let ward = self.effects.remove(index);
            self.health = 1.0;
            tracing::debug!(entity = %self.name, effect = %ward.name, "death prevented");
            return DeathOutcome::Prevented;
        }

        let constitution = self.attributes.modifier(Attribute::Constitution);
        if let DeathBehavior::Undead {
            dc,
            max_revivals,
            revivals,
        } = &mut self.death
        {
            if *revivals < *max_revivals {
                let roll = d20(rng) + constitution;
                let needed = *dc as f64 + damage;
                tracing::debug!(roll, needed, "undead revival check");
                if roll as f64 >= needed {
                    *revivals += 1;
                    self.health = 1.0;
                    self.apply_effect(EffectKind::Stunned, 1);
                    return DeathOutcome::Revived;
                }
            }
        }

        self.dead = true;
        DeathOutcome::Died
    }

    /// Restore health, never above `max_health`.
    pub fn heal(&mut self, amount: i32) {
        self.health = (self.health + amount as f64).min(self.max_health as f64);
    }

    // ========================================================================
    // Effects
    // ========================================================================

    /// Apply an effect from the registry.
    ///
    /// Stackable effects already present gain `duration`; non-stackable ones
    /// are rejected and left untouched.
    pub fn apply_effect(&mut self, kind: EffectKind, duration: i32) -> bool {
        let mut effect = kind.template();

        if let Some(existing) = self.effects.iter_mut().find(|e| e.name == effect.name) {
            if existing.stackable {
                existing.duration += duration;
                return true;
            }
            return false;
        }

        effect.duration = duration;
        let on_apply = effect.on_apply;
        self.effects.push(effect);

        if let Some(ApplyHook::ClearNegativeEffects) = on_apply {
            self.clear_negative_effects();
        }
        true
    }

    pub fn clear_negative_effects(&mut self) {
        self.effects.retain(|effect| effect.positive);
    }

    /// Tick effects at the start of this entity's turn.
    ///
    /// Every duration drops by one before its on-new-turn hook is consulted;
    /// effects at zero are removed afterwards.
    pub fn start_turn<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TurnStart {
        let mut report = TurnStart::default();

        let mut hooks = Vec::new();
        for effect in &mut self.effects {
            effect.duration -= 1;
            if let Some(hook) = effect.on_new_turn {
                hooks.push(hook);
            }
        }

        for hook in hooks {
            match hook {
                TurnHook::SkipTurn => report.skipped = true,
                TurnHook::Damage {
                    amount,
                    damage_type,
                } => {
                    let damage = self.apply_damage(None, amount, damage_type, rng);
                    report.damage_taken += damage.applied;
                }
                TurnHook::Heal(amount) => {
                    self.heal(amount);
                    report.healed += amount;
                }
            }
        }

        report.expired = self
            .effects
            .iter()
            .filter(|effect| effect.duration <= 0)
            .map(|effect| effect.name.clone())
            .collect();
        self.effects.retain(|effect| effect.duration > 0);

        if self.dead {
            report.skipped = true;
        }
        report
    }
}

fn hits(result: i32, dodge: i32) -> bool {
    result >= dodge || result == 20
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{DamageHook, RollHook};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    fn dummy(health: i32) -> Entity {
        Entity::new("Dummy", health)
    }

    #[test]
    fn test_calculate_damage_halves_at_100_armor() {
        let target = dummy(10).with_armor(100.0);
        assert_eq!(target.calculate_damage(100.0), 50.0);
        assert_eq!(dummy(10).calculate_damage(7.0), 7.0);
    }

    #[test]
    fn test_overkill_goes_negative_and_kills() {
        let mut target = dummy(10);
        let report = target.apply_damage(Some(Combatant::Player), 15.0, DamageType::Slashing, &mut rng());
        assert_eq!(target.health, -5.0);
        assert!(target.dead());
        assert!(report.killed);
    }

    #[test]
    fn test_die_is_monotonic() {
        let mut target = dummy(10);
        assert_eq!(target.die(1.0, &mut rng()), DeathOutcome::Died);
        assert_eq!(target.die(1.0, &mut rng()), DeathOutcome::AlreadyDead);
        assert!(target.dead());
        target.heal(5);
        assert!(target.dead());
    }

    #[test]
    fn test_natural_twenty_always_hits() {
        let attacker = dummy(10);
        for dodge in 0..=100 {
            let defender = dummy(10).with_dodge(dodge);
            let outcome = attacker.attack_with_roll(&defender, AttackMode::Melee, 20, &mut rng());
            assert!(outcome.passed, "dodge {dodge}");
            assert!(outcome.critical);
        }
    }

    #[test]
    fn test_miss_deals_no_damage() {
        let attacker = dummy(10);
        let defender = dummy(10).with_dodge(15);
        let outcome = attacker.attack_with_roll(&defender, AttackMode::Melee, 5, &mut rng());
        assert!(!outcome.passed);
        assert_eq!(outcome.damage, 0.0);
    }

    #[test]
    fn test_critical_doubles_damage() {
        let attacker = dummy(10).with_base_damage(5);
        let defender = dummy(10).with_dodge(10);
        let hit = attacker.attack_with_roll(&defender, AttackMode::Melee, 12, &mut rng());
        let crit = attacker.attack_with_roll(&defender, AttackMode::Melee, 20, &mut rng());
        assert_eq!(hit.damage, 5.0);
        assert_eq!(crit.damage, 10.0);
    }

    #[test]
    fn test_spell_damage_uses_intelligence() {
        let attacker = dummy(10).with_attributes(AttributeScores::from_pairs([(
            Attribute::Intelligence,
            14,
        )]));
        let defender = dummy(10).with_dodge(5);
        let mode = AttackMode::Spell {
            damage: 8,
            damage_type: DamageType::Fire,
        };
        let outcome = attacker.attack_with_roll(&defender, mode, 10, &mut rng());
        assert_eq!(outcome.result, 12);
        assert_eq!(outcome.damage, 10.0);
    }

    #[test]
    fn test_reckless_defender_gives_advantage() {
        let attacker = dummy(10);
        let mut defender = dummy(10).with_dodge(30);
        defender.apply_effect(EffectKind::Reckless, 1);
        let mut rng = rng();
        for roll in 1..=19 {
            let outcome = attacker.attack_with_roll(&defender, AttackMode::Melee, roll, &mut rng);
            assert!(outcome.result >= roll);
        }
    }

    #[test]
    fn test_cancelled_attack_is_a_harmless_miss() {
        let mut attacker = dummy(10).with_base_damage(50);
        attacker.effects.push(
            Effect::new(EffectKind::Stunned, "Frozen Arm", "Cannot swing", false)
                .with_on_attack(RollHook::Cancel),
        );
        let defender = dummy(10).with_dodge(0);
        let outcome = attacker.attack_with_roll(&defender, AttackMode::Melee, 20, &mut rng());
        assert_eq!(
            outcome,
            AttackOutcome {
                passed: false,
                result: 0,
                damage: 0.0,
                critical: false,
            }
        );
    }

    #[test]
    fn test_defender_penalty_turns_hit_into_miss() {
        let attacker = dummy(10).with_base_damage(5);
        let mut defender = dummy(10).with_dodge(10);
        defender.effects.push(
            Effect::new(EffectKind::Shielded, "Fog", "Hard to see", true)
                .with_on_attacked(RollHook::Bonus(-5)),
        );
        // 13 beats dodge 10 before the defender's hooks run.
        let outcome = attacker.attack_with_roll(&defender, AttackMode::Melee, 13, &mut rng());
        assert!(!outcome.passed);
        assert_eq!(outcome.result, 8);
        assert_eq!(outcome.damage, 0.0);
    }

    #[test]
    fn test_immune_target_takes_nothing() {
        let mut target = dummy(10);
        target.effects.push(
            Effect::new(EffectKind::Shielded, "Stone Skin", "Ignores blows", true)
                .with_on_damaged(DamageHook::Immune),
        );
        let report = target.apply_damage(Some(Combatant::Player), 25.0, DamageType::Slashing, &mut rng());
        assert!(report.cancelled);
        assert_eq!(report.applied, 0.0);
        assert_eq!(target.health, 10.0);
        assert!(!target.dead());
    }

    #[test]
    fn test_absorb_never_heals() {
        let mut target = dummy(10);
        target.effects.push(
            Effect::new(EffectKind::Shielded, "Ward", "Soaks 3 damage", true)
                .with_on_damaged(DamageHook::Absorb(3.0)),
        );
        let mut rng = rng();
        let report = target.apply_damage(Some(Combatant::Player), 5.0, DamageType::Slashing, &mut rng);
        assert_eq!(report.applied, 2.0);
        let report = target.apply_damage(Some(Combatant::Player), 1.0, DamageType::Slashing, &mut rng);
        assert_eq!(report.applied, 0.0);
        assert_eq!(target.health, 8.0);
    }

    #[test]
    fn test_weak_hit_deals_no_damage() {
        let attacker = dummy(10)
            .with_base_damage(1)
            .with_attributes(AttributeScores::from_pairs([(Attribute::Strength, 2)]));
        let mut defender = dummy(10).with_dodge(5);
        let outcome = attacker.attack_with_roll(&defender, AttackMode::Melee, 15, &mut rng());
        assert!(outcome.passed);
        assert_eq!(outcome.damage, 0.0);
        defender.apply_damage(Some(Combatant::Player), outcome.damage, DamageType::Slashing, &mut rng());
        assert_eq!(defender.health, 10.0);
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut target = dummy(20);
        target.health = 5.0;
        for amount in [0, 3, 15, 100] {
            let before = target.health;
            target.heal(amount);
            assert_eq!(target.health, (before + amount as f64).min(20.0));
        }
        assert_eq!(target.health, 20.0);
    }

    #[test]
    fn test_stackable_effect_accumulates() {
        let mut target = dummy(10);
        assert!(target.apply_effect(EffectKind::Aiming, 1));
        assert!(target.apply_effect(EffectKind::Aiming, 1));
        assert_eq!(target.effects.len(), 1);
        assert_eq!(target.effects[0].duration, 2);
    }

    #[test]
    fn test_non_stackable_effect_rejected() {
        let mut target = dummy(10);
        assert!(target.apply_effect(EffectKind::Stunned, 1));
        assert!(!target.apply_effect(EffectKind::Stunned, 3));
        assert_eq!(target.effects.len(), 1);
        assert_eq!(target.effects[0].duration, 1);
    }

    #[test]
    fn test_shield_only_applies_with_source() {
        let mut target = dummy(20);
        target.apply_effect(EffectKind::Shielded, 3);
        let report = target.apply_damage(Some(Combatant::Enemy(0)), 10.0, DamageType::Piercing, &mut rng());
        assert_eq!(report.applied, 5.0);
        let report = target.apply_damage(None, 10.0, DamageType::Fire, &mut rng());
        assert_eq!(report.applied, 10.0);
    }

    #[test]
    fn test_damage_multiplier() {
        let mut target = dummy(20).with_multiplier(DamageType::Sacred, 2.0);
        target.apply_damage(None, 4.0, DamageType::Sacred, &mut rng());
        assert_eq!(target.health, 12.0);
    }

    #[test]
    fn test_death_ward_prevents_one_death() {
        let mut target = dummy(10);
        target.apply_effect(EffectKind::DeathWard, 10);
        let report = target.apply_damage(Some(Combatant::Player), 50.0, DamageType::Slashing, &mut rng());
        assert!(report.death_prevented);
        assert!(!target.dead());
        assert_eq!(target.health, 1.0);
        assert!(!target.has_effect(EffectKind::DeathWard));

        target.apply_damage(Some(Combatant::Player), 50.0, DamageType::Slashing, &mut rng());
        assert!(target.dead());
    }

    #[test]
    fn test_undead_revival_is_capped() {
        // DC -100 always succeeds; the cap still ends it.
        let mut target = dummy(10).with_death(DeathBehavior::Undead {
            dc: -100,
            max_revivals: 1,
            revivals: 0,
        });
        let mut rng = rng();
        let first = target.apply_damage(Some(Combatant::Player), 12.0, DamageType::Slashing, &mut rng);
        assert!(first.revived);
        assert_eq!(target.health, 1.0);
        assert!(target.has_effect(EffectKind::Stunned));

        let second = target.apply_damage(Some(Combatant::Player), 12.0, DamageType::Slashing, &mut rng);
        assert!(second.killed);
        assert!(target.dead());
    }

    #[test]
    fn test_start_turn_decays_and_removes() {
        let mut target = dummy(10);
        target.apply_effect(EffectKind::Aiming, 2);
        target.apply_effect(EffectKind::Stunned, 1);

        let first = target.start_turn(&mut rng());
        assert!(first.skipped);
        assert_eq!(first.expired, vec!["Stunned".to_string()]);
        assert!(target.has_effect(EffectKind::Aiming));

        let second = target.start_turn(&mut rng());
        assert!(!second.skipped);
        assert!(target.effects.is_empty());
    }

    #[test]
    fn test_burning_ticks_without_source() {
        let mut target = dummy(10);
        target.apply_effect(EffectKind::Shielded, 5);
        target.apply_effect(EffectKind::Burning, 1);
        let report = target.start_turn(&mut rng());
        assert_eq!(report.damage_taken, 3.0);
        assert_eq!(target.health, 7.0);
    }

    #[test]
    fn test_blessing_clears_negative_effects() {
        let mut target = dummy(10);
        target.apply_effect(EffectKind::Burning, 3);
        target.apply_effect(EffectKind::Blessed, 2);
        assert!(!target.has_effect(EffectKind::Burning));
        assert!(target.has_effect(EffectKind::Blessed));
    }
}
