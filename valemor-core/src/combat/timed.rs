//! Delayed narration and state changes.

use crate::combat::Combatant;
use crate::entity::DamageType;
use std::time::{Duration, Instant};

/// A state change carried by a timed action, applied when the action's timer
/// runs out.
#[derive(Debug, Clone, PartialEq)]
pub enum DeferredEffect {
    Damage {
        target: Combatant,
        source: Option<Combatant>,
        /// Already reduced by the target's armor.
        amount: f64,
        damage_type: DamageType,
    },
    /// End the combat.
    Finish { victory: bool },
}

/// One queued unit of narration, optionally carrying a state change.
///
/// The timer starts when the action reaches the front of the queue, not when
/// it is queued.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedAction {
    pub text: Option<String>,
    pub delay: Duration,
    pub effect: Option<DeferredEffect>,
    started_at: Option<Instant>,
}

impl TimedAction {
    pub fn text(text: impl Into<String>, delay: Duration) -> Self {
        Self {
            text: Some(text.into()),
            delay,
            effect: None,
            started_at: None,
        }
    }

    pub fn with_effect(mut self, effect: DeferredEffect) -> Self {
        self.effect = Some(effect);
        self
    }

    pub fn start(&mut self, now: Instant) {
        self.started_at = Some(now);
    }

    /// True once `delay` has elapsed since `start`. Never true before starting.
    pub fn is_ready(&self, now: Instant) -> bool {
        match self.started_at {
            Some(started) => now.saturating_duration_since(started) >= self.delay,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_before_start() {
        let action = TimedAction::text("hello", Duration::ZERO);
        assert!(!action.is_ready(Instant::now()));
    }

    #[test]
    fn test_ready_after_delay() {
        let now = Instant::now();
        let mut action = TimedAction::text("hello", Duration::from_secs(3));
        action.start(now);
        assert!(!action.is_ready(now + Duration::from_millis(2999)));
        assert!(action.is_ready(now + Duration::from_secs(3)));
    }

    #[test]
    fn test_clock_going_backwards_is_not_ready() {
        let now = Instant::now() + Duration::from_secs(10);
        let mut action = TimedAction::text("hello", Duration::from_secs(1));
        action.start(now);
        assert!(!action.is_ready(now - Duration::from_secs(5)));
    }
}
