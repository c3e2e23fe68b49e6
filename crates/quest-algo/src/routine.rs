//! Routine Check-ins
//!
//! Completion is tracked per calendar date key (`YYYY-MM-DD`), so a weekly
//! routine keeps separate history for every week.

use std::collections::BTreeMap;

use crate::rewards::{
    RESPONSIBILITY, ROUTINE_RESPONSIBILITY_POINTS, ROUTINE_SELF_DIRECTION_POINTS, SELF_DIRECTION,
};
use crate::types::RewardDelta;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The date went from not done to done.
    Granted,
    NoReward,
}

impl ToggleOutcome {
    pub fn is_granted(self) -> bool {
        matches!(self, ToggleOutcome::Granted)
    }
}

/// Records `done` for `date` and reports whether the once-per-day reward is due.
pub fn toggle_completion(
    completions: &mut BTreeMap<String, bool>,
    date: &str,
    done: bool,
) -> ToggleOutcome {
    let was_done = completions.get(date).copied().unwrap_or(false);
    completions.insert(date.to_string(), done);

    if done && !was_done {
        ToggleOutcome::Granted
    } else {
        ToggleOutcome::NoReward
    }
}

pub fn routine_reward() -> RewardDelta {
    RewardDelta::default()
        .with_skill(SELF_DIRECTION, ROUTINE_SELF_DIRECTION_POINTS)
        .with_skill(RESPONSIBILITY, ROUTINE_RESPONSIBILITY_POINTS)
}
