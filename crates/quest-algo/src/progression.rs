//! Progression Engine
//!
//! Applies a [`RewardDelta`] to a [`Profile`] snapshot.
//!
//! Rules:
//! - XP and gold accumulate (saturating, never decrease)
//! - Level starts from the stored level and rises while `xp >= level * 100`
//! - Skill increments add to the existing score; untouched skills keep theirs

use serde::{Deserialize, Serialize};

use crate::types::{Profile, RewardDelta, MIN_LEVEL, XP_PER_LEVEL};

/// XP needed to leave `level`.
pub fn level_threshold(level: u32) -> u64 {
    u64::from(level).saturating_mul(XP_PER_LEVEL)
}

/// Level reached from `current` after holding `xp` experience points.
///
/// Closed form of "increment while `xp >= level * 100`": the loop stops at
/// `xp / 100 + 1` unless the stored level is already higher.
pub fn level_for_xp(current: u32, xp: u64) -> u32 {
    let current = current.max(MIN_LEVEL);
    let reached = (xp / XP_PER_LEVEL).saturating_add(1);
    let reached = u32::try_from(reached).unwrap_or(u32::MAX);
    current.max(reached)
}

/// Returns the profile after applying `delta`, stamped with `now_ms`.
///
/// Only `xp`, `gold`, `level`, `skills` and `updated_at` change.
pub fn apply_reward(profile: &Profile, delta: &RewardDelta, now_ms: i64) -> Profile {
    let mut next = profile.clone();

    next.xp = profile.xp.saturating_add(delta.xp.unwrap_or(0));
    next.gold = profile.gold.saturating_add(delta.gold.unwrap_or(0));
    next.level = level_for_xp(profile.level, next.xp);

    for (skill, increment) in &delta.skills {
        let score = next.skills.entry(skill.clone()).or_insert(0);
        *score = score.saturating_add(*increment);
    }

    next.updated_at = now_ms;
    next
}

/// Dashboard view of how far a profile is into its current level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub level: u32,
    /// XP earned since the previous threshold.
    pub xp_into_level: u64,
    /// XP still missing to reach the next level.
    pub xp_to_next_level: u64,
    /// Total XP at which the next level is reached.
    pub next_threshold: u64,
}

pub fn level_progress(profile: &Profile) -> LevelProgress {
    let level = level_for_xp(profile.level, profile.xp);
    let previous = level_threshold(level.saturating_sub(1));
    let next_threshold = level_threshold(level);

    LevelProgress {
        level,
        xp_into_level: profile.xp.saturating_sub(previous),
        xp_to_next_level: next_threshold.saturating_sub(profile.xp),
        next_threshold,
    }
}
