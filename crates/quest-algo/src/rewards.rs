//! Reward Tables
//!
//! Skill names, mission categories and the fixed skill increments each
//! qualifying event grants.

use serde::{Deserialize, Serialize};

use crate::types::RewardDelta;

// ==================== Skills ====================

pub const LITERACY: &str = "문해력";
pub const NUMERACY: &str = "수리력";
pub const CREATIVITY: &str = "창의력";
pub const HEALTH: &str = "건강";
pub const SELF_DIRECTION: &str = "자기주도";
pub const RESPONSIBILITY: &str = "책임감";

/// Points the category skill receives when a mission is settled.
pub const CATEGORY_SKILL_POINTS: u64 = 5;
/// Responsibility points granted by every settled mission.
pub const MISSION_RESPONSIBILITY_POINTS: u64 = 2;

pub const ROUTINE_SELF_DIRECTION_POINTS: u64 = 3;
pub const ROUTINE_RESPONSIBILITY_POINTS: u64 = 2;

pub const JOURNAL_ENTRY_XP: u64 = 10;
pub const JOURNAL_LITERACY_POINTS: u64 = 1;

pub const QUIZ_XP_PER_CORRECT: u64 = 5;
pub const QUIZ_LITERACY_PER_CORRECT: u64 = 1;

// ==================== Mission Category ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionCategory {
    Reading,
    Writing,
    Math,
    ProblemSolving,
    Creativity,
    Exercise,
    LifeHabit,
}

impl MissionCategory {
    pub const ALL: [MissionCategory; 7] = [
        MissionCategory::Reading,
        MissionCategory::Writing,
        MissionCategory::Math,
        MissionCategory::ProblemSolving,
        MissionCategory::Creativity,
        MissionCategory::Exercise,
        MissionCategory::LifeHabit,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            MissionCategory::Reading => "READING",
            MissionCategory::Writing => "WRITING",
            MissionCategory::Math => "MATH",
            MissionCategory::ProblemSolving => "PROBLEM_SOLVING",
            MissionCategory::Creativity => "CREATIVITY",
            MissionCategory::Exercise => "EXERCISE",
            MissionCategory::LifeHabit => "LIFE_HABIT",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            MissionCategory::Reading => "독서",
            MissionCategory::Writing => "글쓰기",
            MissionCategory::Math => "수학",
            MissionCategory::ProblemSolving => "문제해결",
            MissionCategory::Creativity => "창의",
            MissionCategory::Exercise => "운동",
            MissionCategory::LifeHabit => "생활습관",
        }
    }

    /// Accepts the wire name or the Korean label; generated content uses either.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        let upper = trimmed.to_uppercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == upper || c.label() == trimmed)
    }

    /// Skill that grows when a mission of this category is settled.
    pub const fn skill(self) -> &'static str {
        match self {
            MissionCategory::Reading | MissionCategory::Writing => LITERACY,
            MissionCategory::Math | MissionCategory::ProblemSolving => NUMERACY,
            MissionCategory::Creativity => CREATIVITY,
            MissionCategory::Exercise => HEALTH,
            MissionCategory::LifeHabit => SELF_DIRECTION,
        }
    }

    /// Skill increments of a settled mission in this category.
    pub fn skill_delta(self) -> RewardDelta {
        RewardDelta::default()
            .with_skill(self.skill(), CATEGORY_SKILL_POINTS)
            .with_skill(RESPONSIBILITY, MISSION_RESPONSIBILITY_POINTS)
    }
}

// ==================== Fixed Rewards ====================

pub fn journal_entry_reward() -> RewardDelta {
    RewardDelta::default()
        .with_xp(JOURNAL_ENTRY_XP)
        .with_skill(LITERACY, JOURNAL_LITERACY_POINTS)
}

/// Reward for a graded quiz; empty when nothing was answered correctly.
pub fn quiz_reward(correct: usize) -> RewardDelta {
    let correct = correct as u64;
    if correct == 0 {
        return RewardDelta::default();
    }
    RewardDelta::default()
        .with_xp(correct.saturating_mul(QUIZ_XP_PER_CORRECT))
        .with_skill(LITERACY, correct.saturating_mul(QUIZ_LITERACY_PER_CORRECT))
}
