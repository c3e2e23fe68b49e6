//! Common Types and Constants
//!
//! Profile snapshots and reward deltas shared by every rule module.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// XP required per level step; leaving level `L` needs `L * XP_PER_LEVEL` XP.
pub const XP_PER_LEVEL: u64 = 100;

/// Lowest level a profile can hold.
pub const MIN_LEVEL: u32 = 1;

// ==================== Profile ====================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Teacher,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "student" => Some(Self::Student),
            "teacher" => Some(Self::Teacher),
            _ => None,
        }
    }
}

/// Profile snapshot as stored in both the private copy and the public mirror.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub gold: u64,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub skills: BTreeMap<String, u64>,
    #[serde(default)]
    pub is_deleted: bool,
    /// Epoch milliseconds of the last write.
    #[serde(default)]
    pub updated_at: i64,
}

fn default_level() -> u32 {
    MIN_LEVEL
}

impl Profile {
    pub fn new(id: impl Into<String>, role: Role, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            display_name: display_name.into(),
            xp: 0,
            gold: 0,
            level: MIN_LEVEL,
            skills: BTreeMap::new(),
            is_deleted: false,
            updated_at: 0,
        }
    }

    pub fn skill(&self, name: &str) -> u64 {
        self.skills.get(name).copied().unwrap_or(0)
    }
}

// ==================== Reward Delta ====================

/// Increment applied to a profile. Absent fields mean "no change".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gold: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub skills: BTreeMap<String, u64>,
}

impl RewardDelta {
    pub fn with_xp(mut self, xp: u64) -> Self {
        self.xp = Some(self.xp.unwrap_or(0).saturating_add(xp));
        self
    }

    pub fn with_gold(mut self, gold: u64) -> Self {
        self.gold = Some(self.gold.unwrap_or(0).saturating_add(gold));
        self
    }

    /// Adds `points` to `skill`, summing with any increment already present.
    pub fn with_skill(mut self, skill: impl Into<String>, points: u64) -> Self {
        let entry = self.skills.entry(skill.into()).or_insert(0);
        *entry = entry.saturating_add(points);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.xp.unwrap_or(0) == 0
            && self.gold.unwrap_or(0) == 0
            && self.skills.values().all(|v| *v == 0)
    }
}
