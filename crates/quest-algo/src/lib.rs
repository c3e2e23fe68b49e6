//! # quest-algo - progression rules for the quest dashboard
//!
//! Pure Rust, I/O-free rules shared by the backend:
//!
//! - **Progression** - XP / gold accumulation and the `level * 100` leveling curve
//! - **Rewards** - skill names, mission categories and fixed reward tables
//! - **Mission state** - explicit mission lifecycle with a single transition function
//! - **Routine check-ins** - per-date completion toggles with once-per-day rewards
//!
//! ## Module structure
//!
//! - [`types`] - profile snapshot, roles and reward deltas
//! - [`progression`] - `apply_reward` and level helpers
//! - [`rewards`] - skill constants, [`MissionCategory`] and reward tables
//! - [`mission`] - [`MissionState`] transitions and settlement decisions
//! - [`routine`] - completion toggles keyed by calendar date
//!
//! ## Example
//!
//! ```rust
//! use quest_algo::{apply_reward, Profile, RewardDelta, Role};
//!
//! let profile = Profile::new("s-1", Role::Student, "민지");
//! let delta = RewardDelta::default().with_xp(10).with_gold(5).with_skill("문해력", 5);
//! let next = apply_reward(&profile, &delta, 0);
//! assert_eq!(next.xp, 10);
//! assert_eq!(next.level, 1);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod mission;
pub mod progression;
pub mod rewards;
pub mod routine;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use progression::{apply_reward, level_for_xp, level_progress, level_threshold, LevelProgress};

pub use rewards::MissionCategory;

pub use mission::{settlement_delta, MissionEvent, MissionState, SettlementDecision, TransitionError};

pub use routine::{routine_reward, toggle_completion, ToggleOutcome};
