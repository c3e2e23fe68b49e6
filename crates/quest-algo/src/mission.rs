//! Mission Lifecycle
//!
//! `CREATED -> (PENDING_APPROVAL) -> COMPLETED -> REWARDED`; `REWARDED` is terminal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rewards::MissionCategory;
use crate::types::RewardDelta;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionState {
    #[default]
    Created,
    PendingApproval,
    Completed,
    Rewarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionEvent {
    /// Student asks the teacher to confirm completion.
    Submit,
    /// Completion without an approval step.
    Complete,
    Approve,
    Reject,
    /// Undo a completion that has not been settled yet.
    Reopen,
    Settle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("invalid mission transition {event:?} from {from:?}")]
    InvalidTransition { from: MissionState, event: MissionEvent },
}

impl MissionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            MissionState::Created => "CREATED",
            MissionState::PendingApproval => "PENDING_APPROVAL",
            MissionState::Completed => "COMPLETED",
            MissionState::Rewarded => "REWARDED",
        }
    }

    /// Rebuilds the state from the boolean flags older documents carry.
    pub fn from_flags(is_completed: bool, is_pending_approval: bool, is_rewarded: bool) -> Self {
        match (is_completed, is_pending_approval, is_rewarded) {
            (true, _, true) => MissionState::Rewarded,
            (true, _, false) => MissionState::Completed,
            (false, true, _) => MissionState::PendingApproval,
            _ => MissionState::Created,
        }
    }

    pub const fn is_completed(self) -> bool {
        matches!(self, MissionState::Completed | MissionState::Rewarded)
    }

    pub const fn is_pending_approval(self) -> bool {
        matches!(self, MissionState::PendingApproval)
    }

    pub const fn is_rewarded(self) -> bool {
        matches!(self, MissionState::Rewarded)
    }

    /// Not yet completed; these are replaced when a new set is generated.
    pub const fn is_open(self) -> bool {
        matches!(self, MissionState::Created | MissionState::PendingApproval)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, MissionState::Rewarded)
    }

    pub fn next(self, event: MissionEvent) -> Option<MissionState> {
        use MissionEvent as E;
        use MissionState as S;

        match (self, event) {
            (S::Created, E::Submit) => Some(S::PendingApproval),
            (S::Created, E::Complete) => Some(S::Completed),
            (S::PendingApproval, E::Approve) => Some(S::Completed),
            (S::PendingApproval, E::Reject) => Some(S::Created),
            (S::Completed, E::Reopen) => Some(S::Created),
            (S::Completed, E::Settle) => Some(S::Rewarded),
            _ => None,
        }
    }

    pub fn apply(self, event: MissionEvent) -> Result<MissionState, TransitionError> {
        self.next(event)
            .ok_or(TransitionError::InvalidTransition { from: self, event })
    }
}

// ==================== Settlement ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementDecision {
    /// Completed and unpaid: apply the reward, then mark rewarded.
    Apply,
    AlreadyRewarded,
    NotCompleted,
}

impl SettlementDecision {
    pub fn evaluate(state: MissionState) -> Self {
        match state {
            MissionState::Completed => SettlementDecision::Apply,
            MissionState::Rewarded => SettlementDecision::AlreadyRewarded,
            MissionState::Created | MissionState::PendingApproval => SettlementDecision::NotCompleted,
        }
    }
}

/// Full reward of a settled mission: its XP / gold plus the category skills.
pub fn settlement_delta(category: MissionCategory, xp_reward: u64, gold_reward: u64) -> RewardDelta {
    category
        .skill_delta()
        .with_xp(xp_reward)
        .with_gold(gold_reward)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewards::{LITERACY, RESPONSIBILITY};

    const EVENTS: [MissionEvent; 6] = [
        MissionEvent::Submit,
        MissionEvent::Complete,
        MissionEvent::Approve,
        MissionEvent::Reject,
        MissionEvent::Reopen,
        MissionEvent::Settle,
    ];

    #[test]
    fn test_approval_path() {
        let state = MissionState::Created
            .apply(MissionEvent::Submit)
            .and_then(|s| s.apply(MissionEvent::Approve))
            .and_then(|s| s.apply(MissionEvent::Settle))
            .unwrap();
        assert_eq!(state, MissionState::Rewarded);
    }

    #[test]
    fn test_direct_completion_path() {
        let state = MissionState::Created.apply(MissionEvent::Complete).unwrap();
        assert!(state.is_completed());
        assert!(!state.is_rewarded());
    }

    #[test]
    fn test_rewarded_is_terminal() {
        for event in EVENTS {
            assert!(MissionState::Rewarded.apply(event).is_err(), "{event:?}");
        }
        assert!(MissionState::Rewarded.is_terminal());
    }

    #[test]
    fn test_cannot_settle_before_completion() {
        let err = MissionState::Created.apply(MissionEvent::Settle).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidTransition {
                from: MissionState::Created,
                event: MissionEvent::Settle
            }
        );
        assert!(MissionState::PendingApproval.apply(MissionEvent::Settle).is_err());
    }

    #[test]
    fn test_reject_and_reopen_return_to_created() {
        assert_eq!(
            MissionState::PendingApproval.apply(MissionEvent::Reject),
            Ok(MissionState::Created)
        );
        assert_eq!(MissionState::Completed.apply(MissionEvent::Reopen), Ok(MissionState::Created));
    }

    #[test]
    fn test_from_flags() {
        assert_eq!(MissionState::from_flags(false, false, false), MissionState::Created);
        assert_eq!(MissionState::from_flags(false, true, false), MissionState::PendingApproval);
        assert_eq!(MissionState::from_flags(true, false, false), MissionState::Completed);
        assert_eq!(MissionState::from_flags(true, false, true), MissionState::Rewarded);
    }

    #[test]
    fn test_settlement_decision() {
        assert_eq!(SettlementDecision::evaluate(MissionState::Completed), SettlementDecision::Apply);
        assert_eq!(
            SettlementDecision::evaluate(MissionState::Rewarded),
            SettlementDecision::AlreadyRewarded
        );
        assert_eq!(
            SettlementDecision::evaluate(MissionState::PendingApproval),
            SettlementDecision::NotCompleted
        );
    }

    #[test]
    fn test_settlement_delta() {
        let delta = settlement_delta(MissionCategory::Writing, 30, 10);
        assert_eq!(delta.xp, Some(30));
        assert_eq!(delta.gold, Some(10));
        assert_eq!(delta.skills.get(LITERACY), Some(&5));
        assert_eq!(delta.skills.get(RESPONSIBILITY), Some(&2));
    }
}
