//! Property-Based Tests for the Progression Engine
//!
//! Tests the following invariants:
//! - Monotonicity: level, xp, gold and every skill never decrease
//! - Leveling: the resulting level matches the `level * 100` stepping rule
//! - Locality: skills outside the delta are unchanged
//! - Mission settlement: `REWARDED` never re-qualifies

use std::collections::BTreeMap;

use proptest::prelude::*;

use quest_algo::{
    apply_reward, routine_reward, toggle_completion, MissionEvent, MissionState, Profile,
    RewardDelta, Role, SettlementDecision,
};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_skill_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("문해력".to_string()),
        Just("수리력".to_string()),
        Just("창의력".to_string()),
        Just("책임감".to_string()),
        Just("자기주도".to_string()),
    ]
}

fn arb_skills() -> impl Strategy<Value = BTreeMap<String, u64>> {
    proptest::collection::btree_map(arb_skill_name(), 0u64..10_000, 0..5)
}

fn arb_profile() -> impl Strategy<Value = Profile> {
    (0u64..1_000_000, 0u64..1_000_000, 1u32..200, arb_skills()).prop_map(
        |(xp, gold, level, skills)| Profile {
            xp,
            gold,
            level,
            skills,
            ..Profile::new("s-1", Role::Student, "prop")
        },
    )
}

fn arb_delta() -> impl Strategy<Value = RewardDelta> {
    (
        proptest::option::of(0u64..10_000),
        proptest::option::of(0u64..10_000),
        arb_skills(),
    )
        .prop_map(|(xp, gold, skills)| RewardDelta { xp, gold, skills })
}

fn arb_event() -> impl Strategy<Value = MissionEvent> {
    prop_oneof![
        Just(MissionEvent::Submit),
        Just(MissionEvent::Complete),
        Just(MissionEvent::Approve),
        Just(MissionEvent::Reject),
        Just(MissionEvent::Reopen),
        Just(MissionEvent::Settle),
    ]
}

fn reference_level(start: u32, xp: u64) -> u32 {
    let mut level = start.max(1);
    while xp >= u64::from(level) * 100 {
        level += 1;
    }
    level
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_reward_is_monotonic(profile in arb_profile(), delta in arb_delta()) {
        let next = apply_reward(&profile, &delta, 1);

        prop_assert!(next.level >= profile.level);
        prop_assert!(next.xp >= profile.xp);
        prop_assert!(next.gold >= profile.gold);
        for (skill, score) in &profile.skills {
            prop_assert!(next.skill(skill) >= *score);
        }
    }

    #[test]
    fn prop_level_follows_stepping_rule(profile in arb_profile(), delta in arb_delta()) {
        let next = apply_reward(&profile, &delta, 1);
        prop_assert_eq!(next.level, reference_level(profile.level, next.xp));
        // either the stored level was already ahead, or the next threshold is not yet reached
        prop_assert!(next.level == profile.level || next.xp < u64::from(next.level) * 100);
    }

    #[test]
    fn prop_skills_outside_delta_unchanged(profile in arb_profile(), delta in arb_delta()) {
        let next = apply_reward(&profile, &delta, 1);
        for (skill, score) in &profile.skills {
            if !delta.skills.contains_key(skill) {
                prop_assert_eq!(next.skill(skill), *score);
            }
        }
        for (skill, inc) in &delta.skills {
            prop_assert_eq!(next.skill(skill), profile.skill(skill) + inc);
        }
    }

    #[test]
    fn prop_identity_fields_untouched(profile in arb_profile(), delta in arb_delta()) {
        let next = apply_reward(&profile, &delta, 99);
        prop_assert_eq!(&next.id, &profile.id);
        prop_assert_eq!(next.role, profile.role);
        prop_assert_eq!(&next.display_name, &profile.display_name);
        prop_assert_eq!(next.is_deleted, profile.is_deleted);
        prop_assert_eq!(next.updated_at, 99);
    }

    #[test]
    fn prop_settle_happens_at_most_once(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut state = MissionState::Created;
        let mut settled = 0;
        for event in events {
            if event == MissionEvent::Settle
                && SettlementDecision::evaluate(state) == SettlementDecision::Apply
            {
                settled += 1;
            }
            if let Ok(next) = state.apply(event) {
                state = next;
            }
        }
        prop_assert!(settled <= 1);
        prop_assert_eq!(settled == 1, state == MissionState::Rewarded);
    }

    #[test]
    fn prop_routine_grants_once_per_rising_edge(toggles in proptest::collection::vec(any::<bool>(), 0..40)) {
        let mut log = BTreeMap::new();
        let mut previous = false;
        let mut expected = 0;
        let mut granted = 0;
        for done in toggles {
            if done && !previous {
                expected += 1;
            }
            previous = done;
            if toggle_completion(&mut log, "2024-05-06", done).is_granted() {
                granted += 1;
            }
        }
        prop_assert_eq!(granted, expected);
        prop_assert!(!routine_reward().is_empty());
    }
}
