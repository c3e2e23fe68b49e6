use quest_algo::{
    settlement_delta, MissionCategory, MissionEvent, MissionState, Profile, SettlementDecision,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{now_ms, profile, require_owner_or_teacher, require_teacher, ServiceError, ServiceResult};
use crate::auth::Account;
use crate::generative::{ContentGenerator, GenerationError};
use crate::store::{set_op, FieldFilter, Precondition, StoreError, StoreProxy, WriteOp};

pub const MISSIONS_PER_SET: usize = 3;
pub const MAX_XP_REWARD: u64 = 100;
pub const MAX_GOLD_REWARD: u64 = 50;
pub const MISSION_FALLBACK: &str = "지금은 새 미션을 만들 수 없어요. 잠시 후 다시 시도해 주세요.";

const MAX_TITLE_CHARS: usize = 60;

// ==================== Documents ====================

/// Mission as managers see it. Stored with the derived legacy flags next to
/// `state` so older dashboards keep working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MissionDocument", into = "MissionDocument")]
pub struct Mission {
    pub id: String,
    pub student_id: String,
    pub title: String,
    pub category: MissionCategory,
    pub description: String,
    pub xp_reward: u64,
    pub gold_reward: u64,
    pub state: MissionState,
    pub is_recommended: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MissionDocument {
    id: String,
    student_id: String,
    title: String,
    category: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    xp_reward: u64,
    #[serde(default)]
    gold_reward: u64,
    #[serde(default)]
    state: Option<MissionState>,
    #[serde(default)]
    is_completed: bool,
    #[serde(default)]
    is_pending_approval: bool,
    #[serde(default)]
    is_student_rewarded: bool,
    #[serde(default)]
    is_recommended: bool,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    updated_at: i64,
}

impl TryFrom<MissionDocument> for Mission {
    type Error = String;

    fn try_from(doc: MissionDocument) -> Result<Self, Self::Error> {
        let category = MissionCategory::parse(&doc.category)
            .ok_or_else(|| format!("unknown mission category {:?}", doc.category))?;
        let state = doc.state.unwrap_or_else(|| {
            MissionState::from_flags(doc.is_completed, doc.is_pending_approval, doc.is_student_rewarded)
        });

        Ok(Mission {
            id: doc.id,
            student_id: doc.student_id,
            title: doc.title,
            category,
            description: doc.description,
            xp_reward: doc.xp_reward,
            gold_reward: doc.gold_reward,
            state,
            is_recommended: doc.is_recommended,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        })
    }
}

impl From<Mission> for MissionDocument {
    fn from(mission: Mission) -> Self {
        MissionDocument {
            id: mission.id,
            student_id: mission.student_id,
            title: mission.title,
            category: mission.category.as_str().to_string(),
            description: mission.description,
            xp_reward: mission.xp_reward,
            gold_reward: mission.gold_reward,
            state: Some(mission.state),
            is_completed: mission.state.is_completed(),
            is_pending_approval: mission.state.is_pending_approval(),
            is_student_rewarded: mission.state.is_rewarded(),
            is_recommended: mission.is_recommended,
            created_at: mission.created_at,
            updated_at: mission.updated_at,
        }
    }
}

/// Mission content before it is assigned to a student.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionDraft {
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub xp_reward: u64,
    #[serde(default)]
    pub gold_reward: u64,
}

impl MissionDraft {
    fn into_mission(self, student_id: &str, is_recommended: bool, now: i64) -> ServiceResult<Mission> {
        let title = self.title.trim().to_string();
        if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
            return Err(ServiceError::Validation(format!(
                "미션 제목은 1~{MAX_TITLE_CHARS}자여야 합니다"
            )));
        }
        let category = MissionCategory::parse(&self.category)
            .ok_or_else(|| ServiceError::Validation(format!("알 수 없는 분류입니다: {}", self.category)))?;

        Ok(Mission {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            title,
            category,
            description: self.description.trim().to_string(),
            xp_reward: self.xp_reward.min(MAX_XP_REWARD),
            gold_reward: self.gold_reward.min(MAX_GOLD_REWARD),
            state: MissionState::Created,
            is_recommended,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionOutcome {
    pub mission: Mission,
    /// Updated profile when this call settled the mission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

impl MissionOutcome {
    fn unsettled(mission: Mission) -> Self {
        Self { mission, profile: None }
    }
}

// ==================== Queries ====================

pub async fn list_for_student(proxy: &StoreProxy, actor: &Account, student_id: &str) -> ServiceResult<Vec<Mission>> {
    require_owner_or_teacher(actor, student_id)?;

    let mut missions: Vec<Mission> = proxy
        .list(&proxy.paths().missions(), Some(FieldFilter::eq("studentId", student_id)))
        .await?;
    missions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(missions)
}

async fn load(proxy: &StoreProxy, mission_id: &str) -> ServiceResult<Mission> {
    let path = proxy.paths().mission(mission_id);
    let raw = proxy.store().get(&path).await?.ok_or(ServiceError::NotFound("미션"))?;

    let needs_state = raw.get("state").map_or(true, Value::is_null);
    let mission: Mission = serde_json::from_value(raw).map_err(|source| StoreError::Decode {
        path: path.clone(),
        source,
    })?;

    // legacy flag-only document: persist the derived state before any CAS
    if needs_state {
        proxy.store().merge(&path, state_patch(mission.state, mission.updated_at)).await?;
    }

    Ok(mission)
}

// ==================== Generation ====================

pub fn mission_schema() -> Value {
    let categories: Vec<&str> = MissionCategory::ALL.iter().map(|c| c.as_str()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "missions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "category": { "type": "STRING", "enum": categories },
                        "description": { "type": "STRING" },
                        "xpReward": { "type": "INTEGER" },
                        "goldReward": { "type": "INTEGER" }
                    },
                    "required": ["title", "category", "description", "xpReward", "goldReward"]
                }
            }
        },
        "required": ["missions"]
    })
}

fn mission_prompt(student: Option<&Profile>) -> String {
    let categories = MissionCategory::ALL
        .iter()
        .map(|c| format!("{}({})", c.as_str(), c.label()))
        .collect::<Vec<_>>()
        .join(", ");

    let about = match student {
        Some(p) => {
            let skills = p
                .skills
                .iter()
                .map(|(name, score)| format!("{name} {score}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "학생 이름: {}, 레벨: {}, 능력치: {}",
                p.display_name,
                p.level,
                if skills.is_empty() { "아직 없음".to_string() } else { skills }
            )
        }
        None => "학생 정보 없음".to_string(),
    };

    format!(
        "초등학생을 위한 오늘의 미션 {MISSIONS_PER_SET}개를 만들어 주세요.\n{about}\n\
         분류는 다음 중에서 고르세요: {categories}.\n\
         약한 능력치를 키울 수 있는 미션을 우선하고, xpReward는 10~{MAX_XP_REWARD}, \
         goldReward는 0~{MAX_GOLD_REWARD} 사이로 정하세요."
    )
}

fn parse_generated(value: &Value, student_id: &str, now: i64) -> Vec<Mission> {
    let Some(items) = value.get("missions").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<MissionDraft>(item.clone()) {
            Ok(draft) => match draft.into_mission(student_id, false, now) {
                Ok(mission) => Some(mission),
                Err(err) => {
                    tracing::warn!(error = %err, "dropping generated mission");
                    None
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, "undecodable generated mission");
                None
            }
        })
        .take(MISSIONS_PER_SET)
        .collect()
}

/// Generates a fresh mission set and swaps out the student's open,
/// non-recommended missions in one batch. Nothing changes on failure.
pub async fn generate_missions(
    proxy: &StoreProxy,
    generator: &dyn ContentGenerator,
    actor: &Account,
    student_id: &str,
) -> ServiceResult<Vec<Mission>> {
    require_owner_or_teacher(actor, student_id)?;

    let student = proxy
        .read::<Profile>(&proxy.paths().public_profile(student_id))
        .await?;
    let prompt = mission_prompt(student.as_ref());

    let value = generator
        .generate_structured(&prompt, &mission_schema())
        .await
        .map_err(|source| ServiceError::Generation {
            fallback: MISSION_FALLBACK,
            source,
        })?;

    let fresh = parse_generated(&value, student_id, now_ms());
    if fresh.is_empty() {
        return Err(ServiceError::Generation {
            fallback: MISSION_FALLBACK,
            source: GenerationError::Malformed("no usable missions in response".to_string()),
        });
    }

    let existing = list_for_student(proxy, actor, student_id).await?;
    let paths = proxy.paths();
    let mut ops: Vec<WriteOp> = existing
        .iter()
        .filter(|m| m.state.is_open() && !m.is_recommended)
        .map(|m| WriteOp::Delete { path: paths.mission(&m.id) })
        .collect();
    let replaced = ops.len();
    for mission in &fresh {
        ops.push(set_op(paths.mission(&mission.id), mission)?);
    }
    proxy.store().batch(ops).await?;

    tracing::info!(
        student_id,
        generator = generator.id(),
        created = fresh.len(),
        replaced,
        "missions generated"
    );
    Ok(fresh)
}

pub async fn recommend_missions(
    proxy: &StoreProxy,
    actor: &Account,
    student_id: &str,
    drafts: Vec<MissionDraft>,
) -> ServiceResult<Vec<Mission>> {
    require_teacher(actor)?;
    if drafts.is_empty() {
        return Err(ServiceError::Validation("추천할 미션이 없습니다".to_string()));
    }
    profile::get_public(proxy, student_id).await?;

    let now = now_ms();
    let missions = drafts
        .into_iter()
        .map(|draft| draft.into_mission(student_id, true, now))
        .collect::<ServiceResult<Vec<_>>>()?;

    let paths = proxy.paths();
    let ops = missions
        .iter()
        .map(|m| set_op(paths.mission(&m.id), m))
        .collect::<Result<Vec<_>, _>>()?;
    proxy.store().batch(ops).await?;

    tracing::info!(student_id, teacher_id = %actor.user_id, count = missions.len(), "missions recommended");
    Ok(missions)
}

// ==================== Transitions ====================

fn state_patch(state: MissionState, now: i64) -> Map<String, Value> {
    let mut patch = Map::new();
    patch.insert("state".into(), json!(state.as_str()));
    patch.insert("isCompleted".into(), json!(state.is_completed()));
    patch.insert("isPendingApproval".into(), json!(state.is_pending_approval()));
    patch.insert("isStudentRewarded".into(), json!(state.is_rewarded()));
    patch.insert("updatedAt".into(), json!(now));
    patch
}

/// Compare-and-set on `state`: fails with a conflict when someone else moved
/// the mission since it was read.
async fn transition(proxy: &StoreProxy, mission: &Mission, event: MissionEvent) -> ServiceResult<Mission> {
    let next = mission.state.apply(event)?;
    let now = now_ms();
    let path = proxy.paths().mission(&mission.id);

    let applied = proxy
        .store()
        .merge_if(
            &path,
            Precondition::field_equals("state", mission.state.as_str()),
            state_patch(next, now),
        )
        .await
        .map_err(|err| match err {
            StoreError::NotFound(_) => ServiceError::NotFound("미션"),
            other => other.into(),
        })?;

    if !applied {
        return Err(ServiceError::Conflict("미션 상태가 이미 변경되었습니다".to_string()));
    }

    tracing::debug!(mission_id = %mission.id, from = mission.state.as_str(), to = next.as_str(), "mission transition");
    Ok(Mission {
        state: next,
        updated_at: now,
        ..mission.clone()
    })
}

/// Pays a completed mission at most once.
///
/// The mission is claimed (`COMPLETED -> REWARDED`) before the reward is
/// applied; only the caller whose claim succeeds pays.
pub async fn settle(proxy: &StoreProxy, actor: &Account, mission: &Mission) -> ServiceResult<MissionOutcome> {
    match SettlementDecision::evaluate(mission.state) {
        SettlementDecision::Apply => {}
        SettlementDecision::AlreadyRewarded | SettlementDecision::NotCompleted => {
            return Ok(MissionOutcome::unsettled(mission.clone()));
        }
    }

    let claimed = match transition(proxy, mission, MissionEvent::Settle).await {
        Ok(claimed) => claimed,
        Err(ServiceError::Conflict(_)) => {
            tracing::debug!(mission_id = %mission.id, "settlement already claimed");
            return Ok(MissionOutcome::unsettled(load(proxy, &mission.id).await?));
        }
        Err(err) => return Err(err),
    };

    let delta = settlement_delta(mission.category, mission.xp_reward, mission.gold_reward);
    let profile = profile::apply_reward(proxy, &actor.user_id, &mission.student_id, &delta).await?;

    tracing::info!(
        mission_id = %mission.id,
        student_id = %mission.student_id,
        actor_id = %actor.user_id,
        xp = mission.xp_reward,
        gold = mission.gold_reward,
        "mission settled"
    );
    Ok(MissionOutcome {
        mission: claimed,
        profile,
    })
}

pub async fn submit(proxy: &StoreProxy, actor: &Account, mission_id: &str) -> ServiceResult<Mission> {
    let mission = load(proxy, mission_id).await?;
    if actor.user_id != mission.student_id {
        return Err(ServiceError::Forbidden);
    }
    transition(proxy, &mission, MissionEvent::Submit).await
}

pub async fn approve(proxy: &StoreProxy, actor: &Account, mission_id: &str) -> ServiceResult<MissionOutcome> {
    require_teacher(actor)?;
    let mission = load(proxy, mission_id).await?;
    let completed = transition(proxy, &mission, MissionEvent::Approve).await?;
    settle(proxy, actor, &completed).await
}

pub async fn reject(proxy: &StoreProxy, actor: &Account, mission_id: &str) -> ServiceResult<Mission> {
    require_teacher(actor)?;
    let mission = load(proxy, mission_id).await?;
    transition(proxy, &mission, MissionEvent::Reject).await
}

/// Checks a mission off (and settles it) or undoes an unsettled completion.
///
/// A teacher toggling a mission that awaits approval approves it.
pub async fn toggle_completion(proxy: &StoreProxy, actor: &Account, mission_id: &str) -> ServiceResult<MissionOutcome> {
    let mission = load(proxy, mission_id).await?;
    require_owner_or_teacher(actor, &mission.student_id)?;

    let event = match mission.state {
        MissionState::Completed => MissionEvent::Reopen,
        MissionState::PendingApproval if actor.is_teacher() => MissionEvent::Approve,
        _ => MissionEvent::Complete,
    };

    let next = transition(proxy, &mission, event).await?;
    if next.state == MissionState::Completed {
        settle(proxy, actor, &next).await
    } else {
        Ok(MissionOutcome::unsettled(next))
    }
}

pub async fn delete(proxy: &StoreProxy, actor: &Account, mission_id: &str) -> ServiceResult<()> {
    require_teacher(actor)?;
    let path = proxy.paths().mission(mission_id);
    if proxy.store().get(&path).await?.is_none() {
        return Err(ServiceError::NotFound("미션"));
    }
    proxy.store().delete(&path).await?;
    tracing::info!(mission_id, teacher_id = %actor.user_id, "mission deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generative::MockGenerator;
    use crate::services::profile::{ensure_profile, get, get_public};
    use crate::services::testing::{proxy, student, teacher};

    fn draft(title: &str, category: &str, xp: u64, gold: u64) -> MissionDraft {
        MissionDraft {
            title: title.to_string(),
            category: category.to_string(),
            description: String::new(),
            xp_reward: xp,
            gold_reward: gold,
        }
    }

    async fn setup() -> StoreProxy {
        let proxy = proxy();
        ensure_profile(&proxy, &student("s1")).await.unwrap();
        proxy
    }

    async fn one_mission(proxy: &StoreProxy, category: &str) -> Mission {
        recommend_missions(proxy, &teacher(), "s1", vec![draft("책 읽기", category, 30, 10)])
            .await
            .unwrap()
            .remove(0)
    }

    #[test]
    fn test_document_carries_derived_flags() {
        let mission = draft("a", "독서", 10, 0).into_mission("s1", false, 1).unwrap();
        let rewarded = Mission {
            state: MissionState::Rewarded,
            ..mission
        };
        let doc = serde_json::to_value(&rewarded).unwrap();
        assert_eq!(doc["state"], "REWARDED");
        assert_eq!(doc["category"], "READING");
        assert_eq!(doc["isCompleted"], true);
        assert_eq!(doc["isStudentRewarded"], true);
        assert_eq!(doc["isPendingApproval"], false);

        let back: Mission = serde_json::from_value(doc).unwrap();
        assert_eq!(back, rewarded);
    }

    #[test]
    fn test_legacy_document_state_from_flags() {
        let doc = json!({
            "id": "m1", "studentId": "s1", "title": "t", "category": "수학",
            "isCompleted": true, "isStudentRewarded": false
        });
        let mission: Mission = serde_json::from_value(doc).unwrap();
        assert_eq!(mission.state, MissionState::Completed);
        assert_eq!(mission.category, MissionCategory::Math);
    }

    #[test]
    fn test_draft_rewards_are_capped() {
        let mission = draft("x", "MATH", 500, 500).into_mission("s1", false, 0).unwrap();
        assert_eq!(mission.xp_reward, MAX_XP_REWARD);
        assert_eq!(mission.gold_reward, MAX_GOLD_REWARD);
        assert!(draft(" ", "MATH", 1, 1).into_mission("s1", false, 0).is_err());
        assert!(draft("x", "COOKING", 1, 1).into_mission("s1", false, 0).is_err());
    }

    #[tokio::test]
    async fn test_toggle_settles_once() {
        let proxy = setup().await;
        let mission = one_mission(&proxy, "READING").await;

        let outcome = toggle_completion(&proxy, &student("s1"), &mission.id).await.unwrap();
        assert_eq!(outcome.mission.state, MissionState::Rewarded);
        let profile = outcome.profile.unwrap();
        assert_eq!(profile.xp, 30);
        assert_eq!(profile.gold, 10);
        assert_eq!(profile.skill("문해력"), 5);
        assert_eq!(profile.skill("책임감"), 2);

        // a rewarded mission cannot be reopened or settled again
        let err = toggle_completion(&proxy, &student("s1"), &mission.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Transition(_)));

        let stored = load(&proxy, &mission.id).await.unwrap();
        let again = settle(&proxy, &student("s1"), &stored).await.unwrap();
        assert!(again.profile.is_none());
        assert_eq!(get(&proxy, "s1").await.unwrap().xp, 30);
    }

    #[tokio::test]
    async fn test_stale_settlement_pays_once() {
        let proxy = setup().await;
        let mission = one_mission(&proxy, "MATH").await;
        let completed = transition(&proxy, &mission, MissionEvent::Complete).await.unwrap();

        let first = settle(&proxy, &student("s1"), &completed).await.unwrap();
        let second = settle(&proxy, &student("s1"), &completed).await.unwrap();
        assert!(first.profile.is_some());
        assert!(second.profile.is_none());
        assert_eq!(second.mission.state, MissionState::Rewarded);
        assert_eq!(get(&proxy, "s1").await.unwrap().skill("수리력"), 5);
    }

    #[tokio::test]
    async fn test_submit_approve_flow_rewards_mirror() {
        let proxy = setup().await;
        let mission = one_mission(&proxy, "EXERCISE").await;

        let pending = submit(&proxy, &student("s1"), &mission.id).await.unwrap();
        assert_eq!(pending.state, MissionState::PendingApproval);

        assert!(matches!(
            approve(&proxy, &student("s1"), &mission.id).await,
            Err(ServiceError::Forbidden)
        ));

        let outcome = approve(&proxy, &teacher(), &mission.id).await.unwrap();
        assert_eq!(outcome.mission.state, MissionState::Rewarded);
        assert_eq!(get_public(&proxy, "s1").await.unwrap().skill("건강"), 5);
        // teacher writes touch the mirror only; the owner reads through it
        let stored: Profile = proxy
            .read(&proxy.paths().private_profile("s1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.skill("건강"), 0);
        assert_eq!(get(&proxy, "s1").await.unwrap().skill("건강"), 5);
    }

    #[tokio::test]
    async fn test_reject_returns_to_created() {
        let proxy = setup().await;
        let mission = one_mission(&proxy, "WRITING").await;
        submit(&proxy, &student("s1"), &mission.id).await.unwrap();

        let rejected = reject(&proxy, &teacher(), &mission.id).await.unwrap();
        assert_eq!(rejected.state, MissionState::Created);
        assert!(matches!(
            reject(&proxy, &teacher(), &mission.id).await,
            Err(ServiceError::Transition(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_transition_conflicts() {
        let proxy = setup().await;
        let mission = one_mission(&proxy, "CREATIVITY").await;

        transition(&proxy, &mission, MissionEvent::Submit).await.unwrap();
        let err = transition(&proxy, &mission, MissionEvent::Complete).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_students_cannot_touch_other_missions() {
        let proxy = setup().await;
        let mission = one_mission(&proxy, "LIFE_HABIT").await;
        let other = student("s2");

        assert!(matches!(submit(&proxy, &other, &mission.id).await, Err(ServiceError::Forbidden)));
        assert!(matches!(
            toggle_completion(&proxy, &other, &mission.id).await,
            Err(ServiceError::Forbidden)
        ));
        assert!(matches!(
            list_for_student(&proxy, &other, "s1").await,
            Err(ServiceError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_generate_replaces_open_missions_only() {
        let proxy = setup().await;
        let generator = MockGenerator::demo();
        let actor = student("s1");

        let recommended = one_mission(&proxy, "READING").await;
        let first = generate_missions(&proxy, &generator, &actor, "s1").await.unwrap();
        assert_eq!(first.len(), MISSIONS_PER_SET);

        toggle_completion(&proxy, &actor, &first[0].id).await.unwrap();

        let second = generate_missions(&proxy, &generator, &actor, "s1").await.unwrap();
        let ids: Vec<String> = list_for_student(&proxy, &actor, "s1")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();

        assert!(ids.contains(&recommended.id));
        assert!(ids.contains(&first[0].id));
        assert!(!ids.contains(&first[1].id));
        assert!(second.iter().all(|m| ids.contains(&m.id)));
        assert_eq!(ids.len(), 1 + 1 + MISSIONS_PER_SET);
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_missions() {
        let proxy = setup().await;
        let generator = MockGenerator::default();
        generator.push_failure("quota");
        let actor = student("s1");
        let existing = one_mission(&proxy, "MATH").await;

        let err = generate_missions(&proxy, &generator, &actor, "s1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Generation { fallback: MISSION_FALLBACK, .. }));
        let missions = list_for_student(&proxy, &actor, "s1").await.unwrap();
        assert_eq!(missions, vec![existing]);
    }

    #[tokio::test]
    async fn test_generated_missions_are_sanitized() {
        let proxy = setup().await;
        let generator = MockGenerator::default();
        generator.push_reply(
            json!({ "missions": [
                { "title": "줄넘기 100번", "category": "운동", "description": "", "xpReward": 999, "goldReward": 3 },
                { "title": "요리하기", "category": "COOKING", "description": "", "xpReward": 10, "goldReward": 0 }
            ]})
            .to_string(),
        );

        let missions = generate_missions(&proxy, &generator, &student("s1"), "s1").await.unwrap();
        assert_eq!(missions.len(), 1);
        assert_eq!(missions[0].category, MissionCategory::Exercise);
        assert_eq!(missions[0].xp_reward, MAX_XP_REWARD);
    }

    #[tokio::test]
    async fn test_delete_requires_teacher() {
        let proxy = setup().await;
        let mission = one_mission(&proxy, "READING").await;
        assert!(matches!(
            delete(&proxy, &student("s1"), &mission.id).await,
            Err(ServiceError::Forbidden)
        ));
        delete(&proxy, &teacher(), &mission.id).await.unwrap();
        assert!(matches!(
            delete(&proxy, &teacher(), &mission.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
