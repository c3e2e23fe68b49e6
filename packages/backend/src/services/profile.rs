use std::collections::BTreeMap;

use quest_algo::{level_progress, LevelProgress, Profile, RewardDelta, Role};
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::{now_ms, require_teacher, ServiceError, ServiceResult};
use crate::auth::Account;
use crate::store::{patch_of, set_op, StoreError, StoreProxy, WriteOp};

const MAX_DISPLAY_NAME_CHARS: usize = 20;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: Profile,
    pub progress: LevelProgress,
}

impl From<Profile> for ProfileView {
    fn from(profile: Profile) -> Self {
        let progress = level_progress(&profile);
        Self { profile, progress }
    }
}

/// Progression fields of a profile; the only part a reward may touch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Progression<'a> {
    xp: u64,
    gold: u64,
    level: u32,
    skills: &'a BTreeMap<String, u64>,
    updated_at: i64,
}

impl<'a> From<&'a Profile> for Progression<'a> {
    fn from(profile: &'a Profile) -> Self {
        Self {
            xp: profile.xp,
            gold: profile.gold,
            level: profile.level,
            skills: &profile.skills,
            updated_at: profile.updated_at,
        }
    }
}

/// Copies the mirror's progression onto `profile`; the mirror receives
/// every reward, teacher grants included.
fn fold_progression(profile: &mut Profile, mirror: &Profile) {
    profile.xp = mirror.xp;
    profile.gold = mirror.gold;
    profile.level = mirror.level;
    profile.skills = mirror.skills.clone();
    profile.updated_at = profile.updated_at.max(mirror.updated_at);
}

/// The owner's private copy with progression read through the mirror.
pub async fn find(proxy: &StoreProxy, owner_id: &str) -> ServiceResult<Option<Profile>> {
    let paths = proxy.paths();
    let Some(mut profile) = proxy.read::<Profile>(&paths.private_profile(owner_id)).await? else {
        return Ok(None);
    };
    if profile.role == Role::Student {
        if let Some(mirror) = proxy.read::<Profile>(&paths.public_profile(owner_id)).await? {
            fold_progression(&mut profile, &mirror);
        }
    }
    Ok(Some(profile))
}

/// Creates the private copy (and the mirror, for students) on first login.
pub async fn ensure_profile(proxy: &StoreProxy, account: &Account) -> ServiceResult<Profile> {
    if let Some(existing) = find(proxy, &account.user_id).await? {
        return Ok(existing);
    }

    let paths = proxy.paths();
    let private_path = paths.private_profile(&account.user_id);

    let mut profile = Profile::new(&account.user_id, account.role, &account.display_name);
    profile.updated_at = now_ms();

    let mut ops = vec![set_op(private_path, &profile)?];
    if account.role == Role::Student {
        ops.push(set_op(paths.public_profile(&account.user_id), &profile)?);
    }
    proxy.store().batch(ops).await?;

    tracing::info!(user_id = %account.user_id, role = account.role.as_str(), "profile created");
    Ok(profile)
}

pub async fn get(proxy: &StoreProxy, owner_id: &str) -> ServiceResult<Profile> {
    find(proxy, owner_id).await?.ok_or(ServiceError::NotFound("프로필"))
}

pub async fn get_public(proxy: &StoreProxy, student_id: &str) -> ServiceResult<Profile> {
    proxy
        .read::<Profile>(&proxy.paths().public_profile(student_id))
        .await?
        .ok_or(ServiceError::NotFound("학생"))
}

pub async fn rename(proxy: &StoreProxy, owner: &Account, display_name: &str) -> ServiceResult<Profile> {
    let display_name = display_name.trim();
    if display_name.is_empty() {
        return Err(ServiceError::Validation("이름을 입력해 주세요".to_string()));
    }
    if display_name.chars().count() > MAX_DISPLAY_NAME_CHARS {
        return Err(ServiceError::Validation(format!(
            "이름은 {MAX_DISPLAY_NAME_CHARS}자 이하로 입력해 주세요"
        )));
    }

    let mut profile = get(proxy, &owner.user_id).await?;
    profile.display_name = display_name.to_string();
    profile.updated_at = now_ms();

    let paths = proxy.paths();
    let mut ops = vec![set_op(paths.private_profile(&owner.user_id), &profile)?];
    if profile.role == Role::Student {
        let mut patch = Map::new();
        patch.insert("displayName".into(), json!(profile.display_name));
        patch.insert("updatedAt".into(), json!(profile.updated_at));
        ops.push(WriteOp::Merge {
            path: paths.public_profile(&owner.user_id),
            patch,
        });
    }
    proxy.store().batch(ops).await?;

    Ok(profile)
}

/// Active students from the public mirror, sorted by name.
pub async fn list_students(proxy: &StoreProxy) -> ServiceResult<Vec<Profile>> {
    let mut students: Vec<Profile> = proxy
        .list::<Profile>(&proxy.paths().public_profiles(), None)
        .await?
        .into_iter()
        .filter(|p| !p.is_deleted && p.role == Role::Student)
        .collect();
    students.sort_by(|a, b| a.display_name.cmp(&b.display_name).then_with(|| a.id.cmp(&b.id)));
    Ok(students)
}

/// Soft delete on the mirror only; the student's private copy is untouched.
pub async fn set_deleted(
    proxy: &StoreProxy,
    actor: &Account,
    student_id: &str,
    deleted: bool,
) -> ServiceResult<Profile> {
    require_teacher(actor)?;

    let path = proxy.paths().public_profile(student_id);
    let mut patch = Map::new();
    patch.insert("isDeleted".into(), Value::Bool(deleted));
    patch.insert("updatedAt".into(), json!(now_ms()));

    match proxy.store().merge(&path, patch).await {
        Ok(()) => {}
        Err(StoreError::NotFound(_)) => return Err(ServiceError::NotFound("학생")),
        Err(err) => return Err(err.into()),
    }

    tracing::info!(student_id, deleted, teacher_id = %actor.user_id, "student visibility changed");
    get_public(proxy, student_id).await
}

/// Applies `delta` to `owner_id`'s profile on behalf of `actor_id`.
///
/// The owner writes both copies; anyone else writes the public mirror only.
/// The mirror receives a merge of the progression fields, so its
/// visibility flag survives. Returns `None` when the source document is
/// missing.
pub async fn apply_reward(
    proxy: &StoreProxy,
    actor_id: &str,
    owner_id: &str,
    delta: &RewardDelta,
) -> ServiceResult<Option<Profile>> {
    let paths = proxy.paths();
    let is_owner = actor_id == owner_id;

    let current = if is_owner {
        find(proxy, owner_id).await?
    } else {
        proxy.read::<Profile>(&paths.public_profile(owner_id)).await?
    };
    let Some(current) = current else {
        tracing::warn!(owner_id, actor_id, "reward skipped: profile missing");
        return Ok(None);
    };

    let next = quest_algo::apply_reward(&current, delta, now_ms());

    let public_path = paths.public_profile(owner_id);
    let mut ops = Vec::with_capacity(2);
    if next.role == Role::Student {
        if proxy.store().get(&public_path).await?.is_some() {
            ops.push(WriteOp::Merge {
                path: public_path,
                patch: patch_of(&Progression::from(&next))?,
            });
        } else {
            ops.push(set_op(public_path, &next)?);
        }
    }
    if is_owner {
        ops.push(set_op(paths.private_profile(owner_id), &next)?);
    }
    proxy.store().batch(ops).await?;

    tracing::debug!(
        owner_id,
        actor_id,
        xp = next.xp,
        level = next.level,
        leveled_up = next.level > current.level,
        "reward applied"
    );
    Ok(Some(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{proxy, student, teacher};

    #[tokio::test]
    async fn test_ensure_profile_creates_both_copies_once() {
        let proxy = proxy();
        let account = student("s1");

        let created = ensure_profile(&proxy, &account).await.unwrap();
        assert_eq!(created.level, 1);
        assert!(proxy.store().get(&proxy.paths().public_profile("s1")).await.unwrap().is_some());

        let again = ensure_profile(&proxy, &account).await.unwrap();
        assert_eq!(again, created);
    }

    #[tokio::test]
    async fn test_teacher_profile_has_no_mirror() {
        let proxy = proxy();
        ensure_profile(&proxy, &teacher()).await.unwrap();
        assert!(proxy
            .store()
            .get(&proxy.paths().public_profile("teacher-1"))
            .await
            .unwrap()
            .is_none());
        assert!(list_students(&proxy).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_owner_reward_writes_both_copies() {
        let proxy = proxy();
        ensure_profile(&proxy, &student("s1")).await.unwrap();

        let delta = RewardDelta::default().with_xp(120).with_skill("문해력", 5);
        let next = apply_reward(&proxy, "s1", "s1", &delta).await.unwrap().unwrap();
        assert_eq!(next.level, 2);

        let private = get(&proxy, "s1").await.unwrap();
        let public = get_public(&proxy, "s1").await.unwrap();
        assert_eq!(private.xp, 120);
        assert_eq!(public.xp, 120);
        assert_eq!(public.skill("문해력"), 5);
    }

    #[tokio::test]
    async fn test_teacher_reward_writes_mirror_only() {
        let proxy = proxy();
        ensure_profile(&proxy, &student("s1")).await.unwrap();

        let delta = RewardDelta::default().with_gold(7);
        apply_reward(&proxy, "teacher-1", "s1", &delta).await.unwrap().unwrap();

        assert_eq!(get_public(&proxy, "s1").await.unwrap().gold, 7);
        let stored: Profile = proxy
            .read(&proxy.paths().private_profile("s1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.gold, 0);
        // the owner still sees the grant
        assert_eq!(get(&proxy, "s1").await.unwrap().gold, 7);
    }

    #[tokio::test]
    async fn test_owner_reward_builds_on_teacher_grant() {
        let proxy = proxy();
        ensure_profile(&proxy, &student("s1")).await.unwrap();

        let grant = RewardDelta::default().with_xp(50).with_gold(10);
        apply_reward(&proxy, "teacher-1", "s1", &grant).await.unwrap().unwrap();
        let own = RewardDelta::default().with_xp(10).with_skill("문해력", 1);
        let next = apply_reward(&proxy, "s1", "s1", &own).await.unwrap().unwrap();
        assert_eq!((next.xp, next.gold), (60, 10));

        let public = get_public(&proxy, "s1").await.unwrap();
        assert_eq!((public.xp, public.gold), (60, 10));
        assert_eq!(public.skill("문해력"), 1);

        let stored: Profile = proxy
            .read(&proxy.paths().private_profile("s1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!((stored.xp, stored.gold), (60, 10));
    }

    #[tokio::test]
    async fn test_owner_reward_keeps_soft_delete() {
        let proxy = proxy();
        ensure_profile(&proxy, &student("s1")).await.unwrap();
        set_deleted(&proxy, &teacher(), "s1", true).await.unwrap();

        let delta = RewardDelta::default().with_xp(10);
        apply_reward(&proxy, "s1", "s1", &delta).await.unwrap().unwrap();

        assert!(list_students(&proxy).await.unwrap().is_empty());
        let public = get_public(&proxy, "s1").await.unwrap();
        assert!(public.is_deleted);
        assert_eq!(public.xp, 10);
    }

    #[tokio::test]
    async fn test_teacher_own_reward_creates_no_mirror() {
        let proxy = proxy();
        ensure_profile(&proxy, &teacher()).await.unwrap();

        let delta = RewardDelta::default().with_xp(10);
        let next = apply_reward(&proxy, "teacher-1", "teacher-1", &delta).await.unwrap().unwrap();
        assert_eq!(next.xp, 10);
        assert!(proxy
            .store()
            .get(&proxy.paths().public_profile("teacher-1"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_missing_profile_is_skipped() {
        let proxy = proxy();
        let delta = RewardDelta::default().with_xp(10);
        assert_eq!(apply_reward(&proxy, "ghost", "ghost", &delta).await.unwrap(), None);
        assert!(get(&proxy, "ghost").await.is_err());
    }

    #[tokio::test]
    async fn test_rename_updates_mirror() {
        let proxy = proxy();
        let account = student("s1");
        ensure_profile(&proxy, &account).await.unwrap();

        rename(&proxy, &account, "  별빛  ").await.unwrap();
        assert_eq!(get(&proxy, "s1").await.unwrap().display_name, "별빛");
        assert_eq!(get_public(&proxy, "s1").await.unwrap().display_name, "별빛");

        assert!(matches!(
            rename(&proxy, &account, "   ").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_student() {
        let proxy = proxy();
        ensure_profile(&proxy, &student("s1")).await.unwrap();
        ensure_profile(&proxy, &student("s2")).await.unwrap();

        assert!(matches!(
            set_deleted(&proxy, &student("s2"), "s1", true).await,
            Err(ServiceError::Forbidden)
        ));

        set_deleted(&proxy, &teacher(), "s1", true).await.unwrap();
        let ids: Vec<String> = list_students(&proxy).await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["s2".to_string()]);
        assert!(!get(&proxy, "s1").await.unwrap().is_deleted);

        assert!(matches!(
            set_deleted(&proxy, &teacher(), "nobody", true).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_profile_view_includes_progress() {
        let mut profile = Profile::new("s1", Role::Student, "민지");
        profile.xp = 130;
        profile.level = 2;
        let view = serde_json::to_value(ProfileView::from(profile)).unwrap();
        assert_eq!(view["xp"], 130);
        assert_eq!(view["progress"]["xpToNextLevel"], 70);
    }
}
