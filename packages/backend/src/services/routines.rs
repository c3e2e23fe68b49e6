use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use quest_algo::{routine_reward, toggle_completion, Profile};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{now_ms, profile, require_owner_or_teacher, ServiceError, ServiceResult};
use crate::auth::Account;
use crate::store::{Precondition, StoreError, StoreProxy};

const MAX_TITLE_CHARS: usize = 40;
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub weekdays: Vec<Weekday>,
    /// Free text, e.g. "07:30".
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub completions: BTreeMap<String, bool>,
    pub created_at: i64,
}

impl Routine {
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.weekdays.contains(&date.weekday())
    }

    pub fn is_done(&self, date: &str) -> bool {
        self.completions.get(date).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoutine {
    pub title: String,
    pub weekdays: Vec<Weekday>,
    #[serde(default)]
    pub time: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineToggle {
    pub routine: Routine,
    pub granted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineForDate {
    #[serde(flatten)]
    pub routine: Routine,
    pub done: bool,
}

pub fn parse_date(raw: &str) -> ServiceResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| ServiceError::Validation(format!("날짜 형식이 올바르지 않습니다: {raw}")))
}

fn normalize_weekdays(mut weekdays: Vec<Weekday>) -> Vec<Weekday> {
    weekdays.sort_by_key(|d| d.num_days_from_monday());
    weekdays.dedup();
    weekdays
}

pub async fn create(proxy: &StoreProxy, owner: &Account, input: NewRoutine) -> ServiceResult<Routine> {
    let title = input.title.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
        return Err(ServiceError::Validation(format!(
            "루틴 이름은 1~{MAX_TITLE_CHARS}자여야 합니다"
        )));
    }
    if input.weekdays.is_empty() {
        return Err(ServiceError::Validation("요일을 하나 이상 골라 주세요".to_string()));
    }

    let routine = Routine {
        id: uuid::Uuid::new_v4().to_string(),
        owner_id: owner.user_id.clone(),
        title: title.to_string(),
        weekdays: normalize_weekdays(input.weekdays),
        time: input.time.trim().to_string(),
        completions: BTreeMap::new(),
        created_at: now_ms(),
    };
    proxy
        .write(&proxy.paths().routine(&owner.user_id, &routine.id), &routine)
        .await?;

    tracing::info!(owner_id = %owner.user_id, routine_id = %routine.id, "routine created");
    Ok(routine)
}

pub async fn list(proxy: &StoreProxy, actor: &Account, owner_id: &str) -> ServiceResult<Vec<Routine>> {
    require_owner_or_teacher(actor, owner_id)?;

    let mut routines: Vec<Routine> = proxy.list(&proxy.paths().routines(owner_id), None).await?;
    routines.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.created_at.cmp(&b.created_at)));
    Ok(routines)
}

/// Routines scheduled on `date`, each with that day's completion flag.
pub async fn routines_for_date(
    proxy: &StoreProxy,
    actor: &Account,
    owner_id: &str,
    date: &str,
) -> ServiceResult<Vec<RoutineForDate>> {
    let day = parse_date(date)?;
    let key = day.format(DATE_FORMAT).to_string();

    Ok(list(proxy, actor, owner_id)
        .await?
        .into_iter()
        .filter(|r| r.applies_on(day))
        .map(|routine| {
            let done = routine.is_done(&key);
            RoutineForDate { routine, done }
        })
        .collect())
}

pub async fn delete(proxy: &StoreProxy, owner: &Account, routine_id: &str) -> ServiceResult<()> {
    let path = proxy.paths().routine(&owner.user_id, routine_id);
    if proxy.store().get(&path).await?.is_none() {
        return Err(ServiceError::NotFound("루틴"));
    }
    proxy.store().delete(&path).await?;
    Ok(())
}

/// Sets the completion flag of one date. Only a false -> true change pays
/// the routine reward, so toggling back and forth pays once per rising edge.
pub async fn toggle(
    proxy: &StoreProxy,
    owner: &Account,
    routine_id: &str,
    date: &str,
    done: bool,
) -> ServiceResult<RoutineToggle> {
    let day = parse_date(date)?;
    let key = day.format(DATE_FORMAT).to_string();
    let path = proxy.paths().routine(&owner.user_id, routine_id);

    let mut routine: Routine = proxy.read(&path).await?.ok_or(ServiceError::NotFound("루틴"))?;
    if !routine.applies_on(day) {
        return Err(ServiceError::Validation(format!("{key}은(는) 이 루틴의 요일이 아닙니다")));
    }

    let previous = routine.completions.get(&key).copied().map_or(Value::Null, Value::Bool);
    let outcome = toggle_completion(&mut routine.completions, &key, done);

    let field = format!("completions.{key}");
    let mut patch = Map::new();
    patch.insert(field.clone(), Value::Bool(done));

    let applied = proxy
        .store()
        .merge_if(&path, Precondition::field_equals(field, previous), patch)
        .await
        .map_err(|err| match err {
            StoreError::NotFound(_) => ServiceError::NotFound("루틴"),
            other => other.into(),
        })?;
    if !applied {
        return Err(ServiceError::Conflict("다른 곳에서 먼저 체크했습니다".to_string()));
    }

    let profile = if outcome.is_granted() {
        profile::apply_reward(proxy, &owner.user_id, &owner.user_id, &routine_reward()).await?
    } else {
        None
    };

    tracing::debug!(
        owner_id = %owner.user_id,
        routine_id,
        date = %key,
        done,
        granted = outcome.is_granted(),
        "routine toggled"
    );
    Ok(RoutineToggle {
        routine,
        granted: outcome.is_granted(),
        profile,
    })
}
