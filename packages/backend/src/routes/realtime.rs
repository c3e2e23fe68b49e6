use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;

use super::require_session;
use crate::auth::Account;
use crate::response::AppError;
use crate::state::AppState;
use crate::store::{DocPaths, DocumentChange, ListenerGuard};

#[derive(Debug, Deserialize)]
struct StreamQuery {
    scope: Option<String>,
    token: Option<String>,
}

/// What a stream listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamScope {
    /// The caller's own documents: profile, journals, routines.
    Me,
    /// Missions; students only see their own.
    Missions,
    /// Public student mirrors (teachers).
    Students,
    /// Analysis reports (teachers).
    Reports,
}

impl StreamScope {
    fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim).unwrap_or("me") {
            "" | "me" => Some(Self::Me),
            "missions" => Some(Self::Missions),
            "students" => Some(Self::Students),
            "reports" => Some(Self::Reports),
            _ => None,
        }
    }

    fn prefix(self, paths: &DocPaths, user_id: &str) -> String {
        match self {
            Self::Me => paths.user_prefix(user_id),
            Self::Missions => format!("{}/", paths.missions()),
            Self::Students => format!("{}/", paths.public_profiles()),
            Self::Reports => format!("{}/", paths.reports()),
        }
    }

    fn teacher_only(self) -> bool {
        matches!(self, Self::Students | Self::Reports)
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/stream", get(stream_changes))
}

/// Students only receive mission snapshots, deletes included, that belong
/// to them.
fn visible_to(account: &Account, scope: StreamScope, change: &DocumentChange) -> bool {
    if scope != StreamScope::Missions || account.is_teacher() {
        return true;
    }
    change.field("studentId").and_then(|v| v.as_str()) == Some(account.user_id.as_str())
}

async fn stream_changes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StreamQuery>,
) -> Result<impl IntoResponse, AppError> {
    let claims = require_session(&state, &headers, query.token.clone())?;
    let account = claims
        .account()
        .ok_or_else(|| AppError::unauthorized("로그인이 필요합니다"))?;

    let scope = StreamScope::parse(query.scope.as_deref())
        .ok_or_else(|| AppError::validation("알 수 없는 구독 범위입니다"))?;
    if scope.teacher_only() && !account.is_teacher() {
        return Err(AppError::forbidden("선생님만 사용할 수 있습니다"));
    }

    let prefix = scope.prefix(state.proxy().paths(), &account.user_id);
    let feed = state.proxy().change_feed();
    let (subscriber_id, receiver) = feed.subscribe(prefix.clone()).await;
    let guard = ListenerGuard::new(feed, subscriber_id);

    tracing::debug!(user_id = %account.user_id, ?scope, prefix = %prefix, "realtime stream opened");

    let changes = BroadcastStream::new(receiver).filter_map(move |msg| {
        let _guard = &guard;
        let visible = match &msg {
            Ok(change) => visible_to(&account, scope, change),
            Err(_) => false,
        };

        async move {
            match msg {
                Ok(change) if visible => {
                    let event = Event::default()
                        .event("snapshot")
                        .json_data(&change)
                        .unwrap_or_else(|_| Event::default().event("error").data("encode failed"));
                    Some(Ok::<Event, Infallible>(event))
                }
                Ok(_) => None,
                Err(err) => {
                    // lagged receivers skip ahead; the next snapshot is the truth
                    tracing::warn!(error = %err, "realtime listener lagged");
                    None
                }
            }
        }
    });

    let ready = stream::once(async move {
        Ok::<Event, Infallible>(
            Event::default()
                .event("ready")
                .data(serde_json::json!({ "prefix": prefix }).to_string()),
        )
    });

    Ok(Sse::new(ready.chain(changes)).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quest_algo::Role;
    use serde_json::json;

    fn account(role: Role) -> Account {
        Account {
            user_id: "s1".into(),
            display_name: "민지".into(),
            role,
        }
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!(StreamScope::parse(None), Some(StreamScope::Me));
        assert_eq!(StreamScope::parse(Some("missions")), Some(StreamScope::Missions));
        assert_eq!(StreamScope::parse(Some("everything")), None);
        assert!(StreamScope::Students.teacher_only());
    }

    #[test]
    fn test_students_only_see_own_missions() {
        let own = DocumentChange::set("m/1", json!({ "studentId": "s1" }));
        let other = DocumentChange::set("m/2", json!({ "studentId": "s2" }));

        let student = account(Role::Student);
        assert!(visible_to(&student, StreamScope::Missions, &own));
        assert!(!visible_to(&student, StreamScope::Missions, &other));
        assert!(visible_to(&account(Role::Teacher), StreamScope::Missions, &other));
    }

    #[test]
    fn test_students_only_see_own_mission_deletes() {
        let own = DocumentChange::deleted("m/1", json!({ "studentId": "s1" }));
        let other = DocumentChange::deleted("m/2", json!({ "studentId": "s2" }));

        let student = account(Role::Student);
        assert!(visible_to(&student, StreamScope::Missions, &own));
        assert!(!visible_to(&student, StreamScope::Missions, &other));
        assert!(visible_to(&account(Role::Teacher), StreamScope::Missions, &other));
    }
}
