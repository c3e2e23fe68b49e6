mod auth;
mod health;
mod journals;
mod missions;
mod profile;
mod realtime;
mod routines;
mod teacher;

use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::auth::{Account, AuthError, SessionClaims};
use crate::response::AppError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .merge(auth::router())
        .nest("/api/profile", profile::router())
        .nest("/api/missions", missions::router())
        .nest("/api/journals", journals::router())
        .nest("/api/routines", routines::router())
        .nest("/api/teacher", teacher::router())
        .nest("/api/realtime", realtime::router())
        .fallback(fallback_handler)
        .with_state(state)
}

/// Verified session from the bearer header or cookie, falling back to a
/// `?token=` query value (EventSource cannot set headers).
pub(crate) fn require_session(
    state: &AppState,
    headers: &HeaderMap,
    fallback_token: Option<String>,
) -> Result<SessionClaims, AppError> {
    let token = crate::auth::extract_token(headers)
        .or(fallback_token)
        .ok_or(AuthError::MissingToken)?;

    state.sessions().verify(&token).map_err(|err| {
        tracing::debug!(token = %crate::auth::token_fingerprint(&token), error = %err, "session rejected");
        AppError::from(err)
    })
}

/// Logged-in account; anonymous sessions are rejected.
pub(crate) fn require_account(state: &AppState, headers: &HeaderMap) -> Result<Account, AppError> {
    require_session(state, headers, None)?
        .account()
        .ok_or_else(|| AppError::unauthorized("로그인이 필요합니다"))
}

pub(crate) fn require_teacher(state: &AppState, headers: &HeaderMap) -> Result<Account, AppError> {
    let account = require_account(state, headers)?;
    if account.is_teacher() {
        Ok(account)
    } else {
        Err(AppError::forbidden("선생님만 사용할 수 있습니다"))
    }
}

async fn fallback_handler() -> Response {
    AppError::not_found("요청한 경로가 없습니다").into_response()
}
