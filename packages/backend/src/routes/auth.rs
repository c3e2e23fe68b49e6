use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::require_session;
use crate::auth::{Account, AuthError, SessionClaims, SESSION_COOKIE_NAME};
use crate::response::{ok, AppError};
use crate::services::profile::{self, ProfileView};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody {
    display_name: String,
    code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionData {
    token: String,
    user_id: String,
    expires_at: DateTime<Utc>,
    anonymous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    account: Option<Account>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<ProfileView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MeData {
    user_id: String,
    anonymous: bool,
    expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    account: Option<Account>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<ProfileView>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/session/anonymous", post(anonymous_session))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

fn session_cookie(token: &str, claims: &SessionClaims) -> String {
    let max_age = (claims.exp - claims.iat).max(0);
    format!("{SESSION_COOKIE_NAME}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}")
}

async fn anonymous_session(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let (token, claims) = state.sessions().issue_anonymous()?;
    let cookie = session_cookie(&token, &claims);

    let data = SessionData {
        token,
        user_id: claims.sub.clone(),
        expires_at: claims.expires_at(),
        anonymous: true,
        account: None,
        profile: None,
    };
    Ok(([(header::SET_COOKIE, cookie)], ok(data)))
}

async fn login(State(state): State<AppState>, Json(body): Json<LoginBody>) -> Result<impl IntoResponse, AppError> {
    let account = state
        .credentials()
        .verify(&body.display_name, body.code.trim())
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let profile = profile::ensure_profile(state.proxy(), &account).await?;
    let (token, claims) = state.sessions().issue_for(&account)?;
    let cookie = session_cookie(&token, &claims);

    tracing::info!(user_id = %account.user_id, role = account.role.as_str(), "login succeeded");

    let data = SessionData {
        token,
        user_id: account.user_id.clone(),
        expires_at: claims.expires_at(),
        anonymous: false,
        account: Some(account),
        profile: Some(profile.into()),
    };
    Ok(([(header::SET_COOKIE, cookie)], ok(data)))
}

async fn logout() -> impl IntoResponse {
    let cookie = format!("{SESSION_COOKIE_NAME}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0");
    ([(header::SET_COOKIE, cookie)], ok(serde_json::json!({ "loggedOut": true })))
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, AppError> {
    let claims = require_session(&state, &headers, None)?;
    let account = claims.account();

    let profile = match &account {
        Some(account) => profile::find(state.proxy(), &account.user_id)
            .await?
            .map(ProfileView::from),
        None => None,
    };

    Ok(ok(MeData {
        user_id: claims.sub.clone(),
        anonymous: account.is_none(),
        expires_at: claims.expires_at(),
        account,
        profile,
    }))
}
