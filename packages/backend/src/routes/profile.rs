use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use super::require_account;
use crate::response::{ok, AppError};
use crate::services::profile::{self, ProfileView};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameBody {
    display_name: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_profile).patch(rename))
}

async fn get_profile(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, AppError> {
    let account = require_account(&state, &headers)?;
    let profile = profile::ensure_profile(state.proxy(), &account).await?;
    Ok(ok(ProfileView::from(profile)))
}

async fn rename(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RenameBody>,
) -> Result<impl IntoResponse, AppError> {
    let account = require_account(&state, &headers)?;
    let profile = profile::rename(state.proxy(), &account, &body.display_name).await?;
    Ok(ok(ProfileView::from(profile)))
}
