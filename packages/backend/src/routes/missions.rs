use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;

use super::require_account;
use crate::response::{ok, AppError};
use crate::services::missions;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/generate", post(generate))
        .route("/:id/submit", post(submit))
        .route("/:id/toggle", post(toggle))
}

async fn list(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, AppError> {
    let account = require_account(&state, &headers)?;
    let missions = missions::list_for_student(state.proxy(), &account, &account.user_id).await?;
    Ok(ok(missions))
}

async fn generate(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, AppError> {
    let account = require_account(&state, &headers)?;
    let missions =
        missions::generate_missions(state.proxy(), state.generator(), &account, &account.user_id).await?;
    Ok(ok(missions))
}

async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let account = require_account(&state, &headers)?;
    let mission = missions::submit(state.proxy(), &account, &id).await?;
    Ok(ok(mission))
}

async fn toggle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let account = require_account(&state, &headers)?;
    let outcome = missions::toggle_completion(state.proxy(), &account, &id).await?;
    Ok(ok(outcome))
}
