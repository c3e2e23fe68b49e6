use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::require_account;
use crate::response::{ok, AppError};
use crate::services::journals;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateBody {
    content: String,
}

#[derive(Debug, Deserialize)]
struct GradeBody {
    answers: Vec<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id/quiz", post(generate_quiz))
        .route("/:id/quiz/grade", post(grade_quiz))
}

async fn list(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, AppError> {
    let account = require_account(&state, &headers)?;
    Ok(ok(journals::list(state.proxy(), &account, &account.user_id).await?))
}

async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, AppError> {
    let account = require_account(&state, &headers)?;
    let outcome = journals::create_entry(state.proxy(), state.generator(), &account, &body.content).await?;
    Ok(ok(outcome))
}

async fn generate_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let account = require_account(&state, &headers)?;
    let entry = journals::generate_quiz(state.proxy(), state.generator(), &account, &id).await?;
    Ok(ok(entry))
}

async fn grade_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<GradeBody>,
) -> Result<impl IntoResponse, AppError> {
    let account = require_account(&state, &headers)?;
    let outcome = journals::grade_quiz(state.proxy(), &account, &id, body.answers).await?;
    Ok(ok(outcome))
}
