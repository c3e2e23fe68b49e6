use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::require_account;
use crate::response::{ok, AppError};
use crate::services::routines::{self, NewRoutine};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ListQuery {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ToggleBody {
    date: String,
    done: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", delete(remove))
        .route("/:id/toggle", post(toggle))
}

/// All routines, or only those scheduled on `?date=YYYY-MM-DD`.
async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    let account = require_account(&state, &headers)?;
    let response = match query.date {
        Some(date) => {
            ok(routines::routines_for_date(state.proxy(), &account, &account.user_id, &date).await?).into_response()
        }
        None => ok(routines::list(state.proxy(), &account, &account.user_id).await?).into_response(),
    };
    Ok(response)
}

async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewRoutine>,
) -> Result<impl IntoResponse, AppError> {
    let account = require_account(&state, &headers)?;
    Ok(ok(routines::create(state.proxy(), &account, body).await?))
}

async fn remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let account = require_account(&state, &headers)?;
    routines::delete(state.proxy(), &account, &id).await?;
    Ok(ok(serde_json::json!({ "deleted": id })))
}

async fn toggle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ToggleBody>,
) -> Result<impl IntoResponse, AppError> {
    let account = require_account(&state, &headers)?;
    let outcome = routines::toggle(state.proxy(), &account, &id, &body.date, body.done).await?;
    Ok(ok(outcome))
}
