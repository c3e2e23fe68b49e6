use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::require_teacher;
use crate::response::{ok, AppError};
use crate::services::analysis::{self, AnalysisReport};
use crate::services::missions::{self, MissionDraft};
use crate::services::profile::{self, ProfileView};
use crate::services::{journals, routines};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct VisibilityBody {
    deleted: bool,
}

#[derive(Debug, Deserialize)]
struct RecommendBody {
    missions: Vec<MissionDraft>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StudentSummary {
    #[serde(flatten)]
    profile: ProfileView,
    completed_missions: usize,
    open_missions: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportData {
    report: Option<AnalysisReport>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/students", get(list_students))
        .route("/students/:id", get(student_detail))
        .route("/students/:id/visibility", patch(set_visibility))
        .route("/students/:id/missions", get(student_missions))
        .route("/students/:id/missions/generate", post(generate_missions))
        .route("/students/:id/missions/recommend", post(recommend_missions))
        .route("/students/:id/journals", get(student_journals))
        .route("/students/:id/routines", get(student_routines))
        .route("/students/:id/report", get(get_report).post(generate_report))
        .route("/missions/:id/approve", post(approve))
        .route("/missions/:id/reject", post(reject))
        .route("/missions/:id/toggle", post(toggle))
        .route("/missions/:id", delete(delete_mission))
}

async fn list_students(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, AppError> {
    require_teacher(&state, &headers)?;
    let students: Vec<ProfileView> = profile::list_students(state.proxy())
        .await?
        .into_iter()
        .map(ProfileView::from)
        .collect();
    Ok(ok(students))
}

async fn student_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = require_teacher(&state, &headers)?;
    let student = profile::get_public(state.proxy(), &id).await?;
    let missions = missions::list_for_student(state.proxy(), &teacher, &id).await?;

    Ok(ok(StudentSummary {
        profile: student.into(),
        completed_missions: missions.iter().filter(|m| m.state.is_completed()).count(),
        open_missions: missions.iter().filter(|m| m.state.is_open()).count(),
    }))
}

async fn set_visibility(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<VisibilityBody>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = require_teacher(&state, &headers)?;
    let student = profile::set_deleted(state.proxy(), &teacher, &id, body.deleted).await?;
    Ok(ok(ProfileView::from(student)))
}

async fn student_missions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = require_teacher(&state, &headers)?;
    Ok(ok(missions::list_for_student(state.proxy(), &teacher, &id).await?))
}

async fn generate_missions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = require_teacher(&state, &headers)?;
    let created = missions::generate_missions(state.proxy(), state.generator(), &teacher, &id).await?;
    Ok(ok(created))
}

async fn recommend_missions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<RecommendBody>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = require_teacher(&state, &headers)?;
    let created = missions::recommend_missions(state.proxy(), &teacher, &id, body.missions).await?;
    Ok(ok(created))
}

async fn student_journals(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = require_teacher(&state, &headers)?;
    Ok(ok(journals::list(state.proxy(), &teacher, &id).await?))
}

async fn student_routines(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = require_teacher(&state, &headers)?;
    Ok(ok(routines::list(state.proxy(), &teacher, &id).await?))
}

async fn get_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = require_teacher(&state, &headers)?;
    let report = analysis::get_report(state.proxy(), &teacher, &id).await?;
    Ok(ok(ReportData { report }))
}

async fn generate_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = require_teacher(&state, &headers)?;
    let report = analysis::generate_report(state.proxy(), state.generator(), &teacher, &id).await?;
    Ok(ok(ReportData { report: Some(report) }))
}

async fn approve(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = require_teacher(&state, &headers)?;
    Ok(ok(missions::approve(state.proxy(), &teacher, &id).await?))
}

async fn reject(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = require_teacher(&state, &headers)?;
    Ok(ok(missions::reject(state.proxy(), &teacher, &id).await?))
}

async fn toggle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = require_teacher(&state, &headers)?;
    Ok(ok(missions::toggle_completion(state.proxy(), &teacher, &id).await?))
}

async fn delete_mission(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = require_teacher(&state, &headers)?;
    missions::delete(state.proxy(), &teacher, &id).await?;
    Ok(ok(serde_json::json!({ "deleted": id })))
}
