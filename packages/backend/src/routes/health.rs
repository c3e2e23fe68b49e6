use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthInfoResponse {
    service: &'static str,
    version: &'static str,
    start_time: String,
    uptime: u64,
    generator: String,
    listeners: usize,
    changes_published: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/info", get(info))
}

async fn root() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

async fn info(State(state): State<AppState>) -> Json<HealthInfoResponse> {
    let feed = state.proxy().change_feed();
    let start_time: DateTime<Utc> = state.started_at_system().into();

    Json(HealthInfoResponse {
        service: "quest-backend",
        version: env!("CARGO_PKG_VERSION"),
        start_time: start_time.to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime: state.uptime_seconds(),
        generator: state.generator().id().to_string(),
        listeners: feed.listener_count().await,
        changes_published: feed.change_count().await,
    })
}
