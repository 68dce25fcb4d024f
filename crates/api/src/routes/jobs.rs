use axum::{
    extract::{Path, State},
    Json,
};

use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/v1/jobs/{id}",
    params(("id" = String, Path, description = "Job ID")),
    responses((status = 200, description = "Job status", body = jobs::JobStatus))
)]
pub async fn status(State(state): State<AppState>, Path(id): Path<String>) -> Json<serde_json::Value> {
    match state.jobs.get(&id) {
        None => Json(serde_json::json!({"status": "not_found"})),
        Some(s) => Json(serde_json::to_value(s).unwrap()),
    }
}

#[utoipa::path(
    get,
    path = "/v1/jobs/{id}/result",
    params(("id" = String, Path, description = "Job ID")),
    responses((status = 200, description = "Solution payload, if solved", body = types::TimetableSolution))
)]
pub async fn result(State(state): State<AppState>, Path(id): Path<String>) -> Json<serde_json::Value> {
    match state.jobs.get(&id) {
        Some(jobs::JobStatus::Solved { result }) => Json(serde_json::to_value(result).unwrap()),
        Some(other) => Json(serde_json::to_value(other).unwrap()),
        None => Json(serde_json::json!({"status": "not_found"})),
    }
}
