use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sched_core::validate_problem;
use serde::{Deserialize, Serialize};
use types::TimetableProblem;
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    projects::{ProjectDetail, ProjectSummary},
    state::{spawn_attach_watcher, AppState},
};

#[derive(Deserialize, ToSchema)]
pub struct ProjectCreateRequest {
    pub name: String,
    pub problem: TimetableProblem,
}

#[derive(Deserialize, ToSchema)]
pub struct ProjectUpdateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub problem: Option<TimetableProblem>,
}

#[derive(Serialize, ToSchema)]
pub struct ValidationReport {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct SolveEnqueued {
    pub job_id: String,
    pub status: &'static str,
}

#[utoipa::path(
    get,
    path = "/v1/projects",
    responses((status = 200, description = "Project summaries", body = [ProjectSummary]))
)]
pub async fn list(State(state): State<AppState>) -> Json<Vec<ProjectSummary>> {
    Json(state.projects.list())
}

#[utoipa::path(
    post,
    path = "/v1/projects",
    request_body = ProjectCreateRequest,
    responses((status = 201, description = "Project created", body = ProjectDetail))
)]
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<ProjectCreateRequest>,
) -> (StatusCode, Json<ProjectDetail>) {
    let project = state.projects.create(body.name, body.problem);
    (StatusCode::CREATED, Json(project))
}

#[utoipa::path(
    get,
    path = "/v1/projects/{id}",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project detail", body = ProjectDetail),
        (status = 404, description = "Project not found")
    )
)]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProjectDetail>, ApiError> {
    Ok(Json(state.projects.get(&id)?))
}

#[utoipa::path(
    put,
    path = "/v1/projects/{id}",
    params(("id" = String, Path, description = "Project ID")),
    request_body = ProjectUpdateRequest,
    responses(
        (status = 200, description = "Project updated", body = ProjectDetail),
        (status = 404, description = "Project not found")
    )
)]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ProjectUpdateRequest>,
) -> Result<Json<ProjectDetail>, ApiError> {
    Ok(Json(state.projects.update(&id, body.name, body.problem)?))
}

#[utoipa::path(
    delete,
    path = "/v1/projects/{id}",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.projects.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Never returns 422 for a validation failure — an `ok: false` report is
/// a normal response shape here, not a transport error. 404 still
/// applies if the project itself doesn't exist.
#[utoipa::path(
    post,
    path = "/v1/projects/{id}/validate",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Validation result", body = ValidationReport),
        (status = 404, description = "Project not found")
    )
)]
pub async fn validate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ValidationReport>, ApiError> {
    let problem = state.projects.problem_of(&id)?;
    let report = validate_problem(&problem, false)?;
    Ok(Json(ValidationReport {
        ok: report.ok,
        errors: report.errors,
        warnings: report.warnings,
    }))
}

/// Rejects with 422 (carrying `errors[]`) if the embedded problem fails
/// strict validation before a job is even queued, the way the spec's
/// collaborator boundary requires.
#[utoipa::path(
    post,
    path = "/v1/projects/{id}/solve",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Solve job enqueued", body = SolveEnqueued),
        (status = 404, description = "Project not found"),
        (status = 422, description = "Problem fails strict validation")
    )
)]
pub async fn solve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SolveEnqueued>, ApiError> {
    let problem = state.projects.problem_of(&id)?;
    validate_problem(&problem, true)?;

    let job_id = state.jobs.enqueue(problem);
    state.projects.set_last_job(&id, job_id.0.clone());
    spawn_attach_watcher(state.clone(), id, job_id.0.clone());

    Ok(Json(SolveEnqueued {
        job_id: job_id.0,
        status: "queued",
    }))
}
