use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sched_core::EngineError;
use serde::Serialize;

use crate::projects::ProjectNotFound;

/// Maps engine/store failures onto the status codes the spec's
/// collaborator boundary lays out: 404 for a missing project, 422 for
/// validation failures carrying `errors[]`, 400 for every other domain
/// error (parse/compile/solve failure).
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Validation(Vec<String>),
    BadRequest(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl From<ProjectNotFound> for ApiError {
    fn from(e: ProjectNotFound) -> Self {
        ApiError::NotFound(format!("project '{}' not found", e.0))
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::ValidationFailed(errors) => ApiError::Validation(errors),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<EngineError>() {
            Ok(engine_err) => ApiError::from(engine_err),
            Err(e) => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorBody { message, errors: vec![] },
            ),
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    message: "validation failed".into(),
                    errors,
                },
            ),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody { message, errors: vec![] },
            ),
        };
        (status, Json(body)).into_response()
    }
}
