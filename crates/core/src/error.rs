use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("parse error at {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("validation failed: {0:?}")]
    ValidationFailed(Vec<String>),

    #[error("event {event_id} has an empty allowed-{domain} domain")]
    CompileError {
        event_id: String,
        domain: &'static str,
    },

    #[error("solver returned no usable solution: {status}")]
    NoSolution { status: String },

    #[error("model invariant violated for {context}: solver status {status}")]
    ModelInvariantViolation { context: String, status: String },
}
