mod error;
mod projects;
mod state;
mod telemetry;
pub mod routes {
    pub mod health;
    pub mod jobs;
    pub mod projects;
}

use axum::{
    routing::{get, post},
    Router,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health,
        routes::projects::list,
        routes::projects::create,
        routes::projects::get,
        routes::projects::update,
        routes::projects::delete,
        routes::projects::validate,
        routes::projects::solve,
        routes::jobs::status,
        routes::jobs::result,
    ),
    components(schemas(
        types::Calendar, types::Slot, types::Group, types::Subject, types::RoomType,
        types::Teacher, types::Room, types::CourseRequirement, types::TeacherPolicy,
        types::ObjectiveWeights, types::SolveConfig, types::TimetableProblem,
        types::Event, types::ScheduledEvent, types::TeacherAssignment, types::TimetableSolution,
        crate::projects::ProjectSummary, crate::projects::ProjectDetail,
        routes::projects::ProjectCreateRequest, routes::projects::ProjectUpdateRequest,
        routes::projects::ValidationReport, routes::projects::SolveEnqueued,
        jobs::JobId, jobs::JobStatus,
    )),
    tags(
        (name = "unischedule", description = "School timetabling API")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let app_state = state::AppState::new_default();

    let app = Router::new()
        .route("/v1/health", get(routes::health::health))
        .route(
            "/v1/projects",
            get(routes::projects::list).post(routes::projects::create),
        )
        .route(
            "/v1/projects/:id",
            get(routes::projects::get)
                .put(routes::projects::update)
                .delete(routes::projects::delete),
        )
        .route("/v1/projects/:id/validate", post(routes::projects::validate))
        .route("/v1/projects/:id/solve", post(routes::projects::solve))
        .route("/v1/jobs/:id", get(routes::jobs::status))
        .route("/v1/jobs/:id/result", get(routes::jobs::result))
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(telemetry::stack())
        .with_state(app_state);

    let port = std::env::var("UNISCHEDULE__SERVER__PORT").unwrap_or_else(|_| "8080".into());
    let addr: std::net::SocketAddr = format!("0.0.0.0:{}", port)
        .parse()
        .expect("invalid listen addr");
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
