use std::sync::Arc;
use std::time::Duration;

use jobs::{InMemJobs, JobStatus};
use solver_milp::MilpSolver;

use crate::projects::ProjectStore;

#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<InMemJobs<MilpSolver>>,
    pub projects: Arc<ProjectStore>,
}

impl AppState {
    pub fn new_default() -> Self {
        Self {
            jobs: Arc::new(InMemJobs::new(MilpSolver::new())),
            projects: Arc::new(ProjectStore::new()),
        }
    }
}

/// Polls a just-enqueued solve job until it reaches a terminal status,
/// then attaches the result to its owning project. The jobs store has no
/// completion callback of its own (it's a plain status map, the way the
/// teacher's `InMemJobs` is), so this is the glue between "a job
/// finished" and "a project's `last_solution` changed".
pub fn spawn_attach_watcher(state: AppState, project_id: String, job_id: String) {
    tokio::spawn(async move {
        loop {
            match state.jobs.get(&job_id) {
                Some(JobStatus::Solved { result }) => {
                    state
                        .projects
                        .attach_solution_if_current(&project_id, &job_id, result);
                    return;
                }
                Some(JobStatus::Infeasible { .. }) | Some(JobStatus::Failed { .. }) | None => {
                    return;
                }
                Some(JobStatus::Queued) | Some(JobStatus::Running) => {
                    tokio::time::sleep(Duration::from_millis(25)).await;
                }
            }
        }
    });
}
