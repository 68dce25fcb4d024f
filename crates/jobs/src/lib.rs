use parking_lot::RwLock;
use sched_core::{EngineError, Solver};
use std::collections::HashMap;
use tracing::error;
use types::{TimetableProblem, TimetableSolution};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, ToSchema)]
pub struct JobId(pub String);

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, ToSchema)]
#[serde(tag = "status")]
pub enum JobStatus {
    Queued,
    Running,
    Solved { result: TimetableSolution },
    Infeasible { message: String },
    Failed { message: String },
}

#[derive(Clone)]
pub struct InMemJobs<S: Solver> {
    inner: std::sync::Arc<RwLock<HashMap<String, JobStatus>>>,
    solver: std::sync::Arc<S>,
}

impl<S: Solver> InMemJobs<S> {
    pub fn new(solver: S) -> Self {
        Self {
            inner: Default::default(),
            solver: std::sync::Arc::new(solver),
        }
    }

    pub fn enqueue(&self, problem: TimetableProblem) -> JobId {
        let id = Uuid::new_v4().to_string();
        self.inner.write().insert(id.clone(), JobStatus::Queued);

        let map = self.inner.clone();
        let solver = self.solver.clone();
        let id_for_task = id.clone();

        tokio::spawn(async move {
            {
                let mut w = map.write();
                w.insert(id_for_task.clone(), JobStatus::Running);
            }
            match solver.solve(problem).await {
                Ok(result) => {
                    map.write()
                        .insert(id_for_task, JobStatus::Solved { result });
                }
                Err(e) => {
                    error!(error = %e, "solve job failed");
                    let status = match e.downcast_ref::<EngineError>() {
                        Some(EngineError::NoSolution { status }) => JobStatus::Infeasible {
                            message: status.clone(),
                        },
                        _ => JobStatus::Failed {
                            message: e.to_string(),
                        },
                    };
                    map.write().insert(id_for_task, status);
                }
            }
        });

        JobId(id)
    }

    pub fn get(&self, id: &str) -> Option<JobStatus> {
        self.inner.read().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use types::TimetableSolution;

    struct StubSolver {
        outcome: Outcome,
    }

    #[derive(Clone)]
    enum Outcome {
        Solved,
        Infeasible,
        Failed,
    }

    #[async_trait]
    impl Solver for StubSolver {
        async fn solve(&self, _problem: TimetableProblem) -> anyhow::Result<TimetableSolution> {
            match self.outcome {
                Outcome::Solved => Ok(TimetableSolution::default()),
                Outcome::Infeasible => Err(EngineError::NoSolution {
                    status: "INFEASIBLE".into(),
                }
                .into()),
                Outcome::Failed => Err(anyhow::anyhow!("boom")),
            }
        }
    }

    fn empty_problem() -> TimetableProblem {
        TimetableProblem {
            calendar: types::Calendar {
                days: vec!["mon".into()],
                periods_per_day: 1,
                blocked_slots: Default::default(),
            },
            groups: Vec::new(),
            subjects: Vec::new(),
            teachers: Vec::new(),
            rooms: Vec::new(),
            requirements: Vec::new(),
            config: Default::default(),
        }
    }

    async fn await_terminal<S: Solver>(jobs: &InMemJobs<S>, id: &str) -> JobStatus {
        for _ in 0..200 {
            match jobs.get(id) {
                Some(JobStatus::Queued) | Some(JobStatus::Running) | None => {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                Some(other) => return other,
            }
        }
        panic!("job {id} never reached a terminal status");
    }

    #[tokio::test]
    async fn enqueue_transitions_to_solved() {
        let jobs = InMemJobs::new(StubSolver { outcome: Outcome::Solved });
        let id = jobs.enqueue(empty_problem());
        match await_terminal(&jobs, &id.0).await {
            JobStatus::Solved { .. } => {}
            other => panic!("expected Solved, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn engine_no_solution_becomes_infeasible_not_failed() {
        let jobs = InMemJobs::new(StubSolver { outcome: Outcome::Infeasible });
        let id = jobs.enqueue(empty_problem());
        match await_terminal(&jobs, &id.0).await {
            JobStatus::Infeasible { .. } => {}
            other => panic!("expected Infeasible, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unrelated_error_becomes_failed() {
        let jobs = InMemJobs::new(StubSolver { outcome: Outcome::Failed });
        let id = jobs.enqueue(empty_problem());
        match await_terminal(&jobs, &id.0).await {
            JobStatus::Failed { .. } => {}
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_job_id_returns_none() {
        let jobs = InMemJobs::new(StubSolver { outcome: Outcome::Solved });
        assert!(jobs.get("does-not-exist").is_none());
    }
}
