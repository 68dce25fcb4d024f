//! In-memory project store. Stands in for the persistence layer the
//! spec calls out as a boundary concern (`original_source`'s
//! `ProjectRepository`/`sql_project_repository` pair) — a caller that
//! wants real durability swaps this module for one backed by a
//! database without touching the solve/validate pipeline.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use types::{TimetableProblem, TimetableSolution};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ProjectDetail {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub problem: TimetableProblem,
    pub last_solution: Option<TimetableSolution>,
}

#[derive(Clone, Debug)]
struct ProjectRecord {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    problem: TimetableProblem,
    last_solution: Option<TimetableSolution>,
    last_job_id: Option<String>,
}

impl From<&ProjectRecord> for ProjectSummary {
    fn from(p: &ProjectRecord) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl From<&ProjectRecord> for ProjectDetail {
    fn from(p: &ProjectRecord) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            created_at: p.created_at,
            updated_at: p.updated_at,
            problem: p.problem.clone(),
            last_solution: p.last_solution.clone(),
        }
    }
}

/// Mirrors `services.errors.NotFoundError` from the source this engine
/// was distilled from.
#[derive(Debug)]
pub struct ProjectNotFound(pub String);

#[derive(Default)]
pub struct ProjectStore {
    inner: RwLock<HashMap<String, ProjectRecord>>,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> Vec<ProjectSummary> {
        let inner = self.inner.read();
        let mut out: Vec<ProjectSummary> = inner.values().map(ProjectSummary::from).collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        out
    }

    pub fn create(&self, name: String, problem: TimetableProblem) -> ProjectDetail {
        let now = Utc::now();
        let record = ProjectRecord {
            id: Uuid::new_v4().to_string(),
            name,
            created_at: now,
            updated_at: now,
            problem,
            last_solution: None,
            last_job_id: None,
        };
        let detail = ProjectDetail::from(&record);
        self.inner.write().insert(record.id.clone(), record);
        detail
    }

    pub fn get(&self, id: &str) -> Result<ProjectDetail, ProjectNotFound> {
        self.inner
            .read()
            .get(id)
            .map(ProjectDetail::from)
            .ok_or_else(|| ProjectNotFound(id.to_string()))
    }

    pub fn problem_of(&self, id: &str) -> Result<TimetableProblem, ProjectNotFound> {
        self.inner
            .read()
            .get(id)
            .map(|p| p.problem.clone())
            .ok_or_else(|| ProjectNotFound(id.to_string()))
    }

    pub fn update(
        &self,
        id: &str,
        name: Option<String>,
        problem: Option<TimetableProblem>,
    ) -> Result<ProjectDetail, ProjectNotFound> {
        let mut inner = self.inner.write();
        let record = inner.get_mut(id).ok_or_else(|| ProjectNotFound(id.to_string()))?;
        if let Some(name) = name {
            record.name = name;
        }
        if let Some(problem) = problem {
            record.problem = problem;
        }
        record.updated_at = Utc::now();
        Ok(ProjectDetail::from(&*record))
    }

    pub fn delete(&self, id: &str) -> Result<(), ProjectNotFound> {
        self.inner
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ProjectNotFound(id.to_string()))
    }

    pub fn set_last_job(&self, id: &str, job_id: String) {
        if let Some(record) = self.inner.write().get_mut(id) {
            record.last_job_id = Some(job_id);
        }
    }

    /// Attaches a solve result, but only if `job_id` still matches the
    /// project's current solve job — guards against a stale watcher from
    /// a superseded solve overwriting a newer one.
    pub fn attach_solution_if_current(&self, id: &str, job_id: &str, solution: TimetableSolution) {
        let mut inner = self.inner.write();
        if let Some(record) = inner.get_mut(id) {
            if record.last_job_id.as_deref() == Some(job_id) {
                record.last_solution = Some(solution);
                record.updated_at = Utc::now();
            }
        }
    }
}
