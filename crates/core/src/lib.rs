pub mod compile;
pub mod error;
pub mod io;
pub mod validate;

use async_trait::async_trait;

pub use error::EngineError;
pub use validate::{validate_problem, ValidationReport};

pub use types::{TimetableProblem, TimetableSolution};

/// Implemented by each solver tier (MILP-backed, deterministic
/// fallback). Operates directly on the public problem/solution types —
/// callers compile and validate beforehand.
#[async_trait]
pub trait Solver: Send + Sync + 'static {
    async fn solve(&self, problem: TimetableProblem) -> anyhow::Result<TimetableSolution>;
}
