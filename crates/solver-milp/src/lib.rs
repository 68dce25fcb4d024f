mod fallback;
#[cfg(feature = "with-milp")]
mod model;

use async_trait::async_trait;
use sched_core::compile::compile_problem;
use sched_core::{EngineError, Solver};
use tracing::info;
use types::{TimetableProblem, TimetableSolution};

pub use fallback::solve_fallback;

pub struct MilpSolver;

impl MilpSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MilpSolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Solver for MilpSolver {
    async fn solve(&self, problem: TimetableProblem) -> anyhow::Result<TimetableSolution> {
        info!(
            requirements = problem.requirements.len(),
            groups = problem.groups.len(),
            "received instance"
        );
        let compiled = compile_problem(&problem)?;

        #[cfg(feature = "with-milp")]
        {
            match solve_with_milp(&problem, &compiled) {
                Ok(solution) => return Ok(solution),
                // A proven infeasible/unbounded model means no assignment
                // exists that honors every hard constraint (e.g. a
                // max_consecutive cap that can't be met on the available
                // days). The deterministic fallback doesn't enforce that
                // same constraint set, so handing it the problem here
                // would silently return a schedule that violates a hard
                // constraint instead of reporting the failure. Fail fast
                // per §4.5 instead.
                Err(good_lp::ResolutionError::Infeasible) | Err(good_lp::ResolutionError::Unbounded) => {
                    return Err(EngineError::NoSolution {
                        status: "INFEASIBLE".into(),
                    }
                    .into());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "milp backend failed unexpectedly, falling back to deterministic scan");
                }
            }
        }

        Ok(solve_fallback(&problem, &compiled)?)
    }
}

/// Threads `SolveConfig`'s time/seed limits into the CBC backend's own
/// CLI-style parameters (§4.5: "time limit = max_seconds, seed =
/// random_seed"). CBC has no notion of these at the `good_lp` trait
/// level, so this reaches past `SolverModel` to the concrete
/// `CoinCbcProblem` the default backend produces.
#[cfg(feature = "with-milp")]
fn configure_cbc_limits(
    model: &mut good_lp::solvers::coin_cbc::CoinCbcProblem,
    config: &types::SolveConfig,
) {
    if let Some(max_seconds) = config.max_seconds {
        model.set_parameter("sec", &max_seconds.to_string());
    }
    if let Some(seed) = config.random_seed {
        model.set_parameter("randomSeed", &seed.to_string());
    }
}

/// Runs the MILP tier to completion. Returns the raw `good_lp`
/// resolution error on failure (rather than wrapping it in `EngineError`
/// immediately) so the caller can tell a proven `Infeasible`/`Unbounded`
/// model apart from an unexpected backend failure and react differently
/// to each (see the call site in `solve`).
#[cfg(feature = "with-milp")]
fn solve_with_milp(
    problem: &TimetableProblem,
    compiled: &sched_core::compile::CompiledProblem,
) -> Result<TimetableSolution, good_lp::ResolutionError> {
    use good_lp::{default_solver, ProblemVariables, SolverModel};
    use model::*;

    if compiled.events.is_empty() {
        return Ok(TimetableSolution::default());
    }

    let prep = build_prep(problem, compiled);

    let mut pvars = ProblemVariables::new();
    let x = declare_x(&prep, &mut pvars);
    let y = declare_y(&prep, &mut pvars);
    let a = declare_a(&prep, &mut pvars);
    let occ = declare_occ(&prep, &mut pvars, &x);
    let teach = declare_teach(&prep, &mut pvars, &occ);
    let busy = declare_busy(&prep, &mut pvars, &teach);
    let w = declare_w(&prep, &mut pvars, &x, &y);
    let (gaps, late_vars) = declare_gap_and_late_vars(&prep, &mut pvars, &busy);
    let excess = declare_excess_vars(&prep, &mut pvars);
    let (pref_terms, forbidden_soft_terms) = collect_preference_terms(&prep, &occ);

    let gap_vars: Vec<_> = gaps.iter().map(|g| g.var).collect();
    let excess_vars: Vec<_> = excess.iter().map(|e| e.var).collect();
    let objective = build_objective(
        &problem.config.weights,
        gap_vars,
        late_vars,
        excess_vars,
        pref_terms,
        forbidden_soft_terms,
    );
    let weights = &problem.config.weights;
    let objective_declared = (!objective.gap_vars.is_empty() && weights.teacher_gaps != 0)
        || (!objective.late_vars.is_empty() && weights.teacher_late != 0)
        || (!objective.excess_vars.is_empty() && weights.subject_same_day_excess != 0)
        || (!objective.pref_terms.is_empty() && weights.preferred_period_penalty != 0)
        || (!objective.forbidden_soft_terms.is_empty() && weights.forbidden_period_penalty != 0);

    let mut model = pvars.minimise(objective.expr.clone()).using(default_solver);
    configure_cbc_limits(&mut model, &problem.config);
    model = add_event_once_constraints(model, &prep, &x);
    model = add_group_conflict_constraints(model, &prep, &x);
    model = add_teacher_assignment_constraints(model, &prep, &a);
    model = link_occ(model, &prep, &x, &occ);
    model = link_teach(model, &prep, &a, &occ, &teach);
    model = add_teacher_conflict_constraints(model, &prep, &teach, &busy);
    model = add_teacher_load_constraints(model, &prep, &busy);
    model = add_room_assignment_constraints(model, &prep, &y);
    model = add_room_availability_guard(model, &prep, &x, &y);
    model = link_w(model, &prep, &x, &y, &w);
    model = add_room_conflict_constraints(model, &prep, &w);
    model = add_max_consecutive_constraints(model, &prep, &occ);
    model = add_subject_max_per_day_constraints(model, &prep, &occ);
    model = add_gap_constraints(model, &busy, &gaps);
    model = add_excess_constraints(model, &occ, &excess);

    model
        .solve()
        .map(|sol| extract_solution(&prep, &x, &y, &a, &objective, objective_declared, &sol))
}
