// microlp Solver Adapter
// Pure-Rust branch and bound through good_lp, always compiled in.
// microlp has no time limit of its own; the gateway enforces the budget.

use super::{good_lp_model::solve_with, solution_from_values, statistics};
use crate::domain::{
    models::{OptimizationProblem, Solution},
    solver_service::{ProgressSink, Result, SolverService},
    value_objects::SolutionStatus,
};
use good_lp::{solvers::microlp::microlp, ResolutionError};
use std::time::Instant;

#[derive(Debug, Default)]
pub struct MicrolpSolver;

impl MicrolpSolver {
    pub fn new() -> Self {
        Self
    }
}

impl SolverService for MicrolpSolver {
    fn solve(&self, problem: &OptimizationProblem, progress: &ProgressSink) -> Result<Solution> {
        self.validate(problem)?;

        let started = Instant::now();
        let outcome = solve_with(problem, microlp, |_| {});
        let stats = statistics(problem, started.elapsed());

        Ok(match outcome {
            Ok(values) => solution_from_values(problem, &values, true, progress, stats),
            Err(ResolutionError::Infeasible) => Solution::new(
                SolutionStatus::Infeasible,
                "Problem is infeasible: no solution satisfies all constraints",
            )
            .with_statistics(stats),
            Err(e) => {
                tracing::warn!(error = %e, "microlp failed");
                Solution::new(SolutionStatus::Unknown, format!("microlp failed: {e}"))
                    .with_statistics(stats)
            }
        })
    }

    fn name(&self) -> &str {
        "microlp"
    }

    fn honours_time_limit(&self) -> bool {
        false
    }
}
