// Solver adapters module
// Each backend translates the lowered problem to its engine and reports
// the outcome through the domain Solution type

#[cfg(feature = "coin_cbc")]
pub mod coin_cbc_solver;
pub mod factory;
mod good_lp_model;
#[cfg(feature = "highs")]
pub mod highs_solver;
pub mod microlp_solver;

#[cfg(feature = "coin_cbc")]
pub use coin_cbc_solver::CoinCbcSolver;
pub use factory::SolverFactory;
#[cfg(feature = "highs")]
pub use highs_solver::HighsSolver;
pub use microlp_solver::MicrolpSolver;

use crate::domain::{
    models::{OptimizationProblem, Solution, SolverStatistics},
    solver_service::ProgressSink,
    value_objects::SolutionStatus,
};
use std::time::Duration;

pub(crate) fn statistics(problem: &OptimizationProblem, elapsed: Duration) -> SolverStatistics {
    SolverStatistics {
        solve_time_ms: elapsed.as_secs_f64() * 1000.0,
        num_variables: problem.num_variables() as u32,
        num_constraints: problem.constraints.len() as u32,
        num_binary_vars: problem.num_binary_variables() as u32,
    }
}

/// Turns raw column values from a backend into a domain solution.
///
/// Values are rounded to integers and re-checked against the problem; a
/// backend that stopped early without a valid point yields `Unknown`.
pub(crate) fn solution_from_values(
    problem: &OptimizationProblem,
    raw: &[f64],
    proven_optimal: bool,
    progress: &ProgressSink,
    statistics: SolverStatistics,
) -> Solution {
    let values: Vec<f64> = raw.iter().map(|v| v.round()).collect();
    if !problem.is_satisfied_by(&values) {
        tracing::warn!(problem = %problem.name, "backend returned a point that violates the model");
        return Solution::new(
            SolutionStatus::Unknown,
            "Solver stopped without a valid assignment",
        )
        .with_statistics(statistics);
    }

    let objective = problem.objective.evaluate(&values);
    let solution = if proven_optimal {
        progress.improving_solution(objective, objective);
        Solution::optimal(objective, values)
    } else {
        progress.improving_solution(objective, f64::NAN);
        Solution::feasible(objective, values)
    };
    solution.with_statistics(statistics)
}
