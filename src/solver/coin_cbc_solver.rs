// COIN-OR CBC Solver Adapter
// Implements the SolverService interface for CBC through good_lp

use super::{good_lp_model::solve_with, solution_from_values, statistics};
use crate::domain::{
    models::{OptimizationProblem, Solution},
    solver_service::{ProgressSink, Result, SolverService},
    value_objects::SolutionStatus,
};
use good_lp::{solvers::coin_cbc::coin_cbc, ResolutionError};
use std::time::Instant;

#[derive(Debug, Default)]
pub struct CoinCbcSolver;

impl CoinCbcSolver {
    pub fn new() -> Self {
        Self
    }
}

impl SolverService for CoinCbcSolver {
    fn solve(&self, problem: &OptimizationProblem, progress: &ProgressSink) -> Result<Solution> {
        self.validate(problem)?;

        let config = &problem.solver_config;
        let started = Instant::now();
        let outcome = solve_with(problem, coin_cbc, |model| {
            if let Some(limit) = config.time_limit {
                model.set_parameter("seconds", &limit.to_string());
            }
            model.set_parameter("threads", &config.num_workers.to_string());
            if !config.verbose {
                model.set_parameter("log", "0");
            }
        });
        let elapsed = started.elapsed();
        let stats = statistics(problem, elapsed);

        Ok(match outcome {
            Ok(values) => {
                // CBC returns its incumbent when the clock runs out.
                let hit_limit = config
                    .time_limit
                    .is_some_and(|limit| elapsed.as_secs_f64() >= limit);
                solution_from_values(problem, &values, !hit_limit, progress, stats)
            }
            Err(ResolutionError::Infeasible) => Solution::new(
                SolutionStatus::Infeasible,
                "Problem is infeasible: no solution satisfies all constraints",
            )
            .with_statistics(stats),
            Err(e) => Solution::new(SolutionStatus::Unknown, format!("CBC failed: {e}"))
                .with_statistics(stats),
        })
    }

    fn name(&self) -> &str {
        "COIN-OR CBC"
    }

    fn honours_time_limit(&self) -> bool {
        true
    }
}
