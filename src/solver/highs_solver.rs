// HiGHS Solver Adapter
// Implements the SolverService interface for HiGHS
// Translates the lowered problem straight to the HiGHS row API

use super::{solution_from_values, statistics};
use crate::domain::{
    models::{OptimizationProblem, Solution},
    solver_service::{ProgressSink, Result, SolverService},
    value_objects::{ConstraintType, OptimizationType, SolutionStatus},
};
use highs::{HighsModelStatus, RowProblem, Sense};
use std::time::Instant;

#[derive(Debug, Default)]
pub struct HighsSolver;

impl HighsSolver {
    pub fn new() -> Self {
        Self
    }
}

impl SolverService for HighsSolver {
    fn solve(&self, problem: &OptimizationProblem, progress: &ProgressSink) -> Result<Solution> {
        self.validate(problem)?;

        let started = Instant::now();
        let mut objective = vec![0.0; problem.num_variables()];
        for &(col, coeff) in &problem.objective.terms {
            objective[col] += coeff;
        }

        let mut pb = RowProblem::default();
        let cols: Vec<_> = problem
            .variables
            .iter()
            .zip(&objective)
            .map(|(def, &coeff)| {
                let upper = def.upper_bound.unwrap_or(f64::INFINITY);
                pb.add_integer_column(coeff, def.lower_bound..=upper)
            })
            .collect();

        for row in &problem.constraints {
            let factors: Vec<_> = row.terms.iter().map(|&(col, c)| (cols[col], c)).collect();
            match row.constraint_type {
                ConstraintType::LessThanOrEqual => pb.add_row(..=row.bound, &factors),
                ConstraintType::Equal => pb.add_row(row.bound..=row.bound, &factors),
                ConstraintType::GreaterThanOrEqual => pb.add_row(row.bound.., &factors),
            }
        }

        let sense = match problem.objective.optimization_type {
            OptimizationType::Maximize => Sense::Maximise,
            OptimizationType::Minimize => Sense::Minimise,
        };
        let config = &problem.solver_config;
        let mut model = pb.optimise(sense);
        if !config.verbose {
            model.make_quiet();
        }
        if let Some(limit) = config.time_limit {
            model.set_option("time_limit", limit);
        }
        model.set_option("threads", config.num_workers as i32);

        let solved = model.solve();
        let stats = statistics(problem, started.elapsed());

        Ok(match solved.status() {
            HighsModelStatus::Optimal => {
                let values = solved.get_solution().columns().to_vec();
                solution_from_values(problem, &values, true, progress, stats)
            }
            HighsModelStatus::ReachedTimeLimit => {
                let values = solved.get_solution().columns().to_vec();
                solution_from_values(problem, &values, false, progress, stats)
            }
            HighsModelStatus::Infeasible => Solution::new(
                SolutionStatus::Infeasible,
                "Problem is infeasible: no solution satisfies all constraints",
            )
            .with_statistics(stats),
            status => Solution::new(
                SolutionStatus::Unknown,
                format!("HiGHS solver returned status: {status:?}"),
            )
            .with_statistics(stats),
        })
    }

    fn name(&self) -> &str {
        "HiGHS"
    }

    fn honours_time_limit(&self) -> bool {
        true
    }
}
