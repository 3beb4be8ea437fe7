// Translation of the lowered problem into good_lp, shared by the good_lp backends

use crate::domain::{
    models::OptimizationProblem,
    value_objects::{ConstraintType, OptimizationType, VariableType},
};
use good_lp::{
    solvers::Solver, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};

/// Builds the good_lp model, lets the caller set backend options and solves it.
///
/// Returns one value per column, in column order.
pub(crate) fn solve_with<S>(
    problem: &OptimizationProblem,
    solver: S,
    configure: impl FnOnce(&mut S::Model),
) -> Result<Vec<f64>, ResolutionError>
where
    S: Solver,
    S::Model: SolverModel<Error = ResolutionError>,
{
    let mut vars = ProblemVariables::new();
    let columns: Vec<Variable> = problem
        .variables
        .iter()
        .map(|def| {
            let upper = def.upper_bound.unwrap_or(f64::INFINITY);
            let declared = match def.variable_type {
                VariableType::Binary => variable().binary(),
                VariableType::Integer => variable().integer().min(def.lower_bound).max(upper),
            };
            vars.add(declared.name(def.name.clone()))
        })
        .collect();

    let objective = linear(&columns, &problem.objective.terms);
    let unsolved = match problem.objective.optimization_type {
        OptimizationType::Maximize => vars.maximise(objective),
        OptimizationType::Minimize => vars.minimise(objective),
    };

    let mut model = unsolved.using(solver);
    configure(&mut model);
    for row in &problem.constraints {
        let lhs = linear(&columns, &row.terms);
        model = model.with(match row.constraint_type {
            ConstraintType::LessThanOrEqual => lhs.leq(row.bound),
            ConstraintType::Equal => lhs.eq(row.bound),
            ConstraintType::GreaterThanOrEqual => lhs.geq(row.bound),
        });
    }

    let solution = model.solve()?;
    Ok(columns.iter().map(|&col| solution.value(col)).collect())
}

fn linear(columns: &[Variable], terms: &[(usize, f64)]) -> Expression {
    let mut expr = Expression::from(0.0);
    for &(col, coeff) in terms {
        expr += coeff * columns[col];
    }
    expr
}
