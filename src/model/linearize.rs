// Lowering: turns a CpModel into a plain linear program
// Enforced constraints, `!=` and clauses become big-M rows over the variables' bounds

use super::{CpModel, LinearExpr, Literal, Relation, VarId};
use crate::domain::models::{
    Constraint, ObjectiveFunction, OptimizationProblem, SolverConfig, Variable,
};
use crate::domain::value_objects::{ConstraintType, OptimizationType};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum LoweringError {
    #[error("constraint '{0}' is enforced by literals but its expression is unbounded")]
    UnboundedReification(String),
}

impl CpModel {
    /// Lowers the model; model variable `i` becomes column `i`, auxiliary
    /// binaries follow after the model's own variables.
    pub fn lower(&self, config: SolverConfig) -> Result<OptimizationProblem, LoweringError> {
        let mut lowering = Lowering {
            model: self,
            variables: self
                .variables()
                .iter()
                .map(|def| match def.kind {
                    super::VarKind::Bool => Variable::binary(&def.name),
                    super::VarKind::Int => Variable::integer(&def.name)
                        .with_bounds(def.min as f64, def.max.map(|m| m as f64)),
                })
                .collect(),
            rows: Vec::new(),
            trivially_infeasible: false,
        };

        for constraint in self.constraints() {
            lowering.constraint(
                &constraint.name,
                &constraint.expr,
                constraint.relation,
                constraint.rhs,
                &constraint.enforcement,
            )?;
        }
        for clause in self.clauses() {
            lowering.clause(&clause.name, &clause.literals);
        }

        let objective = match self.objective() {
            Some(objective) => ObjectiveFunction::new(
                objective.sense,
                objective
                    .expr
                    .terms
                    .iter()
                    .map(|(var, &coeff)| (var.index(), coeff as f64))
                    .collect(),
            )
            .with_constant(objective.expr.constant as f64),
            None => ObjectiveFunction::new(OptimizationType::Maximize, Vec::new()),
        };

        let mut problem = OptimizationProblem::new(objective).with_config(config);
        problem.variables = lowering.variables;
        problem.constraints = lowering.rows;
        problem.trivially_infeasible = lowering.trivially_infeasible;
        Ok(problem)
    }
}

struct Lowering<'m> {
    model: &'m CpModel,
    variables: Vec<Variable>,
    rows: Vec<Constraint>,
    trivially_infeasible: bool,
}

impl Lowering<'_> {
    fn constraint(
        &mut self,
        name: &str,
        expr: &LinearExpr,
        relation: Relation,
        rhs: i64,
        enforcement: &[Literal],
    ) -> Result<(), LoweringError> {
        match relation {
            Relation::Le => self.less_equal(name, expr, rhs, enforcement),
            Relation::Ge => self.greater_equal(name, expr, rhs, enforcement),
            Relation::Eq => {
                self.less_equal(name, expr, rhs, enforcement)?;
                self.greater_equal(name, expr, rhs, enforcement)
            }
            Relation::Ne => {
                // z picks the side: z ⇒ expr ≤ rhs − 1, ¬z ⇒ expr ≥ rhs + 1
                let side = self.aux_binary(format!("{name}_side"));
                let mut below = enforcement.to_vec();
                below.push(Literal::positive(side));
                let mut above = enforcement.to_vec();
                above.push(Literal::positive(side).not());
                self.less_equal(name, expr, rhs - 1, &below)?;
                self.greater_equal(name, expr, rhs + 1, &above)
            }
        }
    }

    fn aux_binary(&mut self, name: String) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(Variable::binary(name));
        id
    }

    // terms ≤ bound + M·Σ slack(lit)
    fn less_equal(
        &mut self,
        name: &str,
        expr: &LinearExpr,
        rhs: i64,
        enforcement: &[Literal],
    ) -> Result<(), LoweringError> {
        let bound = rhs - expr.constant;
        let terms = LinearExpr {
            constant: 0,
            ..expr.clone()
        };

        if enforcement.is_empty() {
            if terms.is_constant() {
                self.check_constant(name, 0 <= bound);
            } else {
                self.push_row(name, &terms, &[], 0, ConstraintType::LessThanOrEqual, bound);
            }
            return Ok(());
        }

        let (_, high) = self.model.expr_bounds(&terms);
        let high = high.ok_or_else(|| LoweringError::UnboundedReification(name.to_string()))?;
        let big_m = high - bound;
        if big_m <= 0 {
            return Ok(());
        }
        self.push_row(
            name,
            &terms,
            enforcement,
            big_m,
            ConstraintType::LessThanOrEqual,
            bound,
        );
        Ok(())
    }

    // terms ≥ bound − M·Σ slack(lit)
    fn greater_equal(
        &mut self,
        name: &str,
        expr: &LinearExpr,
        rhs: i64,
        enforcement: &[Literal],
    ) -> Result<(), LoweringError> {
        let bound = rhs - expr.constant;
        let terms = LinearExpr {
            constant: 0,
            ..expr.clone()
        };

        if enforcement.is_empty() {
            if terms.is_constant() {
                self.check_constant(name, 0 >= bound);
            } else {
                self.push_row(name, &terms, &[], 0, ConstraintType::GreaterThanOrEqual, bound);
            }
            return Ok(());
        }

        let (low, _) = self.model.expr_bounds(&terms);
        let low = low.ok_or_else(|| LoweringError::UnboundedReification(name.to_string()))?;
        let big_m = bound - low;
        if big_m <= 0 {
            return Ok(());
        }
        self.push_row(
            name,
            &terms,
            enforcement,
            -big_m,
            ConstraintType::GreaterThanOrEqual,
            bound,
        );
        Ok(())
    }

    /// Emits `terms + m·Σ(±lit) (sense) bound + m·#positive`.
    ///
    /// slack(v) = 1 − v and slack(¬v) = v, so moving `m·Σ slack` to the left
    /// adds `+m·v` for positive and `−m·v` for negated literals.
    fn push_row(
        &mut self,
        name: &str,
        terms: &LinearExpr,
        enforcement: &[Literal],
        m: i64,
        sense: ConstraintType,
        bound: i64,
    ) {
        let mut coeffs: BTreeMap<usize, i64> = terms
            .terms
            .iter()
            .map(|(var, &coeff)| (var.index(), coeff))
            .collect();
        let mut rhs = bound;
        for lit in enforcement {
            let entry = coeffs.entry(lit.var.index()).or_insert(0);
            if lit.negated {
                *entry -= m;
            } else {
                *entry += m;
                rhs += m;
            }
        }
        self.rows.push(
            Constraint::new(
                sense,
                coeffs
                    .into_iter()
                    .filter(|&(_, c)| c != 0)
                    .map(|(col, c)| (col, c as f64))
                    .collect(),
                rhs as f64,
            )
            .with_name(name),
        );
    }

    // Σ v + Σ (1 − w) ≥ 1
    fn clause(&mut self, name: &str, literals: &[Literal]) {
        if literals.is_empty() {
            self.check_constant(name, false);
            return;
        }
        let mut coeffs: BTreeMap<usize, i64> = BTreeMap::new();
        let mut rhs = 1;
        for lit in literals {
            let entry = coeffs.entry(lit.var.index()).or_insert(0);
            if lit.negated {
                *entry -= 1;
                rhs -= 1;
            } else {
                *entry += 1;
            }
        }
        self.rows.push(
            Constraint::new(
                ConstraintType::GreaterThanOrEqual,
                coeffs
                    .into_iter()
                    .filter(|&(_, c)| c != 0)
                    .map(|(col, c)| (col, c as f64))
                    .collect(),
                rhs as f64,
            )
            .with_name(name),
        );
    }

    fn check_constant(&mut self, name: &str, holds: bool) {
        if !holds {
            tracing::debug!(constraint = name, "constant constraint can never hold");
            self.trivially_infeasible = true;
        }
    }
}
