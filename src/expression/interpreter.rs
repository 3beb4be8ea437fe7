// Interpreter: lowers parsed formulas onto a CpModel
//
// Also owns the model-mode request payload (`modelData`) since that is the
// only caller of the expression language.

use super::parser::{parse_expr, parse_formula, Expr, Formula};
use super::{ExpressionError, RelOp};
use crate::domain::value_objects::OptimizationType;
use crate::model::{CpModel, LinearExpr, Relation, VarId, VarKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VariableSpec {
    #[serde(rename = "type")]
    pub kind: VarKind,
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConstraintSpec {
    pub expression: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObjectiveSpec {
    #[serde(rename = "type")]
    pub sense: OptimizationType,
    pub expression: String,
}

/// The `modelData` payload of a model-mode request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelData {
    #[serde(default)]
    pub variables: BTreeMap<String, VariableSpec>,
    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
    #[serde(default)]
    pub objective: Option<ObjectiveSpec>,
}

/// Outcome of interpreting a [`ModelData`]
#[derive(Debug)]
pub struct GenericModel {
    pub model: CpModel,
    pub constraints_added: usize,
    pub constraints_skipped: usize,
    pub objective_fallback: bool,
    pub report: Vec<String>,
}

pub fn build_generic_model(data: &ModelData) -> GenericModel {
    let mut model = CpModel::new();
    let mut report = Vec::new();

    for (name, spec) in &data.variables {
        match spec.kind {
            VarKind::Bool => model.new_bool_var(name.as_str()),
            VarKind::Int => model.new_int_var(name.as_str(), spec.min.unwrap_or(0), spec.max),
        };
    }

    let mut added = 0;
    let mut skipped = 0;
    for (i, constraint) in data.constraints.iter().enumerate() {
        let label = constraint
            .description
            .clone()
            .unwrap_or_else(|| format!("constraint_{i}"));
        match apply_constraint(&mut model, &label, &constraint.expression) {
            Ok(()) => added += 1,
            Err(e) => {
                warn!(constraint = %label, expression = %constraint.expression, error = %e, "Skipping constraint");
                report.push(format!("Skipped constraint '{label}': {e}"));
                skipped += 1;
            }
        }
    }

    let mut objective_fallback = false;
    if let Some(objective) = &data.objective {
        match evaluate_expr(&model, &objective.expression) {
            Ok(expr) => match objective.sense {
                OptimizationType::Maximize => model.maximize(expr),
                OptimizationType::Minimize => model.minimize(expr),
            },
            Err(e) => {
                warn!(expression = %objective.expression, error = %e, "Objective rejected, maximizing sum of all variables");
                report.push(format!(
                    "Objective rejected ({e}); maximizing the sum of all variables"
                ));
                let all = (0..model.num_variables()).map(VarId);
                model.maximize(LinearExpr::sum(all));
                objective_fallback = true;
            }
        }
    }

    debug!(
        variables = model.num_variables(),
        added, skipped, "Generic model interpreted"
    );

    GenericModel {
        model,
        constraints_added: added,
        constraints_skipped: skipped,
        objective_fallback,
        report,
    }
}

/// Parses `source` and adds the resulting constraint to `model`.
pub fn apply_constraint(model: &mut CpModel, name: &str, source: &str) -> Result<(), ExpressionError> {
    match parse_formula(source)? {
        Formula::Comparison { lhs, op, rhs } => {
            let (expr, bound) = difference(&lower(model, &lhs)?, &lower(model, &rhs)?)?;

            let (relation, bound) = match op {
                RelOp::Eq => (Relation::Eq, bound),
                RelOp::Le => (Relation::Le, bound),
                RelOp::Ge => (Relation::Ge, bound),
                RelOp::Lt => (Relation::Le, bound.checked_sub(1).ok_or(ExpressionError::Overflow)?),
                RelOp::Gt => (Relation::Ge, bound.checked_add(1).ok_or(ExpressionError::Overflow)?),
                RelOp::Implies => unreachable!("implications parse to their own node"),
            };
            model.add_linear(name, expr, relation, bound);
        }
        Formula::Implication { lhs, rhs } => {
            let lhs = lower(model, &lhs)?;
            let rhs = lower(model, &rhs)?;
            let bools = lhs
                .as_single_var()
                .zip(rhs.as_single_var())
                .filter(|&(a, b)| model.is_bool(a) && model.is_bool(b));
            match bools {
                Some((a, b)) => model.add_implication(name, a.into(), b.into()),
                None => {
                    warn!(constraint = name, "Implication between non-boolean terms, using left <= right");
                    let (expr, bound) = difference(&lhs, &rhs)?;
                    model.add_linear(name, expr, Relation::Le, bound);
                }
            }
        }
    }
    Ok(())
}

/// Parses and lowers a bare expression against the variables of `model`.
pub fn evaluate_expr(model: &CpModel, source: &str) -> Result<LinearExpr, ExpressionError> {
    lower(model, &parse_expr(source)?)
}

fn lower(model: &CpModel, expr: &Expr) -> Result<LinearExpr, ExpressionError> {
    match expr {
        Expr::Literal(value) => Ok(LinearExpr::constant(*value)),
        Expr::Var(name) => match model.lookup(name) {
            Some(var) => Ok(LinearExpr::var(var)),
            None => {
                warn!(variable = %name, "Unknown variable, treating as 0");
                Ok(LinearExpr::zero())
            }
        },
        Expr::Sum(terms) => terms.iter().try_fold(LinearExpr::zero(), |acc, term| {
            acc.checked_add(&lower(model, term)?)
                .ok_or(ExpressionError::Overflow)
        }),
        Expr::Neg(inner) => checked_scale(&lower(model, inner)?, -1),
        Expr::Product(a, b) => {
            let (a, b) = (lower(model, a)?, lower(model, b)?);
            if a.is_constant() {
                checked_scale(&b, a.constant)
            } else if b.is_constant() {
                checked_scale(&a, b.constant)
            } else {
                Err(ExpressionError::Nonlinear(format!("{expr:?}")))
            }
        }
    }
}

fn checked_scale(expr: &LinearExpr, k: i64) -> Result<LinearExpr, ExpressionError> {
    expr.checked_scale(k).ok_or(ExpressionError::Overflow)
}

/// `lhs - rhs` split into variable terms and the bound on the right-hand side.
fn difference(lhs: &LinearExpr, rhs: &LinearExpr) -> Result<(LinearExpr, i64), ExpressionError> {
    let mut expr = lhs.checked_sub(rhs).ok_or(ExpressionError::Overflow)?;
    let bound = expr.constant.checked_neg().ok_or(ExpressionError::Overflow)?;
    expr.constant = 0;
    Ok((expr, bound))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Literal;

    fn bools(names: &[&str]) -> ModelData {
        ModelData {
            variables: names
                .iter()
                .map(|n| {
                    (
                        n.to_string(),
                        VariableSpec {
                            kind: VarKind::Bool,
                            min: None,
                            max: None,
                        },
                    )
                })
                .collect(),
            ..Default::default()
        }
    }

    fn constraint(expression: &str) -> ConstraintSpec {
        ConstraintSpec {
            expression: expression.to_string(),
            description: None,
        }
    }

    #[test]
    fn scaled_sum_becomes_linear_row() {
        let mut data = bools(&["x", "y"]);
        data.constraints.push(constraint("3 * x + 2 * y <= 10"));
        let generic = build_generic_model(&data);

        let x = generic.model.lookup("x").unwrap();
        let y = generic.model.lookup("y").unwrap();
        let row = &generic.model.constraints()[0];
        assert_eq!(row.expr.terms[&x], 3);
        assert_eq!(row.expr.terms[&y], 2);
        assert_eq!(row.relation, Relation::Le);
        assert_eq!(row.rhs, 10);
        assert_eq!(generic.constraints_added, 1);
    }

    #[test]
    fn garbled_operator_is_skipped_and_counted() {
        let mut data = bools(&["x", "y"]);
        data.constraints.push(constraint("x =! y"));
        data.constraints.push(constraint("x + y >= 1"));
        let generic = build_generic_model(&data);

        assert_eq!(generic.constraints_added, 1);
        assert_eq!(generic.constraints_skipped, 1);
        assert_eq!(generic.model.constraints().len(), 1);
        assert!(generic.report[0].contains("constraint_0"));
    }

    #[test]
    fn strict_relations_shift_the_bound() {
        let mut data = bools(&[]);
        data.variables.insert(
            "n".into(),
            VariableSpec {
                kind: VarKind::Int,
                min: Some(0),
                max: Some(9),
            },
        );
        data.constraints.push(constraint("n < 5"));
        data.constraints.push(constraint("2 * n > 3 + 1"));
        let generic = build_generic_model(&data);

        let rows = generic.model.constraints();
        assert_eq!((rows[0].relation, rows[0].rhs), (Relation::Le, 4));
        assert_eq!((rows[1].relation, rows[1].rhs), (Relation::Ge, 5));
    }

    #[test]
    fn boolean_implication_becomes_clause() {
        let mut data = bools(&["a", "b"]);
        data.constraints.push(constraint("a => b"));
        let generic = build_generic_model(&data);

        let a = generic.model.lookup("a").unwrap();
        let b = generic.model.lookup("b").unwrap();
        assert!(generic.model.constraints().is_empty());
        assert_eq!(
            generic.model.clauses()[0].literals,
            vec![Literal::positive(a).not(), Literal::positive(b)]
        );
    }

    #[test]
    fn numeric_implication_falls_back_to_less_equal() {
        let mut data = bools(&["a", "b"]);
        data.constraints.push(constraint("a => 2 * b"));
        let generic = build_generic_model(&data);

        let row = &generic.model.constraints()[0];
        assert_eq!(row.relation, Relation::Le);
        assert_eq!(row.rhs, 0);
        assert_eq!(generic.constraints_added, 1);
    }

    #[test]
    fn overflowing_arithmetic_skips_the_constraint() {
        let mut data = bools(&["x"]);
        data.constraints.push(constraint("9223372036854775807 + 1 + x <= 5"));
        data.constraints.push(constraint("x - 9223372036854775807 - 1 <= 0"));
        data.constraints.push(constraint("-(-9223372036854775807 - 1) * x >= 0"));
        data.constraints.push(constraint("x <= 1"));
        let generic = build_generic_model(&data);

        assert_eq!(generic.constraints_skipped, 3);
        assert_eq!(generic.constraints_added, 1);
        assert!(generic.report.iter().all(|line| line.contains("overflow")));
    }

    #[test]
    fn unknown_variables_evaluate_to_zero() {
        let mut data = bools(&["x"]);
        data.constraints.push(constraint("x + ghost <= 1"));
        let generic = build_generic_model(&data);

        let row = &generic.model.constraints()[0];
        assert_eq!(row.expr.terms.len(), 1);
        assert_eq!(row.rhs, 1);
    }

    #[test]
    fn nonlinear_products_are_rejected() {
        let mut data = bools(&["x", "y"]);
        data.constraints.push(constraint("x * y <= 1"));
        data.constraints.push(constraint("(1 + 1) * x <= 1"));
        let generic = build_generic_model(&data);
        assert_eq!(generic.constraints_skipped, 1);
        assert_eq!(generic.model.constraints()[0].expr.terms.values().next(), Some(&2));
    }

    #[test]
    fn broken_objective_maximizes_all_variables() {
        let mut data = bools(&["x", "y"]);
        data.objective = Some(ObjectiveSpec {
            sense: OptimizationType::Minimize,
            expression: "x +* y".into(),
        });
        let generic = build_generic_model(&data);

        let objective = generic.model.objective().unwrap();
        assert!(generic.objective_fallback);
        assert_eq!(objective.sense, OptimizationType::Maximize);
        assert_eq!(objective.expr.terms.len(), 2);
    }

    #[test]
    fn deserializes_model_data() {
        let data: ModelData = serde_json::from_value(serde_json::json!({
            "variables": { "x": { "type": "bool" }, "n": { "type": "int", "min": 1, "max": 4 } },
            "constraints": [ { "expression": "x + n <= 3", "description": "cap" } ],
            "objective": { "type": "minimize", "expression": "n" }
        }))
        .unwrap();
        assert_eq!(data.variables["n"].max, Some(4));
        assert_eq!(data.constraints[0].description.as_deref(), Some("cap"));
        assert_eq!(data.objective.unwrap().sense, OptimizationType::Minimize);
    }
}
