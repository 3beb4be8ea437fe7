// Transient model context
// A `CpModel` collects named integer/boolean variables, linear constraints
// (optionally enforced by literals), boolean clauses and an objective. It is
// created per request, lowered once into an `OptimizationProblem` and dropped.

pub mod builder;
mod linearize;

pub use builder::{build_schedule_model, AssignmentVar, ScheduleModel};
pub use linearize::LoweringError;

use crate::domain::value_objects::OptimizationType;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Index of a variable inside one [`CpModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarKind {
    Bool,
    Int,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub name: String,
    pub kind: VarKind,
    pub min: i64,
    pub max: Option<i64>,
}

/// A boolean variable or its negation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Literal {
    pub var: VarId,
    pub negated: bool,
}

impl Literal {
    pub fn positive(var: VarId) -> Self {
        Self { var, negated: false }
    }

    pub fn not(self) -> Self {
        Self {
            negated: !self.negated,
            ..self
        }
    }
}

impl From<VarId> for Literal {
    fn from(var: VarId) -> Self {
        Literal::positive(var)
    }
}

/// `Σ coeff·var + constant` with integer coefficients
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearExpr {
    pub terms: BTreeMap<VarId, i64>,
    pub constant: i64,
}

impl LinearExpr {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn constant(value: i64) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant: value,
        }
    }

    pub fn var(var: VarId) -> Self {
        Self::term(var, 1)
    }

    pub fn term(var: VarId, coeff: i64) -> Self {
        let mut expr = Self::zero();
        expr.add_term(var, coeff);
        expr
    }

    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        let mut expr = Self::zero();
        for var in vars {
            expr.add_term(var, 1);
        }
        expr
    }

    pub fn add_term(&mut self, var: VarId, coeff: i64) {
        let entry = self.terms.entry(var).or_insert(0);
        *entry += coeff;
        if *entry == 0 {
            self.terms.remove(&var);
        }
    }

    pub fn add(mut self, other: &LinearExpr) -> Self {
        self.constant += other.constant;
        for (&var, &coeff) in &other.terms {
            self.add_term(var, coeff);
        }
        self
    }

    pub fn sub(self, other: &LinearExpr) -> Self {
        self.add(&other.scale(-1))
    }

    pub fn scale(&self, k: i64) -> Self {
        if k == 0 {
            return Self::zero();
        }
        Self {
            terms: self.terms.iter().map(|(&v, &c)| (v, c * k)).collect(),
            constant: self.constant * k,
        }
    }

    /// `self + other`, or `None` if a coefficient or the constant overflows.
    pub fn checked_add(&self, other: &LinearExpr) -> Option<Self> {
        let mut sum = self.clone();
        sum.constant = sum.constant.checked_add(other.constant)?;
        for (&var, &coeff) in &other.terms {
            let entry = sum.terms.entry(var).or_insert(0);
            *entry = entry.checked_add(coeff)?;
            if *entry == 0 {
                sum.terms.remove(&var);
            }
        }
        Some(sum)
    }

    pub fn checked_sub(&self, other: &LinearExpr) -> Option<Self> {
        self.checked_add(&other.checked_scale(-1)?)
    }

    pub fn checked_scale(&self, k: i64) -> Option<Self> {
        if k == 0 {
            return Some(Self::zero());
        }
        let mut terms = BTreeMap::new();
        for (&var, &coeff) in &self.terms {
            terms.insert(var, coeff.checked_mul(k)?);
        }
        Some(Self {
            terms,
            constant: self.constant.checked_mul(k)?,
        })
    }

    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// The single variable this expression is exactly equal to, if any.
    pub fn as_single_var(&self) -> Option<VarId> {
        match (self.terms.len(), self.constant) {
            (1, 0) => {
                let (&var, &coeff) = self.terms.iter().next()?;
                (coeff == 1).then_some(var)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Le,
    Ge,
    Eq,
    Ne,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relation::Le => "<=",
            Relation::Ge => ">=",
            Relation::Eq => "==",
            Relation::Ne => "!=",
        })
    }
}

/// `expr relation rhs`, active only when every enforcement literal holds
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConstraint {
    pub name: String,
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: i64,
    pub enforcement: Vec<Literal>,
}

/// At least one literal holds
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub name: String,
    pub literals: Vec<Literal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub sense: OptimizationType,
    pub expr: LinearExpr,
}

#[derive(Debug, Clone, Default)]
pub struct CpModel {
    variables: Vec<VarDef>,
    by_name: HashMap<String, VarId>,
    constraints: Vec<ModelConstraint>,
    clauses: Vec<Clause>,
    objective: Option<Objective>,
}

impl CpModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_bool_var(&mut self, name: impl Into<String>) -> VarId {
        self.push_var(name.into(), VarKind::Bool, 0, Some(1))
    }

    pub fn new_int_var(&mut self, name: impl Into<String>, min: i64, max: Option<i64>) -> VarId {
        self.push_var(name.into(), VarKind::Int, min, max)
    }

    fn push_var(&mut self, name: String, kind: VarKind, min: i64, max: Option<i64>) -> VarId {
        let id = VarId(self.variables.len());
        // A redeclared name resolves to the newest variable.
        self.by_name.insert(name.clone(), id);
        self.variables.push(VarDef {
            name,
            kind,
            min,
            max,
        });
        id
    }

    pub fn lookup(&self, name: &str) -> Option<VarId> {
        self.by_name.get(name).copied()
    }

    pub fn var(&self, id: VarId) -> &VarDef {
        &self.variables[id.0]
    }

    pub fn is_bool(&self, id: VarId) -> bool {
        self.variables
            .get(id.0)
            .is_some_and(|v| v.kind == VarKind::Bool)
    }

    pub fn variables(&self) -> &[VarDef] {
        &self.variables
    }

    pub fn constraints(&self) -> &[ModelConstraint] {
        &self.constraints
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Constraints and clauses, the count reported back to callers.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len() + self.clauses.len()
    }

    pub fn add_linear(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        relation: Relation,
        rhs: i64,
    ) {
        self.add_enforced(name, expr, relation, rhs, Vec::new());
    }

    /// Adds `expr relation rhs` that only has to hold when all `enforcement` literals are true.
    pub fn add_enforced(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        relation: Relation,
        rhs: i64,
        enforcement: Vec<Literal>,
    ) {
        self.constraints.push(ModelConstraint {
            name: name.into(),
            expr,
            relation,
            rhs,
            enforcement,
        });
    }

    pub fn add_bool_or(&mut self, name: impl Into<String>, literals: Vec<Literal>) {
        self.clauses.push(Clause {
            name: name.into(),
            literals,
        });
    }

    /// `a ⇒ b`, stored as the clause `¬a ∨ b`.
    pub fn add_implication(&mut self, name: impl Into<String>, a: Literal, b: Literal) {
        self.add_bool_or(name, vec![a.not(), b]);
    }

    pub fn maximize(&mut self, expr: LinearExpr) {
        self.objective = Some(Objective {
            sense: OptimizationType::Maximize,
            expr,
        });
    }

    pub fn minimize(&mut self, expr: LinearExpr) {
        self.objective = Some(Objective {
            sense: OptimizationType::Minimize,
            expr,
        });
    }

    /// Integer range `expr` can take given the variable bounds; `None` when unbounded.
    pub fn expr_bounds(&self, expr: &LinearExpr) -> (Option<i64>, Option<i64>) {
        let mut low = Some(expr.constant);
        let mut high = Some(expr.constant);
        for (&var, &coeff) in &expr.terms {
            let def = self.var(var);
            let (at_min, at_max) = (Some(coeff * def.min), def.max.map(|m| coeff * m));
            let (lo, hi) = if coeff >= 0 {
                (at_min, at_max)
            } else {
                (at_max, at_min)
            };
            low = low.zip(lo).map(|(a, b)| a + b);
            high = high.zip(hi).map(|(a, b)| a + b);
        }
        (low, high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_expr_merges_and_cancels_terms() {
        let mut model = CpModel::new();
        let x = model.new_bool_var("x");
        let y = model.new_bool_var("y");

        let a = LinearExpr::term(x, 3).add(&LinearExpr::term(y, 2));
        let b = LinearExpr::term(x, 3).add(&LinearExpr::constant(4));
        let diff = a.sub(&b);

        assert_eq!(diff.terms.len(), 1);
        assert_eq!(diff.terms[&y], 2);
        assert_eq!(diff.constant, -4);
        assert_eq!(LinearExpr::var(x).as_single_var(), Some(x));
        assert_eq!(LinearExpr::term(x, 2).as_single_var(), None);
    }

    #[test]
    fn bounds_follow_coefficient_signs() {
        let mut model = CpModel::new();
        let x = model.new_bool_var("x");
        let n = model.new_int_var("n", -2, Some(5));
        let expr = LinearExpr::term(x, 3).add(&LinearExpr::term(n, -2));
        assert_eq!(model.expr_bounds(&expr), (Some(-10), Some(7)));

        let open = model.new_int_var("open", 0, None);
        assert_eq!(model.expr_bounds(&LinearExpr::var(open)), (Some(0), None));
    }

    #[test]
    fn implication_is_stored_as_clause() {
        let mut model = CpModel::new();
        let a = model.new_bool_var("a");
        let b = model.new_bool_var("b");
        model.add_implication("a_implies_b", a.into(), b.into());

        let clause = &model.clauses()[0];
        assert_eq!(clause.literals, vec![Literal::positive(a).not(), Literal::positive(b)]);
        assert_eq!(model.num_constraints(), 1);
    }
}
