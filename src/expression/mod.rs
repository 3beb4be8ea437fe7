// Constraint expression language
// Strings such as `3 * x + 2 * y <= 10` or `a => b` are tokenized, parsed
// into a `Formula` tree and then interpreted against a
// `CpModel`.

pub mod interpreter;
pub mod lexer;
pub mod parser;

pub use interpreter::{
    apply_constraint, build_generic_model, evaluate_expr, ConstraintSpec, GenericModel, ModelData,
    ObjectiveSpec, VariableSpec,
};
pub use lexer::{tokenize, RelOp, Token};
pub use parser::{parse_expr, parse_formula, Expr, Formula};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("unexpected character '{found}' at position {position}")]
    UnexpectedChar { found: char, position: usize },

    #[error("integer literal out of range: {0}")]
    IntegerOverflow(String),

    #[error("unexpected token {found} at position {position}")]
    UnexpectedToken { found: String, position: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("missing relational operator")]
    MissingOperator,

    #[error("nonlinear term: {0}")]
    Nonlinear(String),

    #[error("arithmetic overflow while evaluating expression")]
    Overflow,

    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
}

impl ExpressionError {
    pub(crate) fn unexpected(token: &Token, position: usize) -> Self {
        ExpressionError::UnexpectedToken {
            found: token.describe(),
            position,
        }
    }
}
