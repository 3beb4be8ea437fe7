// Recursive-descent parser over the token stream
//
//   formula := expr relop expr
//   expr    := term (('+' | '-') term)*
//   term    := unary ('*' unary)*
//   unary   := '-' unary | atom
//   atom    := integer | name | '(' expr ')'

use super::lexer::{tokenize, RelOp, Token};
use super::ExpressionError;

/// Arithmetic expression tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(i64),
    Var(String),
    Sum(Vec<Expr>),
    Product(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
}

/// Top-level constraint tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    Comparison { lhs: Expr, op: RelOp, rhs: Expr },
    Implication { lhs: Expr, rhs: Expr },
}

pub fn parse_formula(source: &str) -> Result<Formula, ExpressionError> {
    let mut parser = Parser::new(tokenize(source)?);
    let lhs = parser.expr()?;
    let op = match parser.next() {
        Some(Token::Rel(op)) => op,
        Some(other) => return Err(ExpressionError::unexpected(&other, parser.pos - 1)),
        None => return Err(ExpressionError::MissingOperator),
    };
    let rhs = parser.expr()?;
    parser.finish()?;

    Ok(match op {
        RelOp::Implies => Formula::Implication { lhs, rhs },
        op => Formula::Comparison { lhs, op, rhs },
    })
}

/// Parses a bare expression, as used for objectives.
pub fn parse_expr(source: &str) -> Result<Expr, ExpressionError> {
    let mut parser = Parser::new(tokenize(source)?);
    let expr = parser.expr()?;
    parser.finish()?;
    Ok(expr)
}

/// Nesting limit for parentheses, unary minus and `*` chains.
const MAX_DEPTH: usize = 128;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn descend(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn finish(&self) -> Result<(), ExpressionError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(ExpressionError::unexpected(token, self.pos)),
        }
    }

    fn expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut terms = vec![self.term()?];
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    terms.push(self.term()?);
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    terms.push(Expr::Neg(Box::new(self.term()?)));
                }
                _ => break,
            }
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::Sum(terms)
        })
    }

    fn term(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.depth;
        let mut lhs = self.unary()?;
        // Each product nests the tree one level deeper on the left.
        while let Some(Token::Star) = self.peek() {
            self.pos += 1;
            self.descend()?;
            let rhs = self.unary()?;
            lhs = Expr::Product(Box::new(lhs), Box::new(rhs));
        }
        self.depth = base;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        if let Some(Token::Minus) = self.peek() {
            self.pos += 1;
            self.descend()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr, ExpressionError> {
        let position = self.pos;
        match self.next() {
            Some(Token::Int(value)) => Ok(Expr::Literal(value)),
            Some(Token::Ident(name)) => Ok(Expr::Var(name)),
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.expr()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(ExpressionError::unexpected(&other, self.pos - 1)),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            Some(other) => Err(ExpressionError::unexpected(&other, position)),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }
}
