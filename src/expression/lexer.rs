use super::ExpressionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Int(i64),
    Ident(String),
    Plus,
    Minus,
    Star,
    LParen,
    RParen,
    Rel(RelOp),
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Int(value) => value.to_string(),
            Token::Ident(name) => format!("'{name}'"),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Rel(op) => format!("'{}'", op.symbol()),
        }
    }
}

/// Relational and implication operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Eq,
    Le,
    Ge,
    Lt,
    Gt,
    Implies,
}

impl RelOp {
    pub fn symbol(self) -> &'static str {
        match self {
            RelOp::Eq => "==",
            RelOp::Le => "<=",
            RelOp::Ge => ">=",
            RelOp::Lt => "<",
            RelOp::Gt => ">",
            RelOp::Implies => "=>",
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Splits an expression into tokens.
///
/// Identifiers may contain `-` when it sits between identifier characters
/// (`assign_e1_mon-am`), so subtraction between names needs spaces.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            c if c.is_whitespace() => pos += 1,
            '+' => {
                tokens.push(Token::Plus);
                pos += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                pos += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                pos += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            '=' | '<' | '>' => {
                let next = chars.get(pos + 1).copied();
                let (op, width) = match (c, next) {
                    ('=', Some('=')) => (RelOp::Eq, 2),
                    ('=', Some('>')) => (RelOp::Implies, 2),
                    ('<', Some('=')) => (RelOp::Le, 2),
                    ('>', Some('=')) => (RelOp::Ge, 2),
                    ('<', _) => (RelOp::Lt, 1),
                    ('>', _) => (RelOp::Gt, 1),
                    _ => {
                        return Err(ExpressionError::UnexpectedChar {
                            found: c,
                            position: pos,
                        })
                    }
                };
                tokens.push(Token::Rel(op));
                pos += width;
            }
            c if c.is_ascii_digit() => {
                let start = pos;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
                let digits: String = chars[start..pos].iter().collect();
                let value = digits
                    .parse::<i64>()
                    .map_err(|_| ExpressionError::IntegerOverflow(digits.clone()))?;
                tokens.push(Token::Int(value));
            }
            c if is_ident_start(c) => {
                let start = pos;
                pos += 1;
                loop {
                    match chars.get(pos) {
                        Some(&c) if is_ident_continue(c) => pos += 1,
                        Some('-')
                            if chars
                                .get(pos + 1)
                                .is_some_and(|&n| n.is_ascii_alphanumeric() || n == '_') =>
                        {
                            pos += 1
                        }
                        _ => break,
                    }
                }
                tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            }
            other => {
                return Err(ExpressionError::UnexpectedChar {
                    found: other,
                    position: pos,
                })
            }
        }
    }

    Ok(tokens)
}
