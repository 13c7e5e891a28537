//! Arithmetic expression evaluator for the `calculate` tool.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr  := term (('+' | '-') term)*
//! term  := unary (('*' | '/') unary)*
//! unary := ('+' | '-') unary | atom
//! atom  := number | '(' expr ')'
//! ```

use serde_json::Value;
use std::fmt;

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,
    #[error("unsupported character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("expression nested too deeply")]
    TooDeep,
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
    #[error("result is not a finite number")]
    NotFinite,
}

/// An evaluated value. Integer arithmetic stays integral until a float or a
/// true division is involved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    #[allow(clippy::cast_precision_loss)]
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Self::Int(i) => i == 0,
            Self::Float(f) => f == 0.0,
        }
    }

    /// JSON form of the value.
    ///
    /// # Errors
    /// Returns [`ExprError::NotFinite`] for NaN and infinities.
    pub fn to_json(self) -> Result<Value, ExprError> {
        match self {
            Self::Int(i) => Ok(Value::from(i)),
            Self::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .ok_or(ExprError::NotFinite),
        }
    }

    fn add(self, rhs: Self) -> Result<Self, ExprError> {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => a.checked_add(b).map(Self::Int).ok_or(ExprError::Overflow),
            _ => Ok(Self::Float(self.as_f64() + rhs.as_f64())),
        }
    }

    fn sub(self, rhs: Self) -> Result<Self, ExprError> {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => a.checked_sub(b).map(Self::Int).ok_or(ExprError::Overflow),
            _ => Ok(Self::Float(self.as_f64() - rhs.as_f64())),
        }
    }

    fn mul(self, rhs: Self) -> Result<Self, ExprError> {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => a.checked_mul(b).map(Self::Int).ok_or(ExprError::Overflow),
            _ => Ok(Self::Float(self.as_f64() * rhs.as_f64())),
        }
    }

    fn div(self, rhs: Self) -> Result<Self, ExprError> {
        if rhs.is_zero() {
            return Err(ExprError::DivisionByZero);
        }
        Ok(Self::Float(self.as_f64() / rhs.as_f64()))
    }

    fn neg(self) -> Result<Self, ExprError> {
        match self {
            Self::Int(i) => i.checked_neg().map(Self::Int).ok_or(ExprError::Overflow),
            Self::Float(f) => Ok(Self::Float(-f)),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            // Debug keeps the trailing ".0" on whole floats.
            Self::Float(x) => write!(f, "{x:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(Number),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Star => f.write_str("*"),
            Self::Slash => f.write_str("/"),
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Num(parse_number(&text)?));
            }
            _ => {
                tokens.push(match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    other => return Err(ExprError::UnexpectedChar(other, i)),
                });
                i += 1;
            }
        }
    }
    Ok(tokens)
}

fn parse_number(text: &str) -> Result<Number, ExprError> {
    if text.contains('.') {
        text.parse::<f64>()
            .map(Number::Float)
            .map_err(|_| ExprError::InvalidNumber(text.to_string()))
    } else {
        // Only digits reach here, so a parse failure is always overflow.
        text.parse::<i64>().map(Number::Int).map_err(|_| ExprError::Overflow)
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expr(&mut self) -> Result<Number, ExprError> {
        let mut lhs = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.bump();
                    lhs = lhs.add(self.term()?)?;
                }
                Some(Token::Minus) => {
                    self.bump();
                    lhs = lhs.sub(self.term()?)?;
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn term(&mut self) -> Result<Number, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.bump();
                    lhs = lhs.mul(self.unary()?)?;
                }
                Some(Token::Slash) => {
                    self.bump();
                    lhs = lhs.div(self.unary()?)?;
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn unary(&mut self) -> Result<Number, ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        let value = match self.peek() {
            Some(Token::Plus) => {
                self.bump();
                self.unary()
            }
            Some(Token::Minus) => {
                self.bump();
                self.unary().and_then(Number::neg)
            }
            _ => self.atom(),
        };
        self.depth -= 1;
        value
    }

    fn atom(&mut self) -> Result<Number, ExprError> {
        match self.bump() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(value),
                    Some(other) => Err(ExprError::UnexpectedToken(other.to_string())),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(other) => Err(ExprError::UnexpectedToken(other.to_string())),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

/// Evaluate an arithmetic expression.
///
/// # Errors
/// Returns an [`ExprError`] for malformed input, division by zero, integer
/// overflow or a non-finite result.
pub fn evaluate(input: &str) -> Result<Number, ExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let value = parser.expr()?;
    if let Some(extra) = parser.peek() {
        return Err(ExprError::UnexpectedToken(extra.to_string()));
    }
    if let Number::Float(f) = value {
        if !f.is_finite() {
            return Err(ExprError::NotFinite);
        }
    }
    Ok(value)
}
