//! Arithmetic evaluation for `int` and `float` conversions
//!
//! Only numeric literals, `+ - * / // % **`, unary signs and parentheses are
//! accepted. There are no names, calls or attribute lookups, so evaluating an
//! option value can never reach anything outside the expression itself.
//! Integer arithmetic stays exact until it overflows `i64`; `/` always
//! produces a float, `//` floors and `%` takes the sign of the divisor.

use super::strip_digit_separators;
use thiserror::Error;

/// Deepest nesting of parentheses, signs and exponents accepted.
const MAX_DEPTH: usize = 256;

#[derive(Error, Debug, PartialEq)]
pub enum ExpressionError {
    #[error("unexpected character {0:?} at offset {1}")]
    UnexpectedChar(char, usize),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected {0}")]
    UnexpectedToken(String),
    #[error("invalid number literal {0:?}")]
    InvalidNumber(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
    #[error("result is not a finite number")]
    NotFinite,
    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Value of an evaluated expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(value) => value as f64,
            Number::Float(value) => value,
        }
    }

    /// Truncates toward zero.
    pub fn truncate(self) -> Result<i64, ExpressionError> {
        match self {
            Number::Int(value) => Ok(value),
            Number::Float(value) if !value.is_finite() => Err(ExpressionError::NotFinite),
            Number::Float(value) => {
                let truncated = value.trunc();
                if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
                    Err(ExpressionError::Overflow)
                } else {
                    Ok(truncated as i64)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(Number),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    LeftParen,
    RightParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(number) => format!("number {}", number.as_f64()),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::DoubleStar => "'**'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::DoubleSlash => "'//'".to_string(),
            Token::Percent => "'%'".to_string(),
            Token::LeftParen => "'('".to_string(),
            Token::RightParen => "')'".to_string(),
        }
    }
}

/// Evaluates an arithmetic expression.
pub fn evaluate(input: &str) -> Result<Number, ExpressionError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    match parser.peek() {
        None => Ok(value),
        Some(token) => Err(ExpressionError::UnexpectedToken(token.describe())),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let token = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '0'..='9' | '.' => {
                let (number, end) = read_number(&chars, i)?;
                i = end;
                tokens.push(Token::Number(number));
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                Token::DoubleStar
            }
            '*' => Token::Star,
            '/' if chars.get(i + 1) == Some(&'/') => {
                i += 1;
                Token::DoubleSlash
            }
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            other => return Err(ExpressionError::UnexpectedChar(other, i)),
        };
        tokens.push(token);
        i += 1;
    }

    Ok(tokens)
}

fn read_number(chars: &[char], start: usize) -> Result<(Number, usize), ExpressionError> {
    let mut end = start;
    while end < chars.len() && (chars[end].is_ascii_digit() || chars[end] == '.' || chars[end] == '_') {
        end += 1;
    }

    if end < chars.len() && (chars[end] == 'e' || chars[end] == 'E') {
        let mut exponent = end + 1;
        if exponent < chars.len() && (chars[exponent] == '+' || chars[exponent] == '-') {
            exponent += 1;
        }
        if exponent < chars.len() && chars[exponent].is_ascii_digit() {
            end = exponent;
            while end < chars.len() && chars[end].is_ascii_digit() {
                end += 1;
            }
        }
    }

    let literal: String = chars[start..end].iter().collect();
    let text = strip_digit_separators(&literal)
        .ok_or_else(|| ExpressionError::InvalidNumber(literal.clone()))?;
    let is_float = text.contains(['.', 'e', 'E']);

    let number = if is_float {
        text.parse::<f64>().map(Number::Float).ok()
    } else {
        match text.parse::<i64>() {
            Ok(value) => Some(Number::Int(value)),
            Err(_) if text.chars().all(|c| c.is_ascii_digit()) && !text.is_empty() => {
                return Err(ExpressionError::Overflow)
            }
            Err(_) => None,
        }
    };

    number
        .map(|number| (number, end))
        .ok_or(ExpressionError::InvalidNumber(literal))
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

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<Number, ExpressionError> {
        let mut value = self.term()?;
        while let Some(token @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = match token {
                Token::Plus => add(value, rhs)?,
                _ => subtract(value, rhs)?,
            };
        }
        Ok(value)
    }

    // term := unary (('*' | '/' | '//' | '%') unary)*
    fn term(&mut self) -> Result<Number, ExpressionError> {
        let mut value = self.unary()?;
        while let Some(token @ (Token::Star | Token::Slash | Token::DoubleSlash | Token::Percent)) =
            self.peek()
        {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match token {
                Token::Star => multiply(value, rhs)?,
                Token::Slash => divide(value, rhs)?,
                Token::DoubleSlash => floor_divide(value, rhs)?,
                _ => modulo(value, rhs)?,
            };
        }
        Ok(value)
    }

    // Every recursive rule passes through here.
    fn unary(&mut self) -> Result<Number, ExpressionError> {
        if self.depth >= MAX_DEPTH {
            return Err(ExpressionError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    // unary := ('+' | '-') unary | power
    fn signed(&mut self) -> Result<Number, ExpressionError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            Some(Token::Minus) => {
                self.pos += 1;
                negate(self.unary()?)
            }
            _ => self.power(),
        }
    }

    // power := primary ('**' unary)?
    fn power(&mut self) -> Result<Number, ExpressionError> {
        let base = self.primary()?;
        if self.peek() == Some(Token::DoubleStar) {
            self.pos += 1;
            let exponent = self.unary()?;
            return power(base, exponent);
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Number, ExpressionError> {
        match self.next() {
            Some(Token::Number(number)) => Ok(number),
            Some(Token::LeftParen) => {
                let value = self.expression()?;
                match self.next() {
                    Some(Token::RightParen) => Ok(value),
                    Some(token) => Err(ExpressionError::UnexpectedToken(token.describe())),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            Some(token) => Err(ExpressionError::UnexpectedToken(token.describe())),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }
}

fn add(lhs: Number, rhs: Number) -> Result<Number, ExpressionError> {
    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => a.checked_add(b).map(Number::Int).ok_or(ExpressionError::Overflow),
        _ => Ok(Number::Float(lhs.as_f64() + rhs.as_f64())),
    }
}

fn subtract(lhs: Number, rhs: Number) -> Result<Number, ExpressionError> {
    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => a.checked_sub(b).map(Number::Int).ok_or(ExpressionError::Overflow),
        _ => Ok(Number::Float(lhs.as_f64() - rhs.as_f64())),
    }
}

fn multiply(lhs: Number, rhs: Number) -> Result<Number, ExpressionError> {
    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => a.checked_mul(b).map(Number::Int).ok_or(ExpressionError::Overflow),
        _ => Ok(Number::Float(lhs.as_f64() * rhs.as_f64())),
    }
}

fn divide(lhs: Number, rhs: Number) -> Result<Number, ExpressionError> {
    if rhs.as_f64() == 0.0 {
        return Err(ExpressionError::DivisionByZero);
    }
    Ok(Number::Float(lhs.as_f64() / rhs.as_f64()))
}

fn floor_divide(lhs: Number, rhs: Number) -> Result<Number, ExpressionError> {
    if rhs.as_f64() == 0.0 {
        return Err(ExpressionError::DivisionByZero);
    }
    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => {
            let quotient = a.checked_div(b).ok_or(ExpressionError::Overflow)?;
            if a % b != 0 && ((a < 0) != (b < 0)) {
                Ok(Number::Int(quotient - 1))
            } else {
                Ok(Number::Int(quotient))
            }
        }
        _ => Ok(Number::Float((lhs.as_f64() / rhs.as_f64()).floor())),
    }
}

fn modulo(lhs: Number, rhs: Number) -> Result<Number, ExpressionError> {
    if rhs.as_f64() == 0.0 {
        return Err(ExpressionError::DivisionByZero);
    }
    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => {
            let remainder = a.checked_rem(b).ok_or(ExpressionError::Overflow)?;
            if remainder != 0 && ((remainder < 0) != (b < 0)) {
                Ok(Number::Int(remainder + b))
            } else {
                Ok(Number::Int(remainder))
            }
        }
        _ => {
            let (a, b) = (lhs.as_f64(), rhs.as_f64());
            let remainder = a % b;
            if remainder != 0.0 && ((remainder < 0.0) != (b < 0.0)) {
                Ok(Number::Float(remainder + b))
            } else {
                Ok(Number::Float(remainder))
            }
        }
    }
}

fn power(base: Number, exponent: Number) -> Result<Number, ExpressionError> {
    match (base, exponent) {
        (Number::Int(a), Number::Int(b)) if b >= 0 => {
            let b = u32::try_from(b).map_err(|_| ExpressionError::Overflow)?;
            a.checked_pow(b).map(Number::Int).ok_or(ExpressionError::Overflow)
        }
        _ => {
            if base.as_f64() == 0.0 && exponent.as_f64() < 0.0 {
                return Err(ExpressionError::DivisionByZero);
            }
            let value = base.as_f64().powf(exponent.as_f64());
            if value.is_nan() {
                Err(ExpressionError::NotFinite)
            } else {
                Ok(Number::Float(value))
            }
        }
    }
}

fn negate(value: Number) -> Result<Number, ExpressionError> {
    match value {
        Number::Int(a) => a.checked_neg().map(Number::Int).ok_or(ExpressionError::Overflow),
        Number::Float(a) => Ok(Number::Float(-a)),
    }
}
