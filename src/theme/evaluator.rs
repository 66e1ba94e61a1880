// ABOUTME: Restricted arithmetic evaluator for theme expressions
// ABOUTME: Substitutes ${name} references and evaluates + - * / % with parentheses, nothing else

use crate::errors::{DeckError, Result};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;

lazy_static! {
    static ref VARIABLE_PATTERN: Regex = Regex::new(r"\$\{(\w+)\}").unwrap();
    static ref NUMERIC_PATTERN: Regex = Regex::new(r"^[\d\s+\-*/%().]+$").unwrap();
}

/// Substitution passes before a self-referencing value is reported.
const MAX_SUBSTITUTION_DEPTH: usize = 32;
const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
}

impl Token {
    fn symbol(&self) -> String {
        match self {
            Token::Number(n) => n.to_string(),
            Token::Plus => "+".to_string(),
            Token::Minus => "-".to_string(),
            Token::Star => "*".to_string(),
            Token::Slash => "/".to_string(),
            Token::Percent => "%".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
        }
    }
}

/// Render a JSON value the way it appears when spliced into expression text
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Convert an evaluated number into JSON, collapsing whole floats to integers
pub fn number_to_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

/// Evaluates theme expressions against a fixed set of variables.
///
/// Expressions that are purely numeric after substitution are computed; anything else is
/// returned as the interpolated string.
pub struct SafeExpressionEvaluator<'a> {
    variables: &'a IndexMap<String, Value>,
}

impl<'a> SafeExpressionEvaluator<'a> {
    pub fn new(variables: &'a IndexMap<String, Value>) -> Self {
        Self { variables }
    }

    pub fn evaluate(&self, expression: &str) -> Result<Value> {
        let substituted = self.substitute(expression)?;

        if substituted.trim().is_empty() || !NUMERIC_PATTERN.is_match(&substituted) {
            return Ok(Value::String(substituted));
        }

        let n = evaluate_numeric(&substituted)?;
        if !n.is_finite() {
            return Err(DeckError::ExpressionError(format!(
                "Result of '{}' is not a finite number",
                expression
            )));
        }
        Ok(number_to_value(n))
    }

    /// Replace every `${name}` until no references remain
    pub fn substitute(&self, expression: &str) -> Result<String> {
        let mut current = expression.to_string();

        for _ in 0..MAX_SUBSTITUTION_DEPTH {
            if !VARIABLE_PATTERN.is_match(&current) {
                return Ok(current);
            }

            let mut missing = None;
            let next = VARIABLE_PATTERN.replace_all(&current, |caps: &Captures| {
                let name = &caps[1];
                match self.variables.get(name) {
                    Some(value) => value_to_text(value),
                    None => {
                        missing.get_or_insert_with(|| name.to_string());
                        String::new()
                    }
                }
            });

            if let Some(name) = missing {
                return Err(DeckError::ExpressionError(format!(
                    "Unknown variable: {}",
                    name
                )));
            }
            current = next.into_owned();
        }

        Err(DeckError::ExpressionError(format!(
            "Variable substitution in '{}' did not terminate",
            expression
        )))
    }
}

fn tokenize(expression: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let literal: String = chars[start..i].iter().collect();
            let n = literal.parse::<f64>().map_err(|_| {
                DeckError::ExpressionError(format!(
                    "Invalid number '{}' at position {}",
                    literal, start
                ))
            })?;
            tokens.push(Token::Number(n));
            continue;
        }

        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            _ => {
                return Err(DeckError::ExpressionError(format!(
                    "Unexpected character '{}' at position {}",
                    c, i
                )))
            }
        };
        tokens.push(token);
        i += 1;
    }

    Ok(tokens)
}

fn evaluate_numeric(expression: &str) -> Result<f64> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    if let Some(token) = parser.peek() {
        return Err(DeckError::ExpressionError(format!(
            "Unexpected token '{}'",
            token.symbol()
        )));
    }
    Ok(value)
}

/// Recursive descent over the token stream: expression > term > factor.
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
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expression(&mut self) -> Result<f64> {
        let mut left = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let right = self.term()?;
            left = if op == Token::Plus {
                left + right
            } else {
                left - right
            };
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<f64> {
        let mut left = self.factor()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::Percent)) = self.peek() {
            self.pos += 1;
            let right = self.factor()?;
            left = match op {
                Token::Star => left * right,
                Token::Slash => {
                    if right == 0.0 {
                        return Err(DeckError::ExpressionError("Division by zero".to_string()));
                    }
                    left / right
                }
                _ => {
                    if right == 0.0 {
                        return Err(DeckError::ExpressionError("Modulo by zero".to_string()));
                    }
                    // Result takes the sign of the divisor.
                    let r = left % right;
                    if r != 0.0 && (r < 0.0) != (right < 0.0) {
                        r + right
                    } else {
                        r
                    }
                }
            };
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<f64> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(DeckError::ExpressionError(
                "Expression nested too deeply".to_string(),
            ));
        }
        let value = self.primary();
        self.depth -= 1;
        value
    }

    fn primary(&mut self) -> Result<f64> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Minus) => Ok(-self.factor()?),
            Some(Token::LParen) => {
                let value = self.expression()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    Some(other) => Err(DeckError::ExpressionError(format!(
                        "Unexpected token '{}', expected ')'",
                        other.symbol()
                    ))),
                    None => Err(DeckError::ExpressionError(
                        "Unexpected end of expression, expected ')'".to_string(),
                    )),
                }
            }
            Some(other) => Err(DeckError::ExpressionError(format!(
                "Unexpected token '{}'",
                other.symbol()
            ))),
            None => Err(DeckError::ExpressionError(
                "Unexpected end of expression".to_string(),
            )),
        }
    }
}
