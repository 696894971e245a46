//! calculateMath: arithmetic without evaluating arbitrary code
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/' | '%') unary)*
//! unary  := ('-' | '+') unary | power
//! power  := atom (('^' | '**') unary)?
//! atom   := number | '(' expr ')'
//! ```
//!
//! Exponentiation is right-associative and binds tighter than a leading
//! minus, so `-2^2` is `-4`. `%` takes the sign of the divisor.

use super::{required_param, Tool, ToolContext};
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Longest expression accepted before tokenizing
const MAX_EXPRESSION_LEN: usize = 4096;

/// Parentheses, signs and exponents nested deeper than this are rejected
const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' => {}
            '0'..='9' | '.' => {
                let start = i;
                while i + 1 < chars.len() && (chars[i + 1].is_ascii_digit() || chars[i + 1] == '.') {
                    i += 1;
                }
                // Scientific notation: 1e3, 2.5E-4
                if i + 1 < chars.len() && matches!(chars[i + 1], 'e' | 'E') {
                    let mut j = i + 2;
                    if j < chars.len() && matches!(chars[j], '+' | '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j + 1 < chars.len() && chars[j + 1].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let text: String = chars[start..=i].iter().collect();
                let value: f64 = text
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid number '{}'", text))?;
                tokens.push(Token::Num(value));
            }
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '*' | 'x' | '×' => tokens.push(Token::Star),
            '/' | '÷' => tokens.push(Token::Slash),
            '%' => tokens.push(Token::Percent),
            '^' => tokens.push(Token::Caret),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            other => bail!("unexpected character '{}'", other),
        }
        i += 1;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            bail!("expression nested too deeply");
        }
        Ok(())
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.peek();
        self.pos += 1;
        t
    }

    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::Percent)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                Token::Star => value * rhs,
                _ if rhs == 0.0 => bail!("division by zero"),
                Token::Slash => value / rhs,
                _ => value - rhs * (value / rhs).floor(),
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.descend()?;
                let value = -self.unary()?;
                self.depth -= 1;
                Ok(value)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.descend()?;
                let value = self.unary()?;
                self.depth -= 1;
                Ok(value)
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Caret) {
            self.pos += 1;
            self.descend()?;
            let exponent = self.unary()?;
            self.depth -= 1;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                self.descend()?;
                let value = self.expr()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => bail!("missing closing parenthesis"),
                }
            }
            Some(other) => bail!("unexpected token {:?}", other),
            None => bail!("unexpected end of expression"),
        }
    }
}

/// Evaluate an arithmetic expression
pub fn evaluate(expression: &str) -> Result<f64> {
    if expression.len() > MAX_EXPRESSION_LEN {
        bail!("expression too long");
    }
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        bail!("empty expression");
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        bail!("unexpected trailing input");
    }
    if !value.is_finite() {
        bail!("result is not a finite number");
    }
    Ok(value)
}

/// Whole numbers print without a fractional part
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

pub struct CalculateMath;

#[async_trait]
impl Tool for CalculateMath {
    fn name(&self) -> &'static str {
        "calculateMath"
    }

    fn description(&self) -> &'static str {
        "Evaluate an arithmetic expression (expression)"
    }

    fn error_label(&self) -> &'static str {
        "Calculation error"
    }

    async fn call(&self, params: &Value, _ctx: &ToolContext) -> Result<String> {
        let expression = required_param(params, "expression")?;
        let value = evaluate(expression)?;
        Ok(format!("Result: {} = {}", expression, format_number(value)))
    }
}
