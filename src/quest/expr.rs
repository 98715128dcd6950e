//! Arithmetic and boolean expressions used as quest command arguments.
//!
//! Booleans are numbers: comparisons and logic operators yield `1` or `0`,
//! and any non-zero operand counts as true.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character '{0}' at {1}")]
    UnexpectedChar(char, usize),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected '{0}'")]
    UnexpectedToken(String),
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),
    #[error("division by zero")]
    DivideByZero,
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Number(f64),
    Ident(String),
    Op(&'static str),
    Open,
    Close,
}

const OPERATORS: [&str; 15] = [
    "&&", "||", "==", "!=", "<=", ">=", "<", ">", "+", "-", "*", "/", "%", "!", "=",
];

fn tokenize(text: &str) -> Result<Vec<Tok>, ExprError> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let c = bytes[pos] as char;
        if c.is_ascii_whitespace() {
            pos += 1;
        } else if c == '(' {
            out.push(Tok::Open);
            pos += 1;
        } else if c == ')' {
            out.push(Tok::Close);
            pos += 1;
        } else if c.is_ascii_digit() || (c == '.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)) {
            let start = pos;
            while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
                pos += 1;
            }
            let value = text[start..pos]
                .parse()
                .map_err(|_| ExprError::UnexpectedChar(c, start))?;
            out.push(Tok::Number(value));
        } else if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            let start = pos;
            while pos < bytes.len()
                && (bytes[pos].is_ascii_alphanumeric() || matches!(bytes[pos], b'_' | b'.' | b'$'))
            {
                pos += 1;
            }
            out.push(Tok::Ident(text[start..pos].to_string()));
        } else {
            let op = OPERATORS
                .iter()
                .find(|op| text[pos..].starts_with(**op))
                .ok_or(ExprError::UnexpectedChar(c, pos))?;
            // a lone `=` reads as equality
            out.push(Tok::Op(if *op == "=" { "==" } else { op }));
            pos += op.len();
        }
    }
    Ok(out)
}

fn binding_power(op: &str) -> Option<u8> {
    Some(match op {
        "||" => 1,
        "&&" => 2,
        "==" | "!=" => 3,
        "<" | "<=" | ">" | ">=" => 4,
        "+" | "-" => 5,
        "*" | "/" | "%" => 6,
        _ => return None,
    })
}

const PREFIX_POWER: u8 = 7;

fn truth(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

struct Parser<'r, R> {
    tokens: Vec<Tok>,
    pos: usize,
    resolve: &'r R,
}

impl<R: Fn(&str) -> Option<f64>> Parser<'_, R> {
    fn next(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn expression(&mut self, min_power: u8) -> Result<f64, ExprError> {
        let mut lhs = match self.next().ok_or(ExprError::UnexpectedEnd)? {
            Tok::Number(value) => value,
            Tok::Ident(name) => match name.to_ascii_lowercase().as_str() {
                "true" => 1.0,
                "false" => 0.0,
                _ => (self.resolve)(&name).ok_or(ExprError::UnknownIdentifier(name))?,
            },
            Tok::Open => {
                let value = self.expression(0)?;
                match self.next() {
                    Some(Tok::Close) => value,
                    Some(other) => return Err(ExprError::UnexpectedToken(format!("{other:?}"))),
                    None => return Err(ExprError::UnexpectedEnd),
                }
            }
            Tok::Op("-") => -self.expression(PREFIX_POWER)?,
            Tok::Op("+") => self.expression(PREFIX_POWER)?,
            Tok::Op("!") => truth(self.expression(PREFIX_POWER)? == 0.0),
            other => return Err(ExprError::UnexpectedToken(format!("{other:?}"))),
        };

        while let Some(Tok::Op(op)) = self.peek() {
            let op = *op;
            let Some(power) = binding_power(op) else {
                return Err(ExprError::UnexpectedToken(op.to_string()));
            };
            if power <= min_power {
                break;
            }
            self.pos += 1;
            let rhs = self.expression(power)?;
            lhs = match op {
                "+" => lhs + rhs,
                "-" => lhs - rhs,
                "*" => lhs * rhs,
                "/" | "%" if rhs == 0.0 => return Err(ExprError::DivideByZero),
                "/" => lhs / rhs,
                "%" => lhs % rhs,
                "<" => truth(lhs < rhs),
                "<=" => truth(lhs <= rhs),
                ">" => truth(lhs > rhs),
                ">=" => truth(lhs >= rhs),
                "==" => truth(lhs == rhs),
                "!=" => truth(lhs != rhs),
                "&&" => truth(lhs != 0.0 && rhs != 0.0),
                _ => truth(lhs != 0.0 || rhs != 0.0),
            };
        }
        Ok(lhs)
    }
}

/// Evaluates `text`, looking identifiers up through `resolve`.
pub fn evaluate<R>(text: &str, resolve: R) -> Result<f64, ExprError>
where
    R: Fn(&str) -> Option<f64>,
{
    let mut parser = Parser {
        tokens: tokenize(text)?,
        pos: 0,
        resolve: &resolve,
    };
    let value = parser.expression(0)?;
    match parser.next() {
        None => Ok(value),
        Some(tok) => Err(ExprError::UnexpectedToken(format!("{tok:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str) -> Result<f64, ExprError> {
        evaluate(text, |name| match name {
            "t" => Some(40.0),
            "$pc.x" => Some(2.5),
            "t2" => Some(1.0),
            _ => None,
        })
    }

    #[test]
    fn precedence_and_grouping() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), 7.0);
        assert_eq!(eval("(1 + 2) * 3").unwrap(), 9.0);
        assert_eq!(eval("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(eval("-2 * -3").unwrap(), 6.0);
        assert_eq!(eval("7 % 4").unwrap(), 3.0);
    }

    #[test]
    fn identifiers_resolve_whole_words() {
        // `t` must not be substituted inside `t2`
        assert_eq!(eval("t2 + t").unwrap(), 41.0);
        assert_eq!(eval("$pc.x * 2").unwrap(), 5.0);
        assert_eq!(eval("missing + 1"), Err(ExprError::UnknownIdentifier("missing".into())));
    }

    #[test]
    fn comparisons_and_logic_are_numeric() {
        assert_eq!(eval("t > 30 && t < 50").unwrap(), 1.0);
        assert_eq!(eval("t == 41 || false").unwrap(), 0.0);
        assert_eq!(eval("!(t = 40)").unwrap(), 0.0);
        assert_eq!(eval("true + true").unwrap(), 2.0);
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert_eq!(eval("1 / 0"), Err(ExprError::DivideByZero));
        assert_eq!(eval("1 +"), Err(ExprError::UnexpectedEnd));
        assert!(eval("(1 + 2").is_err());
        assert!(eval("1 2").is_err());
        assert!(matches!(eval("1 # 2"), Err(ExprError::UnexpectedChar('#', 2))));
    }
}
