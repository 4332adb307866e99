use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Arithmetic operations a calculation may request. Serialised in canonical
/// upper-case form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalcError {
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Result is out of range")]
    ResultOutOfRange,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Add => "ADD",
            Operation::Sub => "SUB",
            Operation::Mul => "MUL",
            Operation::Div => "DIV",
        }
    }

    /// Case-insensitive lookup. Only the listed spellings are accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "add" => Some(Operation::Add),
            "sub" | "subtract" => Some(Operation::Sub),
            "mul" | "multiply" => Some(Operation::Mul),
            "div" | "divide" => Some(Operation::Div),
            _ => None,
        }
    }

    pub fn apply(self, a: f64, b: f64) -> Result<f64, CalcError> {
        let result = match self {
            Operation::Add => a + b,
            Operation::Sub => a - b,
            Operation::Mul => a * b,
            Operation::Div => {
                if b == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                a / b
            }
        };
        if !result.is_finite() {
            return Err(CalcError::ResultOutOfRange);
        }
        Ok(result)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
