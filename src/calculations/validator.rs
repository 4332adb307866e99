use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::{dto::RawCalculation, operation::Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MalformedInput,
    UnrecognizedOperation,
}

/// One field-level validation problem, rendered inside the 422 `detail` list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: IssueKind,
}

#[derive(Debug, Error)]
#[error("request validation failed ({} issue(s))", .issues.len())]
pub struct ValidationError {
    issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    /// The body as a whole could not be read as the expected JSON shape.
    pub fn malformed_body(msg: impl Into<String>) -> Self {
        Self::malformed("body", msg)
    }

    /// A whole request part (`body`, `path`, `query`) failed to deserialize.
    pub fn malformed(part: &str, msg: impl Into<String>) -> Self {
        Self {
            issues: vec![FieldIssue {
                loc: vec![part.into()],
                msg: msg.into(),
                kind: IssueKind::MalformedInput,
            }],
        }
    }
}

/// A calculation request that passed the validation gate. Only [`validate`]
/// constructs one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedRequest {
    a: f64,
    b: f64,
    operation: Operation,
}

impl ValidatedRequest {
    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }
}

const OPERATION_HINT: &str = "Input should be 'ADD', 'SUB', 'MUL' or 'DIV'";

fn issue(field: &str, msg: &str, kind: IssueKind) -> FieldIssue {
    FieldIssue {
        loc: vec!["body".into(), field.into()],
        msg: msg.into(),
        kind,
    }
}

/// Numbers, or strings holding a finite decimal number.
fn number(field: &str, value: Option<&Value>) -> Result<f64, FieldIssue> {
    let parsed = match value {
        None => return Err(issue(field, "Field required", IssueKind::MalformedInput)),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| issue(field, "Input should be a valid number", IssueKind::MalformedInput))
}

fn operation(value: Option<&Value>) -> Result<Operation, FieldIssue> {
    match value {
        None => Err(issue("type", "Field required", IssueKind::MalformedInput)),
        Some(Value::String(s)) => Operation::parse(s)
            .ok_or_else(|| issue("type", OPERATION_HINT, IssueKind::UnrecognizedOperation)),
        Some(_) => Err(issue("type", OPERATION_HINT, IssueKind::MalformedInput)),
    }
}

/// Check shape and operation of a raw request, collecting every failing field.
pub fn validate(raw: &RawCalculation) -> Result<ValidatedRequest, ValidationError> {
    let a = number("a", raw.a.as_ref());
    let b = number("b", raw.b.as_ref());
    let op = operation(raw.kind.as_ref());

    match (a, b, op) {
        (Ok(a), Ok(b), Ok(operation)) => Ok(ValidatedRequest { a, b, operation }),
        (a, b, op) => Err(ValidationError {
            issues: [a.err(), b.err(), op.err()].into_iter().flatten().collect(),
        }),
    }
}
