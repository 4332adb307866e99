use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{operation::Operation, repo_types::CalculationRecord};

/// Unvalidated calculation body. Every field is optional here so that shape
/// problems are reported per field by the validator instead of as a parse error.
#[derive(Debug, Default, Deserialize)]
pub struct RawCalculation {
    #[serde(default)]
    pub a: Option<Value>,
    #[serde(default)]
    pub b: Option<Value>,
    #[serde(default, rename = "type")]
    pub kind: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct CalculationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub a: f64,
    pub b: f64,
    #[serde(rename = "type")]
    pub kind: Operation,
    pub result: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<CalculationRecord> for CalculationResponse {
    fn from(r: CalculationRecord) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            a: r.a,
            b: r.b,
            kind: r.kind,
            result: r.result,
            created_at: r.created_at,
        }
    }
}

/// Query of the stateless `GET /calculate/:op` endpoint.
#[derive(Debug, Deserialize)]
pub struct CalculateQuery {
    pub a: Option<String>,
    pub b: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CalculateResponse {
    pub result: f64,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

impl Pagination {
    pub const MAX_LIMIT: i64 = 100;

    /// Clamp to `1..=MAX_LIMIT` and a non-negative offset.
    pub fn normalized(&self) -> (i64, i64) {
        (self.limit.clamp(1, Self::MAX_LIMIT), self.offset.max(0))
    }
}
