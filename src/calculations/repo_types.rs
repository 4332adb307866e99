use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::operation::Operation;
use crate::db::StoreError;

/// Persisted result of one executed calculation. Owned by exactly one user.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub a: f64,
    pub b: f64,
    pub kind: Operation,
    pub result: f64,
    pub created_at: OffsetDateTime,
}

/// Row shape of the `calculations` table; `kind` holds the canonical name.
#[derive(Debug, FromRow)]
pub struct CalculationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub a: f64,
    pub b: f64,
    pub kind: String,
    pub result: f64,
    pub created_at: OffsetDateTime,
}

impl TryFrom<CalculationRow> for CalculationRecord {
    type Error = StoreError;

    fn try_from(r: CalculationRow) -> Result<Self, Self::Error> {
        let kind = Operation::parse(&r.kind).ok_or_else(|| {
            StoreError::Backend(anyhow::anyhow!("unknown operation {:?} in row {}", r.kind, r.id))
        })?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            a: r.a,
            b: r.b,
            kind,
            result: r.result,
            created_at: r.created_at,
        })
    }
}
