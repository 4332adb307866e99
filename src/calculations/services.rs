use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::{
    operation::CalcError,
    repo::CalculationStore,
    repo_types::CalculationRecord,
    validator::ValidatedRequest,
};
use crate::error::AppResult;

pub fn compute(req: &ValidatedRequest) -> Result<f64, CalcError> {
    req.operation().apply(req.a(), req.b())
}

/// Run a validated request and persist it for `user_id` under a fresh id.
/// Identical requests are stored as separate records.
pub async fn execute(
    store: &dyn CalculationStore,
    user_id: Uuid,
    req: ValidatedRequest,
) -> AppResult<CalculationRecord> {
    let result = compute(&req)?;

    let record = CalculationRecord {
        id: Uuid::new_v4(),
        user_id,
        a: req.a(),
        b: req.b(),
        kind: req.operation(),
        result,
        created_at: OffsetDateTime::now_utc(),
    };
    let saved = store.insert(record).await?;

    info!(calculation_id = %saved.id, user_id = %user_id, kind = %saved.kind, "calculation stored");
    Ok(saved)
}
