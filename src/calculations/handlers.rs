use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CalculateQuery, CalculateResponse, CalculationResponse, Pagination, RawCalculation},
    operation::Operation,
    services,
    validator::validate,
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult, JsonBody, PathParam, QueryParams},
    state::AppState,
};

pub fn calculation_routes() -> Router<AppState> {
    Router::new()
        .route("/calculations", get(list_calculations).post(create_calculation))
        .route(
            "/calculations/:id",
            get(get_calculation).delete(delete_calculation),
        )
}

pub fn calculate_routes() -> Router<AppState> {
    Router::new().route("/calculate/:op", get(calculate))
}

/// POST /calculations
/// `AuthUser` rejects before the body is read, so authentication failures
/// always win over validation failures.
#[instrument(skip(state, raw))]
pub async fn create_calculation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(raw): JsonBody<RawCalculation>,
) -> AppResult<Json<CalculationResponse>> {
    let req = validate(&raw)?;
    let record = services::execute(state.calculations.as_ref(), user_id, req).await?;
    Ok(Json(record.into()))
}

#[instrument(skip(state))]
pub async fn list_calculations(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    QueryParams(p): QueryParams<Pagination>,
) -> AppResult<Json<Vec<CalculationResponse>>> {
    let (limit, offset) = p.normalized();
    let records = state
        .calculations
        .list_by_user(user_id, limit, offset)
        .await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn get_calculation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> AppResult<Json<CalculationResponse>> {
    let record = state
        .calculations
        .get(user_id, id)
        .await?
        .ok_or(AppError::NotFound("Calculation"))?;
    Ok(Json(record.into()))
}

#[instrument(skip(state))]
pub async fn delete_calculation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> AppResult<StatusCode> {
    if !state.calculations.delete(user_id, id).await? {
        return Err(AppError::NotFound("Calculation"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /calculate/:op?a=&b=
/// Stateless arithmetic, no authentication, nothing persisted. An unknown
/// operation in the path is a 400, not a field-level 422.
#[instrument]
pub async fn calculate(
    PathParam(op): PathParam<String>,
    QueryParams(q): QueryParams<CalculateQuery>,
) -> AppResult<Json<CalculateResponse>> {
    let op = Operation::parse(&op)
        .ok_or_else(|| AppError::BadRequest("Unknown operation".into()))?;
    let raw = RawCalculation {
        a: q.a.map(Value::String),
        b: q.b.map(Value::String),
        kind: Some(Value::String(op.as_str().into())),
    };
    let req = validate(&raw)?;
    let result = services::compute(&req)?;
    Ok(Json(CalculateResponse { result }))
}
