use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::{
    auth::{extractors::AuthError, jwt::TokenError, password::PasswordError},
    calculations::{operation::CalcError, validator::ValidationError},
    db::StoreError,
};

pub type AppResult<T> = Result<T, AppError>;

/// Every failure a handler can surface. Rendered as `{"detail": ...}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Calculation(#[from] CalcError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(_) | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Token(TokenError::Invalid | TokenError::Expired) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) | AppError::Calculation(_) => StatusCode::BAD_REQUEST,
            AppError::Password(PasswordError::Empty) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::DuplicateIdentifier) => StatusCode::CONFLICT,
            AppError::Store(StoreError::Backend(_))
            | AppError::Password(_)
            | AppError::Token(TokenError::Signing(_))
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> Value {
        match self {
            AppError::Auth(_) | AppError::Token(TokenError::Invalid | TokenError::Expired) => {
                json!("Not authenticated")
            }
            AppError::InvalidCredentials => json!("Invalid credentials"),
            AppError::Store(StoreError::DuplicateIdentifier) => json!("Email already registered"),
            AppError::Password(PasswordError::Empty) => json!("Password must not be empty"),
            AppError::Validation(v) => json!(v.issues()),
            AppError::BadRequest(msg) => json!(msg),
            AppError::Calculation(e) => json!(e.to_string()),
            AppError::NotFound(_) => json!(self.to_string()),
            AppError::Store(StoreError::Backend(_))
            | AppError::Password(_)
            | AppError::Token(TokenError::Signing(_))
            | AppError::Internal(_) => json!("Internal server error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = ?self, %status, "request failed");
        } else {
            warn!(error = %self, %status, "request rejected");
        }

        let mut response = (status, Json(json!({ "detail": self.detail() }))).into_response();
        if status == StatusCode::UNAUTHORIZED && !matches!(self, AppError::InvalidCredentials) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// `axum::Json` whose rejections render as 422 `{"detail": [...]}` bodies.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ValidationError::malformed_body(rejection.body_text()).into()),
        }
    }
}

/// `axum::extract::Path` whose rejections render as 422 `{"detail": [...]}` bodies.
pub struct PathParam<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for PathParam<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(ValidationError::malformed("path", rejection.body_text()).into()),
        }
    }
}

/// `axum::extract::Query` whose rejections render as 422 `{"detail": [...]}` bodies.
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => {
                Err(ValidationError::malformed("query", rejection.body_text()).into())
            }
        }
    }
}
