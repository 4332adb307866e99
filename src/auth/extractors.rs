use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use super::jwt::{JwtKeys, TokenError};
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no bearer credential supplied")]
    MissingCredential,
    #[error("bearer credential rejected: {0}")]
    InvalidCredential(#[source] TokenError),
}

/// Resolve a raw `Authorization` header value to the user it identifies.
///
/// An absent header, a non-`Bearer` scheme or an empty token all count as a
/// missing credential. Anything the token service rejects is invalid.
pub fn authenticate(keys: &JwtKeys, header: Option<&str>) -> Result<Uuid, AuthError> {
    let token = header
        .and_then(bearer_token)
        .ok_or(AuthError::MissingCredential)?;

    let claims = keys.verify(token).map_err(AuthError::InvalidCredential)?;
    Ok(claims.sub)
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Authenticated caller. Rejects with 401 before any body extraction runs.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let header = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());

        match authenticate(&keys, header) {
            Ok(user_id) => Ok(AuthUser(user_id)),
            Err(e) => {
                warn!(reason = %e, "unauthenticated request");
                Err(e.into())
            }
        }
    }
}
