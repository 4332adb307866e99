use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::UserStore,
        repo_types::User,
    },
    db::StoreError,
    error::{AppError, AppResult},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// Collapse `email`/`username` into the single stored identifier. `email`
/// wins when both are given; `username` is only a fallback.
fn resolve_identifier(email: Option<&str>, username: Option<&str>) -> AppResult<String> {
    let email = email.map(normalize).filter(|v| !v.is_empty());
    let username = username.map(normalize).filter(|v| !v.is_empty());

    let Some(identifier) = email.or(username) else {
        return Err(AppError::BadRequest("Email is required".into()));
    };

    if !is_valid_email(&identifier) {
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    Ok(identifier)
}

fn auth_response(keys: &JwtKeys, user: User) -> AppResult<AuthResponse> {
    let access_token = keys.issue(user.id)?;
    Ok(AuthResponse {
        access_token,
        token_type: "bearer",
        user: PublicUser {
            id: user.id,
            email: user.email,
        },
    })
}

pub async fn register(
    users: &dyn UserStore,
    keys: &JwtKeys,
    payload: RegisterRequest,
) -> AppResult<AuthResponse> {
    let email = resolve_identifier(payload.email.as_deref(), payload.username.as_deref())?;
    let hash = hash_password(&payload.password)?;

    let user = match users.create(&email, &hash).await {
        Ok(u) => u,
        Err(StoreError::DuplicateIdentifier) => {
            warn!(email = %email, "email already registered");
            return Err(StoreError::DuplicateIdentifier.into());
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    auth_response(keys, user)
}

pub async fn login(
    users: &dyn UserStore,
    keys: &JwtKeys,
    payload: LoginRequest,
) -> AppResult<AuthResponse> {
    let email = normalize(&payload.username);

    let Some(user) = users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    auth_response(keys, user)
}
